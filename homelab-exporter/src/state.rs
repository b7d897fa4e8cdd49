//! Snapshot cache shared between one refresh loop (writer) and any number
//! of scrape handlers (readers).
//!
//! The lock only guards the swap of an `Arc`; readers never wait on I/O.

use parking_lot::Mutex;
use std::sync::Arc;
use time::OffsetDateTime;

pub type Shared<T> = Arc<Mutex<T>>;

pub fn new_state<T>(value: T) -> Shared<T> {
    Arc::new(Mutex::new(value))
}

/// Data from one successful fetch cycle. Never mutated once published.
#[derive(Debug)]
pub struct Snapshot<T> {
    pub data: T,
    /// `None` for the empty startup snapshot.
    pub fetched_at: Option<OffsetDateTime>,
    pub generation: u64,
}

/// Holds exactly one snapshot; each `write` replaces it wholesale.
#[derive(Debug)]
pub struct SnapshotCache<T> {
    current: Mutex<Arc<Snapshot<T>>>,
}

pub type SharedCache<T> = Arc<SnapshotCache<T>>;

impl<T> SnapshotCache<T> {
    pub fn new(initial: T) -> Self {
        Self {
            current: Mutex::new(Arc::new(Snapshot {
                data: initial,
                fetched_at: None,
                generation: 0,
            })),
        }
    }

    /// Current snapshot. O(1): clones the `Arc` under the lock.
    pub fn read(&self) -> Arc<Snapshot<T>> {
        self.current.lock().clone()
    }

    /// Publish `data` as the new snapshot and return its generation.
    pub fn write(&self, data: T) -> u64 {
        let fetched_at = Some(OffsetDateTime::now_utc());
        let mut current = self.current.lock();
        let generation = current.generation + 1;
        *current = Arc::new(Snapshot { data, fetched_at, generation });
        generation
    }
}

impl<T: Default> SnapshotCache<T> {
    pub fn empty() -> Self {
        Self::new(T::default())
    }
}

impl<T: Default> Default for SnapshotCache<T> {
    fn default() -> Self {
        Self::empty()
    }
}

pub fn new_cache<T: Default>() -> SharedCache<T> {
    Arc::new(SnapshotCache::empty())
}
