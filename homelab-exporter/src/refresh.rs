//! Background refresh loop: fetch on a fixed period, publish on success,
//! keep the previous snapshot on failure.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::FetchError;
use crate::health::SourceHealth;
use crate::state::SharedCache;

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(30);

/// One upstream API that can produce a complete snapshot.
#[async_trait]
pub trait Source: Send + Sync + 'static {
    type Data: Send + Sync + 'static;

    fn name(&self) -> &'static str;

    /// Fetch a complete, internally consistent snapshot.
    async fn fetch(&self) -> Result<Self::Data, FetchError>;
}

pub struct RefreshLoop<S: Source> {
    source: S,
    cache: SharedCache<S::Data>,
    health: SourceHealth,
    interval: Duration,
}

impl<S: Source> RefreshLoop<S> {
    pub fn new(source: S, cache: SharedCache<S::Data>, health: SourceHealth) -> Self {
        Self { source, cache, health, interval: DEFAULT_INTERVAL }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn cache(&self) -> &SharedCache<S::Data> {
        &self.cache
    }

    /// Run a single Fetching step. The cache is only touched on success.
    pub async fn refresh_once(&self) -> Result<u64, FetchError> {
        let started = Instant::now();
        match self.source.fetch().await {
            Ok(data) => {
                let generation = self.cache.write(data);
                let took = started.elapsed();
                self.health.record_success(took);
                debug!(source = self.source.name(), generation, ?took, "snapshot published");
                Ok(generation)
            }
            Err(e) => {
                let took = started.elapsed();
                self.health.record_failure(took, &e);
                warn!(
                    source = self.source.name(),
                    kind = e.kind(),
                    "refresh failed, keeping previous snapshot: {e}"
                );
                Err(e)
            }
        }
    }

    /// Fetch immediately, then once per interval until `shutdown` fires.
    pub async fn run(self, shutdown: CancellationToken) {
        info!(source = self.source.name(), interval = ?self.interval, "refresh loop started");
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    // failures are logged and recorded in refresh_once
                    let _ = self.refresh_once().await;
                }
            }
        }
        info!(source = self.source.name(), "refresh loop stopped");
    }

    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }
}

#[async_trait]
impl<T: Source> Source for Arc<T> {
    type Data = T::Data;

    fn name(&self) -> &'static str {
        (**self).name()
    }

    async fn fetch(&self) -> Result<Self::Data, FetchError> {
        (**self).fetch().await
    }
}
