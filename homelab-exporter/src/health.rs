//! Per-source refresh health, readiness, and the freshness metrics that make
//! a stale cache visible to whoever scrapes us.

use parking_lot::Mutex;
use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use time::OffsetDateTime;

use crate::error::FetchError;
use crate::metrics::{collect_all, describe_all, reset_all, Instrument};
use crate::state::{new_state, Shared};

#[derive(Debug, Clone, Serialize)]
pub struct SourceReport {
    pub source: String,
    pub up: bool,
    pub refreshes: u64,
    pub failures: u64,
    pub consecutive_failures: u64,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_success: Option<OffsetDateTime>,
    pub last_error: Option<String>,
    pub last_duration_seconds: f64,
}

/// Refresh outcome counters for one source. Cheap to clone.
#[derive(Clone)]
pub struct SourceHealth {
    name: Arc<str>,
    refreshes: Arc<AtomicU64>,
    failures: Arc<AtomicU64>,
    consecutive_failures: Arc<AtomicU64>,
    last_success: Shared<Option<OffsetDateTime>>,
    last_error: Shared<Option<String>>,
    last_duration: Shared<Duration>,
}

impl SourceHealth {
    pub fn new(name: &str) -> Self {
        Self {
            name: Arc::from(name),
            refreshes: Arc::new(AtomicU64::new(0)),
            failures: Arc::new(AtomicU64::new(0)),
            consecutive_failures: Arc::new(AtomicU64::new(0)),
            last_success: new_state(None),
            last_error: new_state(None),
            last_duration: new_state(Duration::ZERO),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn record_success(&self, took: Duration) {
        self.refreshes.fetch_add(1, Ordering::Relaxed);
        self.consecutive_failures.store(0, Ordering::Relaxed);
        *self.last_success.lock() = Some(OffsetDateTime::now_utc());
        *self.last_error.lock() = None;
        *self.last_duration.lock() = took;
    }

    pub fn record_failure(&self, took: Duration, err: &FetchError) {
        self.refreshes.fetch_add(1, Ordering::Relaxed);
        self.failures.fetch_add(1, Ordering::Relaxed);
        self.consecutive_failures.fetch_add(1, Ordering::Relaxed);
        *self.last_error.lock() = Some(err.to_string());
        *self.last_duration.lock() = took;
    }

    /// True when at least one refresh has run and the latest one succeeded.
    pub fn is_up(&self) -> bool {
        self.refreshes.load(Ordering::Relaxed) > 0
            && self.consecutive_failures.load(Ordering::Relaxed) == 0
    }

    pub fn has_published(&self) -> bool {
        self.last_success.lock().is_some()
    }

    pub fn report(&self) -> SourceReport {
        SourceReport {
            source: self.name.to_string(),
            up: self.is_up(),
            refreshes: self.refreshes.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            consecutive_failures: self.consecutive_failures.load(Ordering::Relaxed),
            last_success: *self.last_success.lock(),
            last_error: self.last_error.lock().clone(),
            last_duration_seconds: self.last_duration.lock().as_secs_f64(),
        }
    }
}

/// Every configured source's health, shared with the HTTP layer.
#[derive(Clone, Default)]
pub struct HealthTracker {
    sources: Shared<Vec<SourceHealth>>,
}

impl HealthTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, name: &str) -> SourceHealth {
        let health = SourceHealth::new(name);
        self.sources.lock().push(health.clone());
        health
    }

    /// Ready once every registered source has published a snapshot.
    pub fn is_ready(&self) -> bool {
        let sources = self.sources.lock();
        !sources.is_empty() && sources.iter().all(SourceHealth::has_published)
    }

    pub fn reports(&self) -> Vec<SourceReport> {
        self.sources.lock().iter().map(SourceHealth::report).collect()
    }
}

/// Exposes the tracker as `homelab_exporter_source_*` series.
pub struct HealthCollector {
    tracker: HealthTracker,
    scrape: Mutex<()>,
    up: Instrument,
    last_success: Instrument,
    refreshes: Instrument,
    failures: Instrument,
    duration: Instrument,
}

impl HealthCollector {
    pub fn new(tracker: HealthTracker) -> prometheus::Result<Self> {
        let labels = ["source"];
        Ok(Self {
            tracker,
            scrape: Mutex::new(()),
            up: Instrument::gauge(
                "homelab_exporter_source_up",
                "1 if the latest refresh of the source succeeded",
                &labels,
            )?,
            last_success: Instrument::gauge(
                "homelab_exporter_source_last_success_timestamp_seconds",
                "Unix time of the latest successful refresh",
                &labels,
            )?,
            refreshes: Instrument::counter(
                "homelab_exporter_source_refreshes_total",
                "Refresh cycles run",
                &labels,
            )?,
            failures: Instrument::counter(
                "homelab_exporter_source_refresh_failures_total",
                "Refresh cycles that kept the previous snapshot",
                &labels,
            )?,
            duration: Instrument::gauge(
                "homelab_exporter_source_refresh_duration_seconds",
                "Duration of the latest refresh cycle",
                &labels,
            )?,
        })
    }

    fn instruments(&self) -> [&Instrument; 5] {
        [&self.up, &self.last_success, &self.refreshes, &self.failures, &self.duration]
    }
}

impl Collector for HealthCollector {
    fn desc(&self) -> Vec<&Desc> {
        describe_all(&self.instruments())
    }

    fn collect(&self) -> Vec<MetricFamily> {
        let _scrape = self.scrape.lock();
        reset_all(&self.instruments());

        for report in self.tracker.reports() {
            let labels = [report.source.as_str()];
            self.up.observe(&labels, if report.up { 1.0 } else { 0.0 });
            if let Some(ts) = report.last_success {
                let secs = ts.unix_timestamp_nanos() as f64 / 1e9;
                self.last_success.observe(&labels, secs);
            }
            self.refreshes.observe(&labels, report.refreshes as f64);
            self.failures.observe(&labels, report.failures as f64);
            self.duration.observe(&labels, report.last_duration_seconds);
        }

        collect_all(&self.instruments())
    }
}
