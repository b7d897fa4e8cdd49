//! Prometheus exporter for a homelab: BMC thermal readings over Redfish and
//! UniFi network devices.
//!
//! Each source is polled by its own refresh loop into a snapshot cache;
//! scrapes are served from the caches and never wait on upstream APIs.

pub mod app;
pub mod config;
pub mod error;
pub mod health;
pub mod http;
pub mod metrics;
pub mod refresh;
pub mod state;
pub mod thermal;
pub mod unifi;

pub use app::Exporter;
pub use error::{ConfigError, ExporterError, FetchError};
