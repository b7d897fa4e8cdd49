//! Wiring: one cache, collector and refresh loop per configured source,
//! all sharing a Prometheus registry and the health tracker.

use prometheus::Registry;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::ExporterConfig;
use crate::error::ExporterError;
use crate::health::{HealthCollector, HealthTracker};
use crate::http::AppState;
use crate::refresh::RefreshLoop;
use crate::state::{new_cache, SharedCache};
use crate::thermal::{client_from_config, ThermalClient, ThermalCollector, ThermalData, ThermalSource};
use crate::unifi::{ControllerClient, ControllerHttpClient, UnifiCollector, UnifiData, UnifiSource};

pub struct Exporter {
    registry: Arc<Registry>,
    health: HealthTracker,
    shutdown: CancellationToken,
    interval: Duration,
    tasks: Vec<JoinHandle<()>>,
}

impl Exporter {
    pub fn new(interval: Duration, shutdown: CancellationToken) -> Result<Self, ExporterError> {
        let registry = Registry::new();
        let health = HealthTracker::new();
        registry.register(Box::new(HealthCollector::new(health.clone())?))?;
        Ok(Self { registry: Arc::new(registry), health, shutdown, interval, tasks: Vec::new() })
    }

    /// Start every source present in `cfg`.
    pub fn from_config(cfg: &ExporterConfig, shutdown: CancellationToken) -> Result<Self, ExporterError> {
        let mut exporter = Self::new(cfg.refresh_interval(), shutdown)?;
        if let Some(redfish) = &cfg.redfish {
            exporter.add_thermal(client_from_config(redfish)?, &redfish.target)?;
        }
        if let Some(unifi) = &cfg.unifi {
            exporter.add_unifi(Arc::new(ControllerHttpClient::new(unifi)?))?;
        }
        Ok(exporter)
    }

    pub fn add_thermal(
        &mut self,
        client: Arc<dyn ThermalClient>,
        target: &str,
    ) -> Result<SharedCache<ThermalData>, ExporterError> {
        let cache = new_cache();
        self.registry.register(Box::new(ThermalCollector::new(cache.clone(), target)?))?;
        let refresh = RefreshLoop::new(ThermalSource::new(client), cache.clone(), self.health.register("thermal"))
            .with_interval(self.interval);
        self.tasks.push(refresh.spawn(self.shutdown.clone()));
        info!(%target, "thermal source registered");
        Ok(cache)
    }

    pub fn add_unifi(
        &mut self,
        client: Arc<dyn ControllerClient>,
    ) -> Result<SharedCache<UnifiData>, ExporterError> {
        let cache = new_cache();
        self.registry.register(Box::new(UnifiCollector::new(cache.clone())?))?;
        let refresh = RefreshLoop::new(UnifiSource::new(client), cache.clone(), self.health.register("unifi"))
            .with_interval(self.interval);
        self.tasks.push(refresh.spawn(self.shutdown.clone()));
        info!("unifi source registered");
        Ok(cache)
    }

    pub fn state(&self) -> AppState {
        AppState { registry: self.registry.clone(), health: self.health.clone() }
    }

    /// Cancel the refresh loops and wait for them to finish.
    pub async fn stop(self) {
        self.shutdown.cancel();
        for task in self.tasks {
            let _ = task.await;
        }
    }
}
