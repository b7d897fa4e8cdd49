//! BMC thermal source: Redfish `Thermal` readings (temperature sensors and
//! fans), cached and republished as gauges.

mod redfish;
mod redfishtool;

pub use redfish::RedfishHttpClient;
pub use redfishtool::RedfishToolClient;

use async_trait::async_trait;
use parking_lot::Mutex;
use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::{RedfishConf, ThermalBackend};
use crate::error::FetchError;
use crate::metrics::{collect_all, describe_all, reset_all, Instrument};
use crate::refresh::Source;
use crate::state::SharedCache;

/// Subset of the Redfish `Thermal` resource we export.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ThermalData {
    #[serde(default)]
    pub temperatures: Vec<TemperatureReading>,
    #[serde(default)]
    pub fans: Vec<FanReading>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TemperatureReading {
    #[serde(default)]
    pub name: String,
    /// `null` for absent sensors (empty slots, powered-off parts).
    #[serde(default)]
    pub reading_celsius: Option<f64>,
    #[serde(default)]
    pub status: Status,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FanReading {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub reading: Option<f64>,
    #[serde(default)]
    pub status: Status,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Status {
    #[serde(default)]
    pub health: Option<String>,
}

impl Status {
    pub fn health_label(&self) -> &str {
        self.health.as_deref().unwrap_or("")
    }
}

impl ThermalData {
    /// Decode a Redfish `Thermal` JSON document.
    pub fn from_json(body: &[u8]) -> Result<Self, FetchError> {
        Ok(serde_json::from_slice(body)?)
    }
}

/// Fetches the Thermal resource of one chassis.
#[async_trait]
pub trait ThermalClient: Send + Sync {
    async fn thermal(&self) -> Result<ThermalData, FetchError>;
}

/// Build the client selected by `conf.backend`.
pub fn client_from_config(conf: &RedfishConf) -> Result<Arc<dyn ThermalClient>, FetchError> {
    Ok(match conf.backend {
        ThermalBackend::Http => Arc::new(RedfishHttpClient::new(conf)?),
        ThermalBackend::Redfishtool => Arc::new(RedfishToolClient::new(conf)),
    })
}

pub struct ThermalSource {
    client: Arc<dyn ThermalClient>,
}

impl ThermalSource {
    pub fn new(client: Arc<dyn ThermalClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Source for ThermalSource {
    type Data = ThermalData;

    fn name(&self) -> &'static str {
        "thermal"
    }

    async fn fetch(&self) -> Result<ThermalData, FetchError> {
        self.client.thermal().await
    }
}

/// Publishes the cached thermal snapshot on every scrape.
pub struct ThermalCollector {
    cache: SharedCache<ThermalData>,
    target: String,
    scrape: Mutex<()>,
    temperature: Instrument,
    fan_speed: Instrument,
}

impl ThermalCollector {
    pub fn new(cache: SharedCache<ThermalData>, target: &str) -> prometheus::Result<Self> {
        Ok(Self {
            cache,
            target: target.to_string(),
            scrape: Mutex::new(()),
            temperature: Instrument::gauge(
                "redfish_temperature_celsius",
                "Temperature readings from Redfish",
                &["sensor", "name", "target", "health"],
            )?,
            fan_speed: Instrument::gauge(
                "redfish_fan_speed_rpm",
                "Fan speeds from Redfish",
                &["fan", "name", "target", "health"],
            )?,
        })
    }

    fn instruments(&self) -> [&Instrument; 2] {
        [&self.temperature, &self.fan_speed]
    }
}

impl Collector for ThermalCollector {
    fn desc(&self) -> Vec<&Desc> {
        describe_all(&self.instruments())
    }

    fn collect(&self) -> Vec<MetricFamily> {
        let _scrape = self.scrape.lock();
        let snapshot = self.cache.read();
        reset_all(&self.instruments());

        // absent sensors still get a series, reading 0
        for temp in &snapshot.data.temperatures {
            self.temperature.observe(
                &[&temp.name, "temperature", &self.target, temp.status.health_label()],
                temp.reading_celsius.unwrap_or(0.0),
            );
        }
        for fan in &snapshot.data.fans {
            self.fan_speed.observe(
                &[&fan.name, "fan", &self.target, fan.status.health_label()],
                fan.reading.unwrap_or(0.0),
            );
        }

        collect_all(&self.instruments())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::render;
    use crate::state::new_cache;

    const THERMAL: &str = r#"{
        "@odata.id": "/redfish/v1/Chassis/Baseboard/Thermal",
        "Temperatures": [
            {"Name": "CPU1 Temp", "ReadingCelsius": 48, "Status": {"Health": "OK", "State": "Enabled"}},
            {"Name": "DIMM B2", "ReadingCelsius": null, "Status": {"State": "Absent"}}
        ],
        "Fans": [
            {"Name": "FAN1", "Reading": 5400, "ReadingUnits": "RPM", "Status": {"Health": "Warning"}},
            {"Name": "FAN2"}
        ]
    }"#;

    #[test]
    fn decodes_redfish_document() {
        let data = ThermalData::from_json(THERMAL.as_bytes()).unwrap();
        assert_eq!(data.temperatures.len(), 2);
        assert_eq!(data.temperatures[0].reading_celsius, Some(48.0));
        assert_eq!(data.temperatures[1].status.health_label(), "");
        assert_eq!(data.fans[0].reading, Some(5400.0));
    }

    #[test]
    fn rejects_non_thermal_payload() {
        let err = ThermalData::from_json(b"[1, 2, 3]").unwrap_err();
        assert_eq!(err.kind(), "malformed");
    }

    #[test]
    fn collects_every_sensor_with_absent_readings_as_zero() {
        let cache = new_cache();
        cache.write(ThermalData::from_json(THERMAL.as_bytes()).unwrap());

        let registry = prometheus::Registry::new();
        registry.register(Box::new(ThermalCollector::new(cache, "bmc.lan").unwrap())).unwrap();
        let text = render(&registry).unwrap();

        assert!(text.contains(
            r#"redfish_temperature_celsius{health="OK",name="temperature",sensor="CPU1 Temp",target="bmc.lan"} 48"#
        ));
        assert!(text.contains(
            r#"redfish_fan_speed_rpm{fan="FAN1",health="Warning",name="fan",target="bmc.lan"} 5400"#
        ));
        assert!(text.contains(
            r#"redfish_temperature_celsius{health="",name="temperature",sensor="DIMM B2",target="bmc.lan"} 0"#
        ));
        assert!(text.contains(r#"redfish_fan_speed_rpm{fan="FAN2",health="",name="fan",target="bmc.lan"} 0"#));
    }

    #[test]
    fn empty_cache_reports_nothing() {
        let registry = prometheus::Registry::new();
        registry
            .register(Box::new(ThermalCollector::new(new_cache(), "bmc.lan").unwrap()))
            .unwrap();
        assert!(!render(&registry).unwrap().contains("redfish_temperature_celsius{"));
    }
}
