//! Exporter configuration: optional YAML file, then environment overrides.
//!
//! Environment variables use the historical flag names upper-cased with
//! dots replaced by underscores (`redfish.target` -> `REDFISH_TARGET`).

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tokio::fs;
use tracing::{info, warn};

use crate::error::ConfigError;

pub const CONFIG_PATH_ENV: &str = "HOMELAB_EXPORTER_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "exporter.yaml";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ExporterConfig {
    pub listen: String,
    pub refresh_interval_secs: u64,
    pub redfish: Option<RedfishConf>,
    pub unifi: Option<UnifiConf>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct RedfishConf {
    pub target: String,
    pub user: String,
    pub password: String,
    pub chassis: String,
    pub backend: ThermalBackend,
    /// Accept self-signed BMC certificates.
    pub insecure_tls: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ThermalBackend {
    #[default]
    Http,
    Redfishtool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct UnifiConf {
    pub url: String,
    pub user: String,
    pub password: String,
    pub insecure_tls: bool,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:9100".into(),
            refresh_interval_secs: 30,
            redfish: None,
            unifi: None,
        }
    }
}

impl ExporterConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    /// Apply environment overrides. `lookup` is `std::env::var` in production.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("LISTEN") {
            self.listen = v;
        }
        if let Some(v) = lookup("REFRESH_INTERVAL_SECS") {
            self.refresh_interval_secs = v.trim().parse().map_err(|_| invalid("REFRESH_INTERVAL_SECS", &v))?;
        }

        let redfish = self.redfish.get_or_insert_with(RedfishConf::default);
        if let Some(v) = lookup("REDFISH_TARGET") {
            redfish.target = v;
        }
        if let Some(v) = lookup("REDFISH_USER") {
            redfish.user = v;
        }
        if let Some(v) = lookup("REDFISH_PASSWORD") {
            redfish.password = v;
        }
        if let Some(v) = lookup("REDFISH_CHASSIS") {
            redfish.chassis = v;
        }
        if let Some(v) = lookup("REDFISH_BACKEND") {
            redfish.backend = match v.trim().to_ascii_lowercase().as_str() {
                "http" => ThermalBackend::Http,
                "redfishtool" | "cli" => ThermalBackend::Redfishtool,
                _ => return Err(invalid("REDFISH_BACKEND", &v)),
            };
        }
        if let Some(v) = lookup("REDFISH_INSECURE") {
            redfish.insecure_tls = parse_bool("REDFISH_INSECURE", &v)?;
        }

        let unifi = self.unifi.get_or_insert_with(UnifiConf::default);
        if let Some(v) = lookup("UNIFI_URL") {
            unifi.url = v;
        }
        if let Some(v) = lookup("UNIFI_USER") {
            unifi.user = v;
        }
        if let Some(v) = lookup("UNIFI_PASSWORD").or_else(|| lookup("UNIFI_PASS")) {
            unifi.password = v;
        }
        if let Some(v) = lookup("UNIFI_INSECURE") {
            unifi.insecure_tls = parse_bool("UNIFI_INSECURE", &v)?;
        }

        self.normalize();
        Ok(())
    }

    /// Drop sections without a target so "configured" means usable.
    fn normalize(&mut self) {
        if self.redfish.as_ref().is_some_and(|r| r.target.trim().is_empty()) {
            self.redfish = None;
        }
        if let Some(redfish) = self.redfish.as_mut() {
            if redfish.chassis.trim().is_empty() {
                redfish.chassis = "Baseboard".into();
            }
        }
        if self.unifi.as_ref().is_some_and(|u| u.url.trim().is_empty()) {
            self.unifi = None;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.redfish.is_none() && self.unifi.is_none() {
            return Err(ConfigError::NoSource);
        }
        if self.refresh_interval_secs == 0 {
            return Err(invalid("refresh_interval_secs", "0"));
        }
        Ok(())
    }
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::Invalid { key: key.into(), value: value.into() }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(invalid(key, value)),
    }
}

/// Read the YAML file at `path`; a missing or empty file yields defaults.
pub async fn load_file(path: &Path) -> Result<ExporterConfig, ConfigError> {
    let shown = path.display().to_string();
    if !path.exists() {
        info!("no config file at {shown}, using defaults and environment");
        return Ok(ExporterConfig::default());
    }
    let txt = fs::read_to_string(path)
        .await
        .map_err(|source| ConfigError::Io { path: shown.clone(), source })?;
    if txt.trim().is_empty() {
        warn!("config file {shown} is empty, using defaults");
        return Ok(ExporterConfig::default());
    }
    let mut cfg: ExporterConfig =
        serde_yaml::from_str(&txt).map_err(|source| ConfigError::Parse { path: shown, source })?;
    cfg.normalize();
    Ok(cfg)
}

/// File (from `HOMELAB_EXPORTER_CONFIG`), then environment, then validation.
pub async fn load_config() -> Result<ExporterConfig, ConfigError> {
    let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
    let mut cfg = load_file(Path::new(&path)).await?;
    cfg.apply_env(|key| std::env::var(key).ok())?;
    cfg.validate()?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_need_a_source() {
        let mut cfg = ExporterConfig::default();
        cfg.apply_env(env(&[])).unwrap();
        assert!(cfg.redfish.is_none());
        assert!(cfg.unifi.is_none());
        assert!(matches!(cfg.validate(), Err(ConfigError::NoSource)));
    }

    #[test]
    fn one_source_is_enough() {
        let mut cfg = ExporterConfig::default();
        cfg.apply_env(env(&[("UNIFI_URL", "https://unifi.lan"), ("UNIFI_PASS", "secret")]))
            .unwrap();
        cfg.validate().unwrap();
        let unifi = cfg.unifi.unwrap();
        assert_eq!(unifi.password, "secret");
        assert!(cfg.redfish.is_none());
    }

    #[test]
    fn env_overrides_redfish_section() {
        let mut cfg = ExporterConfig::default();
        cfg.apply_env(env(&[
            ("REDFISH_TARGET", "10.0.0.5"),
            ("REDFISH_USER", "root"),
            ("REDFISH_BACKEND", "redfishtool"),
            ("REDFISH_INSECURE", "yes"),
            ("REFRESH_INTERVAL_SECS", "15"),
        ]))
        .unwrap();
        let redfish = cfg.redfish.clone().unwrap();
        assert_eq!(redfish.target, "10.0.0.5");
        assert_eq!(redfish.chassis, "Baseboard");
        assert_eq!(redfish.backend, ThermalBackend::Redfishtool);
        assert!(redfish.insecure_tls);
        assert_eq!(cfg.refresh_interval(), Duration::from_secs(15));
    }

    #[test]
    fn rejects_bad_values() {
        let mut cfg = ExporterConfig::default();
        let err = cfg.apply_env(env(&[("REDFISH_BACKEND", "ipmi")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref key, .. } if key == "REDFISH_BACKEND"));

        let mut cfg = ExporterConfig::default();
        assert!(cfg.apply_env(env(&[("REFRESH_INTERVAL_SECS", "soon")])).is_err());
    }

    #[tokio::test]
    async fn loads_yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("exporter.yaml");
        std::fs::write(
            &path,
            "listen: 127.0.0.1:9200\nredfish:\n  target: bmc.lan\n  user: admin\n  password: pw\n",
        )
        .unwrap();

        let cfg = load_file(&path).await.unwrap();
        assert_eq!(cfg.listen, "127.0.0.1:9200");
        assert_eq!(cfg.refresh_interval_secs, 30);
        let redfish = cfg.redfish.unwrap();
        assert_eq!(redfish.target, "bmc.lan");
        assert_eq!(redfish.chassis, "Baseboard");
        assert_eq!(redfish.backend, ThermalBackend::Http);
    }

    #[tokio::test]
    async fn missing_file_gives_defaults_and_garbage_fails() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_file(&dir.path().join("absent.yaml")).await.unwrap();
        assert_eq!(cfg, ExporterConfig::default());

        let path = dir.path().join("bad.yaml");
        std::fs::write(&path, "listen: [unterminated").unwrap();
        assert!(matches!(load_file(&path).await, Err(ConfigError::Parse { .. })));
    }

    #[tokio::test]
    async fn empty_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("exporter.yaml");
        std::fs::write(&path, "  \n").unwrap();
        assert_eq!(load_file(&path).await.unwrap(), ExporterConfig::default());
    }
}
