use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;
use tracing::debug;

use super::{ThermalClient, ThermalData};
use crate::config::RedfishConf;
use crate::error::FetchError;

/// Talks to the BMC's Redfish service directly over HTTPS.
pub struct RedfishHttpClient {
    http: reqwest::Client,
    url: String,
    user: String,
    password: String,
}

impl RedfishHttpClient {
    pub fn new(conf: &RedfishConf) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(conf.insecure_tls)
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            url: thermal_url(&conf.target, &conf.chassis),
            user: conf.user.clone(),
            password: conf.password.clone(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// `bmc.lan` and `https://bmc.lan/` both map to the chassis Thermal URL.
pub(crate) fn thermal_url(target: &str, chassis: &str) -> String {
    let target = target.trim().trim_end_matches('/');
    let base = if target.starts_with("http://") || target.starts_with("https://") {
        target.to_string()
    } else {
        format!("https://{target}")
    };
    format!("{base}/redfish/v1/Chassis/{chassis}/Thermal")
}

#[async_trait]
impl ThermalClient for RedfishHttpClient {
    async fn thermal(&self) -> Result<ThermalData, FetchError> {
        debug!(url = %self.url, "fetching redfish thermal");
        let resp = self
            .http
            .get(&self.url)
            .basic_auth(&self.user, Some(&self.password))
            .header("Accept", "application/json")
            .send()
            .await?;

        match resp.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(FetchError::Auth(format!("BMC rejected credentials for {}", self.url)));
            }
            s if !s.is_success() => {
                return Err(FetchError::Status { status: s.as_u16(), url: self.url.clone() });
            }
            _ => {}
        }

        let body = resp.bytes().await?;
        ThermalData::from_json(&body)
    }
}
