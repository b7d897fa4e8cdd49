//! HTTP client for the UniFi Network controller API (classic controllers
//! and UniFi OS consoles).

use async_trait::async_trait;
use reqwest::redirect::Policy;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::devices::{decode_device, group};
use super::models::{Client, RawDevices, Site};
use crate::config::UnifiConf;
use crate::error::FetchError;

/// The calls the UniFi source needs from a controller.
#[async_trait]
pub trait ControllerClient: Send + Sync {
    async fn login(&self) -> Result<(), FetchError>;
    async fn sites(&self) -> Result<Vec<Option<Site>>, FetchError>;
    async fn clients(&self, sites: &[Site]) -> Result<Vec<Option<Client>>, FetchError>;
    async fn devices(&self, sites: &[Site]) -> Result<RawDevices, FetchError>;
}

#[derive(Debug, Default, Deserialize)]
struct Meta {
    #[serde(default)]
    rc: String,
    #[serde(default)]
    msg: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    meta: Meta,
    #[serde(default)]
    data: Vec<Value>,
}

pub struct ControllerHttpClient {
    http: reqwest::Client,
    base: String,
    user: String,
    password: String,
    unifi_os: AtomicBool,
}

impl ControllerHttpClient {
    pub fn new(conf: &UnifiConf) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .redirect(Policy::none())
            .danger_accept_invalid_certs(conf.insecure_tls)
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            base: conf.url.trim().trim_end_matches('/').to_string(),
            user: conf.user.clone(),
            password: conf.password.clone(),
            unifi_os: AtomicBool::new(false),
        })
    }

    pub fn is_unifi_os(&self) -> bool {
        self.unifi_os.load(Ordering::Relaxed)
    }

    fn api_url(&self, path: &str) -> String {
        let prefix = if self.is_unifi_os() { "/proxy/network" } else { "" };
        format!("{}{prefix}{path}", self.base)
    }

    /// UniFi OS consoles answer 200 on `/`; classic controllers redirect.
    async fn detect_unifi_os(&self) -> Result<bool, FetchError> {
        let resp = self.http.get(&self.base).send().await?;
        Ok(resp.status() == StatusCode::OK)
    }

    async fn get_data(&self, path: &str) -> Result<Vec<Value>, FetchError> {
        let url = self.api_url(path);
        debug!(%url, "controller request");
        let resp = self.http.get(&url).send().await?;
        check_status(resp.status(), &url)?;

        let envelope: Envelope = serde_json::from_slice(&resp.bytes().await?)?;
        if !envelope.meta.rc.is_empty() && envelope.meta.rc != "ok" {
            let msg = envelope.meta.msg.unwrap_or_default();
            if msg.contains("LoginRequired") {
                return Err(FetchError::Auth(msg));
            }
            return Err(FetchError::Malformed(format!("{url}: rc={} {msg}", envelope.meta.rc)));
        }
        Ok(envelope.data)
    }
}

fn check_status(status: StatusCode, url: &str) -> Result<(), FetchError> {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Err(FetchError::Auth(format!("{url} answered {status}")))
        }
        s if !s.is_success() => Err(FetchError::Status { status: s.as_u16(), url: url.to_string() }),
        _ => Ok(()),
    }
}

/// Records that fail to decode become absent entries.
fn decode_records<T: DeserializeOwned>(what: &str, data: Vec<Value>) -> Vec<Option<T>> {
    data.into_iter()
        .map(|record| match serde_json::from_value(record) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!("skipping undecodable {what} record: {e}");
                None
            }
        })
        .collect()
}

#[async_trait]
impl ControllerClient for ControllerHttpClient {
    async fn login(&self) -> Result<(), FetchError> {
        let unifi_os = self.detect_unifi_os().await?;
        self.unifi_os.store(unifi_os, Ordering::Relaxed);

        let path = if unifi_os { "/api/auth/login" } else { "/api/login" };
        let url = format!("{}{path}", self.base);
        let resp = self
            .http
            .post(&url)
            .json(&serde_json::json!({
                "username": self.user,
                "password": self.password,
                "remember": true,
            }))
            .send()
            .await?;
        // classic controllers reject bad credentials with 400
        if resp.status() == StatusCode::BAD_REQUEST {
            return Err(FetchError::Auth(format!("{url} rejected the credentials")));
        }
        check_status(resp.status(), &url)?;
        info!(controller = %self.base, unifi_os, "logged in to UniFi controller");
        Ok(())
    }

    async fn sites(&self) -> Result<Vec<Option<Site>>, FetchError> {
        let data = self.get_data("/api/self/sites").await?;
        Ok(decode_records("site", data))
    }

    async fn clients(&self, sites: &[Site]) -> Result<Vec<Option<Client>>, FetchError> {
        let mut clients = Vec::new();
        let mut failed = 0;
        let mut last_err = None;
        for site in sites {
            match self.get_data(&format!("/api/s/{}/stat/sta", site.name)).await {
                Ok(data) => {
                    let label = site.label();
                    clients.extend(decode_records::<Client>("client", data).into_iter().map(|c| {
                        c.map(|mut c| {
                            c.site_name = label.clone();
                            c
                        })
                    }));
                }
                Err(e @ FetchError::Auth(_)) => return Err(e),
                Err(e) => {
                    warn!(site = %site.name, "client listing failed: {e}");
                    failed += 1;
                    last_err = Some(e);
                }
            }
        }
        match last_err {
            Some(e) if failed == sites.len() => Err(e),
            _ => Ok(clients),
        }
    }

    async fn devices(&self, sites: &[Site]) -> Result<RawDevices, FetchError> {
        let mut raw = RawDevices::default();
        let mut failed = 0;
        let mut last_err = None;
        for site in sites {
            match self.get_data(&format!("/api/s/{}/stat/device", site.name)).await {
                Ok(data) => {
                    let label = site.label();
                    raw.extend(group(data.into_iter().filter_map(decode_device).map(|mut d| {
                        d.set_site(&label);
                        d
                    })));
                }
                Err(e @ FetchError::Auth(_)) => return Err(e),
                Err(e) => {
                    warn!(site = %site.name, "device listing failed: {e}");
                    failed += 1;
                    last_err = Some(e);
                }
            }
        }
        match last_err {
            Some(e) if failed == sites.len() => Err(e),
            _ => Ok(raw),
        }
    }
}
