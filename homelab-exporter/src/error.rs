//! Error types shared by the fetch clients, the refresh loops and the wiring.

/// Failure of one fetch cycle against an upstream API.
///
/// Every variant is recoverable: the refresh loop logs it, keeps the
/// previous snapshot and tries again on the next tick.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("upstream returned HTTP {status} for {url}")]
    Status { status: u16, url: String },
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("command failed: {0}")]
    Command(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::Malformed(err.to_string())
    }
}

impl FetchError {
    /// Short machine-friendly name, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Transport(_) => "transport",
            FetchError::Status { .. } => "status",
            FetchError::Auth(_) => "auth",
            FetchError::Malformed(_) => "malformed",
            FetchError::Command(_) => "command",
            FetchError::Io(_) => "io",
        }
    }
}

/// Startup configuration errors. These are fatal.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("at least one of Redfish (REDFISH_TARGET) or UniFi (UNIFI_URL) must be configured")]
    NoSource,
    #[error("invalid value for {key}: {value}")]
    Invalid { key: String, value: String },
}

/// Errors raised while wiring the exporter together.
#[derive(Debug, thiserror::Error)]
pub enum ExporterError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
    #[error("fetch client setup failed: {0}")]
    Client(#[from] FetchError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
