/*!
Scrape harness: register collectors on a private registry, render the text
exposition and look up samples by name and labels.
*/

use anyhow::{Context, Result};
use homelab_exporter::metrics::render;
use prometheus::core::Collector;
use prometheus::Registry;
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Install a test-friendly subscriber once; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("homelab_exporter=debug")),
        )
        .with_test_writer()
        .try_init();
}

pub struct ScrapeHarness {
    pub registry: Registry,
}

impl Default for ScrapeHarness {
    fn default() -> Self {
        Self::new()
    }
}

impl ScrapeHarness {
    pub fn new() -> Self {
        init_tracing();
        Self { registry: Registry::new() }
    }

    /// Wrap an existing registry, e.g. the one an `Exporter` serves.
    pub fn with_registry(registry: Registry) -> Self {
        init_tracing();
        Self { registry }
    }

    pub fn register<C: Collector + 'static>(&self, collector: C) -> Result<()> {
        self.registry.register(Box::new(collector)).context("registering collector")
    }

    pub fn scrape(&self) -> Result<Scrape> {
        let text = render(&self.registry).context("rendering registry")?;
        Ok(Scrape::parse(text))
    }
}

/// One exposition line.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub name: String,
    pub labels: BTreeMap<String, String>,
    pub value: f64,
}

impl Sample {
    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }

    fn matches(&self, name: &str, labels: &[(&str, &str)]) -> bool {
        self.name == name && labels.iter().all(|(k, v)| self.label(k) == Some(*v))
    }
}

/// A parsed scrape.
#[derive(Debug, Clone)]
pub struct Scrape {
    pub text: String,
    pub samples: Vec<Sample>,
    types: HashMap<String, String>,
}

impl Scrape {
    pub fn parse(text: String) -> Self {
        let mut samples = Vec::new();
        let mut types = HashMap::new();
        for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            if let Some(rest) = line.strip_prefix("# TYPE ") {
                let mut parts = rest.split_whitespace();
                if let (Some(name), Some(kind)) = (parts.next(), parts.next()) {
                    types.insert(name.to_string(), kind.to_string());
                }
            } else if !line.starts_with('#') {
                if let Some(sample) = parse_line(line) {
                    samples.push(sample);
                }
            }
        }
        Self { text, samples, types }
    }

    /// Value of the first sample named `name` carrying every pair in `labels`.
    pub fn value(&self, name: &str, labels: &[(&str, &str)]) -> Option<f64> {
        self.samples.iter().find(|s| s.matches(name, labels)).map(|s| s.value)
    }

    pub fn series(&self, name: &str) -> Vec<&Sample> {
        self.samples.iter().filter(|s| s.name == name).collect()
    }

    pub fn has(&self, name: &str, labels: &[(&str, &str)]) -> bool {
        self.value(name, labels).is_some()
    }

    pub fn metric_type(&self, name: &str) -> Option<&str> {
        self.types.get(name).map(String::as_str)
    }
}

/// Parse `name{k="v",...} value`. Label values may contain commas.
pub fn parse_line(line: &str) -> Option<Sample> {
    let (name, labels, rest) = match line.find('{') {
        Some(open) => {
            let close = line.rfind('}')?;
            (&line[..open], parse_labels(&line[open + 1..close]), &line[close + 1..])
        }
        None => {
            let space = line.find(char::is_whitespace)?;
            (&line[..space], BTreeMap::new(), &line[space..])
        }
    };
    let value = rest.split_whitespace().next()?.parse::<f64>().ok()?;
    Some(Sample { name: name.trim().to_string(), labels, value })
}

fn parse_labels(body: &str) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    let mut chars = body.chars();
    loop {
        let key: String = chars.by_ref().take_while(|c| *c != '=').collect();
        let key = key.trim().trim_start_matches(',').trim().to_string();
        if key.is_empty() || chars.next() != Some('"') {
            break;
        }
        let mut value = String::new();
        while let Some(c) = chars.next() {
            match c {
                '\\' => match chars.next() {
                    Some('n') => value.push('\n'),
                    Some(other) => value.push(other),
                    None => break,
                },
                '"' => break,
                c => value.push(c),
            }
        }
        labels.insert(key, value);
    }
    labels
}

/// Poll `check` every 10ms until it holds or `timeout` elapses.
pub async fn wait_until<F, Fut>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let poll = async {
        while !check().await {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    };
    tokio::time::timeout(timeout, poll).await.is_ok()
}
