//! Small helpers over the `prometheus` crate shared by every collector:
//! building labelled instruments, resetting them in bulk, rendering the
//! text exposition format.

use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;
use prometheus::{CounterVec, GaugeVec, Opts, Registry, TextEncoder};

/// One labelled instrument owned by a collector.
#[derive(Clone)]
pub enum Instrument {
    Gauge(GaugeVec),
    Counter(CounterVec),
}

impl Instrument {
    pub fn gauge(name: &str, help: &str, labels: &[&str]) -> prometheus::Result<Self> {
        Ok(Instrument::Gauge(GaugeVec::new(Opts::new(name, help), labels)?))
    }

    pub fn counter(name: &str, help: &str, labels: &[&str]) -> prometheus::Result<Self> {
        Ok(Instrument::Counter(CounterVec::new(Opts::new(name, help), labels)?))
    }

    /// Drop every series; the next collect only reports what gets repopulated.
    pub fn reset(&self) {
        match self {
            Instrument::Gauge(v) => v.reset(),
            Instrument::Counter(v) => v.reset(),
        }
    }

    /// Set a gauge, or publish an upstream cumulative value on a counter.
    ///
    /// Counters were just reset, so adding the upstream value once makes the
    /// series equal to it. Negative or NaN values are not valid for a
    /// counter and are reported as 0.
    pub fn observe(&self, labels: &[&str], value: f64) {
        match self {
            Instrument::Gauge(v) => v.with_label_values(labels).set(value),
            Instrument::Counter(v) => {
                let value = if value.is_finite() && value > 0.0 { value } else { 0.0 };
                v.with_label_values(labels).inc_by(value);
            }
        }
    }

    pub fn desc(&self) -> Vec<&Desc> {
        match self {
            Instrument::Gauge(v) => v.desc(),
            Instrument::Counter(v) => v.desc(),
        }
    }

    pub fn collect(&self) -> Vec<MetricFamily> {
        match self {
            Instrument::Gauge(v) => v.collect(),
            Instrument::Counter(v) => v.collect(),
        }
    }
}

pub fn describe_all<'a>(instruments: &[&'a Instrument]) -> Vec<&'a Desc> {
    instruments.iter().flat_map(|i| i.desc()).collect()
}

pub fn collect_all(instruments: &[&Instrument]) -> Vec<MetricFamily> {
    instruments.iter().flat_map(|i| i.collect()).collect()
}

pub fn reset_all(instruments: &[&Instrument]) {
    for instrument in instruments {
        instrument.reset();
    }
}

/// Render everything registered in `registry` in the text exposition format.
pub fn render(registry: &Registry) -> prometheus::Result<String> {
    TextEncoder::new().encode_to_string(&registry.gather())
}

pub fn bool_label(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}
