/*!
Builders for controller-shaped device records and Redfish thermal data.

Numbers in device records are emitted as JSON strings, the way controllers
commonly send `system-stats`, so fixtures exercise the loose decoding path.
*/

use homelab_exporter::thermal::{FanReading, Status, TemperatureReading, ThermalData};
use homelab_exporter::unifi::{Client, Site};
use serde_json::{json, Map, Value};

pub fn site(name: &str, desc: &str) -> Site {
    Site { id: format!("id-{name}"), name: name.to_string(), desc: desc.to_string() }
}

/// A client attached to the site with `site_label` (see `Site::label`).
pub fn client(site_label: &str, name: &str) -> Client {
    Client { name: name.to_string(), site_name: site_label.to_string(), ..Default::default() }
}

/// `(name, reading)` pairs; `None` is a Redfish `null` reading.
pub fn thermal(temperatures: &[(&str, Option<f64>)], fans: &[(&str, Option<f64>)]) -> ThermalData {
    let ok = || Status { health: Some("OK".into()) };
    ThermalData {
        temperatures: temperatures
            .iter()
            .map(|(name, reading)| TemperatureReading {
                name: name.to_string(),
                reading_celsius: *reading,
                status: ok(),
            })
            .collect(),
        fans: fans
            .iter()
            .map(|(name, reading)| FanReading { name: name.to_string(), reading: *reading, status: ok() })
            .collect(),
    }
}

/// One entry of a device `port_table`.
#[derive(Debug, Clone)]
pub struct PortRecord {
    fields: Map<String, Value>,
}

impl PortRecord {
    pub fn new(idx: u32, name: &str) -> Self {
        let mut fields = Map::new();
        fields.insert("port_idx".into(), json!(idx));
        fields.insert("name".into(), json!(name));
        fields.insert("up".into(), json!(true));
        fields.insert("is_uplink".into(), json!(false));
        Self { fields }
    }

    pub fn up(mut self, up: bool) -> Self {
        self.fields.insert("up".into(), json!(up));
        self
    }

    pub fn uplink(mut self) -> Self {
        self.fields.insert("is_uplink".into(), json!(true));
        self
    }

    /// Link speed in Mbps.
    pub fn speed(mut self, mbps: u64) -> Self {
        self.fields.insert("speed".into(), json!(mbps));
        self
    }

    pub fn sfp(mut self, temperature: f64) -> Self {
        self.fields.insert("sfp_found".into(), json!(true));
        self.fields.insert("sfp_temperature".into(), json!(temperature.to_string()));
        self
    }

    /// Set any counter field, e.g. `rx_bytes`.
    pub fn counter(mut self, field: &str, value: u64) -> Self {
        self.fields.insert(field.into(), json!(value));
        self
    }

    pub fn build(self) -> Value {
        Value::Object(self.fields)
    }
}

/// One entry of `stat/device`.
#[derive(Debug, Clone)]
pub struct DeviceRecord {
    fields: Map<String, Value>,
    ports: Vec<Value>,
}

impl DeviceRecord {
    /// `kind` is the controller `type`: `udm`, `ugw`, `usw` or `uap`.
    pub fn new(kind: &str, name: &str) -> Self {
        let mut fields = Map::new();
        fields.insert("type".into(), json!(kind));
        fields.insert("name".into(), json!(name));
        fields.insert("mac".into(), json!("00:00:00:00:00:00"));
        Self { fields, ports: Vec::new() }
    }

    pub fn uap(name: &str) -> Self {
        Self::new("uap", name).model("U7PG2")
    }

    pub fn usw(name: &str) -> Self {
        Self::new("usw", name).model("US8P60")
    }

    pub fn usg(name: &str) -> Self {
        Self::new("ugw", name).model("UGW3")
    }

    pub fn udm(name: &str) -> Self {
        Self::new("udm", name).model("UDMPRO")
    }

    pub fn ip(mut self, ip: &str) -> Self {
        self.fields.insert("ip".into(), json!(ip));
        self
    }

    /// Site label; the HTTP client stamps this from the listing site.
    pub fn site(mut self, label: &str) -> Self {
        self.fields.insert("site_name".into(), json!(label));
        self
    }

    pub fn model(mut self, model: &str) -> Self {
        self.fields.insert("model".into(), json!(model));
        self
    }

    pub fn usage(mut self, cpu: f64, mem: f64) -> Self {
        self.fields.insert(
            "system-stats".into(),
            json!({ "cpu": cpu.to_string(), "mem": mem.to_string() }),
        );
        self
    }

    /// Switch-style `general_temperature`.
    pub fn general_temperature(mut self, celsius: f64) -> Self {
        self.fields.insert("has_temperature".into(), json!(true));
        self.fields.insert("general_temperature".into(), json!(celsius));
        self
    }

    /// Dream Machine-style sensor list.
    pub fn sensors(mut self, sensors: &[(&str, f64)]) -> Self {
        let list: Vec<Value> = sensors
            .iter()
            .map(|(name, value)| json!({ "name": name, "type": "board", "value": value }))
            .collect();
        self.fields.insert("has_temperature".into(), json!(true));
        self.fields.insert("temperatures".into(), Value::Array(list));
        self
    }

    /// Switch-level `stat.sw` counters, e.g. `[("rx_bytes", 10)]`.
    pub fn switch_stats(mut self, counters: &[(&str, u64)]) -> Self {
        let sw: Map<String, Value> =
            counters.iter().map(|(k, v)| (k.to_string(), json!(v))).collect();
        self.fields.insert("stat".into(), json!({ "sw": sw }));
        self
    }

    pub fn port(mut self, port: PortRecord) -> Self {
        self.ports.push(port.build());
        self
    }

    pub fn build(mut self) -> Value {
        if !self.ports.is_empty() {
            self.fields.insert("port_table".into(), Value::Array(self.ports));
        }
        Value::Object(self.fields)
    }
}
