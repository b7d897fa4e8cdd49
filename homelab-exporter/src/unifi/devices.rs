//! Device adapter layer: one read-only view over the four device families.
//!
//! Common attributes go through [`UnifiDevice`]. Family extensions (switch
//! counters, port tables) are reached through the closed [`Device`] enum.

use serde_json::Value;
use tracing::warn;

use super::models::{Port, RawDevices, SwitchStats, Uap, Udm, Usg, Usw};

/// Upstream uses negative values as "not reported".
fn usage(raw: f64) -> f64 {
    if raw < 0.0 || raw.is_nan() { 0.0 } else { raw }
}

pub trait UnifiDevice {
    fn name(&self) -> &str;
    fn site(&self) -> &str;
    fn address(&self) -> &str;
    fn has_temperature(&self) -> bool;
    /// 0 when the family or the unit does not report a temperature.
    fn temperature(&self) -> f64;
    fn model(&self) -> &str;
    fn kind(&self) -> &'static str;
    fn cpu_usage(&self) -> f64;
    fn mem_usage(&self) -> f64;

    fn ports(&self) -> &[Port] {
        &[]
    }

    fn switch_stats(&self) -> Option<&SwitchStats> {
        None
    }
}

macro_rules! common_fields {
    () => {
        fn name(&self) -> &str {
            &self.name
        }
        fn site(&self) -> &str {
            &self.site_name
        }
        fn address(&self) -> &str {
            &self.ip
        }
        fn model(&self) -> &str {
            &self.model
        }
        fn cpu_usage(&self) -> f64 {
            usage(self.system_stats.cpu.val())
        }
        fn mem_usage(&self) -> f64 {
            usage(self.system_stats.mem.val())
        }
    };
}

impl UnifiDevice for Udm {
    common_fields!();

    fn has_temperature(&self) -> bool {
        self.has_temperature.val()
    }

    fn temperature(&self) -> f64 {
        self.temperatures.first().map_or(0.0, |t| t.value.val())
    }

    fn kind(&self) -> &'static str {
        "UDM"
    }

    fn ports(&self) -> &[Port] {
        &self.port_table
    }
}

impl UnifiDevice for Usg {
    common_fields!();

    fn has_temperature(&self) -> bool {
        false
    }

    fn temperature(&self) -> f64 {
        0.0
    }

    fn kind(&self) -> &'static str {
        "USG"
    }
}

impl UnifiDevice for Usw {
    common_fields!();

    fn has_temperature(&self) -> bool {
        self.has_temperature.val()
    }

    fn temperature(&self) -> f64 {
        self.general_temperature.val()
    }

    fn kind(&self) -> &'static str {
        "USW"
    }

    fn ports(&self) -> &[Port] {
        &self.port_table
    }

    fn switch_stats(&self) -> Option<&SwitchStats> {
        Some(&self.stat.sw)
    }
}

impl UnifiDevice for Uap {
    common_fields!();

    // most access points do not report a temperature
    fn has_temperature(&self) -> bool {
        false
    }

    fn temperature(&self) -> f64 {
        0.0
    }

    fn kind(&self) -> &'static str {
        "UAP"
    }
}

/// The finite set of families the exporter understands.
#[derive(Debug, Clone, PartialEq)]
pub enum Device {
    AllInOne(Udm),
    Gateway(Usg),
    Switch(Usw),
    AccessPoint(Uap),
}

impl Device {
    /// Stamp the site label the record was listed under.
    pub fn set_site(&mut self, site: &str) {
        let slot = match self {
            Device::AllInOne(d) => &mut d.site_name,
            Device::Gateway(d) => &mut d.site_name,
            Device::Switch(d) => &mut d.site_name,
            Device::AccessPoint(d) => &mut d.site_name,
        };
        *slot = site.to_string();
    }

    pub fn view(&self) -> &dyn UnifiDevice {
        match self {
            Device::AllInOne(d) => d,
            Device::Gateway(d) => d,
            Device::Switch(d) => d,
            Device::AccessPoint(d) => d,
        }
    }
}

/// Normalized devices of one snapshot, each family in fetch order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Devices {
    pub udms: Vec<Udm>,
    pub usgs: Vec<Usg>,
    pub usws: Vec<Usw>,
    pub uaps: Vec<Uap>,
}

impl Devices {
    /// Absent entries are skipped silently.
    pub fn from_raw(raw: RawDevices) -> Self {
        Self {
            udms: raw.udms.into_iter().flatten().collect(),
            usgs: raw.usgs.into_iter().flatten().collect(),
            usws: raw.usws.into_iter().flatten().collect(),
            uaps: raw.uaps.into_iter().flatten().collect(),
        }
    }

    /// Every device as a view: UDM, USG, USW, UAP.
    pub fn all(&self) -> impl Iterator<Item = &dyn UnifiDevice> + '_ {
        let udms = self.udms.iter().map(|d| d as &dyn UnifiDevice);
        let usgs = self.usgs.iter().map(|d| d as &dyn UnifiDevice);
        let usws = self.usws.iter().map(|d| d as &dyn UnifiDevice);
        let uaps = self.uaps.iter().map(|d| d as &dyn UnifiDevice);
        udms.chain(usgs).chain(usws).chain(uaps)
    }

    pub fn len(&self) -> usize {
        self.udms.len() + self.usgs.len() + self.usws.len() + self.uaps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Classify one controller record by its `type` field.
///
/// Unknown families and records that fail to decode are skipped with a
/// warning rather than misreported.
pub fn decode_device(record: Value) -> Option<Device> {
    let kind = record.get("type").and_then(Value::as_str).unwrap_or_default().to_string();
    let name = record.get("name").and_then(Value::as_str).unwrap_or_default().to_string();
    let decoded = match kind.as_str() {
        "udm" => serde_json::from_value(record).map(Device::AllInOne),
        "ugw" | "usg" => serde_json::from_value(record).map(Device::Gateway),
        "usw" => serde_json::from_value(record).map(Device::Switch),
        "uap" => serde_json::from_value(record).map(Device::AccessPoint),
        other => {
            warn!(device = %name, kind = other, "skipping device of unknown family");
            return None;
        }
    };
    match decoded {
        Ok(device) => Some(device),
        Err(e) => {
            warn!(device = %name, kind = %kind, "skipping undecodable device record: {e}");
            None
        }
    }
}

/// Sort decoded devices into their family lists.
pub fn group(devices: impl IntoIterator<Item = Device>) -> RawDevices {
    let mut raw = RawDevices::default();
    for device in devices {
        match device {
            Device::AllInOne(d) => raw.udms.push(Some(d)),
            Device::Gateway(d) => raw.usgs.push(Some(d)),
            Device::Switch(d) => raw.usws.push(Some(d)),
            Device::AccessPoint(d) => raw.uaps.push(Some(d)),
        }
    }
    raw
}
