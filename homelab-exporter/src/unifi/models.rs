//! Raw controller records, one struct per device family.
//!
//! Only the fields the exporter reads are modelled; everything else in the
//! controller payload is ignored. `site_name` is not part of the payload:
//! the fetch client stamps it from the site the record was listed under.

use serde::{Deserialize, Serialize};

use super::flex::{FlexBool, FlexNum};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Site {
    #[serde(rename = "_id")]
    pub id: String,
    /// Internal reference used in API paths, e.g. `default`.
    pub name: String,
    /// Display name.
    pub desc: String,
}

impl Site {
    /// Label used for every record of this site: `Desc (name)`.
    pub fn label(&self) -> String {
        if self.desc.is_empty() || self.desc == self.name {
            self.name.clone()
        } else {
            format!("{} ({})", self.desc, self.name)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Client {
    pub name: String,
    pub hostname: String,
    pub ip: String,
    pub mac: String,
    pub ap_mac: String,
    pub site_name: String,
    pub rssi: FlexNum,
    pub tx_bytes: FlexNum,
    pub rx_bytes: FlexNum,
    pub is_wired: FlexBool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemStats {
    pub cpu: FlexNum,
    pub mem: FlexNum,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemperatureSensor {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub value: FlexNum,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Port {
    pub name: String,
    pub port_idx: FlexNum,
    pub up: FlexBool,
    pub is_uplink: FlexBool,
    pub rx_packets: FlexNum,
    pub rx_bytes: FlexNum,
    pub rx_errors: FlexNum,
    pub rx_dropped: FlexNum,
    pub tx_packets: FlexNum,
    pub tx_bytes: FlexNum,
    pub tx_errors: FlexNum,
    pub tx_dropped: FlexNum,
    /// Negotiated link speed in Mbps.
    pub speed: FlexNum,
    pub sfp_found: FlexBool,
    pub sfp_temperature: FlexNum,
}

impl Port {
    /// SFP module temperature, only when a module is present.
    pub fn sfp_temperature(&self) -> Option<f64> {
        self.sfp_found.val().then(|| self.sfp_temperature.val())
    }

    pub fn speed_bps(&self) -> f64 {
        self.speed.val() * 1_000_000.0
    }
}

/// Switch-level cumulative counters (`stat.sw`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwitchStats {
    pub rx_packets: FlexNum,
    pub rx_bytes: FlexNum,
    pub rx_errors: FlexNum,
    pub rx_dropped: FlexNum,
    pub tx_packets: FlexNum,
    pub tx_bytes: FlexNum,
    pub tx_errors: FlexNum,
    pub tx_dropped: FlexNum,
    pub bytes: FlexNum,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceStat {
    pub sw: SwitchStats,
}

/// Dream Machine: gateway, switch ports and temperature sensors in one box.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Udm {
    pub name: String,
    pub site_name: String,
    pub ip: String,
    pub mac: String,
    pub model: String,
    pub has_temperature: FlexBool,
    pub temperatures: Vec<TemperatureSensor>,
    #[serde(rename = "system-stats")]
    pub system_stats: SystemStats,
    pub port_table: Vec<Port>,
}

/// Security Gateway. Reports no temperature and no port table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Usg {
    pub name: String,
    pub site_name: String,
    pub ip: String,
    pub mac: String,
    pub model: String,
    #[serde(rename = "system-stats")]
    pub system_stats: SystemStats,
}

/// Switch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Usw {
    pub name: String,
    pub site_name: String,
    pub ip: String,
    pub mac: String,
    pub model: String,
    pub has_temperature: FlexBool,
    pub general_temperature: FlexNum,
    #[serde(rename = "system-stats")]
    pub system_stats: SystemStats,
    pub stat: DeviceStat,
    pub port_table: Vec<Port>,
}

/// Access point.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Uap {
    pub name: String,
    pub site_name: String,
    pub ip: String,
    pub mac: String,
    pub model: String,
    #[serde(rename = "system-stats")]
    pub system_stats: SystemStats,
}

/// Devices as handed over by a fetch client, grouped by family.
/// Entries may be absent; the adapter layer drops them.
#[derive(Debug, Clone, Default)]
pub struct RawDevices {
    pub udms: Vec<Option<Udm>>,
    pub usgs: Vec<Option<Usg>>,
    pub usws: Vec<Option<Usw>>,
    pub uaps: Vec<Option<Uap>>,
}

impl RawDevices {
    pub fn len(&self) -> usize {
        self.udms.len() + self.usgs.len() + self.usws.len() + self.uaps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn extend(&mut self, other: RawDevices) {
        self.udms.extend(other.udms);
        self.usgs.extend(other.usgs);
        self.usws.extend(other.usws);
        self.uaps.extend(other.uaps);
    }
}
