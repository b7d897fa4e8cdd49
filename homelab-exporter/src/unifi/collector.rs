//! Scrape-time view of the UniFi snapshot: device gauges, switch and port
//! counters, clients per site.

use parking_lot::Mutex;
use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;

use super::models::{Port, SwitchStats};
use super::{UnifiData, UnifiDevice};
use crate::metrics::{bool_label, collect_all, describe_all, reset_all, Instrument};
use crate::state::SharedCache;

const DEVICE_LABELS: &[&str] = &["type", "site", "source", "name"];
const PORT_LABELS: &[&str] =
    &["type", "site", "source", "name", "port", "port_number", "up", "uplink"];

/// Rx/tx counter set shared by switch and port series.
struct Traffic {
    rx_packets: Instrument,
    rx_bytes: Instrument,
    rx_errors: Instrument,
    rx_dropped: Instrument,
    tx_packets: Instrument,
    tx_bytes: Instrument,
    tx_errors: Instrument,
    tx_dropped: Instrument,
}

impl Traffic {
    fn new(prefix: &str, what: &str, labels: &[&str]) -> prometheus::Result<Self> {
        let counter = |field: &str, help: &str| {
            Instrument::counter(
                &format!("{prefix}_{field}_total"),
                &format!("{help} by the {what}"),
                labels,
            )
        };
        Ok(Self {
            rx_packets: counter("rx_packets", "Packets received")?,
            rx_bytes: counter("rx_bytes", "Bytes received")?,
            rx_errors: counter("rx_errors", "Receive errors seen")?,
            rx_dropped: counter("rx_dropped", "Received packets dropped")?,
            tx_packets: counter("tx_packets", "Packets sent")?,
            tx_bytes: counter("tx_bytes", "Bytes sent")?,
            tx_errors: counter("tx_errors", "Transmit errors seen")?,
            tx_dropped: counter("tx_dropped", "Transmitted packets dropped")?,
        })
    }

    fn instruments(&self) -> [&Instrument; 8] {
        [
            &self.rx_packets,
            &self.rx_bytes,
            &self.rx_errors,
            &self.rx_dropped,
            &self.tx_packets,
            &self.tx_bytes,
            &self.tx_errors,
            &self.tx_dropped,
        ]
    }

    fn observe_switch(&self, labels: &[&str], sw: &SwitchStats) {
        self.rx_packets.observe(labels, sw.rx_packets.val());
        self.rx_bytes.observe(labels, sw.rx_bytes.val());
        self.rx_errors.observe(labels, sw.rx_errors.val());
        self.rx_dropped.observe(labels, sw.rx_dropped.val());
        self.tx_packets.observe(labels, sw.tx_packets.val());
        self.tx_bytes.observe(labels, sw.tx_bytes.val());
        self.tx_errors.observe(labels, sw.tx_errors.val());
        self.tx_dropped.observe(labels, sw.tx_dropped.val());
    }

    fn observe_port(&self, labels: &[&str], port: &Port) {
        self.rx_packets.observe(labels, port.rx_packets.val());
        self.rx_bytes.observe(labels, port.rx_bytes.val());
        self.rx_errors.observe(labels, port.rx_errors.val());
        self.rx_dropped.observe(labels, port.rx_dropped.val());
        self.tx_packets.observe(labels, port.tx_packets.val());
        self.tx_bytes.observe(labels, port.tx_bytes.val());
        self.tx_errors.observe(labels, port.tx_errors.val());
        self.tx_dropped.observe(labels, port.tx_dropped.val());
    }
}

/// Publishes the cached UniFi snapshot on every scrape.
///
/// Every instrument is reset before being repopulated, so a device or port
/// missing from the latest snapshot disappears from the output.
pub struct UnifiCollector {
    cache: SharedCache<UnifiData>,
    scrape: Mutex<()>,
    temperature: Instrument,
    cpu: Instrument,
    mem: Instrument,
    switch: Traffic,
    switch_bytes: Instrument,
    port: Traffic,
    port_speed: Instrument,
    sfp_temperature: Instrument,
    site_clients: Instrument,
}

impl UnifiCollector {
    pub fn new(cache: SharedCache<UnifiData>) -> prometheus::Result<Self> {
        Ok(Self {
            cache,
            scrape: Mutex::new(()),
            temperature: Instrument::gauge(
                "unifi_device_temperature_celsius",
                "Device temperature in degrees Celsius, 0 when not reported",
                DEVICE_LABELS,
            )?,
            cpu: Instrument::gauge("unifi_device_cpu_pct", "Device CPU usage in percent", DEVICE_LABELS)?,
            mem: Instrument::gauge(
                "unifi_device_mem_pct",
                "Device memory usage in percent",
                DEVICE_LABELS,
            )?,
            switch: Traffic::new("unifi_switch", "switch", DEVICE_LABELS)?,
            switch_bytes: Instrument::counter(
                "unifi_switch_bytes_total",
                "Bytes moved by the switch",
                DEVICE_LABELS,
            )?,
            port: Traffic::new("unifi_port", "port", PORT_LABELS)?,
            port_speed: Instrument::gauge(
                "unifi_port_speed_bps",
                "Negotiated port speed in bits per second",
                PORT_LABELS,
            )?,
            sfp_temperature: Instrument::gauge(
                "unifi_port_sfp_temperature_celsius",
                "SFP module temperature in degrees Celsius",
                PORT_LABELS,
            )?,
            site_clients: Instrument::gauge(
                "unifi_site_clients",
                "Clients connected per site",
                &["site"],
            )?,
        })
    }

    fn instruments(&self) -> Vec<&Instrument> {
        let mut all = vec![&self.temperature, &self.cpu, &self.mem, &self.switch_bytes];
        all.extend(self.switch.instruments());
        all.extend(self.port.instruments());
        all.extend([&self.port_speed, &self.sfp_temperature, &self.site_clients]);
        all
    }

    fn observe_device(&self, device: &dyn UnifiDevice) {
        let labels = [device.model(), device.site(), device.address(), device.name()];
        self.temperature.observe(&labels, device.temperature());
        self.cpu.observe(&labels, device.cpu_usage());
        self.mem.observe(&labels, device.mem_usage());

        let kind_labels = [device.kind(), device.site(), device.address(), device.name()];
        if let Some(sw) = device.switch_stats() {
            self.switch.observe_switch(&kind_labels, sw);
            self.switch_bytes.observe(&kind_labels, sw.bytes.val());
        }

        for port in device.ports() {
            let number = port.port_idx.to_string();
            let labels = [
                kind_labels[0],
                kind_labels[1],
                kind_labels[2],
                kind_labels[3],
                port.name.as_str(),
                number.as_str(),
                bool_label(port.up.val()),
                bool_label(port.is_uplink.val()),
            ];
            self.port.observe_port(&labels, port);
            self.port_speed.observe(&labels, port.speed_bps());
            if let Some(temp) = port.sfp_temperature() {
                self.sfp_temperature.observe(&labels, temp);
            }
        }
    }
}

impl Collector for UnifiCollector {
    fn desc(&self) -> Vec<&Desc> {
        describe_all(&self.instruments())
    }

    fn collect(&self) -> Vec<MetricFamily> {
        let instruments = self.instruments();
        let _scrape = self.scrape.lock();
        let snapshot = self.cache.read();
        reset_all(&instruments);

        for device in snapshot.data.devices.all() {
            self.observe_device(device);
        }
        if let Some(per_site) = snapshot.data.clients_per_site() {
            for (site, count) in per_site {
                self.site_clients.observe(&[site.as_str()], count as f64);
            }
        }

        collect_all(&instruments)
    }
}
