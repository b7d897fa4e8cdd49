use homelab_devkit::fixtures::{self, DeviceRecord, PortRecord};
use homelab_devkit::{Call, Fault, MockControllerClient, MockThermalClient, ScrapeHarness};
use homelab_exporter::health::{HealthCollector, HealthTracker};
use homelab_exporter::refresh::RefreshLoop;
use homelab_exporter::state::new_cache;
use homelab_exporter::thermal::{ThermalCollector, ThermalSource};
use homelab_exporter::unifi::{RawDevices, UnifiCollector, UnifiSource, Uap};
use std::sync::Arc;

fn unifi(mock: &MockControllerClient) -> (RefreshLoop<UnifiSource>, ScrapeHarness) {
    let cache = new_cache();
    let tracker = HealthTracker::new();
    let harness = ScrapeHarness::new();
    harness.register(UnifiCollector::new(cache.clone()).unwrap()).unwrap();
    harness.register(HealthCollector::new(tracker.clone()).unwrap()).unwrap();
    let source = UnifiSource::new(Arc::new(mock.clone()));
    (RefreshLoop::new(source, cache, tracker.register("unifi")), harness)
}

fn thermal(mock: &MockThermalClient) -> (RefreshLoop<ThermalSource>, ScrapeHarness) {
    let cache = new_cache();
    let tracker = HealthTracker::new();
    let harness = ScrapeHarness::new();
    harness.register(ThermalCollector::new(cache.clone(), "bmc.lan").unwrap()).unwrap();
    harness.register(HealthCollector::new(tracker.clone()).unwrap()).unwrap();
    let source = ThermalSource::new(Arc::new(mock.clone()));
    (RefreshLoop::new(source, cache, tracker.register("thermal")), harness)
}

fn home() -> MockControllerClient {
    MockControllerClient::new().with_sites(vec![fixtures::site("default", "")])
}

const AP1: [(&str, &str); 4] =
    [("type", "U7PG2"), ("site", "default"), ("source", "10.0.0.5"), ("name", "AP1")];

fn ap1() -> DeviceRecord {
    DeviceRecord::uap("AP1").ip("10.0.0.5").site("default").usage(10.0, 20.0)
}

#[tokio::test]
async fn access_point_reports_usage_and_zero_temperature() {
    let mock = home();
    mock.set_device_records(vec![ap1().build()]);
    let (refresh, harness) = unifi(&mock);

    refresh.refresh_once().await.unwrap();
    let scrape = harness.scrape().unwrap();

    assert_eq!(scrape.value("unifi_device_temperature_celsius", &AP1), Some(0.0));
    assert_eq!(scrape.value("unifi_device_cpu_pct", &AP1), Some(10.0));
    assert_eq!(scrape.value("unifi_device_mem_pct", &AP1), Some(20.0));
    assert!(scrape.series("unifi_switch_rx_bytes_total").is_empty());
}

#[tokio::test]
async fn upstream_failure_keeps_previous_values() {
    let mock = home();
    mock.set_device_records(vec![ap1().build()]);
    let (refresh, harness) = unifi(&mock);
    refresh.refresh_once().await.unwrap();

    mock.set_device_records(vec![ap1().usage(99.0, 99.0).build()]);
    mock.fail(Call::Devices, Fault::Unavailable);
    assert!(refresh.refresh_once().await.is_err());

    let scrape = harness.scrape().unwrap();
    assert_eq!(scrape.value("unifi_device_cpu_pct", &AP1), Some(10.0));
    assert_eq!(scrape.value("homelab_exporter_source_up", &[("source", "unifi")]), Some(0.0));
    assert_eq!(
        scrape.value("homelab_exporter_source_refresh_failures_total", &[("source", "unifi")]),
        Some(1.0)
    );
    assert!(scrape.has("homelab_exporter_source_last_success_timestamp_seconds", &[("source", "unifi")]));

    mock.recover(Call::Devices);
    refresh.refresh_once().await.unwrap();
    assert_eq!(harness.scrape().unwrap().value("unifi_device_cpu_pct", &AP1), Some(99.0));
}

#[tokio::test]
async fn sfp_temperature_only_when_module_present() {
    let mock = home();
    mock.set_device_records(vec![DeviceRecord::usw("SW1")
        .ip("10.0.0.2")
        .site("default")
        .general_temperature(48.0)
        .switch_stats(&[("rx_bytes", 5000), ("bytes", 9000)])
        .port(PortRecord::new(1, "Port 1").speed(1000).counter("rx_bytes", 1234))
        .port(PortRecord::new(9, "SFP+ 1").uplink().speed(10000).sfp(41.5))
        .build()]);
    let (refresh, harness) = unifi(&mock);
    refresh.refresh_once().await.unwrap();
    let scrape = harness.scrape().unwrap();

    let sfp = scrape.series("unifi_port_sfp_temperature_celsius");
    assert_eq!(sfp.len(), 1);
    assert_eq!(sfp[0].label("port"), Some("SFP+ 1"));
    assert_eq!(sfp[0].label("port_number"), Some("9"));
    assert_eq!(sfp[0].label("uplink"), Some("true"));
    assert_eq!(sfp[0].value, 41.5);

    let port1 = [("name", "SW1"), ("port", "Port 1"), ("type", "USW"), ("up", "true")];
    assert_eq!(scrape.value("unifi_port_rx_bytes_total", &port1), Some(1234.0));
    assert_eq!(scrape.value("unifi_port_speed_bps", &port1), Some(1e9));
    assert_eq!(scrape.metric_type("unifi_port_rx_bytes_total"), Some("counter"));

    let switch = [("name", "SW1"), ("type", "USW")];
    assert_eq!(scrape.value("unifi_switch_rx_bytes_total", &switch), Some(5000.0));
    assert_eq!(scrape.value("unifi_switch_bytes_total", &switch), Some(9000.0));
    assert_eq!(
        scrape.value("unifi_device_temperature_celsius", &[("name", "SW1"), ("type", "US8P60")]),
        Some(48.0)
    );
}

#[tokio::test]
async fn absent_entries_are_skipped() {
    let mock = MockControllerClient::new();
    mock.set_site_entries(vec![None, Some(fixtures::site("default", "Home"))]);
    mock.set_raw_devices(RawDevices {
        uaps: vec![None, Some(Uap { name: "AP2".into(), ..Default::default() }), None],
        ..Default::default()
    });
    mock.set_clients(vec![None, Some(fixtures::client("Home (default)", "laptop"))]);
    let (refresh, harness) = unifi(&mock);

    refresh.refresh_once().await.unwrap();
    let scrape = harness.scrape().unwrap();

    assert_eq!(scrape.series("unifi_device_cpu_pct").len(), 1);
    assert_eq!(scrape.value("unifi_site_clients", &[("site", "Home (default)")]), Some(1.0));
}

#[tokio::test]
async fn vanished_device_is_no_longer_reported() {
    let mock = home();
    mock.set_device_records(vec![
        ap1().build(),
        DeviceRecord::uap("AP2").ip("10.0.0.6").site("default").build(),
    ]);
    let (refresh, harness) = unifi(&mock);
    refresh.refresh_once().await.unwrap();
    assert_eq!(harness.scrape().unwrap().series("unifi_device_cpu_pct").len(), 2);

    mock.set_device_records(vec![ap1().build()]);
    refresh.refresh_once().await.unwrap();
    let scrape = harness.scrape().unwrap();
    assert_eq!(scrape.series("unifi_device_cpu_pct").len(), 1);
    assert!(!scrape.has("unifi_device_cpu_pct", &[("name", "AP2")]));
}

#[tokio::test]
async fn expired_session_logs_in_and_retries() {
    let mock = MockControllerClient::expired().with_sites(vec![fixtures::site("default", "")]);
    mock.set_device_records(vec![ap1().build()]);
    let (refresh, harness) = unifi(&mock);

    refresh.refresh_once().await.unwrap();

    assert_eq!(mock.calls(), [Call::Sites, Call::Login, Call::Sites, Call::Devices, Call::Clients]);
    assert!(harness.scrape().unwrap().has("unifi_device_cpu_pct", &AP1));
}

#[tokio::test]
async fn login_failure_aborts_the_cycle() {
    let mock = MockControllerClient::expired().with_sites(vec![fixtures::site("default", "")]);
    mock.fail(Call::Login, Fault::Auth);
    let (refresh, harness) = unifi(&mock);

    let err = refresh.refresh_once().await.unwrap_err();
    assert_eq!(err.kind(), "auth");
    assert_eq!(mock.count(Call::Devices), 0);
    assert_eq!(mock.count(Call::Login), 1);
    assert!(harness.scrape().unwrap().series("unifi_device_cpu_pct").is_empty());
}

#[tokio::test]
async fn client_listing_failure_still_publishes_devices() {
    let mock = home();
    mock.set_device_records(vec![ap1().build()]);
    mock.fail(Call::Clients, Fault::Malformed);
    let (refresh, harness) = unifi(&mock);

    refresh.refresh_once().await.unwrap();
    let scrape = harness.scrape().unwrap();
    assert!(scrape.has("unifi_device_cpu_pct", &AP1));
    assert!(scrape.series("unifi_site_clients").is_empty());
}

#[tokio::test]
async fn thermal_reports_null_readings_as_zero_and_survives_outages() {
    let mock = MockThermalClient::new(fixtures::thermal(
        &[("CPU1 Temp", Some(47.0)), ("DIMM A1", None)],
        &[("FAN1", Some(4200.0))],
    ));
    let (refresh, harness) = thermal(&mock);
    refresh.refresh_once().await.unwrap();

    mock.fail(Fault::Unavailable);
    assert!(refresh.refresh_once().await.is_err());

    let scrape = harness.scrape().unwrap();
    assert_eq!(scrape.series("redfish_temperature_celsius").len(), 2);
    assert_eq!(scrape.value("redfish_temperature_celsius", &[("sensor", "DIMM A1")]), Some(0.0));
    assert_eq!(
        scrape.value("redfish_temperature_celsius", &[("sensor", "CPU1 Temp"), ("target", "bmc.lan")]),
        Some(47.0)
    );
    assert_eq!(scrape.value("redfish_fan_speed_rpm", &[("fan", "FAN1"), ("health", "OK")]), Some(4200.0));
    assert_eq!(scrape.value("homelab_exporter_source_up", &[("source", "thermal")]), Some(0.0));
    assert_eq!(mock.calls(), 2);
}

#[tokio::test]
async fn all_in_one_and_gateway_follow_their_family_rules() {
    let mock = home();
    mock.set_device_records(vec![
        DeviceRecord::udm("Dream")
            .ip("10.0.0.1")
            .site("default")
            .usage(25.0, 60.0)
            .sensors(&[("CPU", 62.0), ("Local", 45.0)])
            .port(PortRecord::new(9, "WAN").uplink().speed(1000).counter("tx_bytes", 777))
            .port(PortRecord::new(2, "Port 2").up(false))
            .build(),
        DeviceRecord::usg("Gateway").ip("10.0.0.254").site("default").usage(5.0, 30.0).build(),
    ]);
    let (refresh, harness) = unifi(&mock);
    refresh.refresh_once().await.unwrap();
    let scrape = harness.scrape().unwrap();

    let udm = [("type", "UDMPRO"), ("site", "default"), ("source", "10.0.0.1"), ("name", "Dream")];
    assert_eq!(scrape.value("unifi_device_temperature_celsius", &udm), Some(62.0));
    assert_eq!(scrape.value("unifi_device_cpu_pct", &udm), Some(25.0));

    let wan = [("type", "UDM"), ("name", "Dream"), ("port", "WAN"), ("port_number", "9"), ("uplink", "true")];
    assert_eq!(scrape.value("unifi_port_tx_bytes_total", &wan), Some(777.0));
    assert_eq!(scrape.value("unifi_port_speed_bps", &wan), Some(1e9));
    assert!(scrape.has("unifi_port_speed_bps", &[("port", "Port 2"), ("up", "false"), ("type", "UDM")]));
    assert!(scrape.series("unifi_port_sfp_temperature_celsius").is_empty());
    assert!(scrape.series("unifi_switch_rx_bytes_total").is_empty());
    assert!(scrape.series("unifi_switch_bytes_total").is_empty());

    let usg = [("type", "UGW3"), ("source", "10.0.0.254"), ("name", "Gateway")];
    assert_eq!(scrape.value("unifi_device_temperature_celsius", &usg), Some(0.0));
    assert_eq!(scrape.value("unifi_device_mem_pct", &usg), Some(30.0));
    assert!(!scrape.has("unifi_port_speed_bps", &[("name", "Gateway")]));
    assert_eq!(scrape.series("unifi_device_cpu_pct").len(), 2);
}
