/*!
# Homelab Exporter DevKit

Test support for the exporter:
- mock Redfish and UniFi fetch clients with fault injection
- builders for controller device records and thermal documents
- a scrape harness that renders a registry and parses the exposition text
*/

pub mod fixtures;
pub mod mock_clients;
pub mod test_utils;

pub use fixtures::{DeviceRecord, PortRecord};
pub use mock_clients::{Call, Fault, MockControllerClient, MockThermalClient};
pub use test_utils::{Sample, Scrape, ScrapeHarness};
