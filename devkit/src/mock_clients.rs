/*!
Mock fetch clients for running sources without a BMC or a controller.

Both mocks are cheap to clone and share their script, so a test keeps one
handle to steer the mock while the refresh loop owns another.
*/

use async_trait::async_trait;
use homelab_exporter::thermal::{ThermalClient, ThermalData};
use homelab_exporter::unifi::{decode_device, group, Client, ControllerClient, RawDevices, Site};
use homelab_exporter::FetchError;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Failure modes a mock can be told to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Upstream answered with a server error.
    Unavailable,
    Auth,
    Malformed,
}

impl Fault {
    fn to_error(self, what: &str) -> FetchError {
        match self {
            Fault::Unavailable => FetchError::Status { status: 503, url: format!("mock://{what}") },
            Fault::Auth => FetchError::Auth(format!("{what}: api.err.LoginRequired")),
            Fault::Malformed => FetchError::Malformed(format!("{what}: unexpected payload")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Call {
    Login,
    Sites,
    Clients,
    Devices,
}

#[derive(Default)]
struct ControllerScript {
    sites: Vec<Option<Site>>,
    clients: Vec<Option<Client>>,
    devices: RawDevices,
    session: bool,
    faults: HashMap<Call, Fault>,
    calls: Vec<Call>,
}

/// Scripted UniFi controller.
#[derive(Clone)]
pub struct MockControllerClient {
    script: Arc<Mutex<ControllerScript>>,
}

impl Default for MockControllerClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockControllerClient {
    /// A controller with a live session.
    pub fn new() -> Self {
        let script = ControllerScript { session: true, ..Default::default() };
        Self { script: Arc::new(Mutex::new(script)) }
    }

    /// A controller whose session has expired: `sites` fails until `login`.
    pub fn expired() -> Self {
        let mock = Self::new();
        mock.script.lock().session = false;
        mock
    }

    pub fn with_sites(self, sites: Vec<Site>) -> Self {
        self.script.lock().sites = sites.into_iter().map(Some).collect();
        self
    }

    pub fn set_site_entries(&self, sites: Vec<Option<Site>>) {
        self.script.lock().sites = sites;
    }

    pub fn set_clients(&self, clients: Vec<Option<Client>>) {
        self.script.lock().clients = clients;
    }

    /// Replace the device listing with controller-shaped JSON records.
    pub fn set_device_records(&self, records: Vec<Value>) {
        self.script.lock().devices = group(records.into_iter().filter_map(decode_device));
    }

    pub fn set_raw_devices(&self, devices: RawDevices) {
        self.script.lock().devices = devices;
    }

    /// Make every subsequent `call` fail with `fault`.
    pub fn fail(&self, call: Call, fault: Fault) {
        self.script.lock().faults.insert(call, fault);
    }

    pub fn recover(&self, call: Call) {
        self.script.lock().faults.remove(&call);
    }

    pub fn expire_session(&self) {
        self.script.lock().session = false;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.script.lock().calls.clone()
    }

    pub fn count(&self, call: Call) -> usize {
        self.script.lock().calls.iter().filter(|c| **c == call).count()
    }

    fn enter(&self, call: Call) -> Result<(), FetchError> {
        let mut script = self.script.lock();
        script.calls.push(call);
        if let Some(fault) = script.faults.get(&call) {
            return Err(fault.to_error(&format!("{call:?}")));
        }
        if call != Call::Login && !script.session {
            return Err(Fault::Auth.to_error(&format!("{call:?}")));
        }
        Ok(())
    }
}

#[async_trait]
impl ControllerClient for MockControllerClient {
    async fn login(&self) -> Result<(), FetchError> {
        self.enter(Call::Login)?;
        self.script.lock().session = true;
        Ok(())
    }

    async fn sites(&self) -> Result<Vec<Option<Site>>, FetchError> {
        self.enter(Call::Sites)?;
        Ok(self.script.lock().sites.clone())
    }

    async fn clients(&self, _sites: &[Site]) -> Result<Vec<Option<Client>>, FetchError> {
        self.enter(Call::Clients)?;
        Ok(self.script.lock().clients.clone())
    }

    async fn devices(&self, _sites: &[Site]) -> Result<RawDevices, FetchError> {
        self.enter(Call::Devices)?;
        Ok(self.script.lock().devices.clone())
    }
}

#[derive(Default)]
struct ThermalScript {
    data: ThermalData,
    fault: Option<Fault>,
    calls: usize,
}

/// Scripted Redfish endpoint.
#[derive(Clone, Default)]
pub struct MockThermalClient {
    script: Arc<Mutex<ThermalScript>>,
}

impl MockThermalClient {
    pub fn new(data: ThermalData) -> Self {
        let mock = Self::default();
        mock.set_data(data);
        mock
    }

    pub fn set_data(&self, data: ThermalData) {
        self.script.lock().data = data;
    }

    pub fn fail(&self, fault: Fault) {
        self.script.lock().fault = Some(fault);
    }

    pub fn recover(&self) {
        self.script.lock().fault = None;
    }

    pub fn calls(&self) -> usize {
        self.script.lock().calls
    }
}

#[async_trait]
impl ThermalClient for MockThermalClient {
    async fn thermal(&self) -> Result<ThermalData, FetchError> {
        let mut script = self.script.lock();
        script.calls += 1;
        match script.fault {
            Some(fault) => Err(fault.to_error("thermal")),
            None => Ok(script.data.clone()),
        }
    }
}
