//! UniFi Network source: sites, devices and clients from the controller,
//! normalized through the device adapter layer.

mod collector;
mod controller;
mod devices;
mod flex;
mod models;

pub use collector::UnifiCollector;
pub use controller::{ControllerClient, ControllerHttpClient};
pub use devices::{decode_device, group, Device, Devices, UnifiDevice};
pub use flex::{FlexBool, FlexNum};
pub use models::{
    Client, DeviceStat, Port, RawDevices, Site, SwitchStats, SystemStats, TemperatureSensor, Uap,
    Udm, Usg, Usw,
};

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::FetchError;
use crate::refresh::Source;

/// One successful UniFi refresh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnifiData {
    pub sites: Vec<Site>,
    pub devices: Devices,
    /// `None` when the client listing failed this cycle.
    pub clients: Option<Vec<Client>>,
}

impl UnifiData {
    /// Client count per site label, in site order.
    pub fn clients_per_site(&self) -> Option<Vec<(String, usize)>> {
        let clients = self.clients.as_ref()?;
        Some(
            self.sites
                .iter()
                .map(|site| {
                    let label = site.label();
                    let count = clients.iter().filter(|c| c.site_name == label).count();
                    (label, count)
                })
                .collect(),
        )
    }
}

pub struct UnifiSource {
    client: Arc<dyn ControllerClient>,
}

impl UnifiSource {
    pub fn new(client: Arc<dyn ControllerClient>) -> Self {
        Self { client }
    }

    /// Listing sites doubles as the session probe.
    async fn sites(&self) -> Result<Vec<Site>, FetchError> {
        let sites = match self.client.sites().await {
            Ok(sites) => sites,
            Err(e) => {
                debug!("site probe failed ({e}), logging in");
                self.client.login().await?;
                self.client.sites().await?
            }
        };
        Ok(sites.into_iter().flatten().collect())
    }
}

#[async_trait]
impl Source for UnifiSource {
    type Data = UnifiData;

    fn name(&self) -> &'static str {
        "unifi"
    }

    async fn fetch(&self) -> Result<UnifiData, FetchError> {
        let sites = self.sites().await?;
        let devices = Devices::from_raw(self.client.devices(&sites).await?);

        let clients = match self.client.clients(&sites).await {
            Ok(clients) => Some(clients.into_iter().flatten().collect::<Vec<_>>()),
            Err(e) => {
                warn!("client listing failed, publishing devices only: {e}");
                None
            }
        };

        info!(
            sites = sites.len(),
            devices = devices.len(),
            clients = clients.as_ref().map(Vec::len),
            "UniFi refresh complete"
        );
        Ok(UnifiData { sites, devices, clients })
    }
}
