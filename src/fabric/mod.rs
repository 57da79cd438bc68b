//! The discovered fabric.
//!
//! [`Fabric`] owns every [`Device`] in an arena indexed by [`DeviceId`].
//! Interfaces refer to each other through [`InterfaceRef`]s into that arena,
//! so the controller can rewire links without shared mutable references.
//!
//! - [`collect`]: logs into one device and harvests it (runs on workers)
//! - [`discovery`]: the crawl controller
//! - [`links`]: turns neighbor descriptors into interface references
//! - [`macs`]: fabric-wide MAC attachment table
//! - [`paths`]: path search over resolved links

pub mod collect;
pub mod discovery;
pub mod links;
pub mod macs;
pub mod paths;

use std::collections::{BTreeSet, HashMap};

use log::debug;
use mac_address::MacAddress;
use thiserror::Error;

use crate::device::{Device, DeviceId, DiscoveryStatus, InterfaceRef};
use crate::interface::{Interface, InterfaceError, Neighbor, NeighborDescriptor};
use crate::session::SessionError;

pub use collect::{DiscoveryOptions, Probe, ScanProfile};

/// CDP truncates advertised device ids to this many characters
pub const CDP_HOSTNAME_LIMIT: usize = 40;

/// Errors affecting one host's branch of the crawl, or the crawl setup
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("Could not log in to {address} with any of {attempts} credential/transport combinations: {last}")]
    LoginFailed {
        address: String,
        attempts: usize,
        last: String,
    },

    #[error("Session to {address} failed")]
    Session {
        address: String,
        #[source]
        source: SessionError,
    },

    #[error("Invalid interface data from {address}")]
    Interface {
        address: String,
        #[source]
        source: InterfaceError,
    },

    #[error("Could not build worker pool: {0}")]
    Pool(String),

    #[error("Worker crawling {address} panicked")]
    WorkerPanicked { address: String },

    #[error("Unknown host: {0}")]
    UnknownHost(String),
}

/// Where a MAC address most likely attaches to the fabric
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FabricMacEntry {
    pub interface: InterfaceRef,
    pub vlan: u16,
}

/// Truncate a hostname the way CDP does
pub fn truncate_hostname(hostname: &str) -> &str {
    hostname
        .char_indices()
        .nth(CDP_HOSTNAME_LIMIT)
        .map_or(hostname, |(end, _)| &hostname[..end])
}

/// All devices of a network and the links between them
#[derive(Debug, Default)]
pub struct Fabric {
    devices: Vec<Device>,
    /// Hostname to slot
    index: HashMap<String, DeviceId>,
    /// Address or name used to reach a device, to slot
    targets: HashMap<String, DeviceId>,
    /// Crawl status per target
    discovery_status: HashMap<String, DiscoveryStatus>,
    mac_table: HashMap<MacAddress, FabricMacEntry>,
    /// Slots merged into another one during a crawl, removed by `compact`
    retired: BTreeSet<DeviceId>,
}

impl Fabric {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn devices(&self) -> impl Iterator<Item = (DeviceId, &Device)> {
        self.devices.iter().enumerate().map(|(i, d)| (DeviceId(i), d))
    }

    pub fn device(&self, id: DeviceId) -> Option<&Device> {
        self.devices.get(id.0)
    }

    pub fn device_mut(&mut self, id: DeviceId) -> Option<&mut Device> {
        self.devices.get_mut(id.0)
    }

    pub fn device_by_hostname(&self, hostname: &str) -> Option<&Device> {
        self.lookup(hostname).and_then(|id| self.device(id))
    }

    pub fn interface(&self, at: InterfaceRef) -> Option<&Interface> {
        self.device(at.device)?.interface_at(at.index)
    }

    /// `hostname interface` label for logs and reports
    pub fn describe(&self, at: InterfaceRef) -> String {
        match (self.device(at.device), self.interface(at)) {
            (Some(device), Some(interface)) => format!("{} {}", device.hostname, interface.name()),
            _ => format!("{}/{}", at.device, at.index),
        }
    }

    /// Crawl status per target address
    pub fn discovery_status(&self) -> &HashMap<String, DiscoveryStatus> {
        &self.discovery_status
    }

    pub fn status_of(&self, target: &str) -> DiscoveryStatus {
        self.discovery_status.get(target).copied().unwrap_or_default()
    }

    /// Fabric-wide MAC table, filled by [`Fabric::refresh_global_information`]
    pub fn mac_table(&self) -> &HashMap<MacAddress, FabricMacEntry> {
        &self.mac_table
    }

    /// Find a device by hostname: exact, then by the CDP-truncated form,
    /// then by the hostname a switch reports in its facts
    pub fn lookup(&self, hostname: &str) -> Option<DeviceId> {
        if let Some(&id) = self.index.get(hostname) {
            return Some(id);
        }

        let short = truncate_hostname(hostname);
        let live = || {
            self.devices
                .iter()
                .enumerate()
                .filter(|(i, _)| !self.retired.contains(&DeviceId(*i)))
        };

        live()
            .find(|(_, d)| truncate_hostname(&d.hostname) == short)
            .or_else(|| live().find(|(_, d)| d.facts_hostname() == Some(hostname)))
            .map(|(i, _)| DeviceId(i))
    }

    /// Add a device, replacing the contents of any device with the same
    /// hostname so there is at most one entity per hostname
    pub fn add_device(&mut self, device: Device) -> DeviceId {
        match self.index.get(&device.hostname).copied() {
            Some(id) => {
                self.unlink_device(id);
                self.targets.insert(device.target(), id);
                self.devices[id.0] = device;
                id
            }
            None => self.push_device(device),
        }
    }

    fn push_device(&mut self, device: Device) -> DeviceId {
        let id = DeviceId(self.devices.len());
        self.index.insert(device.hostname.clone(), id);
        self.targets.entry(device.target()).or_insert(id);
        self.devices.push(device);
        id
    }

    /// Re-run the fabric-wide passes over the current device set
    pub fn refresh_global_information(&mut self) {
        debug!("Refreshing fabric-wide information");
        self.recalculate_macs();
        self.resolve_links();
    }

    /// Turn every reference into `id` back into a neighbor descriptor, so
    /// the device contents can be replaced and resolved again later
    fn unlink_device(&mut self, id: DeviceId) {
        let Some(target) = self.devices.get(id.0) else {
            return;
        };
        let hostname = target.hostname.clone();
        let ip = target.mgmt_address;
        let names: Vec<String> = target.interfaces().iter().map(|i| i.name().to_string()).collect();

        for (d, device) in self.devices.iter_mut().enumerate() {
            if d == id.0 {
                continue;
            }
            for interface in device.interfaces_mut() {
                for neighbor in &mut interface.neighbors {
                    if let Neighbor::Resolved(peer) = neighbor {
                        if peer.device == id {
                            let remote_interface = names.get(peer.index).cloned().unwrap_or_default();
                            *neighbor = Neighbor::Unresolved(NeighborDescriptor {
                                hostname: hostname.clone(),
                                ip,
                                platform: String::new(),
                                remote_interface,
                            });
                        }
                    }
                }
            }
        }

        if let Some(device) = self.devices.get_mut(id.0) {
            for interface in device.interfaces_mut() {
                interface.neighbors.retain(|n| n.resolved().is_none());
            }
        }
        self.mac_table.retain(|_, entry| entry.interface.device != id);
    }

    /// Remove slots retired during a crawl and renumber the rest
    fn compact(&mut self) {
        if self.retired.is_empty() {
            return;
        }
        let retired = std::mem::take(&mut self.retired);
        for id in &retired {
            self.unlink_device(*id);
        }

        let mut remap: HashMap<DeviceId, DeviceId> = HashMap::new();
        let mut kept = Vec::with_capacity(self.devices.len() - retired.len());
        for (i, device) in std::mem::take(&mut self.devices).into_iter().enumerate() {
            if retired.contains(&DeviceId(i)) {
                debug!("Dropping merged slot {} ({})", i, device.hostname);
                continue;
            }
            remap.insert(DeviceId(i), DeviceId(kept.len()));
            kept.push(device);
        }
        self.devices = kept;

        self.index.retain(|_, id| remap.contains_key(id));
        for id in self.index.values_mut() {
            *id = remap[&*id];
        }
        self.targets.retain(|_, id| remap.contains_key(id));
        for id in self.targets.values_mut() {
            *id = remap[&*id];
        }

        for device in &mut self.devices {
            for interface in device.interfaces_mut() {
                for neighbor in &mut interface.neighbors {
                    if let Neighbor::Resolved(peer) = neighbor {
                        peer.device = remap[&peer.device];
                    }
                }
            }
        }
        self.mac_table.clear();
    }
}
