//! Device session collaborator.
//!
//! The crawl never talks to a device directly. It asks a [`SessionConnector`]
//! to log in and then reads semi-structured records from the returned
//! [`DeviceSession`]. Two connectors ship with the crate:
//!
//! - [`snapshot::SnapshotConnector`] reads one YAML file per device from a
//!   directory, used by the `fabricmap` binary
//! - [`memory::MemoryConnector`] serves devices from memory and records every
//!   connection attempt, used by tests

pub mod memory;
pub mod snapshot;

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors reported by a session collaborator
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("Connection to {address} failed: {reason}")]
    Connection { address: String, reason: String },

    #[error("Authentication as '{username}' on {address} rejected")]
    Authentication { address: String, username: String },

    #[error("Session to {address} timed out after {timeout:?}")]
    Timeout { address: String, timeout: Duration },

    #[error("Could not extract {probe} data: {reason}")]
    Extraction { probe: String, reason: String },
}

impl SessionError {
    /// True for errors that mean "try the next credential or transport"
    pub fn is_login_failure(&self) -> bool {
        !matches!(self, Self::Extraction { .. })
    }
}

/// Login credential, tried in priority order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub username: String,
    pub password: String,
}

impl Credential {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

/// Management protocol used to reach a device
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Ssh,
    Telnet,
}

/// One way of reaching a device, tried in priority order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransportOptions {
    #[serde(default)]
    pub protocol: Protocol,
    #[serde(default)]
    pub port: Option<u16>,
    /// Per-connection socket timeout applied by the collaborator
    #[serde(skip)]
    pub timeout: Option<Duration>,
    /// Free-form options passed through to the collaborator
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

/// Facts retrieved right after login
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Facts {
    pub hostname: String,
    pub fqdn: String,
    pub vendor: String,
    pub model: String,
    pub serial_number: String,
    pub os_version: String,
}

/// Row of the MAC address table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacRow {
    pub mac: String,
    #[serde(default)]
    pub interface: String,
    #[serde(default = "default_vlan")]
    pub vlan: u16,
}

fn default_vlan() -> u16 {
    1
}

/// Row of `show interface`. Timers are relative ("00:00:01", "3d05h", "never").
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterfaceStatusRow {
    pub name: String,
    /// Admin/link line, e.g. "administratively down"
    pub link_status: String,
    pub protocol_status: String,
    pub hardware_type: Option<String>,
    pub mtu: Option<u32>,
    pub speed: Option<String>,
    pub duplex: Option<String>,
    pub last_input: String,
    pub last_output: String,
    pub last_clearing: String,
}

/// Row of a CDP or LLDP neighbor table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NeighborRow {
    pub local_interface: String,
    pub hostname: String,
    pub ip: String,
    pub platform: String,
    pub remote_interface: String,
}

/// Entry of the VLAN database
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VlanInfo {
    pub name: String,
}

/// Layer-3 addressing of one interface as reported by the device
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterfaceIp {
    pub interface: String,
    pub addresses: Vec<String>,
}

/// Row of the ARP table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArpRow {
    pub interface: String,
    pub mac: String,
    pub ip: String,
    pub age: Option<f64>,
}

/// Local user account
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalAccount {
    pub level: u8,
    pub password: String,
    pub sshkeys: Vec<String>,
}

/// Item of `show inventory`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InventoryItem {
    pub descr: String,
    pub pid: String,
    pub vid: String,
    pub sn: String,
}

/// Opens sessions. Shared by all crawl workers, so it must be `Sync`.
pub trait SessionConnector: Sync {
    type Session: DeviceSession;

    fn connect(
        &self,
        address: &str,
        credential: &Credential,
        transport: &TransportOptions,
    ) -> Result<Self::Session, SessionError>;
}

/// A logged-in session to one device
pub trait DeviceSession {
    fn facts(&mut self) -> Result<Facts, SessionError>;
    fn running_config(&mut self) -> Result<String, SessionError>;
    fn mac_address_table(&mut self) -> Result<Vec<MacRow>, SessionError>;
    fn interface_status(&mut self) -> Result<Vec<InterfaceStatusRow>, SessionError>;
    fn cdp_neighbors(&mut self) -> Result<Vec<NeighborRow>, SessionError>;
    fn lldp_neighbors(&mut self) -> Result<Vec<NeighborRow>, SessionError>;
    fn vtp_status(&mut self) -> Result<String, SessionError>;
    fn vlans(&mut self) -> Result<BTreeMap<u16, VlanInfo>, SessionError>;
    fn interfaces_ip(&mut self) -> Result<Vec<InterfaceIp>, SessionError>;
    fn arp_table(&mut self) -> Result<Vec<ArpRow>, SessionError>;
    fn local_accounts(&mut self) -> Result<HashMap<String, LocalAccount>, SessionError>;
    fn inventory(&mut self) -> Result<BTreeMap<String, InventoryItem>, SessionError>;
    fn close(&mut self);
}

/// Everything a device can report, as stored in a snapshot or served from
/// memory. Probes left empty return empty data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceRecord {
    /// Required username, `None` accepts any credential
    pub username: Option<String>,
    pub password: Option<String>,
    /// Protocols the device answers on, `None` accepts any
    pub protocols: Option<Vec<Protocol>>,
    /// Probes whose output cannot be extracted on this device
    pub broken_probes: Vec<String>,
    pub facts: Facts,
    pub running_config: String,
    pub mac_address_table: Vec<MacRow>,
    pub interface_status: Vec<InterfaceStatusRow>,
    pub cdp_neighbors: Vec<NeighborRow>,
    pub lldp_neighbors: Vec<NeighborRow>,
    pub vtp_status: String,
    pub vlans: BTreeMap<u16, VlanInfo>,
    pub interfaces_ip: Vec<InterfaceIp>,
    pub arp_table: Vec<ArpRow>,
    pub local_accounts: HashMap<String, LocalAccount>,
    pub inventory: BTreeMap<String, InventoryItem>,
}

impl DeviceRecord {
    /// Check a login attempt against the restrictions of the record
    pub fn admit(
        &self,
        address: &str,
        credential: &Credential,
        transport: &TransportOptions,
    ) -> Result<(), SessionError> {
        if let Some(protocols) = &self.protocols {
            if !protocols.contains(&transport.protocol) {
                return Err(SessionError::Connection {
                    address: address.to_string(),
                    reason: format!("{:?} not reachable", transport.protocol),
                });
            }
        }

        let user_ok = self.username.as_ref().map_or(true, |u| *u == credential.username);
        let pass_ok = self.password.as_ref().map_or(true, |p| *p == credential.password);
        if user_ok && pass_ok {
            Ok(())
        } else {
            Err(SessionError::Authentication {
                address: address.to_string(),
                username: credential.username.clone(),
            })
        }
    }
}

/// Session serving a [`DeviceRecord`]
#[derive(Debug, Clone)]
pub struct RecordSession {
    record: DeviceRecord,
}

impl RecordSession {
    pub fn new(record: DeviceRecord) -> Self {
        Self { record }
    }
}

impl RecordSession {
    fn probe<T: Clone>(&self, name: &str, value: &T) -> Result<T, SessionError> {
        if self.record.broken_probes.iter().any(|p| p == name) {
            return Err(SessionError::Extraction {
                probe: name.to_string(),
                reason: "unexpected command output".to_string(),
            });
        }
        Ok(value.clone())
    }
}

impl DeviceSession for RecordSession {
    fn facts(&mut self) -> Result<Facts, SessionError> {
        Ok(self.record.facts.clone())
    }

    fn running_config(&mut self) -> Result<String, SessionError> {
        Ok(self.record.running_config.clone())
    }

    fn mac_address_table(&mut self) -> Result<Vec<MacRow>, SessionError> {
        self.probe("mac_address", &self.record.mac_address_table)
    }

    fn interface_status(&mut self) -> Result<Vec<InterfaceStatusRow>, SessionError> {
        self.probe("interface_status", &self.record.interface_status)
    }

    fn cdp_neighbors(&mut self) -> Result<Vec<NeighborRow>, SessionError> {
        self.probe("cdp_neighbors", &self.record.cdp_neighbors)
    }

    fn lldp_neighbors(&mut self) -> Result<Vec<NeighborRow>, SessionError> {
        self.probe("lldp_neighbors", &self.record.lldp_neighbors)
    }

    fn vtp_status(&mut self) -> Result<String, SessionError> {
        self.probe("vtp", &self.record.vtp_status)
    }

    fn vlans(&mut self) -> Result<BTreeMap<u16, VlanInfo>, SessionError> {
        self.probe("vlans", &self.record.vlans)
    }

    fn interfaces_ip(&mut self) -> Result<Vec<InterfaceIp>, SessionError> {
        self.probe("l3_int", &self.record.interfaces_ip)
    }

    fn arp_table(&mut self) -> Result<Vec<ArpRow>, SessionError> {
        self.probe("l3_int", &self.record.arp_table)
    }

    fn local_accounts(&mut self) -> Result<HashMap<String, LocalAccount>, SessionError> {
        self.probe("local_admins", &self.record.local_accounts)
    }

    fn inventory(&mut self) -> Result<BTreeMap<String, InventoryItem>, SessionError> {
        self.probe("inventory", &self.record.inventory)
    }

    fn close(&mut self) {}
}
