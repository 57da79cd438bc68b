//! Devices and switches.
//!
//! A [`Device`] is anything seen on the network: a seed we were asked to
//! crawl, or a neighbor advertised over CDP/LLDP. Once a session to it
//! succeeds it is promoted to a switch by attaching a [`SwitchData`]
//! payload; demotion detaches the payload again. The device keeps its
//! identity either way.

mod ingest;

pub use ingest::NeighborProtocol;

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;
use std::net::IpAddr;
use std::sync::LazyLock;

use chrono::{DateTime, Local};
use log::debug;
use mac_address::MacAddress;
use regex::Regex;
use serde::Serialize;

use crate::interface::naming::expand_interface_name;
use crate::interface::vlan::{full_range, is_unrestricted};
use crate::interface::{self, Interface, InterfaceError, ParseContext};
use crate::session::{ArpRow, Facts, InterfaceIp, InventoryItem, LocalAccount, VlanInfo};

/// Interface blocks of a running configuration worth modelling
static INTERFACE_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^interface ([Pp]ort-channel|\w*Ethernet|\w*GigE|Vlan|Loopback).")
        .expect("Invalid interface_header regex")
});

/// Slot of a device in the fabric arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct DeviceId(pub usize);

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Address of an interface in the fabric arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct InterfaceRef {
    pub device: DeviceId,
    pub index: usize,
}

impl InterfaceRef {
    pub fn new(device: DeviceId, index: usize) -> Self {
        Self { device, index }
    }
}

/// Where a device is in the crawl
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum DiscoveryStatus {
    #[default]
    NotStarted,
    Queued,
    Completed(DateTime<Local>),
    Failed,
    Skipped,
}

impl DiscoveryStatus {
    fn stage(&self) -> u8 {
        match self {
            Self::NotStarted => 0,
            Self::Queued => 1,
            Self::Completed(_) | Self::Failed | Self::Skipped => 2,
        }
    }

    /// Move to `next` if it is a later stage. Returns false, leaving the
    /// status unchanged, for a transition that would go backwards or sideways.
    pub fn advance(&mut self, next: DiscoveryStatus) -> bool {
        if next.stage() > self.stage() {
            *self = next;
            true
        } else {
            false
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.stage() == 2
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::NotStarted => "not started",
            Self::Queued => "queued",
            Self::Completed(_) => "completed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }
}

/// Entry of a switch's own MAC address table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MacEntry {
    /// Index into the owning device's interfaces
    pub interface: usize,
    pub vlan: u16,
}

/// State only a successfully queried device has
#[derive(Debug, Clone)]
pub struct SwitchData {
    pub facts: Facts,
    /// Raw running configuration
    pub config: String,
    /// Harvest time; relative interface timers are measured back from it
    pub init_time: DateTime<Local>,
    pub mac_table: HashMap<MacAddress, MacEntry>,
    pub vlans: Option<BTreeMap<u16, VlanInfo>>,
    /// VLAN ids configured on the device. Every legal id until the VLAN
    /// database has been read.
    pub vlans_set: BTreeSet<u16>,
    pub vtp: Option<String>,
    pub arp_table: Vec<ArpRow>,
    pub interfaces_ip: Vec<InterfaceIp>,
    pub local_accounts: Option<HashMap<String, LocalAccount>>,
    pub inventory: BTreeMap<String, InventoryItem>,
}

impl SwitchData {
    pub fn new(facts: Facts) -> Self {
        Self {
            facts,
            config: String::new(),
            init_time: Local::now(),
            mac_table: HashMap::new(),
            vlans: None,
            vlans_set: full_range(),
            vtp: None,
            arp_table: Vec::new(),
            interfaces_ip: Vec::new(),
            local_accounts: None,
            inventory: BTreeMap::new(),
        }
    }

    /// Record the VLAN database and the set of configured ids
    pub fn set_vlans(&mut self, vlans: BTreeMap<u16, VlanInfo>) {
        self.vlans_set = vlans.keys().copied().collect();
        self.vlans = Some(vlans);
    }
}

impl Default for SwitchData {
    fn default() -> Self {
        Self::new(Facts::default())
    }
}

/// A network device and its interfaces
#[derive(Debug, Clone)]
pub struct Device {
    /// Discovery key. Starts as the address and becomes the reported
    /// hostname once the device has been queried.
    pub hostname: String,
    pub mgmt_address: Option<IpAddr>,
    pub discovery_status: DiscoveryStatus,
    interfaces: Vec<Interface>,
    by_name: HashMap<String, usize>,
    switch: Option<SwitchData>,
}

impl Device {
    /// Create a device known only by the address used to reach it
    pub fn new(address: &str) -> Self {
        Self {
            hostname: address.to_string(),
            mgmt_address: address.parse().ok(),
            discovery_status: DiscoveryStatus::NotStarted,
            interfaces: Vec::new(),
            by_name: HashMap::new(),
            switch: None,
        }
    }

    /// Create a device with a known hostname and optional address
    pub fn with_hostname(hostname: impl Into<String>, mgmt_address: Option<IpAddr>) -> Self {
        Self {
            hostname: hostname.into(),
            mgmt_address,
            ..Self::new("")
        }
    }

    /// Address to connect to: the management IP if known, else the hostname
    pub fn target(&self) -> String {
        self.mgmt_address
            .map(|ip| ip.to_string())
            .unwrap_or_else(|| self.hostname.clone())
    }

    pub fn is_switch(&self) -> bool {
        self.switch.is_some()
    }

    pub fn switch(&self) -> Option<&SwitchData> {
        self.switch.as_ref()
    }

    pub fn switch_mut(&mut self) -> Option<&mut SwitchData> {
        self.switch.as_mut()
    }

    /// Hostname the device reports about itself, if it was queried
    pub fn facts_hostname(&self) -> Option<&str> {
        self.switch
            .as_ref()
            .map(|s| s.facts.hostname.as_str())
            .filter(|h| !h.is_empty())
    }

    /// Attach switch state. Replaces any previous payload.
    pub fn promote(&mut self, data: SwitchData) {
        debug!("Promoting {} to switch", self.hostname);
        self.switch = Some(data);
    }

    /// Detach switch state, turning the switch back into a plain device
    pub fn demote(&mut self) -> Option<SwitchData> {
        if self.switch.is_some() {
            debug!("Demoting {} to plain device", self.hostname);
        }
        self.switch.take()
    }

    pub fn interfaces(&self) -> &[Interface] {
        &self.interfaces
    }

    pub fn interfaces_mut(&mut self) -> &mut [Interface] {
        &mut self.interfaces
    }

    pub fn interface(&self, name: &str) -> Option<&Interface> {
        self.by_name.get(name).map(|&i| &self.interfaces[i])
    }

    pub fn interface_at(&self, index: usize) -> Option<&Interface> {
        self.interfaces.get(index)
    }

    pub fn interface_at_mut(&mut self, index: usize) -> Option<&mut Interface> {
        self.interfaces.get_mut(index)
    }

    /// Index of the interface with exactly this name
    pub fn interface_index(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    /// Find an interface by a name as another command or device spells it:
    /// exact, then with abbreviations expanded, then ignoring case
    pub fn find_interface(&self, name: &str) -> Option<usize> {
        if let Some(index) = self.interface_index(name) {
            return Some(index);
        }

        let expanded = expand_interface_name(name);
        if let Some(index) = self.interface_index(&expanded) {
            return Some(index);
        }

        let lower = expanded.to_lowercase();
        self.interfaces.iter().position(|i| i.name().to_lowercase() == lower)
    }

    /// Add an interface, merging into an existing one of the same name.
    ///
    /// On a switch every interface is parsed again afterwards, because
    /// port-channel membership can only be linked once the aggregate exists.
    pub fn add_interface(&mut self, interface: Interface) -> Result<usize, InterfaceError> {
        let index = self.merge_interface(interface)?;
        if self.is_switch() {
            self.second_pass();
        }
        Ok(index)
    }

    fn merge_interface(&mut self, interface: Interface) -> Result<usize, InterfaceError> {
        let name = interface.name.clone().ok_or(InterfaceError::MissingName)?;

        match self.by_name.get(&name) {
            Some(&index) => {
                self.interfaces[index].merge_config(interface);
                Ok(index)
            }
            None => {
                let index = self.interfaces.len();
                self.interfaces.push(interface);
                self.by_name.insert(name, index);
                Ok(index)
            }
        }
    }

    /// Parse interface blocks again with the sibling names known and link
    /// port-channel members to their aggregate in both directions
    pub fn second_pass(&mut self) {
        let names: HashSet<String> = self.interfaces.iter().filter_map(|i| i.name.clone()).collect();
        let context = ParseContext::with_siblings(&names);
        for interface in &mut self.interfaces {
            interface::reparse(interface, context);
        }

        let links: Vec<(usize, String)> = self
            .interfaces
            .iter()
            .filter_map(|child| {
                let parent = self.by_name.get(child.parent_interface.as_deref()?)?;
                Some((*parent, child.name().to_string()))
            })
            .collect();

        for (parent, child) in links {
            let children = &mut self.interfaces[parent].child_interfaces;
            if !children.contains(&child) {
                children.push(child);
            }
        }
    }

    /// Split a running configuration into interface blocks, parse each one
    /// and merge it by name. Returns the number of blocks parsed.
    pub fn parse_running_config(&mut self, config: &str) -> Result<usize, InterfaceError> {
        let mut blocks: Vec<Vec<&str>> = Vec::new();
        let mut current: Option<Vec<&str>> = None;

        for line in config.lines() {
            let indented = line.starts_with(' ') || line.starts_with('\t');
            if indented {
                if let Some(block) = current.as_mut() {
                    block.push(line);
                }
                continue;
            }

            if let Some(block) = current.take() {
                blocks.push(block);
            }
            if INTERFACE_HEADER.is_match(line) {
                current = Some(vec![line]);
            }
        }
        blocks.extend(current);

        let count = blocks.len();
        for block in blocks {
            self.merge_interface(interface::parse(&block))?;
        }
        self.second_pass();

        debug!("{}: parsed {} interface blocks", self.hostname, count);
        Ok(count)
    }

    /// Render the device configuration from the interface model
    pub fn render_config(&self) -> Result<String, InterfaceError> {
        let mut out = format!("! {}\n!\n", self.hostname);
        for interface in &self.interfaces {
            out.push_str(&interface::render(interface)?);
        }
        Ok(out)
    }

    /// VLANs actually in use on this device.
    ///
    /// Collects native VLANs, restricted trunk allowed lists, VLANs seen in
    /// the MAC table on trunks with no resolved neighbor, and enabled SVIs,
    /// then drops any id missing from the VLAN database.
    pub fn active_vlans(&self) -> BTreeSet<u16> {
        let mut vlans = BTreeSet::from([1]);

        for interface in &self.interfaces {
            vlans.insert(interface.native_vlan);
            if let Some(allowed) = &interface.allowed_vlan {
                if !is_unrestricted(Some(allowed)) {
                    vlans.extend(allowed.iter().copied());
                }
            }
        }

        let Some(switch) = &self.switch else {
            return vlans;
        };

        let edge_trunks: HashSet<usize> = self
            .interfaces
            .iter()
            .enumerate()
            .filter(|(_, i)| i.is_trunk() && !i.has_resolved_neighbor())
            .map(|(index, _)| index)
            .collect();
        vlans.extend(
            switch
                .mac_table
                .values()
                .filter(|entry| edge_trunks.contains(&entry.interface))
                .map(|entry| entry.vlan),
        );

        for interface in &self.interfaces {
            if interface.is_vlan_interface() && interface.is_enabled {
                if let Ok(id) = interface.name().to_lowercase().replace("vlan", "").parse::<u16>() {
                    vlans.insert(id);
                }
            }
        }

        vlans.retain(|id| switch.vlans_set.contains(id));
        vlans
    }
}
