//! Switch interface model, configuration parser and renderer.
//!
//! An [`Interface`] is built from the lines of one `interface ...` block of a
//! running configuration with [`parse`], and turned back into configuration
//! text with [`render`]. Lines the parser does not understand are kept in
//! [`Interface::unparsed_lines`] and rendered verbatim, so nothing is lost
//! between the two.

pub mod naming;
pub mod parser;
pub mod render;
pub mod status;
pub mod vlan;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};

use chrono::{DateTime, Local};
use ipnetwork::Ipv4Network;
use serde::Serialize;

use crate::device::InterfaceRef;

pub use parser::{parse, parse_str, parse_with, reparse, ParseContext};
pub use render::render;

/// Errors raised by interface operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InterfaceError {
    #[error("Interface has no name, cannot render or attach it")]
    MissingName,
}

/// Layer-2 mode of a switch port
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub enum SwitchportMode {
    #[default]
    Access,
    Trunk,
    /// Anything else the device reports, e.g. `dynamic desirable`, kept verbatim
    Other(String),
}

impl SwitchportMode {
    pub fn from_config(value: &str) -> Self {
        match value.trim() {
            "access" => Self::Access,
            "trunk" => Self::Trunk,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for SwitchportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Access => write!(f, "access"),
            Self::Trunk => write!(f, "trunk"),
            Self::Other(mode) => write!(f, "{}", mode),
        }
    }
}

/// Whether an IPv4 address is the primary or a secondary one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AddressKind {
    Primary,
    Secondary,
}

/// An IPv4 address configured on a routed interface
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ipv4Address {
    pub network: Ipv4Network,
    pub kind: AddressKind,
}

/// 802.1Q tag of a routed sub-interface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Dot1q {
    pub vlan: u16,
    pub native: bool,
}

/// Default HSRP priority
pub const HSRP_DEFAULT_PRIORITY: u16 = 100;

/// One HSRP standby group
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HsrpGroup {
    pub address: Option<Ipv4Addr>,
    pub priority: u16,
    pub preempt: bool,
    pub secondary: Vec<Ipv4Addr>,
}

impl Default for HsrpGroup {
    fn default() -> Self {
        Self {
            address: None,
            priority: HSRP_DEFAULT_PRIORITY,
            preempt: false,
            secondary: Vec::new(),
        }
    }
}

/// HSRP configuration of an interface. Group 0 is the implicit group used
/// when `standby` commands carry no group number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Hsrp {
    pub version: u8,
    pub groups: BTreeMap<u16, HsrpGroup>,
}

impl Default for Hsrp {
    fn default() -> Self {
        Self {
            version: 1,
            groups: BTreeMap::new(),
        }
    }
}

/// Neighbor advertised by CDP or LLDP that has not been matched to a
/// discovered interface yet
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NeighborDescriptor {
    pub hostname: String,
    pub ip: Option<IpAddr>,
    pub platform: String,
    pub remote_interface: String,
}

/// An entry in an interface's neighbor list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Neighbor {
    /// Peer interface inside the fabric
    Resolved(InterfaceRef),
    /// Advertised peer awaiting (or failing) resolution
    Unresolved(NeighborDescriptor),
}

impl Neighbor {
    pub fn resolved(&self) -> Option<InterfaceRef> {
        match self {
            Self::Resolved(peer) => Some(*peer),
            Self::Unresolved(_) => None,
        }
    }

    pub fn descriptor(&self) -> Option<&NeighborDescriptor> {
        match self {
            Self::Resolved(_) => None,
            Self::Unresolved(desc) => Some(desc),
        }
    }
}

/// Operational data from `show interface`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InterfaceStatus {
    pub protocol_status: Option<String>,
    pub hardware_type: Option<String>,
    pub mtu: Option<u32>,
    pub speed: Option<String>,
    pub duplex: Option<String>,
    pub last_input: Option<DateTime<Local>>,
    pub last_output: Option<DateTime<Local>>,
    pub last_clearing: Option<DateTime<Local>>,
}

/// A switch interface
#[derive(Debug, Clone)]
pub struct Interface {
    pub name: Option<String>,
    pub description: String,
    pub is_enabled: bool,
    pub is_up: bool,
    pub mode: SwitchportMode,
    /// Layer-3 port: SVIs, routed ports and dot1Q sub-interfaces
    pub routed_port: bool,
    pub native_vlan: u16,
    /// `None` means no explicit list; trunks default to the full range
    pub allowed_vlan: Option<BTreeSet<u16>>,
    pub voice_vlan: Option<u16>,
    pub encapsulation: Option<Dot1q>,
    pub type_edge: bool,
    pub bpduguard: bool,
    pub channel_group: Option<u32>,
    pub channel_protocol: Option<String>,
    /// Name of the port-channel this port is a member of
    pub parent_interface: Option<String>,
    /// Names of the member ports, when this is a port-channel
    pub child_interfaces: Vec<String>,
    pub vrf: String,
    pub ipv4: Vec<Ipv4Address>,
    pub hsrp: Option<Hsrp>,
    /// MAC addresses learned on this port, recomputed on every aggregation pass
    pub mac_count: usize,
    pub neighbors: Vec<Neighbor>,
    pub unparsed_lines: Vec<String>,
    /// Raw configuration block this interface was parsed from
    pub config: Vec<String>,
    pub status: InterfaceStatus,
}

impl Default for Interface {
    fn default() -> Self {
        Self {
            name: None,
            description: String::new(),
            is_enabled: true,
            is_up: true,
            mode: SwitchportMode::Access,
            routed_port: false,
            native_vlan: 1,
            allowed_vlan: None,
            voice_vlan: None,
            encapsulation: None,
            type_edge: false,
            bpduguard: false,
            channel_group: None,
            channel_protocol: None,
            parent_interface: None,
            child_interfaces: Vec::new(),
            vrf: "default".to_string(),
            ipv4: Vec::new(),
            hsrp: None,
            mac_count: 0,
            neighbors: Vec::new(),
            unparsed_lines: Vec::new(),
            config: Vec::new(),
            status: InterfaceStatus::default(),
        }
    }
}

impl Interface {
    /// Create an interface with default settings
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    /// Name, or an empty string for an interface built without one
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }

    pub fn is_trunk(&self) -> bool {
        self.mode == SwitchportMode::Trunk
    }

    /// SVI such as `Vlan100`
    pub fn is_vlan_interface(&self) -> bool {
        self.name().to_lowercase().starts_with("vlan")
    }

    pub fn is_port_channel(&self) -> bool {
        self.name().to_lowercase().starts_with("port-channel")
    }

    pub fn sort_order(&self) -> Option<u64> {
        naming::sort_order(self.name())
    }

    /// Resolved peers of this interface
    pub fn resolved_neighbors(&self) -> impl Iterator<Item = InterfaceRef> + '_ {
        self.neighbors.iter().filter_map(Neighbor::resolved)
    }

    pub fn has_resolved_neighbor(&self) -> bool {
        self.resolved_neighbors().next().is_some()
    }

    /// Compare the configuration-derived state of two interfaces.
    ///
    /// Runtime data (neighbors, MAC counts, status, port-channel links which
    /// depend on sibling interfaces) is ignored. An unset trunk allowed list
    /// and the full VLAN range compare equal.
    pub fn same_config(&self, other: &Interface) -> bool {
        self.name == other.name
            && self.description == other.description
            && self.is_enabled == other.is_enabled
            && self.mode == other.mode
            && self.routed_port == other.routed_port
            && self.native_vlan == other.native_vlan
            && vlan::allowed_vlans_equivalent(self.allowed_vlan.as_ref(), other.allowed_vlan.as_ref())
            && self.voice_vlan == other.voice_vlan
            && self.encapsulation == other.encapsulation
            && self.type_edge == other.type_edge
            && self.bpduguard == other.bpduguard
            && self.channel_group == other.channel_group
            && self.channel_protocol == other.channel_protocol
            && self.vrf == other.vrf
            && self.ipv4 == other.ipv4
            && self.hsrp == other.hsrp
            && self.unparsed_lines == other.unparsed_lines
    }

    /// Take over the configuration-derived state of a freshly parsed copy of
    /// this interface, keeping runtime data gathered from other commands
    pub fn merge_config(&mut self, parsed: Interface) {
        let Interface {
            name,
            description,
            is_enabled,
            mode,
            routed_port,
            native_vlan,
            allowed_vlan,
            voice_vlan,
            encapsulation,
            type_edge,
            bpduguard,
            channel_group,
            channel_protocol,
            parent_interface,
            vrf,
            ipv4,
            hsrp,
            unparsed_lines,
            config,
            ..
        } = parsed;

        self.name = name;
        self.description = description;
        self.is_enabled = is_enabled;
        self.mode = mode;
        self.routed_port = routed_port;
        self.native_vlan = native_vlan;
        self.allowed_vlan = allowed_vlan;
        self.voice_vlan = voice_vlan;
        self.encapsulation = encapsulation;
        self.type_edge = type_edge;
        self.bpduguard = bpduguard;
        self.channel_group = channel_group;
        self.channel_protocol = channel_protocol;
        if parent_interface.is_some() {
            self.parent_interface = parent_interface;
        }
        self.vrf = vrf;
        self.ipv4 = ipv4;
        self.hsrp = hsrp;
        self.unparsed_lines = unparsed_lines;
        self.config = config;
    }
}
