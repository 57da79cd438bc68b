//! Harvesting one device.
//!
//! Runs on a crawl worker. Tries every transport/credential combination in
//! priority order until one logs in, then reads facts and the running
//! configuration followed by whichever probes the scan profile enables.
//! The result is a fresh [`Device`] handed back to the controller; nothing
//! here touches shared fabric state.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use super::DiscoveryError;
use crate::device::{Device, NeighborProtocol, SwitchData};
use crate::session::{Credential, DeviceSession, Facts, SessionConnector, SessionError, TransportOptions};

/// Optional data categories read after login. The running configuration is
/// always read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Probe {
    MacAddress,
    InterfaceStatus,
    CdpNeighbors,
    LldpNeighbors,
    Vtp,
    Vlans,
    L3Int,
    LocalAdmins,
    Inventory,
}

impl Probe {
    pub const ALL: [Probe; 9] = [
        Probe::MacAddress,
        Probe::InterfaceStatus,
        Probe::CdpNeighbors,
        Probe::LldpNeighbors,
        Probe::Vtp,
        Probe::Vlans,
        Probe::L3Int,
        Probe::LocalAdmins,
        Probe::Inventory,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Probe::MacAddress => "mac_address",
            Probe::InterfaceStatus => "interface_status",
            Probe::CdpNeighbors => "cdp_neighbors",
            Probe::LldpNeighbors => "lldp_neighbors",
            Probe::Vtp => "vtp",
            Probe::Vlans => "vlans",
            Probe::L3Int => "l3_int",
            Probe::LocalAdmins => "local_admins",
            Probe::Inventory => "inventory",
        }
    }
}

impl fmt::Display for Probe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Probe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Probe::ALL
            .into_iter()
            .find(|p| p.name() == s)
            .ok_or_else(|| format!("Unknown probe '{}'", s))
    }
}

/// Set of probes to run on each device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanProfile {
    probes: BTreeSet<Probe>,
}

impl ScanProfile {
    /// Every probe
    pub fn all() -> Self {
        Self {
            probes: Probe::ALL.into_iter().collect(),
        }
    }

    /// Only the listed probes
    pub fn whitelist(probes: impl IntoIterator<Item = Probe>) -> Self {
        Self {
            probes: probes.into_iter().collect(),
        }
    }

    /// Every probe except the listed ones
    pub fn blacklist(probes: impl IntoIterator<Item = Probe>) -> Self {
        let mut profile = Self::all();
        for probe in probes {
            profile.probes.remove(&probe);
        }
        profile
    }

    pub fn includes(&self, probe: Probe) -> bool {
        self.probes.contains(&probe)
    }

    pub fn probes(&self) -> impl Iterator<Item = Probe> + '_ {
        self.probes.iter().copied()
    }
}

impl Default for ScanProfile {
    fn default() -> Self {
        Self::all()
    }
}

/// How to reach and what to read from every device of a crawl
#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    /// Tried in order; the first that logs in wins
    pub credentials: Vec<Credential>,
    /// Tried in order, each with every credential. Empty means one default
    /// SSH transport.
    pub transports: Vec<TransportOptions>,
    pub scan: ScanProfile,
    /// Devices crawled at the same time
    pub parallelism: usize,
    /// Socket timeout handed to the session collaborator
    pub session_timeout: Option<Duration>,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            credentials: Vec::new(),
            transports: Vec::new(),
            scan: ScanProfile::all(),
            parallelism: 10,
            session_timeout: Some(Duration::from_secs(30)),
        }
    }
}

impl DiscoveryOptions {
    pub fn with_credentials(credentials: Vec<Credential>) -> Self {
        Self {
            credentials,
            ..Default::default()
        }
    }

    fn transports(&self) -> Vec<TransportOptions> {
        let mut transports = if self.transports.is_empty() {
            vec![TransportOptions::default()]
        } else {
            self.transports.clone()
        };
        for transport in &mut transports {
            if transport.timeout.is_none() {
                transport.timeout = self.session_timeout;
            }
        }
        transports
    }
}

/// Hostname a device reports: its FQDN without the ".not set" placeholder
/// domain, or the plain hostname when the FQDN is unknown
pub fn reported_hostname(facts: &Facts) -> Option<String> {
    let fqdn = facts.fqdn.trim();
    let hostname = if fqdn.is_empty() || fqdn == "Unknown" {
        facts.hostname.trim().to_string()
    } else {
        fqdn.replace(".not set", "")
    };
    (!hostname.is_empty()).then_some(hostname)
}

/// Log into `address` and harvest it
pub fn collect<C: SessionConnector>(
    address: &str,
    connector: &C,
    options: &DiscoveryOptions,
) -> Result<Device, DiscoveryError> {
    let mut attempts = 0;
    let mut last_error = None;

    for transport in options.transports() {
        for credential in &options.credentials {
            attempts += 1;
            debug!(
                "Connecting to {} as {} over {:?}",
                address, credential.username, transport.protocol
            );

            match connector.connect(address, credential, &transport) {
                Ok(mut session) => {
                    info!("Connection to {} successful", address);
                    let result = harvest(address, &mut session, &options.scan);
                    session.close();
                    match result {
                        Err(DiscoveryError::Session { source, .. }) if source.is_login_failure() => {
                            warn!("Session to {} lost ({}), trying next method if available", address, source);
                            last_error = Some(source);
                        }
                        other => return other,
                    }
                }
                Err(e) => {
                    warn!("Login to {} failed ({}), trying next method if available", address, e);
                    last_error = Some(e);
                }
            }
        }
    }

    Err(DiscoveryError::LoginFailed {
        address: address.to_string(),
        attempts,
        last: last_error.map_or_else(|| "no credentials configured".to_string(), |e| e.to_string()),
    })
}

fn harvest<S: DeviceSession>(
    address: &str,
    session: &mut S,
    scan: &ScanProfile,
) -> Result<Device, DiscoveryError> {
    let session_error = |source: SessionError| DiscoveryError::Session {
        address: address.to_string(),
        source,
    };

    let facts = session.facts().map_err(session_error)?;
    let mut device = Device::new(address);
    if let Some(hostname) = reported_hostname(&facts) {
        device.hostname = hostname;
    }

    let mut switch = SwitchData::new(facts);
    switch.config = session.running_config().map_err(session_error)?;
    let config = switch.config.clone();
    device.promote(switch);

    device
        .parse_running_config(&config)
        .map_err(|source| DiscoveryError::Interface {
            address: address.to_string(),
            source,
        })?;

    let hostname = device.hostname.clone();
    let probe = |probe: Probe| scan.includes(probe);

    if probe(Probe::MacAddress) {
        if let Some(rows) = optional(&hostname, Probe::MacAddress, session.mac_address_table())? {
            let kept = device.load_mac_table(&rows);
            debug!("{}: {} MAC entries", hostname, kept);
        }
    }

    if probe(Probe::InterfaceStatus) {
        if let Some(rows) = optional(&hostname, Probe::InterfaceStatus, session.interface_status())? {
            device.load_interface_status(&rows);
        }
    }

    if probe(Probe::CdpNeighbors) {
        if let Some(rows) = optional(&hostname, Probe::CdpNeighbors, session.cdp_neighbors())? {
            device.load_neighbors(&rows, NeighborProtocol::Cdp);
        }
    }

    if probe(Probe::LldpNeighbors) {
        if let Some(rows) = optional(&hostname, Probe::LldpNeighbors, session.lldp_neighbors())? {
            device.load_neighbors(&rows, NeighborProtocol::Lldp);
        }
    }

    let vtp = if probe(Probe::Vtp) {
        optional(&hostname, Probe::Vtp, session.vtp_status())?
    } else {
        None
    };
    let vlans = if probe(Probe::Vlans) {
        optional(&hostname, Probe::Vlans, session.vlans())?
    } else {
        None
    };
    let (interfaces_ip, arp_table) = if probe(Probe::L3Int) {
        (
            optional(&hostname, Probe::L3Int, session.interfaces_ip())?,
            optional(&hostname, Probe::L3Int, session.arp_table())?,
        )
    } else {
        (None, None)
    };
    let local_accounts = if probe(Probe::LocalAdmins) {
        optional(&hostname, Probe::LocalAdmins, session.local_accounts())?
    } else {
        None
    };
    let inventory = if probe(Probe::Inventory) {
        optional(&hostname, Probe::Inventory, session.inventory())?
    } else {
        None
    };

    if let Some(switch) = device.switch_mut() {
        switch.vtp = vtp;
        if let Some(vlans) = vlans {
            switch.set_vlans(vlans);
        }
        switch.interfaces_ip = interfaces_ip.unwrap_or_default();
        switch.arp_table = arp_table.unwrap_or_default();
        switch.local_accounts = local_accounts;
        switch.inventory = inventory.unwrap_or_default();
    }

    Ok(device)
}

/// Treat an extraction failure as missing data, propagate anything else
fn optional<T>(
    hostname: &str,
    probe: Probe,
    result: Result<T, SessionError>,
) -> Result<Option<T>, DiscoveryError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e @ SessionError::Extraction { .. }) => {
            warn!("{}: {} probe failed, continuing without it: {}", hostname, probe, e);
            Ok(None)
        }
        Err(source) => Err(DiscoveryError::Session {
            address: hostname.to_string(),
            source,
        }),
    }
}
