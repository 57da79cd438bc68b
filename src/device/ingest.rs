//! Loading probe results into a device.

use std::net::IpAddr;

use chrono::Local;
use log::{debug, info, warn};

use super::{Device, MacEntry};
use crate::interface::naming::expand_interface_name;
use crate::interface::status::apply_status;
use crate::interface::{Interface, Neighbor, NeighborDescriptor};
use crate::session::{InterfaceStatusRow, MacRow, NeighborRow};
use crate::utils::mac::parse_mac;

/// Which neighbor protocol a table came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NeighborProtocol {
    Cdp,
    Lldp,
}

impl Device {
    /// Replace the switch's MAC table with `rows`.
    ///
    /// Rows without an interface, with an unreadable MAC, or naming an
    /// interface the device does not have are dropped. Returns the number of
    /// entries kept. Does nothing on a plain device.
    pub fn load_mac_table(&mut self, rows: &[MacRow]) -> usize {
        let mut table = std::collections::HashMap::new();

        for row in rows {
            if row.interface.trim().is_empty() {
                continue;
            }
            let Some(mac) = parse_mac(&row.mac) else {
                debug!("{}: skipping unreadable MAC '{}'", self.hostname, row.mac);
                continue;
            };
            let Some(interface) = self.find_interface(&row.interface) else {
                debug!("{}: MAC {} on unknown interface {}", self.hostname, mac, row.interface);
                continue;
            };
            table.insert(mac, MacEntry { interface, vlan: row.vlan });
        }

        let kept = table.len();
        match self.switch.as_mut() {
            Some(switch) => switch.mac_table = table,
            None => return 0,
        }
        self.count_macs();
        kept
    }

    /// Recount MACs learned per interface from the switch's MAC table
    pub fn count_macs(&mut self) {
        for interface in &mut self.interfaces {
            interface.mac_count = 0;
        }
        let Some(switch) = &self.switch else {
            return;
        };
        for entry in switch.mac_table.values() {
            if let Some(interface) = self.interfaces.get_mut(entry.interface) {
                interface.mac_count += 1;
            }
        }
    }

    /// Apply `show interface` rows, creating interfaces missing from the
    /// configuration
    pub fn load_interface_status(&mut self, rows: &[InterfaceStatusRow]) {
        let reference = self.switch.as_ref().map_or_else(Local::now, |s| s.init_time);

        for row in rows {
            if row.name.is_empty() {
                continue;
            }
            let index = match self.find_interface(&row.name) {
                Some(index) => index,
                None => {
                    info!("{}: creating interface {} not found in configuration", self.hostname, row.name);
                    match self.merge_interface(Interface::new(row.name.clone())) {
                        Ok(index) => index,
                        Err(e) => {
                            warn!("{}: {}", self.hostname, e);
                            continue;
                        }
                    }
                }
            };
            apply_status(&mut self.interfaces[index], row, reference);
        }
    }

    /// Attach CDP or LLDP neighbors as unresolved descriptors.
    ///
    /// LLDP rows without a management IP, local port or hostname are
    /// dropped. CDP rows only need a known local port.
    pub fn load_neighbors(&mut self, rows: &[NeighborRow], protocol: NeighborProtocol) -> usize {
        let mut added = 0;

        for row in rows {
            let ip: Option<IpAddr> = row.ip.trim().parse().ok();

            if protocol == NeighborProtocol::Lldp
                && (ip.is_none() || row.local_interface.is_empty() || row.hostname.is_empty())
            {
                continue;
            }

            debug!(
                "{}: {:?} neighbor {} ({:?}) on {}, remote {}",
                self.hostname, protocol, row.hostname, ip, row.local_interface, row.remote_interface
            );

            let Some(index) = self.find_interface(&row.local_interface) else {
                warn!(
                    "{}: neighbor {} reported on unknown interface {}",
                    self.hostname, row.hostname, row.local_interface
                );
                continue;
            };

            self.interfaces[index].neighbors.push(Neighbor::Unresolved(NeighborDescriptor {
                hostname: row.hostname.clone(),
                ip,
                platform: row.platform.clone(),
                remote_interface: expand_interface_name(&row.remote_interface),
            }));
            added += 1;
        }

        added
    }
}
