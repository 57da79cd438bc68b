//! Neighbor link resolution.
//!
//! Turns CDP/LLDP neighbor descriptors into references to the peer
//! interface and writes the reciprocal reference on the peer. Descriptors
//! naming devices or ports outside the fabric stay as they are.

use log::{debug, warn};

use super::Fabric;
use crate::device::{DeviceId, InterfaceRef};
use crate::interface::{Neighbor, NeighborDescriptor};

impl Fabric {
    /// Find the interface a neighbor descriptor points at
    pub fn resolve_descriptor(&self, descriptor: &NeighborDescriptor) -> Option<InterfaceRef> {
        let device: DeviceId = self.lookup(&descriptor.hostname)?;
        let index = self.device(device)?.find_interface(&descriptor.remote_interface)?;
        Some(InterfaceRef::new(device, index))
    }

    /// Resolve every neighbor descriptor that matches a known interface.
    ///
    /// The peer gets a reference back: appended if it has no neighbors,
    /// otherwise written over its first neighbor entry. Shared segments
    /// with several neighbors on one port therefore keep only the link
    /// resolved last. Returns the number of links resolved.
    pub fn resolve_links(&mut self) -> usize {
        let mut pending = Vec::new();
        for (id, device) in self.devices() {
            for (index, interface) in device.interfaces().iter().enumerate() {
                for (slot, neighbor) in interface.neighbors.iter().enumerate() {
                    if let Neighbor::Unresolved(descriptor) = neighbor {
                        match self.resolve_descriptor(descriptor) {
                            Some(peer) => pending.push((InterfaceRef::new(id, index), slot, peer)),
                            None => debug!(
                                "Could not find link between {} {} and {} {}",
                                device.hostname,
                                interface.name(),
                                descriptor.hostname,
                                descriptor.remote_interface
                            ),
                        }
                    }
                }
            }
        }

        let mut resolved = 0;
        for (local, slot, peer) in pending {
            // An earlier reciprocal write may already have replaced this entry
            let still_unresolved = self
                .interface(local)
                .and_then(|i| i.neighbors.get(slot))
                .is_some_and(|n| n.resolved().is_none());
            if !still_unresolved {
                continue;
            }

            self.set_neighbor(local, slot, peer);
            self.set_reciprocal(peer, local);
            debug!("Found link between {} and {}", self.describe(local), self.describe(peer));
            resolved += 1;
        }
        resolved
    }

    fn set_neighbor(&mut self, at: InterfaceRef, slot: usize, peer: InterfaceRef) {
        if let Some(interface) = self.device_mut(at.device).and_then(|d| d.interface_at_mut(at.index)) {
            if let Some(entry) = interface.neighbors.get_mut(slot) {
                *entry = Neighbor::Resolved(peer);
            }
        }
    }

    fn set_reciprocal(&mut self, peer: InterfaceRef, local: InterfaceRef) {
        let replaced = {
            let Some(interface) = self.device_mut(peer.device).and_then(|d| d.interface_at_mut(peer.index)) else {
                return;
            };
            if interface.neighbors.contains(&Neighbor::Resolved(local)) {
                return;
            }
            match interface.neighbors.first_mut() {
                None => {
                    interface.neighbors.push(Neighbor::Resolved(local));
                    None
                }
                Some(first) => Some(std::mem::replace(first, Neighbor::Resolved(local))),
            }
        };

        match replaced {
            Some(Neighbor::Resolved(previous)) if previous != local => warn!(
                "{} already linked to {}, replacing with {} (shared segments keep one neighbor)",
                self.describe(peer),
                self.describe(previous),
                self.describe(local)
            ),
            Some(Neighbor::Unresolved(descriptor)) => debug!(
                "{} dropping unresolved neighbor {} {} for link to {}",
                self.describe(peer),
                descriptor.hostname,
                descriptor.remote_interface,
                self.describe(local)
            ),
            _ => {}
        }
    }
}
