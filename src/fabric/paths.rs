//! Path search over resolved links.

use std::collections::BTreeSet;

use super::{DiscoveryError, Fabric};
use crate::device::{DeviceId, InterfaceRef};

/// One path: both ends of every link crossed, in order
pub type Path = Vec<InterfaceRef>;

impl Fabric {
    /// Every simple path from `start` to any device in `destinations`.
    ///
    /// A branch begins at each interface of `start` with a resolved
    /// neighbor and stops as soon as it lands on a destination device. No
    /// interface appears twice in one path. Branches ending at unresolved
    /// neighbors or dead ends produce nothing.
    pub fn find_paths(&self, start: DeviceId, destinations: &[DeviceId]) -> Vec<Path> {
        let destinations: BTreeSet<DeviceId> = destinations.iter().copied().collect();
        let mut paths = Vec::new();
        if destinations.is_empty() {
            return paths;
        }
        let Some(device) = self.device(start) else {
            return paths;
        };

        for (index, interface) in device.interfaces().iter().enumerate() {
            for peer in interface.resolved_neighbors() {
                let mut path = vec![InterfaceRef::new(start, index)];
                self.extend_path(peer, &destinations, &mut path, &mut paths);
            }
        }
        paths
    }

    /// [`Fabric::find_paths`] by hostname
    pub fn find_paths_between(&self, start: &str, destinations: &[&str]) -> Result<Vec<Path>, DiscoveryError> {
        let start = self
            .lookup(start)
            .ok_or_else(|| DiscoveryError::UnknownHost(start.to_string()))?;
        let destinations = destinations
            .iter()
            .map(|host| self.lookup(host).ok_or_else(|| DiscoveryError::UnknownHost(host.to_string())))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self.find_paths(start, &destinations))
    }

    fn extend_path(
        &self,
        arrived: InterfaceRef,
        destinations: &BTreeSet<DeviceId>,
        path: &mut Path,
        found: &mut Vec<Path>,
    ) {
        path.push(arrived);
        if destinations.contains(&arrived.device) {
            found.push(path.clone());
            path.pop();
            return;
        }

        if let Some(device) = self.device(arrived.device) {
            for (index, interface) in device.interfaces().iter().enumerate() {
                let exit = InterfaceRef::new(arrived.device, index);
                if path.contains(&exit) {
                    continue;
                }
                for peer in interface.resolved_neighbors() {
                    if path.contains(&peer) {
                        continue;
                    }
                    path.push(exit);
                    self.extend_path(peer, destinations, path, found);
                    path.pop();
                }
            }
        }
        path.pop();
    }
}
