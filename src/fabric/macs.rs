//! Fabric-wide MAC attachment table.

use log::debug;

use super::{Fabric, FabricMacEntry};
use crate::device::{DeviceId, InterfaceRef};

impl Fabric {
    /// Rebuild the fabric MAC table.
    ///
    /// Every switch that learned a MAC reports it on some port. The port
    /// with the fewest learned MACs is taken as the attachment point, since
    /// uplinks carry many MACs and edge ports few. On a tie the switch seen
    /// first keeps the entry.
    pub fn recalculate_macs(&mut self) -> usize {
        self.mac_table.clear();
        for device in &mut self.devices {
            device.count_macs();
        }

        for (id, device) in self.devices.iter().enumerate() {
            if self.retired.contains(&DeviceId(id)) {
                continue;
            }
            let Some(switch) = device.switch() else {
                continue;
            };

            for (mac, entry) in &switch.mac_table {
                let Some(count) = device.interface_at(entry.interface).map(|i| i.mac_count) else {
                    continue;
                };
                let candidate = FabricMacEntry {
                    interface: InterfaceRef::new(DeviceId(id), entry.interface),
                    vlan: entry.vlan,
                };

                match self.mac_table.get(mac) {
                    Some(current) => {
                        let current_count = self.devices[current.interface.device.0]
                            .interface_at(current.interface.index)
                            .map_or(usize::MAX, |i| i.mac_count);
                        if count < current_count {
                            self.mac_table.insert(*mac, candidate);
                        }
                    }
                    None => {
                        self.mac_table.insert(*mac, candidate);
                    }
                }
            }
        }

        debug!("Fabric MAC table holds {} entries", self.mac_table.len());
        self.mac_table.len()
    }

    /// Where `mac` attaches to the fabric, if any switch learned it
    pub fn locate_mac(&self, mac: &mac_address::MacAddress) -> Option<FabricMacEntry> {
        self.mac_table.get(mac).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{Device, SwitchData};
    use crate::interface::Interface;
    use crate::session::MacRow;
    use crate::utils::mac::parse_mac;

    fn switch(hostname: &str, rows: &[(&str, &str)]) -> Device {
        let mut device = Device::with_hostname(hostname, None);
        device.promote(SwitchData::default());
        device.add_interface(Interface::new("GigabitEthernet0/1")).unwrap();
        device.add_interface(Interface::new("GigabitEthernet0/2")).unwrap();
        let rows: Vec<MacRow> = rows
            .iter()
            .map(|(mac, interface)| MacRow {
                mac: mac.to_string(),
                interface: interface.to_string(),
                vlan: 10,
            })
            .collect();
        device.load_mac_table(&rows);
        device
    }

    #[test]
    fn test_edge_port_beats_uplink() {
        let mut fabric = Fabric::new();
        // Core sees five MACs on its uplink, the access switch one on its edge port
        let core = switch(
            "core",
            &[
                ("0000.0000.0001", "Gi0/1"),
                ("0000.0000.0002", "Gi0/1"),
                ("0000.0000.0003", "Gi0/1"),
                ("0000.0000.0004", "Gi0/1"),
                ("0000.0000.0005", "Gi0/1"),
            ],
        );
        let access = switch("access", &[("0000.0000.0001", "Gi0/2")]);
        let core = fabric.add_device(core);
        let access = fabric.add_device(access);

        assert_eq!(fabric.recalculate_macs(), 5);

        let host = parse_mac("0000.0000.0001").unwrap();
        assert_eq!(
            fabric.locate_mac(&host).map(|e| e.interface),
            Some(InterfaceRef::new(access, 1))
        );
        let other = parse_mac("0000.0000.0002").unwrap();
        assert_eq!(fabric.locate_mac(&other).map(|e| e.interface.device), Some(core));
    }

    #[test]
    fn test_tie_keeps_first_device() {
        let mut fabric = Fabric::new();
        let first = fabric.add_device(switch("a", &[("aa:bb:cc:00:00:01", "Gi0/1")]));
        fabric.add_device(switch("b", &[("aa:bb:cc:00:00:01", "Gi0/1")]));

        fabric.recalculate_macs();
        let mac = parse_mac("aabb.cc00.0001").unwrap();
        assert_eq!(fabric.locate_mac(&mac).map(|e| e.interface.device), Some(first));
    }

    #[test]
    fn test_plain_devices_contribute_nothing() {
        let mut fabric = Fabric::new();
        fabric.add_device(Device::with_hostname("phone", None));
        assert_eq!(fabric.recalculate_macs(), 0);
        assert!(fabric.mac_table().is_empty());
    }
}
