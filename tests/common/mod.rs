#![allow(dead_code)]

use fabricmap::fabric::DiscoveryOptions;
use fabricmap::session::{Credential, DeviceRecord, Facts, MacRow, NeighborRow};

/// A switch whose port `GigabitEthernet0/i` faces the i-th neighbor, plus an
/// access port `GigabitEthernet0/9`
pub fn switch(hostname: &str, neighbors: &[(&str, &str, &str)], macs: &[(&str, &str)]) -> DeviceRecord {
    let mut config = String::from("version 15.2\n!\nhostname ");
    config.push_str(hostname);
    config.push_str("\n!\n");
    let mut cdp = Vec::new();
    for (i, (peer, ip, remote)) in neighbors.iter().enumerate() {
        config.push_str(&format!(
            "interface GigabitEthernet0/{}\n description uplink to {}\n switchport mode trunk\n!\n",
            i, peer
        ));
        cdp.push(NeighborRow {
            local_interface: format!("Gi0/{}", i),
            hostname: peer.to_string(),
            ip: ip.to_string(),
            platform: "cisco WS-C3850-48P".to_string(),
            remote_interface: remote.to_string(),
        });
    }
    config.push_str("interface GigabitEthernet0/9\n switchport mode access\n switchport access vlan 20\n spanning-tree portfast\n!\nend\n");

    DeviceRecord {
        facts: Facts {
            hostname: hostname.to_string(),
            fqdn: format!("{}.not set", hostname),
            vendor: "Cisco".to_string(),
            model: "WS-C3850-48P".to_string(),
            ..Default::default()
        },
        running_config: config,
        cdp_neighbors: cdp,
        mac_address_table: macs
            .iter()
            .map(|(mac, interface)| MacRow {
                mac: mac.to_string(),
                interface: interface.to_string(),
                vlan: 20,
            })
            .collect(),
        ..Default::default()
    }
}

pub fn options() -> DiscoveryOptions {
    DiscoveryOptions {
        credentials: vec![Credential::new("admin", "admin")],
        parallelism: 4,
        ..Default::default()
    }
}
