//! Interface configuration renderer.
//!
//! Produces the configuration block for an [`Interface`] in a normal form the
//! parser reads back into the same record.

use super::vlan::{compress_vlan_list, is_unrestricted};
use super::{AddressKind, Interface, InterfaceError, SwitchportMode, HSRP_DEFAULT_PRIORITY};

/// Render an interface as configuration text, one line per directive,
/// terminated by `!`.
///
/// Fails with [`InterfaceError::MissingName`] if the interface was built
/// without a name.
pub fn render(interface: &Interface) -> Result<String, InterfaceError> {
    let name = interface.name.as_deref().ok_or(InterfaceError::MissingName)?;

    let mut lines: Vec<String> = vec![format!("interface {}", name)];

    if !interface.description.is_empty() {
        lines.push(format!(" description {}", interface.description));
    }

    if let (Some(group), Some(protocol)) = (interface.channel_group, &interface.channel_protocol) {
        let in_port_channel = interface
            .parent_interface
            .as_deref()
            .is_some_and(|parent| parent.to_lowercase().starts_with("port-channel"));
        if in_port_channel {
            lines.push(format!(" channel-group {} mode {}", group, protocol));
        }
    }

    if !interface.routed_port {
        render_switchport(interface, &mut lines);
    }

    render_layer3(interface, &mut lines);

    for line in &interface.unparsed_lines {
        lines.push(format!(" {}", line));
    }

    lines.push(if interface.is_enabled {
        " no shutdown".to_string()
    } else {
        " shutdown".to_string()
    });
    lines.push("!".to_string());

    Ok(lines.into_iter().map(|line| line + "\n").collect())
}

fn render_switchport(interface: &Interface, lines: &mut Vec<String>) {
    lines.push(format!(" switchport mode {}", interface.mode));

    match &interface.mode {
        SwitchportMode::Trunk => {
            lines.push(format!(" switchport trunk native vlan {}", interface.native_vlan));
            let allowed = match &interface.allowed_vlan {
                _ if is_unrestricted(interface.allowed_vlan.as_ref()) => "all".to_string(),
                Some(vlans) if vlans.is_empty() => "none".to_string(),
                Some(vlans) => compress_vlan_list(vlans),
                None => "all".to_string(),
            };
            lines.push(format!(" switchport trunk allowed vlan {}", allowed));
        }
        SwitchportMode::Access | SwitchportMode::Other(_) => {
            lines.push(format!(" switchport access vlan {}", interface.native_vlan));
        }
    }

    if interface.mode == SwitchportMode::Access {
        if let Some(voice) = interface.voice_vlan {
            lines.push(format!(" switchport voice vlan {}", voice));
        }
    }

    if interface.type_edge {
        if interface.is_trunk() {
            lines.push(" spanning-tree portfast trunk".to_string());
        } else {
            lines.push(" spanning-tree portfast".to_string());
        }
    }

    if interface.bpduguard {
        lines.push(" spanning-tree bpduguard enable".to_string());
    }
}

fn render_layer3(interface: &Interface, lines: &mut Vec<String>) {
    if interface.vrf != "default" {
        lines.push(format!(" vrf forwarding {}", interface.vrf));
    }

    for address in &interface.ipv4 {
        let suffix = match address.kind {
            AddressKind::Primary => "",
            AddressKind::Secondary => " secondary",
        };
        lines.push(format!(
            " ip address {} {}{}",
            address.network.ip(),
            address.network.mask(),
            suffix
        ));
    }

    if let Some(hsrp) = &interface.hsrp {
        // A group-less block only survives a reparse through its version line
        if hsrp.version != 1 || hsrp.groups.is_empty() {
            lines.push(format!(" standby version {}", hsrp.version));
        }
        for (id, group) in &hsrp.groups {
            let prefix = if *id == 0 {
                " standby ".to_string()
            } else {
                format!(" standby {} ", id)
            };

            match group.address {
                Some(address) => lines.push(format!("{}ip {}", prefix, address)),
                None => lines.push(format!("{}ip", prefix)),
            }
            for secondary in &group.secondary {
                lines.push(format!("{}ip {} secondary", prefix, secondary));
            }
            if group.priority != HSRP_DEFAULT_PRIORITY {
                lines.push(format!("{}priority {}", prefix, group.priority));
            }
            if group.preempt {
                lines.push(format!("{}preempt", prefix));
            }
        }
    }

    if let Some(dot1q) = &interface.encapsulation {
        let native = if dot1q.native { " native" } else { "" };
        lines.push(format!(" encapsulation dot1Q {}{}", dot1q.vlan, native));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::parse;

    fn round_trip(lines: &[&str]) -> (Interface, Interface) {
        let first = parse(lines);
        let text = render(&first).unwrap();
        let second = parse(&[text.as_str()]);
        (first, second)
    }

    #[test]
    fn test_missing_name() {
        assert_eq!(render(&Interface::default()), Err(InterfaceError::MissingName));
    }

    #[test]
    fn test_render_access_port() {
        let interface = parse(&[
            "interface GigabitEthernet1/0/1",
            " description printer",
            " switchport mode access",
            " switchport access vlan 20",
            " switchport voice vlan 150",
            " spanning-tree portfast",
            " spanning-tree bpduguard enable",
        ]);
        let text = render(&interface).unwrap();

        assert_eq!(
            text,
            "interface GigabitEthernet1/0/1\n\
             \x20description printer\n\
             \x20switchport mode access\n\
             \x20switchport access vlan 20\n\
             \x20switchport voice vlan 150\n\
             \x20spanning-tree portfast\n\
             \x20spanning-tree bpduguard enable\n\
             \x20no shutdown\n\
             !\n"
        );
    }

    #[test]
    fn test_render_trunk_all() {
        let interface = parse(&["interface E0", " switchport mode trunk"]);
        let text = render(&interface).unwrap();
        assert!(text.contains(" switchport trunk allowed vlan all\n"));
        assert!(text.contains(" switchport trunk native vlan 1\n"));
    }

    #[test]
    fn test_render_trunk_list() {
        let interface = parse(&[
            "interface E0",
            " switchport mode trunk",
            " switchport trunk allowed vlan 1-5,7,8,10",
        ]);
        let text = render(&interface).unwrap();
        assert!(text.contains(" switchport trunk allowed vlan 1-5,7,8,10\n"));
    }

    #[test]
    fn test_unparsed_lines_come_before_shutdown() {
        let interface = parse(&["interface E0", " shutdown", " storm-control broadcast level 10"]);
        let text = render(&interface).unwrap();
        assert!(text.ends_with(" storm-control broadcast level 10\n shutdown\n!\n"));
    }

    #[test]
    fn test_round_trip_switchports() {
        let cases: &[&[&str]] = &[
            &["interface E0"],
            &["interface E0", " switchport mode trunk", " switchport trunk allowed vlan none"],
            &["interface E0", " switchport mode trunk", " switchport trunk allowed vlan all"],
            &[
                "interface GigabitEthernet0/16",
                " switchport access vlan 820",
                " switchport mode dynamic desirable",
                " spanning-tree portfast",
            ],
            &[
                "interface E1",
                " switchport mode trunk",
                " switchport trunk native vlan 99",
                " switchport trunk allowed vlan 10,20,30-40",
                " switchport trunk allowed vlan add 50",
                " spanning-tree portfast trunk",
                " switchport voice vlan 5",
            ],
        ];

        for case in cases {
            let (first, second) = round_trip(case);
            assert!(first.same_config(&second), "round trip changed {:?}", case);
        }
    }

    #[test]
    fn test_round_trip_layer3() {
        let (first, second) = round_trip(&[
            "interface Vlan10",
            " vrf forwarding USERS",
            " ip address 10.0.10.2 255.255.255.0",
            " ip address 10.0.11.2 255.255.255.0 secondary",
            " standby version 2",
            " standby ip 10.0.10.1",
            " standby ip 10.0.11.1 secondary",
            " standby 3 ip",
            " standby 3 priority 120",
            " standby 3 preempt",
            " ip helper-address 10.1.1.1",
        ]);
        assert!(first.same_config(&second));
        assert_eq!(second.unparsed_lines, vec!["ip helper-address 10.1.1.1".to_string()]);
    }

    #[test]
    fn test_round_trip_hsrp_version_without_groups() {
        let (first, second) = round_trip(&["interface Vlan30", " standby version 1"]);
        assert!(first.hsrp.is_some());
        assert_eq!(first.hsrp, second.hsrp);
        assert!(first.same_config(&second));
    }

    #[test]
    fn test_default_hsrp_version_omitted_with_groups() {
        let text = render(&parse(&["interface Vlan30", " standby 1 ip 10.0.30.1"])).unwrap();
        assert!(!text.contains("standby version"));
        assert!(text.contains(" standby 1 ip 10.0.30.1\n"));
    }

    #[test]
    fn test_round_trip_subinterface() {
        let (first, second) = round_trip(&[
            "interface GigabitEthernet0/0.20",
            " encapsulation dot1Q 20 native",
            " ip address 192.168.20.1 255.255.255.0",
        ]);
        assert!(first.same_config(&second));
        assert_eq!(second.encapsulation.map(|e| e.native), Some(true));
    }
}
