use fabricmap::device::Device;
use fabricmap::interface::{parse_str, render, SwitchportMode};

const RUNNING_CONFIG: &str = "\
hostname dist-1
!
interface Port-channel10
 description to core
 switchport trunk allowed vlan 10,20,30-40
 switchport mode trunk
!
interface GigabitEthernet1/0/1
 switchport trunk allowed vlan 10,20,30-40
 switchport mode trunk
 channel-group 10 mode active
!
interface GigabitEthernet1/0/2
 description printer
 switchport access vlan 20
 switchport mode access
 spanning-tree portfast
 spanning-tree bpduguard enable
 storm-control broadcast level 1.00
!
interface Vlan20
 ip address 10.20.0.2 255.255.255.0
 standby version 2
 standby 20 ip 10.20.0.1
 standby 20 priority 110
 standby 20 preempt
!
line vty 0 4
 transport input ssh
!
end
";

#[test]
fn test_running_config_round_trips_through_render() {
    let mut device = Device::with_hostname("dist-1", None);
    assert_eq!(device.parse_running_config(RUNNING_CONFIG).unwrap(), 4);

    let rendered = device.render_config().unwrap();
    let mut reparsed = Device::with_hostname("dist-1", None);
    assert_eq!(reparsed.parse_running_config(&rendered).unwrap(), 4);

    for interface in device.interfaces() {
        let again = reparsed.interface(interface.name()).unwrap();
        assert!(interface.same_config(again), "{} changed on round trip", interface.name());
    }
}

#[test]
fn test_port_channel_members_are_linked() {
    let mut device = Device::with_hostname("dist-1", None);
    device.parse_running_config(RUNNING_CONFIG).unwrap();

    let member = device.interface("GigabitEthernet1/0/1").unwrap();
    assert_eq!(member.parent_interface.as_deref(), Some("Port-channel10"));
    let channel = device.interface("Port-channel10").unwrap();
    assert_eq!(channel.child_interfaces, vec!["GigabitEthernet1/0/1".to_string()]);
}

#[test]
fn test_unknown_lines_survive_render() {
    let interface = parse_str(
        "interface GigabitEthernet1/0/2\n switchport mode access\n storm-control broadcast level 1.00\n shutdown\n",
    );
    assert_eq!(interface.mode, SwitchportMode::Access);
    assert!(!interface.is_enabled);

    let text = render(&interface).unwrap();
    let storm = text.find("storm-control").unwrap();
    let shutdown = text.find(" shutdown").unwrap();
    assert!(storm < shutdown);
}
