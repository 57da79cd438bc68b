//! Interface configuration parser.
//!
//! Each configuration line is tested against an ordered table of rules. The
//! first rule whose pattern matches and which accepts the line decides what
//! happens to it; a line no rule takes ends up in `unparsed_lines`.
//!
//! `switchport mode` is extracted before the main scan because vendors put it
//! either first or last in the block, and several rules depend on whether the
//! port is an access port or a trunk.

use std::collections::HashSet;
use std::net::Ipv4Addr;
use std::sync::LazyLock;

use ipnetwork::Ipv4Network;
use regex::{Captures, Regex};

use super::vlan::{expand_vlan_list, full_range};
use super::{AddressKind, Dot1q, Hsrp, Interface, Ipv4Address, SwitchportMode};

/// What a rule did with a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    /// Line fully represented in the structured fields
    Consumed,
    /// Rule matched and recorded data, but the line stays in `unparsed_lines`
    Retained,
    /// Pattern matched but the rule does not apply; try the next rule
    Declined,
}

type Apply = fn(&mut Interface, &Captures, &ParseContext) -> Outcome;

struct Rule {
    name: &'static str,
    pattern: Regex,
    apply: Apply,
}

impl Rule {
    fn new(name: &'static str, pattern: &str, apply: Apply) -> Self {
        Self {
            name,
            pattern: Regex::new(pattern).unwrap_or_else(|e| panic!("Invalid {} regex: {}", name, e)),
            apply,
        }
    }
}

static SWITCHPORT_MODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^switchport mode (.+)$").expect("Invalid switchport_mode regex"));

/// Parsing rules in priority order
static RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    vec![
        Rule::new("name", r"^interface\s+(\S+)", apply_name),
        Rule::new("description", r"^description (.*)$", apply_description),
        Rule::new("channel_group", r"^channel-group (\d+) mode (\w+)", apply_channel_group),
        Rule::new("access_vlan", r"^switchport access vlan (\d+)$", apply_access_vlan),
        Rule::new("voice_vlan", r"^switchport voice vlan (\d+)$", apply_voice_vlan),
        Rule::new("trunk_native_vlan", r"^switchport trunk native vlan (\d+)$", apply_trunk_native),
        Rule::new("trunk_allowed_keyword", r"^switchport trunk allowed vlan (all|none)$", apply_allowed_keyword),
        Rule::new("trunk_allowed", r"^switchport trunk allowed vlan ([0-9,\-]+)$", apply_allowed),
        Rule::new("trunk_allowed_add", r"^switchport trunk allowed vlan add ([0-9,\-]+)$", apply_allowed_add),
        Rule::new("dot1q", r"^encapsulation dot1[qQ] (\d+)( native)?$", apply_dot1q),
        Rule::new("portfast", r"^spanning-tree portfast(?:\s+(.*))?$", apply_portfast),
        Rule::new("bpduguard", r"^spanning-tree bpduguard(?:\s+(\S+))?$", apply_bpduguard),
        Rule::new("shutdown", r"^(no\s+)?shutdown$", apply_shutdown),
        Rule::new("legacy_trunk_encapsulation", r"^switchport trunk encapsulation", apply_discard),
        Rule::new("vrf", r"^(?:ip )?vrf forwarding (\S+)$", apply_vrf),
        Rule::new(
            "ipv4_address",
            r"^ip address (\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}) (\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3})(?:\s+(secondary))?$",
            apply_ipv4,
        ),
        Rule::new(
            "hsrp",
            r"^standby(?:\s+(\d{1,4}))?\s+(ip|priority|preempt|version)(?:\s+(\S+))?(?:\s+(secondary))?$",
            apply_hsrp,
        ),
    ]
});

/// Information about the device an interface belongs to.
///
/// Port-channel membership can only be linked when the aggregate interface
/// is already known, so the device passes the names of its interfaces.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParseContext<'a> {
    siblings: Option<&'a HashSet<String>>,
}

impl<'a> ParseContext<'a> {
    /// Parse an interface on its own
    pub fn standalone() -> Self {
        Self { siblings: None }
    }

    /// Parse an interface that lives next to the named interfaces
    pub fn with_siblings(siblings: &'a HashSet<String>) -> Self {
        Self {
            siblings: Some(siblings),
        }
    }

    fn port_channel(&self, id: &str) -> Option<String> {
        let wanted = format!("port-channel{}", id);
        self.siblings?
            .iter()
            .find(|name| name.to_lowercase() == wanted)
            .cloned()
    }
}

/// Parse an interface configuration block without device context
pub fn parse<S: AsRef<str>>(lines: &[S]) -> Interface {
    parse_with(lines, ParseContext::standalone())
}

/// Parse an interface configuration block given as one string
pub fn parse_str(text: &str) -> Interface {
    let lines: Vec<&str> = text.lines().collect();
    parse(&lines)
}

/// Parse an interface configuration block
pub fn parse_with<S: AsRef<str>>(lines: &[S], context: ParseContext<'_>) -> Interface {
    let config: Vec<String> = lines
        .iter()
        .flat_map(|chunk| chunk.as_ref().lines())
        .map(|line| line.trim_end().to_string())
        .collect();

    let mut interface = Interface {
        unparsed_lines: config.iter().map(|line| line.trim().to_string()).collect(),
        config,
        ..Default::default()
    };

    extract_switchport_mode(&mut interface);
    dispatch(&mut interface, &context);
    interface
}

/// Run the rules again over the lines a previous pass left unparsed.
///
/// Used once sibling interfaces are known, so `channel-group` lines whose
/// port-channel did not exist yet can be linked now.
pub fn reparse(interface: &mut Interface, context: ParseContext<'_>) {
    dispatch(interface, &context);
}

fn extract_switchport_mode(interface: &mut Interface) {
    let mut mode = None;
    interface.unparsed_lines.retain(|line| match SWITCHPORT_MODE.captures(line) {
        Some(caps) => {
            mode = Some(SwitchportMode::from_config(&caps[1]));
            false
        }
        None => true,
    });

    if let Some(mode) = mode {
        if mode == SwitchportMode::Trunk && interface.allowed_vlan.is_none() {
            interface.allowed_vlan = Some(full_range());
        }
        interface.mode = mode;
    }
}

fn dispatch(interface: &mut Interface, context: &ParseContext<'_>) {
    let pending = std::mem::take(&mut interface.unparsed_lines);

    for line in pending {
        let clean = line.trim();
        if clean.is_empty() || clean == "!" {
            continue;
        }

        let mut keep = true;
        for rule in RULES.iter() {
            let Some(caps) = rule.pattern.captures(clean) else {
                continue;
            };

            match (rule.apply)(interface, &caps, context) {
                Outcome::Consumed => {
                    log::trace!("{}: '{}' handled by {}", interface.name(), clean, rule.name);
                    keep = false;
                    break;
                }
                Outcome::Retained => break,
                Outcome::Declined => continue,
            }
        }

        if keep {
            interface.unparsed_lines.push(clean.to_string());
        }
    }
}

fn apply_name(interface: &mut Interface, caps: &Captures, _: &ParseContext) -> Outcome {
    let name = caps[1].to_string();

    let lower = name.to_lowercase();
    if lower.contains("vlan") {
        interface.routed_port = true;
        interface.mode = SwitchportMode::Access;
        if let Ok(vlan) = lower.replace("vlan", "").parse::<u16>() {
            interface.native_vlan = vlan;
        }
    }

    interface.name = Some(name);
    Outcome::Consumed
}

fn apply_description(interface: &mut Interface, caps: &Captures, _: &ParseContext) -> Outcome {
    interface.description = caps[1].to_string();
    Outcome::Consumed
}

fn apply_channel_group(interface: &mut Interface, caps: &Captures, context: &ParseContext) -> Outcome {
    let Ok(group) = caps[1].parse::<u32>() else {
        return Outcome::Declined;
    };
    interface.channel_group = Some(group);
    interface.channel_protocol = Some(caps[2].to_string());

    match context.port_channel(&caps[1]) {
        Some(parent) => {
            interface.parent_interface = Some(parent);
            Outcome::Consumed
        }
        None => Outcome::Retained,
    }
}

fn apply_access_vlan(interface: &mut Interface, caps: &Captures, _: &ParseContext) -> Outcome {
    if interface.is_trunk() {
        return Outcome::Declined;
    }
    match caps[1].parse() {
        Ok(vlan) => {
            interface.native_vlan = vlan;
            Outcome::Consumed
        }
        Err(_) => Outcome::Declined,
    }
}

fn apply_voice_vlan(interface: &mut Interface, caps: &Captures, _: &ParseContext) -> Outcome {
    if interface.mode != SwitchportMode::Access {
        return Outcome::Declined;
    }
    match caps[1].parse() {
        Ok(vlan) => {
            interface.voice_vlan = Some(vlan);
            Outcome::Consumed
        }
        Err(_) => Outcome::Declined,
    }
}

fn apply_trunk_native(interface: &mut Interface, caps: &Captures, _: &ParseContext) -> Outcome {
    if !interface.is_trunk() {
        return Outcome::Declined;
    }
    match caps[1].parse() {
        Ok(vlan) => {
            interface.native_vlan = vlan;
            Outcome::Consumed
        }
        Err(_) => Outcome::Declined,
    }
}

fn apply_allowed_keyword(interface: &mut Interface, caps: &Captures, _: &ParseContext) -> Outcome {
    if !interface.is_trunk() {
        return Outcome::Declined;
    }
    interface.allowed_vlan = Some(match &caps[1] {
        "all" => full_range(),
        _ => Default::default(),
    });
    Outcome::Consumed
}

fn apply_allowed(interface: &mut Interface, caps: &Captures, _: &ParseContext) -> Outcome {
    if !interface.is_trunk() {
        return Outcome::Declined;
    }
    match expand_vlan_list(&caps[1]) {
        Some(vlans) => {
            interface.allowed_vlan = Some(vlans);
            Outcome::Consumed
        }
        None => Outcome::Declined,
    }
}

fn apply_allowed_add(interface: &mut Interface, caps: &Captures, _: &ParseContext) -> Outcome {
    if !interface.is_trunk() {
        return Outcome::Declined;
    }
    match expand_vlan_list(&caps[1]) {
        Some(vlans) => {
            interface.allowed_vlan.get_or_insert_with(Default::default).extend(vlans);
            Outcome::Consumed
        }
        None => Outcome::Declined,
    }
}

fn apply_dot1q(interface: &mut Interface, caps: &Captures, _: &ParseContext) -> Outcome {
    let Ok(vlan) = caps[1].parse::<u16>() else {
        return Outcome::Declined;
    };
    interface.mode = SwitchportMode::Access;
    interface.routed_port = true;
    interface.native_vlan = vlan;
    interface.encapsulation = Some(Dot1q {
        vlan,
        native: caps.get(2).is_some(),
    });
    Outcome::Consumed
}

fn apply_portfast(interface: &mut Interface, caps: &Captures, _: &ParseContext) -> Outcome {
    let args = caps.get(1).map_or("", |m| m.as_str());
    if args.contains("disable") {
        interface.type_edge = false;
    } else if args.contains("trunk") {
        if interface.is_trunk() {
            interface.type_edge = true;
        }
    } else if interface.mode == SwitchportMode::Access {
        interface.type_edge = true;
    }
    Outcome::Consumed
}

fn apply_bpduguard(interface: &mut Interface, caps: &Captures, _: &ParseContext) -> Outcome {
    interface.bpduguard = caps.get(1).map_or(true, |m| m.as_str() != "disable");
    Outcome::Consumed
}

fn apply_shutdown(interface: &mut Interface, caps: &Captures, _: &ParseContext) -> Outcome {
    interface.is_enabled = caps.get(1).is_some();
    log::trace!("{}: is_enabled = {}", interface.name(), interface.is_enabled);
    Outcome::Consumed
}

fn apply_discard(_: &mut Interface, _: &Captures, _: &ParseContext) -> Outcome {
    Outcome::Consumed
}

fn apply_vrf(interface: &mut Interface, caps: &Captures, _: &ParseContext) -> Outcome {
    interface.vrf = caps[1].to_string();
    Outcome::Consumed
}

fn apply_ipv4(interface: &mut Interface, caps: &Captures, _: &ParseContext) -> Outcome {
    let (Ok(address), Ok(netmask)) = (caps[1].parse::<Ipv4Addr>(), caps[2].parse::<Ipv4Addr>()) else {
        return Outcome::Declined;
    };
    let Ok(network) = Ipv4Network::with_netmask(address, netmask) else {
        return Outcome::Declined;
    };
    let kind = if caps.get(3).is_some() {
        AddressKind::Secondary
    } else {
        AddressKind::Primary
    };

    match interface.ipv4.iter_mut().find(|a| a.network == network) {
        Some(existing) => existing.kind = kind,
        None => interface.ipv4.push(Ipv4Address { network, kind }),
    }
    interface.routed_port = true;
    Outcome::Consumed
}

fn apply_hsrp(interface: &mut Interface, caps: &Captures, _: &ParseContext) -> Outcome {
    let group_id: u16 = match caps.get(1) {
        Some(m) => match m.as_str().parse() {
            Ok(id) => id,
            Err(_) => return Outcome::Declined,
        },
        None => 0,
    };
    let argument = caps.get(3).map(|m| m.as_str());
    let secondary = caps.get(4).is_some();

    // Validate before touching the model so a declined line leaves no trace
    let parsed = match (&caps[2], argument) {
        ("version", Some(arg)) => arg.parse::<u8>().ok().map(HsrpCommand::Version),
        ("ip", Some(arg)) => arg.parse::<Ipv4Addr>().ok().map(|ip| HsrpCommand::Ip(Some(ip), secondary)),
        ("ip", None) if !secondary => Some(HsrpCommand::Ip(None, false)),
        ("priority", Some(arg)) if !secondary => arg.parse::<u16>().ok().map(HsrpCommand::Priority),
        ("preempt", None) if !secondary => Some(HsrpCommand::Preempt),
        _ => None,
    };
    let Some(command) = parsed else {
        return Outcome::Declined;
    };

    let hsrp = interface.hsrp.get_or_insert_with(Hsrp::default);
    if let HsrpCommand::Version(version) = command {
        hsrp.version = version;
        return Outcome::Consumed;
    }

    let group = hsrp.groups.entry(group_id).or_default();
    match command {
        HsrpCommand::Ip(Some(ip), true) => group.secondary.push(ip),
        HsrpCommand::Ip(address, _) => group.address = address,
        HsrpCommand::Priority(priority) => group.priority = priority,
        HsrpCommand::Preempt => group.preempt = true,
        HsrpCommand::Version(_) => {}
    }
    Outcome::Consumed
}

enum HsrpCommand {
    Version(u8),
    Ip(Option<Ipv4Addr>, bool),
    Priority(u16),
    Preempt,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::vlan::VLAN_COUNT;
    use std::collections::BTreeSet;

    #[test]
    fn test_empty_config() {
        let interface = parse(&["interface GigabitEthernet1/0/1\n"]);

        assert_eq!(interface.name(), "GigabitEthernet1/0/1");
        assert_eq!(interface.mode, SwitchportMode::Access);
        assert_eq!(interface.native_vlan, 1);
        assert_eq!(interface.voice_vlan, None);
        assert_eq!(interface.description, "");
        assert!(!interface.bpduguard);
        assert!(!interface.type_edge);
        assert!(interface.is_enabled);
        assert!(interface.unparsed_lines.is_empty());
    }

    #[test]
    fn test_shutdown() {
        let interface = parse(&["interface E0\n", " shutdown"]);
        assert!(!interface.is_enabled);

        let interface = parse(&["interface E0", " shutdown", " no shutdown"]);
        assert!(interface.is_enabled);
    }

    #[test]
    fn test_unparsed_lines() {
        let interface = parse(&["interface E0\n", " switchport mode access\n", " antani mascetti perozzi"]);
        assert_eq!(interface.unparsed_lines, vec!["antani mascetti perozzi".to_string()]);
    }

    #[test]
    fn test_mode_found_after_dependent_lines() {
        let interface = parse(&[
            "interface GigabitEthernet0/16",
            "description [Direct] SD-WAN",
            "switchport trunk native vlan 30",
            "switchport mode trunk",
        ]);
        assert!(interface.is_trunk());
        assert_eq!(interface.native_vlan, 30);
    }

    #[test]
    fn test_dynamic_desirable() {
        let interface = parse(&[
            "interface GigabitEthernet0/16\n",
            "description [Direct] SD-WAN\n",
            "switchport access vlan 820\n",
            "switchport mode dynamic desirable\n",
            "spanning-tree portfast\n",
        ]);

        assert_eq!(interface.mode, SwitchportMode::Other("dynamic desirable".to_string()));
        assert_eq!(interface.native_vlan, 820);
        assert_eq!(interface.description, "[Direct] SD-WAN");
    }

    #[test]
    fn test_access_ignores_trunk_native() {
        let interface = parse(&["interface E0", " switchport mode access", " switchport trunk native vlan 3"]);
        assert_eq!(interface.native_vlan, 1);
        assert_eq!(interface.unparsed_lines, vec!["switchport trunk native vlan 3".to_string()]);
    }

    #[test]
    fn test_trunk_ignores_access_vlan() {
        let interface = parse(&["interface E0", " switchport mode trunk", " switchport access vlan 3"]);
        assert_eq!(interface.native_vlan, 1);
        assert_eq!(interface.unparsed_lines, vec!["switchport access vlan 3".to_string()]);
    }

    #[test]
    fn test_portfast() {
        let interface = parse(&["interface E0", " switchport mode access", " spanning-tree portfast"]);
        assert!(interface.type_edge);

        let interface = parse(&["interface E0", " switchport mode access", " spanning-tree portfast trunk"]);
        assert!(!interface.type_edge);

        let interface = parse(&["interface E0", " switchport mode trunk", " spanning-tree portfast trunk"]);
        assert!(interface.type_edge);
    }

    #[test]
    fn test_voice_vlan() {
        let interface = parse(&["interface E0", " switchport mode access", " switchport voice vlan 150"]);
        assert_eq!(interface.native_vlan, 1);
        assert_eq!(interface.voice_vlan, Some(150));
    }

    #[test]
    fn test_bpduguard() {
        let interface = parse(&["interface E0", " spanning-tree bpduguard enable"]);
        assert!(interface.bpduguard);
    }

    #[test]
    fn test_trunk_defaults_to_all_vlans() {
        let interface = parse(&["interface E0", " switchport mode trunk"]);
        assert!(interface.is_trunk());
        assert_eq!(interface.native_vlan, 1);
        assert_eq!(interface.allowed_vlan.as_ref().map(|v| v.len()), Some(VLAN_COUNT));
    }

    #[test]
    fn test_trunk_allowed_and_add() {
        let interface = parse(&[
            "interface E0",
            " switchport mode trunk",
            " switchport trunk allowed vlan 1,2,3-5",
            " switchport trunk allowed vlan add 7,8-10",
            " switchport trunk allowed vlan add 12",
        ]);
        assert_eq!(
            interface.allowed_vlan,
            Some(BTreeSet::from([1, 2, 3, 4, 5, 7, 8, 9, 10, 12]))
        );
    }

    #[test]
    fn test_trunk_allowed_none() {
        let interface = parse(&["interface E0", " switchport mode trunk", " switchport trunk allowed vlan none"]);
        assert_eq!(interface.allowed_vlan, Some(BTreeSet::new()));
    }

    #[test]
    fn test_vlan_interface_is_routed() {
        let interface = parse(&[
            "interface Vlan100",
            " ip address 10.0.0.1 255.255.255.0",
            " ip address 10.0.1.1 255.255.255.0 secondary",
        ]);
        assert!(interface.routed_port);
        assert_eq!(interface.native_vlan, 100);
        assert_eq!(interface.ipv4.len(), 2);
        assert_eq!(interface.ipv4[0].kind, AddressKind::Primary);
        assert_eq!(interface.ipv4[0].network.prefix(), 24);
        assert_eq!(interface.ipv4[1].kind, AddressKind::Secondary);
    }

    #[test]
    fn test_dot1q_subinterface() {
        let interface = parse(&["interface GigabitEthernet0/0.20", " encapsulation dot1Q 20"]);
        assert!(interface.routed_port);
        assert_eq!(interface.native_vlan, 20);
        assert_eq!(interface.encapsulation, Some(Dot1q { vlan: 20, native: false }));
    }

    #[test]
    fn test_vrf_and_legacy_lines() {
        let interface = parse(&[
            "interface GigabitEthernet0/1",
            " vrf forwarding MGMT",
            " switchport trunk encapsulation dot1q",
            "!",
        ]);
        assert_eq!(interface.vrf, "MGMT");
        assert!(interface.unparsed_lines.is_empty());
    }

    #[test]
    fn test_hsrp() {
        let interface = parse(&[
            "interface Vlan10",
            " ip address 10.0.10.2 255.255.255.0",
            " standby version 2",
            " standby ip 10.0.10.1",
            " standby ip 10.0.11.1 secondary",
            " standby ip 10.0.12.1 secondary",
            " standby 5 ip 10.0.20.1",
            " standby 5 priority 110",
            " standby 5 preempt",
            " standby 5 timers 1 3",
        ]);

        let hsrp = interface.hsrp.as_ref().unwrap();
        assert_eq!(hsrp.version, 2);

        let default_group = &hsrp.groups[&0];
        assert_eq!(default_group.address, Some(Ipv4Addr::new(10, 0, 10, 1)));
        assert_eq!(default_group.priority, 100);
        assert!(!default_group.preempt);
        assert_eq!(
            default_group.secondary,
            vec![Ipv4Addr::new(10, 0, 11, 1), Ipv4Addr::new(10, 0, 12, 1)]
        );

        let group = &hsrp.groups[&5];
        assert_eq!(group.priority, 110);
        assert!(group.preempt);
        assert_eq!(interface.unparsed_lines, vec!["standby 5 timers 1 3".to_string()]);
    }

    #[test]
    fn test_channel_group_without_parent_is_kept() {
        let interface = parse(&["interface GigabitEthernet0/1", " channel-group 1 mode active"]);
        assert_eq!(interface.channel_group, Some(1));
        assert_eq!(interface.channel_protocol.as_deref(), Some("active"));
        assert!(interface.parent_interface.is_none());
        assert_eq!(interface.unparsed_lines, vec!["channel-group 1 mode active".to_string()]);
    }

    #[test]
    fn test_channel_group_links_to_sibling() {
        let siblings = HashSet::from(["Port-channel1".to_string()]);
        let mut interface = parse(&["interface GigabitEthernet0/1", " channel-group 1 mode active"]);

        reparse(&mut interface, ParseContext::with_siblings(&siblings));
        assert_eq!(interface.parent_interface.as_deref(), Some("Port-channel1"));
        assert!(interface.unparsed_lines.is_empty());
    }
}
