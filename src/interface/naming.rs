//! Interface name helpers.
//!
//! Command outputs abbreviate interface names (`Gi1/0/1`) while the running
//! configuration spells them out (`GigabitEthernet1/0/1`). These helpers
//! normalise names so rows from different commands land on the same port.

/// Abbreviation to full name. Longer prefixes first so `Twe` wins over `T*`.
const ABBREVIATIONS: &[(&str, &str)] = &[
    ("Twe", "TwentyFiveGigE"),
    ("Fa", "FastEthernet"),
    ("Gi", "GigabitEthernet"),
    ("Te", "TenGigabitEthernet"),
    ("Po", "Port-channel"),
];

/// Expand an abbreviated interface name.
///
/// Only expands when the abbreviation is immediately followed by a digit,
/// so names that are already complete are returned unchanged.
///
/// ```
/// use fabricmap::interface::naming::expand_interface_name;
///
/// assert_eq!(expand_interface_name("Gi1/0/1"), "GigabitEthernet1/0/1");
/// assert_eq!(expand_interface_name("GigabitEthernet1/0/1"), "GigabitEthernet1/0/1");
/// assert_eq!(expand_interface_name("Po10"), "Port-channel10");
/// ```
pub fn expand_interface_name(name: &str) -> String {
    let name = name.trim();
    for (short, long) in ABBREVIATIONS {
        if let Some(rest) = name.strip_prefix(short) {
            if rest.chars().next().is_some_and(|c| c.is_ascii_digit()) {
                return format!("{}{}", long, rest);
            }
        }
    }
    name.to_string()
}

/// Physical port keys stay below this, port-channels start at it
const PORT_CHANNEL_BASE: u64 = 10_000_000_000_000_000_000;
/// Digits a physical port key may use
const PHYSICAL_KEY_DIGITS: usize = 19;

/// Numeric key ordering interfaces the way an operator reads them.
///
/// Physical ports sort by slot/port/subinterface, port-channels sort after
/// all physical ports. Other interface kinds have no natural order.
pub fn sort_order(name: &str) -> Option<u64> {
    if let Some(id) = name.strip_prefix("Port-channel") {
        return id.parse::<u64>().ok().and_then(|id| PORT_CHANNEL_BASE.checked_add(id));
    }

    let (_, port_id) = name.split_once("Ethernet")?;
    let mut numbers: Vec<&str> = port_id.split('/').collect();
    let last = numbers.pop()?;
    let (last_port, subinterface) = last.split_once('.').unwrap_or((last, "0"));

    let mut key = String::new();
    for number in numbers {
        key.push_str(&format!("{:0>3}", number));
    }
    key.push_str(&format!("{:0>3}", last_port));
    key.push_str(&format!("{:0>4}", subinterface));

    if key.len() > PHYSICAL_KEY_DIGITS {
        return None;
    }
    key.parse().ok()
}
