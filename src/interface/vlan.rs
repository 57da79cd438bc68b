//! VLAN list handling.
//!
//! Trunk allowed-VLAN lists are written as comma separated ids and ranges
//! (`1,2,3-5`). This file expands them into sets and compresses sets back
//! into the same notation for rendering.

use std::collections::BTreeSet;

/// Lowest legal 802.1Q VLAN id
pub const MIN_VLAN: u16 = 1;
/// Highest legal 802.1Q VLAN id
pub const MAX_VLAN: u16 = 4094;
/// Number of VLANs in the full legal range
pub const VLAN_COUNT: usize = (MAX_VLAN - MIN_VLAN + 1) as usize;

/// Every legal VLAN id, the implicit allowed list of a trunk
pub fn full_range() -> BTreeSet<u16> {
    (MIN_VLAN..=MAX_VLAN).collect()
}

/// Expand a VLAN list such as `1,2,3-5` into `{1, 2, 3, 4, 5}`.
///
/// Returns `None` if any element is not a number, a range is reversed,
/// or an id falls outside 1-4094.
pub fn expand_vlan_list(list: &str) -> Option<BTreeSet<u16>> {
    let mut out = BTreeSet::new();

    for element in list.split(',') {
        let element = element.trim();
        if element.is_empty() {
            continue;
        }

        if let Some((begin, end)) = element.split_once('-') {
            let begin: u16 = begin.trim().parse().ok()?;
            let end: u16 = end.trim().parse().ok()?;
            if begin > end || !is_legal(begin) || !is_legal(end) {
                return None;
            }
            out.extend(begin..=end);
        } else {
            let vlan: u16 = element.parse().ok()?;
            if !is_legal(vlan) {
                return None;
            }
            out.insert(vlan);
        }
    }

    Some(out)
}

/// Compress a VLAN set into list notation, collapsing consecutive runs
/// of three or more ids into ranges
pub fn compress_vlan_list(vlans: &BTreeSet<u16>) -> String {
    let mut parts: Vec<String> = Vec::new();
    let mut iter = vlans.iter().copied().peekable();

    while let Some(start) = iter.next() {
        let mut end = start;
        while let Some(&next) = iter.peek() {
            if next == end + 1 {
                end = next;
                iter.next();
            } else {
                break;
            }
        }

        match end - start {
            0 => parts.push(start.to_string()),
            1 => {
                parts.push(start.to_string());
                parts.push(end.to_string());
            }
            _ => parts.push(format!("{}-{}", start, end)),
        }
    }

    parts.join(",")
}

/// True when an allowed list is equivalent to "allowed vlan all"
pub fn is_unrestricted(allowed: Option<&BTreeSet<u16>>) -> bool {
    allowed.map_or(true, |set| set.len() == VLAN_COUNT)
}

/// Compare two allowed-VLAN states, treating unset and the full range as equal
pub fn allowed_vlans_equivalent(a: Option<&BTreeSet<u16>>, b: Option<&BTreeSet<u16>>) -> bool {
    if is_unrestricted(a) && is_unrestricted(b) {
        return true;
    }
    a == b
}

fn is_legal(vlan: u16) -> bool {
    (MIN_VLAN..=MAX_VLAN).contains(&vlan)
}
