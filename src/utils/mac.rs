//! MAC address normalisation.

use mac_address::MacAddress;

/// Parse a MAC address written as `aabb.ccdd.eeff`, `aa:bb:cc:dd:ee:ff`,
/// `aa-bb-cc-dd-ee-ff` or as twelve bare hex digits.
///
/// ```
/// use fabricmap::utils::mac::parse_mac;
///
/// let mac = parse_mac("0011.2233.44ff").unwrap();
/// assert_eq!(mac, parse_mac("00:11:22:33:44:FF").unwrap());
/// assert!(parse_mac("0011.2233").is_none());
/// ```
pub fn parse_mac(value: &str) -> Option<MacAddress> {
    let digits: String = value
        .trim()
        .chars()
        .filter(|c| !matches!(c, '.' | ':' | '-'))
        .collect();

    if digits.len() != 12 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    let mut bytes = [0u8; 6];
    for (i, byte) in bytes.iter_mut().enumerate() {
        *byte = u8::from_str_radix(&digits[i * 2..i * 2 + 2], 16).ok()?;
    }
    Some(MacAddress::new(bytes))
}
