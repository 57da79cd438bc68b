//! Operational status from `show interface`.

use chrono::{DateTime, Local};
use log::warn;

use super::Interface;
use crate::session::InterfaceStatusRow;
use crate::utils::duration::timer_to_datetime;

/// Apply one `show interface` row to an interface.
///
/// Relative timers are converted to timestamps measured back from
/// `reference`, the time the device was harvested.
pub fn apply_status(interface: &mut Interface, row: &InterfaceStatusRow, reference: DateTime<Local>) {
    if !row.link_status.is_empty() {
        interface.is_enabled = !row.link_status.contains("administratively");
    }
    if !row.protocol_status.is_empty() {
        interface.is_up = row.protocol_status.contains("up");
        interface.status.protocol_status = Some(row.protocol_status.clone());
    }

    let status = &mut interface.status;
    status.hardware_type = row.hardware_type.clone().or(status.hardware_type.take());
    status.mtu = row.mtu.or(status.mtu);
    status.speed = row.speed.clone().or(status.speed.take());
    status.duplex = row.duplex.clone().or(status.duplex.take());

    let timers = [
        ("last_input", &row.last_input, &mut status.last_input),
        ("last_output", &row.last_output, &mut status.last_output),
        ("last_clearing", &row.last_clearing, &mut status.last_clearing),
    ];
    for (field, value, slot) in timers {
        match timer_to_datetime(reference, value) {
            Ok(at) => *slot = Some(at),
            Err(e) => warn!("{}: ignoring {}: {}", row.name, field, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::duration::epoch;
    use chrono::TimeDelta;

    fn row(link: &str, protocol: &str) -> InterfaceStatusRow {
        InterfaceStatusRow {
            name: "GigabitEthernet0/1".to_string(),
            link_status: link.to_string(),
            protocol_status: protocol.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_admin_down() {
        let mut interface = Interface::new("GigabitEthernet0/1");
        apply_status(&mut interface, &row("administratively down", "down"), Local::now());
        assert!(!interface.is_enabled);
        assert!(!interface.is_up);
        assert_eq!(interface.status.protocol_status.as_deref(), Some("down"));
    }

    #[test]
    fn test_up_with_timers() {
        let reference = Local::now();
        let mut interface = Interface::new("GigabitEthernet0/1");
        let status = InterfaceStatusRow {
            mtu: Some(1500),
            speed: Some("1000Mb/s".to_string()),
            last_input: "00:00:05".to_string(),
            last_output: "never".to_string(),
            last_clearing: "1y2w".to_string(),
            ..row("up", "up (connected)")
        };

        apply_status(&mut interface, &status, reference);

        assert!(interface.is_enabled);
        assert!(interface.is_up);
        assert_eq!(interface.status.mtu, Some(1500));
        assert_eq!(interface.status.last_input, Some(reference - TimeDelta::seconds(5)));
        assert_eq!(interface.status.last_output, Some(epoch()));
        assert_eq!(
            interface.status.last_clearing,
            Some(reference - TimeDelta::weeks(56))
        );
    }

    #[test]
    fn test_bad_timer_left_unset() {
        let mut interface = Interface::new("GigabitEthernet0/1");
        let status = InterfaceStatusRow {
            last_input: "whenever".to_string(),
            ..row("up", "up")
        };
        apply_status(&mut interface, &status, Local::now());
        assert_eq!(interface.status.last_input, None);
    }
}
