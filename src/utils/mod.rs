//! Shared utilities: relative timer parsing and MAC address normalisation.

pub mod duration;
pub mod mac;

pub use duration::{parse_timer_to_seconds, timer_to_datetime};
pub use mac::parse_mac;
