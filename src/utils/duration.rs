//! Relative timer parsing.
//!
//! Switches report counters such as "last input" as time elapsed since the
//! event, in a format whose resolution shrinks as the interval grows:
//! "00:00:01", "3d05h", "24w2d", "2y34w" or "never".

use chrono::{DateTime, Local, TimeZone, TimeDelta};

const MINUTE: u64 = 60;
const HOUR: u64 = 60 * MINUTE;
const DAY: u64 = 24 * HOUR;
const WEEK: u64 = 7 * DAY;
/// Weeks counted per year in the switch's year/week timer format
const WEEKS_PER_YEAR: u64 = 54;
const YEAR: u64 = WEEKS_PER_YEAR * WEEK;

/// Parse a relative timer into seconds.
///
/// Returns `Ok(None)` for "never" or an empty value.
///
/// # Examples
/// ```
/// use fabricmap::utils::duration::parse_timer_to_seconds;
///
/// assert_eq!(parse_timer_to_seconds("00:01:05"), Ok(Some(65)));
/// assert_eq!(parse_timer_to_seconds("1d02h"), Ok(Some(93600)));
/// assert_eq!(parse_timer_to_seconds("never"), Ok(None));
/// assert!(parse_timer_to_seconds("soon").is_err());
/// ```
pub fn parse_timer_to_seconds(timer: &str) -> Result<Option<u64>, String> {
    let timer = timer.trim();
    if timer.is_empty() || timer == "never" {
        return Ok(None);
    }

    let invalid = || format!("Invalid timer format: {}", timer);
    let number = |s: &str| s.parse::<u64>().map_err(|_| invalid());
    let total = |terms: &[(u64, u64)]| {
        terms
            .iter()
            .try_fold(0u64, |sum, &(count, unit)| count.checked_mul(unit).and_then(|s| sum.checked_add(s)))
            .ok_or_else(|| format!("Timer out of range: {}", timer))
    };

    let seconds = if timer.contains(':') {
        let parts: Vec<&str> = timer.split(':').collect();
        let [hours, minutes, seconds] = parts.as_slice() else {
            return Err(invalid());
        };
        total(&[(number(hours)?, HOUR), (number(minutes)?, MINUTE), (number(seconds)?, 1)])?
    } else if let Some((years, weeks)) = timer.split_once('y') {
        let weeks = weeks.strip_suffix('w').unwrap_or(weeks);
        total(&[(number(years)?, YEAR), (number(weeks)?, WEEK)])?
    } else if timer.ends_with('h') {
        let (days, hours) = timer.split_once('d').ok_or_else(invalid)?;
        total(&[(number(days)?, DAY), (number(hours.trim_end_matches('h'))?, HOUR)])?
    } else if let Some((weeks, days)) = timer.split_once('w') {
        let days = days.strip_suffix('d').unwrap_or(days);
        total(&[(number(weeks)?, WEEK), (number(days)?, DAY)])?
    } else {
        return Err(invalid());
    };

    Ok(Some(seconds))
}

/// Turn a relative timer into an absolute timestamp measured back from
/// `reference`. "never" maps to the Unix epoch.
pub fn timer_to_datetime(reference: DateTime<Local>, timer: &str) -> Result<DateTime<Local>, String> {
    match parse_timer_to_seconds(timer)? {
        Some(seconds) => i64::try_from(seconds)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .and_then(|elapsed| reference.checked_sub_signed(elapsed))
            .ok_or_else(|| format!("Timer out of range: {}", timer)),
        None => Ok(epoch()),
    }
}

/// The Unix epoch in local time
pub fn epoch() -> DateTime<Local> {
    Local.timestamp_opt(0, 0).single().unwrap_or_default()
}
