// Timestamp parsing and formatting for the command line
//
// Timestamps are epoch milliseconds; 0 means unset.

use crate::record::TIME_UNSET;
use chrono::{DateTime, Local, LocalResult, NaiveDate, NaiveDateTime, TimeZone};
use eyre::{Result, eyre};

const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M"];
const DATE_FORMAT: &str = "%Y-%m-%d";
const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Parse a user-supplied time into epoch milliseconds.
///
/// Accepts RFC 3339, `YYYY-MM-DD HH:MM` and `YYYY-MM-DD` in local time, or a
/// raw millisecond count. `none`, `0` and the empty string mean unset.
pub fn parse_time(input: &str) -> Result<i64> {
    let input = input.trim();
    if input.is_empty() || input.eq_ignore_ascii_case("none") {
        return Ok(TIME_UNSET);
    }

    if let Ok(ms) = input.parse::<i64>() {
        return Ok(ms);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt.timestamp_millis());
    }

    for format in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, format) {
            return local_millis(naive, input);
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(input, DATE_FORMAT) {
        let naive = date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| eyre!("Invalid date: {}", input))?;
        return local_millis(naive, input);
    }

    Err(eyre!(
        "Unrecognised time: {} (use YYYY-MM-DD [HH:MM], RFC 3339 or epoch milliseconds)",
        input
    ))
}

/// Render a timestamp for display; unset renders as `-`
pub fn format_time(ms: i64) -> String {
    if ms == TIME_UNSET {
        return "-".to_string();
    }
    match Local.timestamp_millis_opt(ms) {
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt.format(DISPLAY_FORMAT).to_string(),
        LocalResult::None => ms.to_string(),
    }
}

fn local_millis(naive: NaiveDateTime, input: &str) -> Result<i64> {
    match Local.from_local_datetime(&naive) {
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => Ok(dt.timestamp_millis()),
        LocalResult::None => Err(eyre!("Time does not exist in the local time zone: {}", input)),
    }
}
