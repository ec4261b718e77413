//! Duration and timestamp formatting for console output.

use chrono::{DateTime, Duration, Local};

/// Formats seconds as `H:MM:SS`. Negative values show as zero.
///
/// ```rust
/// use respite::libs::formatter::format_secs;
///
/// assert_eq!(format_secs(3725), "1:02:05");
/// assert_eq!(format_secs(59), "0:00:59");
/// assert_eq!(format_secs(-5), "0:00:00");
/// ```
pub fn format_secs(secs: i64) -> String {
    format_duration(&Duration::seconds(secs))
}

pub fn format_duration(duration: &Duration) -> String {
    let total = duration.num_seconds().max(0);
    format!("{}:{:02}:{:02}", total / 3600, (total / 60) % 60, total % 60)
}

/// Formats a Unix timestamp in local time, or `-` when it is out of range.
pub fn format_timestamp(secs: i64) -> String {
    match DateTime::from_timestamp(secs, 0) {
        Some(utc) => utc.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string(),
        None => "-".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations_pad_minutes_and_seconds() {
        assert_eq!(format_secs(0), "0:00:00");
        assert_eq!(format_secs(600), "0:10:00");
        assert_eq!(format_secs(14_400), "4:00:00");
        assert_eq!(format_duration(&Duration::minutes(-3)), "0:00:00");
    }
}
