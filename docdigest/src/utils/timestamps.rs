//! Timestamp utilities.

use chrono::{DateTime, SecondsFormat, Utc};
use std::time::Duration;

/// Represents a timestamp that can be serialized/deserialized.
pub type Timestamp = DateTime<Utc>;

/// Returns the current UTC timestamp.
#[must_use]
pub fn now_utc() -> Timestamp {
    Utc::now()
}

/// Formats a timestamp for the status cells: RFC 3339, second precision, `Z` suffix.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use docdigest::utils::format_status_timestamp;
///
/// let ts = Utc.with_ymd_and_hms(2026, 10, 16, 9, 30, 0).unwrap();
/// assert_eq!(format_status_timestamp(&ts), "2026-10-16T09:30:00Z");
/// ```
#[must_use]
pub fn format_status_timestamp(ts: &Timestamp) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parses a `Retry-After` header value given in delta-seconds.
///
/// HTTP-date values are not used by the generation service and yield `None`.
#[must_use]
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_status_timestamp() {
        let ts = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(format_status_timestamp(&ts), "2026-01-02T03:04:05Z");
    }

    #[test]
    fn test_parse_retry_after_seconds() {
        assert_eq!(parse_retry_after("30"), Some(Duration::from_secs(30)));
        assert_eq!(parse_retry_after(" 7 "), Some(Duration::from_secs(7)));
    }

    #[test]
    fn test_parse_retry_after_http_date_ignored() {
        assert_eq!(parse_retry_after("Wed, 21 Oct 2015 07:28:00 GMT"), None);
        assert_eq!(parse_retry_after(""), None);
    }

    #[test]
    fn test_now_utc_is_recent() {
        let before = Utc::now();
        let now = now_utc();
        assert!(now >= before);
    }
}
