//! Timestamp utilities
//!
//! Timestamps are stored as fixed-width RFC 3339 text with millisecond
//! precision (`2024-05-01T09:30:00.000Z`), so lexical order in SQLite equals
//! chronological order.

use chrono::{DateTime, NaiveDate, SecondsFormat, SubsecRound, Utc};

/// Get current UTC timestamp, truncated to milliseconds
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Canonical TEXT form for a stored timestamp
pub fn to_db(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a client-supplied timestamp
///
/// Accepts a full RFC 3339 value (any offset, converted to UTC) or a bare
/// `YYYY-MM-DD` date, which means midnight UTC.
pub fn parse_timestamp(input: &str) -> Option<DateTime<Utc>> {
    let input = input.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(input) {
        return Some(ts.with_timezone(&Utc).trunc_subsecs(3));
    }
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::time::Duration;

    #[test]
    fn test_now_returns_valid_timestamp() {
        let timestamp = now();
        // Should be a reasonable timestamp (after year 2000)
        assert!(timestamp.timestamp() > 946_684_800);
    }

    #[test]
    fn test_now_has_millisecond_precision() {
        let timestamp = now();
        assert_eq!(timestamp.timestamp_subsec_nanos() % 1_000_000, 0);
    }

    #[tokio::test]
    async fn test_now_successive_calls_advance() {
        let time1 = now();
        tokio::time::sleep(Duration::from_millis(10)).await;
        let time2 = now();
        assert!(time2 > time1);
    }

    #[test]
    fn test_to_db_is_fixed_width() {
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap();
        assert_eq!(to_db(&ts), "2024-05-01T09:30:00.000Z");
    }

    #[test]
    fn test_parse_timestamp_rfc3339_with_offset() {
        let ts = parse_timestamp("2024-05-01T11:30:00+02:00").unwrap();
        assert_eq!(to_db(&ts), "2024-05-01T09:30:00.000Z");
    }

    #[test]
    fn test_parse_timestamp_date_only() {
        let ts = parse_timestamp("2024-12-31").unwrap();
        assert_eq!(to_db(&ts), "2024-12-31T00:00:00.000Z");
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert!(parse_timestamp("next tuesday").is_none());
        assert!(parse_timestamp("2024-13-01").is_none());
    }
}
