// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time formatting and parsing.

use chrono::{DateTime, SecondsFormat, Utc};

/// Format a UTC timestamp as RFC3339 with millisecond precision.
///
/// Used for the `start` watermark so sub-second `updated_at` values survive.
pub fn format_utc_rfc3339_millis(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse an ISO-8601 timestamp with an explicit offset into UTC.
pub fn parse_utc(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_utc_normalizes_offset() {
        let parsed = parse_utc("2024-06-15T12:00:00+02:00").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 6, 15, 10, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_utc_rejects_garbage() {
        assert!(parse_utc("yesterday").is_none());
        assert!(parse_utc("2024-06-15").is_none());
    }

    #[test]
    fn test_format_millis() {
        let date = Utc.with_ymd_and_hms(2024, 6, 15, 10, 0, 0).unwrap();
        assert_eq!(format_utc_rfc3339_millis(date), "2024-06-15T10:00:00.000Z");
        let fractional = Utc.timestamp_millis_opt(1_718_445_600_123).unwrap();
        assert_eq!(format_utc_rfc3339_millis(fractional), "2024-06-15T10:00:00.123Z");
    }
}
