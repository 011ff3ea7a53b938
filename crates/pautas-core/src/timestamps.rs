//! Parsing of the heterogeneous creation times reported by the job service.
//!
//! Facebook reports ISO-8601 strings, TikTok reports epoch seconds as integers,
//! Instagram reports either depending on the actor version. Rows loaded back
//! from the store carry the same value as a string.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::identity::UNKNOWN_TIMESTAMP;

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

const OFFSET_DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S%.f%z"];

/// Parses a source-reported creation time.
///
/// Accepts epoch seconds (integer or fractional, as text), RFC 3339, ISO-8601
/// with a numeric offset, naive `YYYY-MM-DD[ HH:MM[:SS]]` (taken as UTC), and a
/// bare date (midnight UTC). Returns `None` for anything else.
#[must_use]
pub fn parse_created_time(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Some(secs) = parse_epoch_secs(raw) {
        return DateTime::from_timestamp(secs, 0);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in OFFSET_DATETIME_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(raw, format) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Normalizes a creation time into the epoch-second string used by fingerprints.
///
/// Absent or unparsable values map to [`UNKNOWN_TIMESTAMP`].
#[must_use]
pub fn normalize_timestamp_key(raw: Option<&str>) -> String {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return UNKNOWN_TIMESTAMP.to_owned();
    };

    if let Some(secs) = parse_epoch_secs(raw) {
        return secs.to_string();
    }

    parse_created_time(raw).map_or_else(
        || UNKNOWN_TIMESTAMP.to_owned(),
        |dt| dt.timestamp().to_string(),
    )
}

fn parse_epoch_secs(raw: &str) -> Option<i64> {
    if let Ok(secs) = raw.parse::<i64>() {
        return Some(secs);
    }
    // Only plain decimals; `f64::from_str` would also accept "inf" and "NaN".
    if !raw.bytes().all(|b| b.is_ascii_digit() || b == b'.' || b == b'-') {
        return None;
    }
    let value = raw.parse::<f64>().ok()?;
    #[allow(clippy::cast_possible_truncation)]
    let secs = value.trunc() as i64;
    Some(secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_integer_epoch_seconds() {
        let dt = parse_created_time("1700000000").unwrap();
        assert_eq!(dt.timestamp(), 1_700_000_000);
    }

    #[test]
    fn parses_fractional_epoch_seconds() {
        let dt = parse_created_time("1700000000.75").unwrap();
        assert_eq!(dt.timestamp(), 1_700_000_000);
    }

    #[test]
    fn parses_rfc3339_with_millis() {
        let dt = parse_created_time("2024-01-05T10:00:00.000Z").unwrap();
        assert_eq!(dt.to_rfc3339(), "2024-01-05T10:00:00+00:00");
    }

    #[test]
    fn parses_numeric_offset() {
        let dt = parse_created_time("2024-01-05T10:00:00+0200").unwrap();
        assert_eq!(dt.to_rfc3339(), "2024-01-05T08:00:00+00:00");
    }

    #[test]
    fn parses_naive_datetime_as_utc() {
        let dt = parse_created_time("2024-01-05 10:30:00").unwrap();
        assert_eq!(dt.to_rfc3339(), "2024-01-05T10:30:00+00:00");
    }

    #[test]
    fn parses_bare_date_as_midnight() {
        let dt = parse_created_time("2024-01-05").unwrap();
        assert_eq!(dt.to_rfc3339(), "2024-01-05T00:00:00+00:00");
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_created_time("hace 3 días").is_none());
        assert!(parse_created_time("inf").is_none());
        assert!(parse_created_time("   ").is_none());
    }

    #[test]
    fn key_for_equivalent_representations_is_identical() {
        let from_int = normalize_timestamp_key(Some("1704448800"));
        let from_iso = normalize_timestamp_key(Some("2024-01-05T10:00:00Z"));
        let from_float = normalize_timestamp_key(Some("1704448800.0"));
        assert_eq!(from_int, "1704448800");
        assert_eq!(from_iso, from_int);
        assert_eq!(from_float, from_int);
    }

    #[test]
    fn key_for_missing_or_unparsable_is_sentinel() {
        assert_eq!(normalize_timestamp_key(None), UNKNOWN_TIMESTAMP);
        assert_eq!(normalize_timestamp_key(Some("")), UNKNOWN_TIMESTAMP);
        assert_eq!(normalize_timestamp_key(Some("ayer")), UNKNOWN_TIMESTAMP);
    }
}
