//! Conversions between stored epoch-millisecond columns and `OffsetDateTime`.
//!
//! Older databases held `created_at`/`updated_at` as seconds since the epoch,
//! or as text (ISO 8601 or SQLite's `YYYY-MM-DD HH:MM:SS`). The migration runs
//! every such value through [`normalize_legacy_timestamp`].

use time::{
    OffsetDateTime, PrimitiveDateTime, format_description::well_known::Rfc3339,
    macros::format_description,
};

/// Numeric values below this are second-precision epochs (before year 2286).
pub const SECONDS_EPOCH_CEILING: i64 = 10_000_000_000;

/// Convert an instant to whole epoch milliseconds.
pub fn to_millis(value: OffsetDateTime) -> i64 {
    (value.unix_timestamp_nanos() / 1_000_000) as i64
}

/// Convert epoch milliseconds back to a UTC instant.
pub fn from_millis(millis: i64) -> Option<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000).ok()
}

/// Promote a second-precision epoch to milliseconds; millisecond values pass through.
pub fn normalize_epoch(value: i64) -> i64 {
    if value.abs() < SECONDS_EPOCH_CEILING {
        value.saturating_mul(1000)
    } else {
        value
    }
}

/// Interpret a raw legacy timestamp and return epoch milliseconds.
pub fn normalize_legacy_timestamp(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(number) = trimmed.parse::<i64>() {
        return Some(normalize_epoch(number));
    }
    if let Ok(number) = trimmed.parse::<f64>()
        && number.is_finite()
    {
        return Some(normalize_epoch(number.trunc() as i64));
    }

    if let Ok(parsed) = OffsetDateTime::parse(trimmed, &Rfc3339) {
        return Some(to_millis(parsed));
    }

    let sqlite = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    if let Ok(parsed) = PrimitiveDateTime::parse(trimmed, &sqlite) {
        return Some(to_millis(parsed.assume_utc()));
    }

    let naive_iso = format_description!(
        "[year]-[month]-[day]T[hour]:[minute]:[second][optional [.[subsecond]]]"
    );
    if let Ok(parsed) = PrimitiveDateTime::parse(trimmed.trim_end_matches('Z'), &naive_iso) {
        return Some(to_millis(parsed.assume_utc()));
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn second_epochs_are_promoted() {
        assert_eq!(normalize_legacy_timestamp("1700000000"), Some(1_700_000_000_000));
        assert_eq!(normalize_epoch(1_700_000_000), 1_700_000_000_000);
    }

    #[test]
    fn millisecond_epochs_pass_through() {
        assert_eq!(
            normalize_legacy_timestamp("1700000000123"),
            Some(1_700_000_000_123)
        );
    }

    #[test]
    fn iso_and_sqlite_text_are_parsed_as_utc() {
        let expected = to_millis(datetime!(2024-03-05 10:20:30 UTC));

        assert_eq!(
            normalize_legacy_timestamp("2024-03-05T10:20:30Z"),
            Some(expected)
        );
        assert_eq!(
            normalize_legacy_timestamp("2024-03-05 10:20:30"),
            Some(expected)
        );
        assert_eq!(
            normalize_legacy_timestamp("2024-03-05T10:20:30.000"),
            Some(expected)
        );
    }

    #[test]
    fn offsets_are_respected() {
        let expected = to_millis(datetime!(2024-03-05 08:20:30 UTC));
        assert_eq!(
            normalize_legacy_timestamp("2024-03-05T10:20:30+02:00"),
            Some(expected)
        );
    }

    #[test]
    fn garbage_is_rejected() {
        assert_eq!(normalize_legacy_timestamp(""), None);
        assert_eq!(normalize_legacy_timestamp("yesterday"), None);
    }

    #[test]
    fn millis_round_trip_through_offset_datetime() {
        let instant = datetime!(2025-01-02 03:04:05.678 UTC);
        let millis = to_millis(instant);
        assert_eq!(from_millis(millis), Some(instant));
    }
}
