use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Current wall-clock time as unix milliseconds.
///
/// Entity timestamps throughout the crate are integer milliseconds, which is
/// also how they are persisted.
pub fn now_ms() -> i64 {
    let now = OffsetDateTime::now_utc();
    (now.unix_timestamp_nanos() / 1_000_000) as i64
}

/// Render a unix-millisecond timestamp as an RFC 3339 string.
///
/// Falls back to the raw integer when the timestamp is out of the
/// representable range.
pub fn rfc3339(ms: i64) -> String {
    OffsetDateTime::from_unix_timestamp_nanos(ms as i128 * 1_000_000)
        .ok()
        .and_then(|dt| dt.format(&Rfc3339).ok())
        .unwrap_or_else(|| ms.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rfc3339_epoch() {
        assert_eq!(rfc3339(0), "1970-01-01T00:00:00Z");
    }

    #[test]
    fn rfc3339_with_millis() {
        assert_eq!(rfc3339(1_700_000_000_123), "2023-11-14T22:13:20.123Z");
    }

    #[test]
    fn now_ms_is_past_2024() {
        assert!(now_ms() > 1_704_067_200_000);
    }
}
