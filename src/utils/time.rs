//! Time and timestamp utilities

use chrono::{SecondsFormat, TimeZone, Utc};

/// Get current Unix timestamp in milliseconds
pub fn current_timestamp_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Render a millisecond timestamp as RFC 3339 (UTC), e.g. `2024-01-02T03:04:05.678Z`
pub fn format_timestamp_millis(millis: i64) -> String {
    match Utc.timestamp_millis_opt(millis).single() {
        Some(dt) => dt.to_rfc3339_opts(SecondsFormat::Millis, true),
        None => millis.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_timestamp_is_recent() {
        // 2020-01-01T00:00:00Z
        assert!(current_timestamp_millis() > 1_577_836_800_000);
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(
            format_timestamp_millis(1_700_000_000_123),
            "2023-11-14T22:13:20.123Z"
        );
    }
}
