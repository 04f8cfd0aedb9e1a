//! Timestamp utilities

use chrono::{DateTime, FixedOffset, Utc};

/// Timestamp format used by the exported archive (e.g., "Wed Oct 10 20:19:24 +0000 2018")
pub const EXPORT_TIMESTAMP_FORMAT: &str = "%a %b %d %H:%M:%S %z %Y";

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Parse an export timestamp, keeping its original offset
pub fn parse_export_timestamp(value: &str) -> Result<DateTime<FixedOffset>, chrono::ParseError> {
    DateTime::parse_from_str(value.trim(), EXPORT_TIMESTAMP_FORMAT)
}

/// Convert an export timestamp to the RFC 3339 form the remote API expects
///
/// `"Wed Oct 10 20:19:24 +0000 2018"` becomes `"2018-10-10T20:19:24+00:00"`.
pub fn export_to_rfc3339(value: &str) -> Result<String, chrono::ParseError> {
    parse_export_timestamp(value).map(|ts| ts.to_rfc3339())
}
