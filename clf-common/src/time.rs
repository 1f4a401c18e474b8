//! Timestamp utilities

use chrono::{DateTime, Utc};

/// Format used for `creation-date` fields in manifest metadata
pub const CREATION_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Render a timestamp the way manifest `creation-date` fields expect it
pub fn creation_date(at: DateTime<Utc>) -> String {
    at.format(CREATION_DATE_FORMAT).to_string()
}

/// Convert seconds to duration
pub fn secs_to_duration(secs: u64) -> std::time::Duration {
    std::time::Duration::from_secs(secs)
}
