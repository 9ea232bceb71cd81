//! Display formatting for server timestamps.
//!
//! The chat service emits either RFC 3339 timestamps or naive ISO-8601
//! (`2025-04-20T10:30:15.123456`, no offset). Both are accepted; anything
//! else is shown verbatim rather than dropped.

use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};

#[cfg(test)]
#[path = "timestamp_test.rs"]
mod timestamp_test;

fn parse(raw: &str) -> Option<PrimitiveDateTime> {
    if let Ok(dt) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(PrimitiveDateTime::new(dt.date(), dt.time()));
    }
    let whole_seconds = raw.split('.').next().unwrap_or(raw);
    PrimitiveDateTime::parse(whole_seconds, format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]")).ok()
}

/// `HH:MM:SS` for a message timestamp.
#[must_use]
pub fn display_time(raw: &str) -> String {
    parse(raw)
        .and_then(|dt| dt.format(format_description!("[hour]:[minute]:[second]")).ok())
        .unwrap_or_else(|| raw.to_owned())
}

/// `YYYY-MM-DD` for a chat creation date.
#[must_use]
pub fn display_date(raw: &str) -> String {
    parse(raw)
        .and_then(|dt| dt.format(format_description!("[year]-[month]-[day]")).ok())
        .unwrap_or_else(|| raw.to_owned())
}

/// Current UTC time as `HH:MM:SS`, used for optimistic entries.
#[must_use]
pub fn now_time() -> String {
    OffsetDateTime::now_utc()
        .format(format_description!("[hour]:[minute]:[second]"))
        .unwrap_or_default()
}
