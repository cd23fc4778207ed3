// SPDX-FileCopyrightText: 2026 Velio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Canonical timestamp handling.
//!
//! All persisted timestamps use RFC 3339 UTC with millisecond precision and
//! a `Z` suffix. The format is fixed-width, so lexicographic string
//! comparison matches chronological order and SQL range queries work on the
//! raw text.

use chrono::{DateTime, SecondsFormat, Utc};

/// Current time in the canonical persisted format.
pub fn now_millis() -> String {
    format_millis(Utc::now())
}

/// Formats any UTC instant in the canonical persisted format.
pub fn format_millis(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Re-encodes an arbitrary RFC 3339 timestamp (any offset, any precision)
/// into the canonical format. Returns `None` for unparseable input.
pub fn canonical(ts: &str) -> Option<String> {
    DateTime::parse_from_rfc3339(ts)
        .ok()
        .map(|dt| format_millis(dt.with_timezone(&Utc)))
}

/// Milliseconds since the Unix epoch for a canonical timestamp.
pub fn epoch_millis(ts: &str) -> Option<i64> {
    DateTime::parse_from_rfc3339(ts)
        .ok()
        .map(|dt| dt.timestamp_millis())
}

/// Inclusive `[center - secs, center + secs]` bounds in the canonical
/// format, for timestamp-window queries.
pub fn window_bounds(center: &str, secs: i64) -> Option<(String, String)> {
    let dt = DateTime::parse_from_rfc3339(center).ok()?.with_timezone(&Utc);
    let delta = chrono::Duration::seconds(secs);
    Some((
        format_millis(dt - delta),
        format_millis(dt + delta),
    ))
}
