//! Freshness classification for persisted records.
//!
//! Stale records are treated as inactive everywhere. They are not deleted on
//! read; see [`super::cleanup`] for the reaper.

use chrono::{DateTime, Utc};

use super::types::{parse_timestamp, Timestamped};

/// Window for the cheap "is any mode active" probe.
pub const PROBE_STALE_THRESHOLD_MS: i64 = 60 * 60 * 1000; // 1 hour

/// Window for the authoritative stop decision.
pub const DECISION_STALE_THRESHOLD_MS: i64 = 2 * 60 * 60 * 1000; // 2 hours

/// Most recent of `last_checked_at` and `started_at`, ignoring malformed values.
pub fn most_recent_activity<T: Timestamped>(record: &T) -> Option<DateTime<Utc>> {
    [record.last_checked_at(), record.started_at()]
        .into_iter()
        .flatten()
        .filter_map(parse_timestamp)
        .max()
}

/// Returns true if `record` has not been touched within `threshold_ms`.
///
/// A record with no parseable timestamp is always stale. Exactly at the
/// threshold counts as fresh.
pub fn is_stale<T: Timestamped>(record: &T, threshold_ms: i64, now: DateTime<Utc>) -> bool {
    match most_recent_activity(record) {
        Some(ts) => now.signed_duration_since(ts).num_milliseconds() > threshold_ms,
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::types::{format_timestamp, ModeState};
    use chrono::{Duration, TimeZone};

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn record(started: Option<String>, checked: Option<String>) -> ModeState {
        let mut state: ModeState = serde_json::from_str(r#"{"active":true}"#).unwrap();
        state.started_at = started;
        state.last_checked_at = checked;
        state
    }

    fn at(offset_ms: i64) -> Option<String> {
        Some(format_timestamp(fixed_now() - Duration::milliseconds(offset_ms)))
    }

    #[test]
    fn no_timestamps_is_stale() {
        assert!(is_stale(&record(None, None), PROBE_STALE_THRESHOLD_MS, fixed_now()));
    }

    #[test]
    fn malformed_timestamps_are_ignored() {
        let state = record(Some("yesterday".into()), Some("soon".into()));
        assert!(is_stale(&state, DECISION_STALE_THRESHOLD_MS, fixed_now()));
    }

    #[test]
    fn one_ms_past_threshold_is_stale() {
        let state = record(None, at(PROBE_STALE_THRESHOLD_MS + 1));
        assert!(is_stale(&state, PROBE_STALE_THRESHOLD_MS, fixed_now()));
    }

    #[test]
    fn one_ms_inside_threshold_is_fresh() {
        let state = record(None, at(PROBE_STALE_THRESHOLD_MS - 1));
        assert!(!is_stale(&state, PROBE_STALE_THRESHOLD_MS, fixed_now()));
    }

    #[test]
    fn exactly_at_threshold_is_fresh() {
        let state = record(None, at(DECISION_STALE_THRESHOLD_MS));
        assert!(!is_stale(&state, DECISION_STALE_THRESHOLD_MS, fixed_now()));
    }

    #[test]
    fn newest_timestamp_wins() {
        let state = record(at(10 * DECISION_STALE_THRESHOLD_MS), at(1_000));
        assert!(!is_stale(&state, DECISION_STALE_THRESHOLD_MS, fixed_now()));

        let state = record(at(1_000), at(10 * DECISION_STALE_THRESHOLD_MS));
        assert!(!is_stale(&state, DECISION_STALE_THRESHOLD_MS, fixed_now()));
    }

    #[test]
    fn thresholds_differ_between_probe_and_decision() {
        let ninety_minutes = 90 * 60 * 1000;
        let state = record(None, at(ninety_minutes));
        assert!(is_stale(&state, PROBE_STALE_THRESHOLD_MS, fixed_now()));
        assert!(!is_stale(&state, DECISION_STALE_THRESHOLD_MS, fixed_now()));
    }
}
