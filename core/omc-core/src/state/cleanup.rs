//! Reaping of abandoned session state directories.
//!
//! Stale records are inert on read, but per-session directories would
//! otherwise accumulate forever. At session start we remove sibling session
//! directories that hold no fresh record. Legacy files are never reaped.

use chrono::{DateTime, Utc};
use fs_err as fs;
use std::io::ErrorKind;

use super::scope::{is_valid_session_id, StateScope};
use super::staleness::is_stale;
use super::store::StateStore;

/// Results from a cleanup pass.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CleanupStats {
    /// Session directories inspected (the caller's own is never counted).
    pub sessions_scanned: u32,
    /// Session directories removed because nothing in them was fresh.
    pub sessions_removed: u32,
    /// Errors encountered during cleanup.
    pub errors: Vec<String>,
}

/// Removes session directories under `scope`'s project whose every record
/// is stale by `threshold_ms`. The caller's own session is skipped.
pub fn reap_stale_sessions(scope: &StateScope, threshold_ms: i64, now: DateTime<Utc>) -> CleanupStats {
    let mut stats = CleanupStats::default();
    let sessions_root = scope.sessions_root();

    let entries = match fs::read_dir(&sessions_root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return stats,
        Err(e) => {
            stats.errors.push(format!("Failed to list sessions: {}", e));
            return stats;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }

        let name = entry.file_name().to_string_lossy().into_owned();
        // Directories we could not have created are left alone.
        if !is_valid_session_id(&name) || scope.session_id() == Some(name.as_str()) {
            continue;
        }
        stats.sessions_scanned += 1;

        let store = StateStore::new(StateScope::new(scope.project_root(), Some(&name)));
        if has_fresh_record(&store, threshold_ms, now) {
            continue;
        }

        match fs::remove_dir_all(&path) {
            Ok(()) => {
                tracing::debug!(session = %name, "Reaped stale session state");
                stats.sessions_removed += 1;
            }
            Err(e) => stats
                .errors
                .push(format!("Failed to remove {}: {}", path.display(), e)),
        }
    }

    stats
}

fn has_fresh_record(store: &StateStore, threshold_ms: i64, now: DateTime<Utc>) -> bool {
    store
        .all_states()
        .iter()
        .any(|(_, state)| !is_stale(state, threshold_ms, now))
        || store
            .read_swarm_summary()
            .is_some_and(|summary| !is_stale(&summary, threshold_ms, now))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OmcConfig;
    use crate::state::staleness::DECISION_STALE_THRESHOLD_MS;
    use crate::state::types::{format_timestamp, ModeState};
    use crate::types::ModeKind;
    use chrono::Duration;
    use tempfile::tempdir;

    fn write_state(project: &std::path::Path, session: &str, age: Duration, now: DateTime<Utc>) {
        let scope = StateScope::new(project, Some(session));
        let mut state = ModeState::new(
            ModeKind::Ultrawork,
            "ulw",
            "",
            &scope,
            &OmcConfig::default(),
            now - age,
        );
        state.last_checked_at = Some(format_timestamp(now - age));
        StateStore::new(scope).write(ModeKind::Ultrawork, &state).unwrap();
    }

    #[test]
    fn removes_only_fully_stale_sessions() {
        let temp = tempdir().unwrap();
        let now = Utc::now();
        write_state(temp.path(), "old", Duration::hours(5), now);
        write_state(temp.path(), "fresh", Duration::minutes(5), now);

        let scope = StateScope::new(temp.path(), Some("current"));
        let stats = reap_stale_sessions(&scope, DECISION_STALE_THRESHOLD_MS, now);

        assert_eq!(stats.sessions_scanned, 2);
        assert_eq!(stats.sessions_removed, 1);
        assert!(stats.errors.is_empty());
        assert!(!scope.sessions_root().join("old").exists());
        assert!(scope.sessions_root().join("fresh").exists());
    }

    #[test]
    fn never_reaps_the_callers_session() {
        let temp = tempdir().unwrap();
        let now = Utc::now();
        write_state(temp.path(), "current", Duration::hours(5), now);

        let scope = StateScope::new(temp.path(), Some("current"));
        let stats = reap_stale_sessions(&scope, DECISION_STALE_THRESHOLD_MS, now);

        assert_eq!(stats.sessions_removed, 0);
        assert!(scope.sessions_root().join("current").exists());
    }

    #[test]
    fn missing_sessions_dir_is_a_no_op() {
        let temp = tempdir().unwrap();
        let scope = StateScope::new(temp.path(), None);
        assert_eq!(
            reap_stale_sessions(&scope, DECISION_STALE_THRESHOLD_MS, Utc::now()),
            CleanupStats::default()
        );
    }
}
