//! Cheap "which modes are running here" check.
//!
//! Callers pick the window: session-start reminders use the short probe
//! window so abandoned markers stop haunting new sessions quickly.

use chrono::{DateTime, Utc};

use crate::types::ModeKind;

use super::staleness::is_stale;
use super::store::StateStore;

/// Modes that are active, fresh and owned by the store's scope, in walk order.
pub fn active_modes(store: &StateStore, threshold_ms: i64, now: DateTime<Utc>) -> Vec<ModeKind> {
    let scope = store.scope();
    let mut active: Vec<ModeKind> = store
        .all_states()
        .into_iter()
        .filter(|(_, state)| {
            state.active
                && !is_stale(state, threshold_ms, now)
                && scope.owns(state.session_id.as_deref(), state.project_path.as_deref())
        })
        .map(|(mode, _)| mode)
        .collect();

    let swarm_active = store.read_swarm_summary().is_some_and(|summary| {
        summary.active
            && !is_stale(&summary, threshold_ms, now)
            && scope.owns(summary.session_id.as_deref(), summary.project_path.as_deref())
    });
    if swarm_active {
        active.push(ModeKind::Swarm);
    }

    active.sort();
    active
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::staleness::PROBE_STALE_THRESHOLD_MS;
    use crate::config::OmcConfig;
    use crate::state::scope::StateScope;
    use crate::state::types::{ModeState, SwarmSummary, format_timestamp};
    use chrono::Duration;
    use tempfile::tempdir;

    #[test]
    fn reports_fresh_active_modes_only() {
        let temp = tempdir().unwrap();
        let scope = StateScope::new(temp.path(), Some("s1"));
        let store = StateStore::new(scope.clone());
        let now = Utc::now();
        let config = OmcConfig::default();

        store
            .write(ModeKind::Ralph, &ModeState::new(ModeKind::Ralph, "", "", &scope, &config, now))
            .unwrap();
        let mut stale = ModeState::new(ModeKind::Autopilot, "", "", &scope, &config, now);
        let old = format_timestamp(now - Duration::minutes(61));
        stale.started_at = Some(old.clone());
        stale.last_checked_at = Some(old);
        store.write(ModeKind::Autopilot, &stale).unwrap();
        let mut inactive = ModeState::new(ModeKind::Team, "", "", &scope, &config, now);
        inactive.active = false;
        store.write(ModeKind::Team, &inactive).unwrap();

        assert_eq!(active_modes(&store, PROBE_STALE_THRESHOLD_MS, now), vec![ModeKind::Ralph]);
    }

    #[test]
    fn swarm_summary_counts_as_a_mode() {
        let temp = tempdir().unwrap();
        let store = StateStore::new(StateScope::new(temp.path(), None));
        let now = Utc::now();
        store
            .write_swarm_summary(&SwarmSummary {
                active: true,
                started_at: Some(format_timestamp(now)),
                ..SwarmSummary::default()
            })
            .unwrap();
        assert_eq!(active_modes(&store, PROBE_STALE_THRESHOLD_MS, now), vec![ModeKind::Swarm]);
    }

    #[test]
    fn empty_project_has_nothing_active() {
        let temp = tempdir().unwrap();
        let store = StateStore::new(StateScope::new(temp.path(), Some("s1")));
        assert!(active_modes(&store, PROBE_STALE_THRESHOLD_MS, Utc::now()).is_empty());
    }
}
