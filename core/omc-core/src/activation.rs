//! Activation writer: turns resolved mode matches into state on disk.
//!
//! Runs on prompt submission, after the resolver. `cancel` clears every
//! persisting mode in the scope. Other persisting modes get a fresh state
//! unless one is already running; advisory modes only contribute context
//! text.

use chrono::{DateTime, Utc};

use crate::config::OmcConfig;
use crate::error::{OmcError, Result};
use crate::keywords::needs_team_link;
use crate::state::{is_stale, ModeState, StateStore, DECISION_STALE_THRESHOLD_MS};
use crate::trace::{FlowEvent, FlowTracer};
use crate::types::{ModeKind, ModeMatch};

const CANCEL_HINT: &str =
    "Persistent modes stay active across turns until their work is complete. Say \"cancelomc\" to end them early.";

/// What one prompt changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivationReport {
    /// Persisting modes that now have a fresh state.
    pub activated: Vec<ModeKind>,
    /// Persisting modes that were already running and were left alone.
    pub resumed: Vec<ModeKind>,
    /// Modes that only add guidance for this turn.
    pub advisory: Vec<ModeKind>,
    /// Modes whose state was deleted by a cancel.
    pub cancelled: Vec<ModeKind>,
    pub cancel_requested: bool,
    /// `ralph` and `team` were cross-linked.
    pub linked: bool,
}

impl ActivationReport {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Context text injected into the assistant's turn, if anything changed.
    pub fn context_message(&self) -> Option<String> {
        if self.cancel_requested {
            return Some(if self.cancelled.is_empty() {
                "[OMC] No active modes to cancel.".to_string()
            } else {
                format!("[OMC] Cancelled modes: {}.", join_modes(&self.cancelled))
            });
        }

        let mut lines: Vec<String> = self
            .activated
            .iter()
            .chain(&self.resumed)
            .chain(&self.advisory)
            .map(|mode| format!("[{}] {}", mode.name().to_uppercase(), instruction(*mode)))
            .collect();
        if lines.is_empty() {
            return None;
        }
        if self.linked {
            lines.push(
                "[RALPH + TEAM] Linked: ralph keeps the team going until the work is verified."
                    .to_string(),
            );
        }
        if !self.activated.is_empty() || !self.resumed.is_empty() {
            lines.push(CANCEL_HINT.to_string());
        }
        Some(lines.join("\n"))
    }
}

fn join_modes(modes: &[ModeKind]) -> String {
    modes.iter().map(|m| m.name()).collect::<Vec<_>>().join(", ")
}

fn instruction(mode: ModeKind) -> &'static str {
    match mode {
        ModeKind::Cancel => "Cancel every active mode.",
        ModeKind::Ralph => "Persistence loop: keep working until the task is verified complete.",
        ModeKind::Autopilot => "Full autonomy: plan, implement and verify without waiting for confirmation.",
        ModeKind::Team => "Coordinated team: split the work across teammates through the shared task list.",
        ModeKind::Ultrapilot => "Parallel autopilot: fan the work out to independent workers.",
        ModeKind::Ultrawork => "Maximum parallelism: run independent subtasks concurrently.",
        ModeKind::Ecomode => "Token-efficient parallelism: prefer smaller models and concise output.",
        ModeKind::Swarm => "Swarm: agents claim tasks from a shared pool.",
        ModeKind::Pipeline => "Sequential pipeline: finish each stage before starting the next.",
        ModeKind::Ralplan => "Iterative planning: draft, critique and refine the plan before executing.",
        ModeKind::Plan => "Planning interview: ask clarifying questions before writing a plan.",
        ModeKind::Tdd => "Test-driven: write a failing test before each change.",
        ModeKind::Research => "Research: gather sources and summarize findings before acting.",
        ModeKind::Ultrathink => "Extended reasoning: think the problem through before answering.",
        ModeKind::Deepsearch => "Codebase search: search exhaustively before answering.",
        ModeKind::Analyze => "Deep analysis: find the root cause before proposing changes.",
        ModeKind::Codex => "Delegate to Codex for a second opinion.",
        ModeKind::Gemini => "Delegate to Gemini for a second opinion.",
        ModeKind::UltraQa => "QA cycling: test, fix and re-test until everything passes.",
    }
}

/// Applies resolved matches to the store.
pub fn apply_activations(
    store: &StateStore,
    prompt: &str,
    matches: &[ModeMatch],
    config: &OmcConfig,
    tracer: &dyn FlowTracer,
    now: DateTime<Utc>,
) -> Result<ActivationReport> {
    let scope = store.scope();
    let mut report = ActivationReport::default();

    for m in matches {
        tracer.record(scope, &FlowEvent::KeywordDetected { keyword: m.mode });
    }

    if matches.iter().any(|m| m.mode == ModeKind::Cancel) {
        report.cancel_requested = true;
        report.cancelled = store.delete_all()?;
        tracing::info!(modes = %join_modes(&report.cancelled), "Cancelled modes");
        tracer.record(
            scope,
            &FlowEvent::ModeCancelled {
                modes: report.cancelled.clone(),
            },
        );
        return Ok(report);
    }

    for m in matches {
        if !m.mode.persists() {
            report.advisory.push(m.mode);
            continue;
        }

        if running_state(store, m.mode, now).is_some() {
            tracing::debug!(mode = %m.mode, "Mode already running, keeping state");
            report.resumed.push(m.mode);
            continue;
        }

        let state = ModeState::new(m.mode, prompt, &m.args, scope, config, now);
        store.write(m.mode, &state)?;
        tracing::info!(mode = %m.mode, session_id = ?scope.session_id(), "Mode activated");
        tracer.record(scope, &FlowEvent::ModeActivated { mode: m.mode });
        report.activated.push(m.mode);
    }

    if needs_team_link(matches) {
        link_ralph_and_team(store)?;
        report.linked = true;
    }

    Ok(report)
}

/// Starts `mode` explicitly, replacing any previous state.
pub fn activate_mode(
    store: &StateStore,
    mode: ModeKind,
    prompt: &str,
    config: &OmcConfig,
    tracer: &dyn FlowTracer,
    now: DateTime<Utc>,
) -> Result<ModeState> {
    if !mode.persists() {
        return Err(OmcError::NotPersistent(mode.name().to_string()));
    }

    let state = ModeState::new(mode, prompt, prompt, store.scope(), config, now);
    store.write(mode, &state)?;
    tracer.record(store.scope(), &FlowEvent::ModeActivated { mode });
    tracing::info!(mode = %mode, "Mode activated explicitly");
    Ok(state)
}

/// Deletes every persisting mode for the scope. Returns what was removed.
pub fn cancel_all(store: &StateStore, tracer: &dyn FlowTracer) -> Result<Vec<ModeKind>> {
    let removed = store.delete_all()?;
    tracer.record(
        store.scope(),
        &FlowEvent::ModeCancelled {
            modes: removed.clone(),
        },
    );
    Ok(removed)
}

fn running_state(store: &StateStore, mode: ModeKind, now: DateTime<Utc>) -> Option<ModeState> {
    store.read(mode).filter(|state| {
        state.active
            && !state.is_exhausted()
            && !is_stale(state, DECISION_STALE_THRESHOLD_MS, now)
            && store
                .scope()
                .owns(state.session_id.as_deref(), state.project_path.as_deref())
    })
}

fn link_ralph_and_team(store: &StateStore) -> Result<()> {
    if let Some(mut ralph) = store.read(ModeKind::Ralph) {
        ralph.linked_team = Some(true);
        store.write(ModeKind::Ralph, &ralph)?;
    }
    if let Some(mut team) = store.read(ModeKind::Team) {
        team.linked_ralph = Some(true);
        store.write(ModeKind::Team, &team)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{format_timestamp, StateScope};
    use crate::trace::{MemoryTracer, NoopTracer};
    use chrono::Duration;
    use tempfile::tempdir;

    fn matches(modes: &[ModeKind]) -> Vec<ModeMatch> {
        modes.iter().map(|m| ModeMatch::new(*m, "")).collect()
    }

    #[test]
    fn creates_states_for_persisting_modes_only() {
        let temp = tempdir().unwrap();
        let store = StateStore::new(StateScope::new(temp.path(), Some("s1")));
        let report = apply_activations(
            &store,
            "ralph tdd",
            &matches(&[ModeKind::Ralph, ModeKind::Ultrawork, ModeKind::Tdd]),
            &OmcConfig::default(),
            &NoopTracer,
            Utc::now(),
        )
        .unwrap();

        assert_eq!(report.activated, vec![ModeKind::Ralph, ModeKind::Ultrawork]);
        assert_eq!(report.advisory, vec![ModeKind::Tdd]);
        assert!(store.read(ModeKind::Tdd).is_none());
        let ralph = store.read(ModeKind::Ralph).unwrap();
        assert!(ralph.active);
        assert_eq!(ralph.original_prompt, "ralph tdd");
    }

    #[test]
    fn running_mode_is_not_reset() {
        let temp = tempdir().unwrap();
        let scope = StateScope::new(temp.path(), Some("s1"));
        let store = StateStore::new(scope.clone());
        let mut running = ModeState::new(ModeKind::Ralph, "first", "", &scope, &OmcConfig::default(), Utc::now());
        running.iteration = Some(4);
        store.write(ModeKind::Ralph, &running).unwrap();

        let report = apply_activations(
            &store,
            "ralph again",
            &matches(&[ModeKind::Ralph]),
            &OmcConfig::default(),
            &NoopTracer,
            Utc::now(),
        )
        .unwrap();
        assert_eq!(report.resumed, vec![ModeKind::Ralph]);
        assert_eq!(store.read(ModeKind::Ralph).unwrap().iteration, Some(4));
    }

    #[test]
    fn stale_mode_is_replaced() {
        let temp = tempdir().unwrap();
        let scope = StateScope::new(temp.path(), Some("s1"));
        let store = StateStore::new(scope.clone());
        let now = Utc::now();
        let mut old = ModeState::new(ModeKind::Ultrawork, "old", "", &scope, &OmcConfig::default(), now);
        let stamp = format_timestamp(now - Duration::hours(3));
        old.started_at = Some(stamp.clone());
        old.last_checked_at = Some(stamp);
        old.reinforcement_count = 12;
        store.write(ModeKind::Ultrawork, &old).unwrap();

        apply_activations(&store, "ulw", &matches(&[ModeKind::Ultrawork]), &OmcConfig::default(), &NoopTracer, now)
            .unwrap();
        let state = store.read(ModeKind::Ultrawork).unwrap();
        assert_eq!(state.reinforcement_count, 0);
        assert_eq!(state.original_prompt, "ulw");
    }

    #[test]
    fn ralph_and_team_are_linked() {
        let temp = tempdir().unwrap();
        let store = StateStore::new(StateScope::new(temp.path(), Some("s1")));
        let report = apply_activations(
            &store,
            "ralph team",
            &matches(&[ModeKind::Ralph, ModeKind::Team, ModeKind::Ultrawork]),
            &OmcConfig::default(),
            &NoopTracer,
            Utc::now(),
        )
        .unwrap();

        assert!(report.linked);
        assert_eq!(store.read(ModeKind::Ralph).unwrap().linked_team, Some(true));
        assert_eq!(store.read(ModeKind::Team).unwrap().linked_ralph, Some(true));
    }

    #[test]
    fn cancel_clears_scope_and_traces() {
        let temp = tempdir().unwrap();
        let store = StateStore::new(StateScope::new(temp.path(), Some("s1")));
        let tracer = MemoryTracer::default();
        let config = OmcConfig::default();
        apply_activations(&store, "ralph", &matches(&[ModeKind::Ralph]), &config, &NoopTracer, Utc::now())
            .unwrap();

        let report =
            apply_activations(&store, "cancelomc", &matches(&[ModeKind::Cancel]), &config, &tracer, Utc::now())
                .unwrap();
        assert_eq!(report.cancelled, vec![ModeKind::Ralph]);
        assert!(store.read(ModeKind::Ralph).is_none());
        assert_eq!(
            tracer.events(),
            vec![
                FlowEvent::KeywordDetected { keyword: ModeKind::Cancel },
                FlowEvent::ModeCancelled {
                    modes: vec![ModeKind::Ralph]
                },
            ]
        );
        assert_eq!(
            report.context_message().as_deref(),
            Some("[OMC] Cancelled modes: ralph.")
        );
    }

    #[test]
    fn explicit_activation_rejects_advisory_modes() {
        let temp = tempdir().unwrap();
        let store = StateStore::new(StateScope::new(temp.path(), None));
        let config = OmcConfig::default();

        let qa = activate_mode(&store, ModeKind::UltraQa, "fix tests", &config, &NoopTracer, Utc::now()).unwrap();
        assert_eq!(qa.cycle, Some(1));
        assert!(store.read(ModeKind::UltraQa).is_some());

        let err = activate_mode(&store, ModeKind::Tdd, "", &config, &NoopTracer, Utc::now()).unwrap_err();
        assert!(matches!(err, OmcError::NotPersistent(_)));
    }

    #[test]
    fn context_message_lists_modes_and_cancel_hint() {
        let report = ActivationReport {
            activated: vec![ModeKind::Ralph, ModeKind::Ultrawork],
            advisory: vec![ModeKind::Ultrathink],
            ..ActivationReport::default()
        };
        let message = report.context_message().unwrap();
        let lines: Vec<_> = message.lines().collect();
        assert!(lines[0].starts_with("[RALPH]"));
        assert!(lines[1].starts_with("[ULTRAWORK]"));
        assert!(lines[2].starts_with("[ULTRATHINK]"));
        assert!(lines[3].contains("cancelomc"));

        assert!(ActivationReport::default().context_message().is_none());
    }
}
