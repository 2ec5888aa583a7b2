//! Stop-event decision engine.
//!
//! Runs before the session is allowed to end and decides whether some mode
//! still has work that should keep the assistant going.
//!
//! ```text
//! stop event
//!   ├─ bypass (context limit, user abort, auth failure) → allow, no state read
//!   └─ walk WALK_ORDER; first active ∧ fresh ∧ owned mode with work left:
//!        count += 1
//!        count > cap → deactivate, allow
//!        otherwise   → persist, block with reason
//!      nothing blocks → allow
//! ```
//!
//! Every failure resolves to "allow". The engine sits on the path of ending
//! a session and must never be the reason one hangs.

pub mod bypass;

pub use bypass::{classify_stop, StopBypass};

use chrono::{DateTime, Utc};

use crate::config::OmcConfig;
use crate::hook::{HookOutput, StopEvent};
use crate::state::types::DEFAULT_PIPELINE_STAGES;
use crate::state::{
    format_timestamp, is_stale, ModeState, StateStore, DECISION_STALE_THRESHOLD_MS,
};
use crate::trace::{FlowEvent, FlowTracer};
use crate::types::ModeKind;
use crate::work::WorkCounter;

/// Order in which modes get a chance to block.
pub const WALK_ORDER: [ModeKind; 9] = [
    ModeKind::Ralph,
    ModeKind::Autopilot,
    ModeKind::Team,
    ModeKind::Ultrapilot,
    ModeKind::Ultrawork,
    ModeKind::Ecomode,
    ModeKind::Swarm,
    ModeKind::Pipeline,
    ModeKind::UltraQa,
];

const TERMINAL_PHASES: [&str; 3] = ["complete", "failed", "cancelled"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopDecision {
    pub block: bool,
    /// Mode that blocked, if any.
    pub mode: Option<ModeKind>,
    pub reason: Option<String>,
}

impl StopDecision {
    pub fn allow() -> Self {
        Self {
            block: false,
            mode: None,
            reason: None,
        }
    }

    fn blocked(mode: ModeKind, reason: String) -> Self {
        Self {
            block: true,
            mode: Some(mode),
            reason: Some(reason),
        }
    }

    pub fn to_output(&self) -> HookOutput {
        match (&self.block, &self.reason) {
            (true, Some(reason)) => HookOutput::block(reason.clone()),
            _ => HookOutput::passthrough(),
        }
    }
}

/// Outcome of looking at one mode during the walk.
enum Step {
    Skip,
    Block { reinforcement_count: u32, reason: String },
    Allow(String),
}

pub struct ContinuationEngine<'a> {
    store: &'a StateStore,
    work: &'a dyn WorkCounter,
    tracer: &'a dyn FlowTracer,
}

impl<'a> ContinuationEngine<'a> {
    pub fn new(store: &'a StateStore, work: &'a dyn WorkCounter, tracer: &'a dyn FlowTracer) -> Self {
        Self {
            store,
            work,
            tracer,
        }
    }

    pub fn decide(&self, event: &StopEvent, now: DateTime<Utc>) -> StopDecision {
        if let Some(bypass) = classify_stop(event) {
            tracing::debug!(bypass = bypass.as_str(), "Stop bypass, allowing");
            return StopDecision::allow();
        }
        if event.stop_hook_active {
            tracing::debug!("Stop follows an earlier block");
        }

        for mode in WALK_ORDER {
            let step = if mode == ModeKind::Swarm {
                self.check_swarm(now)
            } else {
                self.check_mode(mode, now)
            };

            match step {
                Step::Skip => continue,
                Step::Block {
                    reinforcement_count,
                    reason,
                } => {
                    tracing::debug!(mode = %mode, reinforcement_count, "Blocking stop");
                    self.trace(&FlowEvent::StopBlocked {
                        mode,
                        reinforcement_count,
                    });
                    return StopDecision::blocked(mode, reason);
                }
                Step::Allow(reason) => {
                    tracing::debug!(mode = %mode, reason = %reason, "Allowing stop");
                    self.trace(&FlowEvent::StopAllowed { reason });
                    return StopDecision::allow();
                }
            }
        }

        StopDecision::allow()
    }

    fn check_mode(&self, mode: ModeKind, now: DateTime<Utc>) -> Step {
        let Some(mut state) = self.store.read(mode) else {
            return Step::Skip;
        };
        if !self.applies(&state, now) {
            return Step::Skip;
        }
        if state.is_exhausted() {
            return Step::Allow(format!("{} exhausted", mode));
        }

        if !needs_work(mode, &state) {
            tracing::debug!(mode = %mode, "Completion condition met, deactivating");
            state.active = false;
            state.touch(now);
            if let Err(e) = self.store.write(mode, &state) {
                tracing::warn!(mode = %mode, error = %e, "Failed to deactivate completed mode");
            }
            return Step::Skip;
        }

        state.reinforcement_count = state.reinforcement_count.saturating_add(1);
        if mode == ModeKind::Ralph {
            state.iteration = Some(state.iteration.unwrap_or(1).saturating_add(1));
        }
        state.touch(now);

        if state.is_exhausted() {
            state.active = false;
            if let Err(e) = self.store.write(mode, &state) {
                tracing::warn!(mode = %mode, error = %e, "Failed to persist exhausted mode");
            }
            return Step::Allow(format!("{} reached max reinforcements", mode));
        }

        if let Err(e) = self.store.write(mode, &state) {
            tracing::warn!(mode = %mode, error = %e, "Failed to persist reinforcement");
            return Step::Allow(format!("{} state write failed", mode));
        }

        Step::Block {
            reinforcement_count: state.reinforcement_count,
            reason: self.reason(
                mode,
                &progress(mode, &state),
                state.reinforcement_count,
                state.max_reinforcements,
            ),
        }
    }

    fn check_swarm(&self, now: DateTime<Utc>) -> Step {
        let Some(mut summary) = self.store.read_swarm_summary() else {
            return Step::Skip;
        };
        let scope = self.store.scope();
        if !summary.active
            || is_stale(&summary, DECISION_STALE_THRESHOLD_MS, now)
            || !scope.owns(summary.session_id.as_deref(), summary.project_path.as_deref())
        {
            return Step::Skip;
        }
        if summary.reinforcement_count > summary.max_reinforcements {
            return Step::Allow("swarm exhausted".to_string());
        }

        let outstanding = summary.outstanding_tasks();
        if outstanding == 0 {
            return Step::Skip;
        }

        summary.reinforcement_count = summary.reinforcement_count.saturating_add(1);
        summary.last_checked_at = Some(format_timestamp(now));

        if summary.reinforcement_count > summary.max_reinforcements {
            summary.active = false;
            if let Err(e) = self.store.write_swarm_summary(&summary) {
                tracing::warn!(error = %e, "Failed to persist exhausted swarm summary");
            }
            return Step::Allow("swarm reached max reinforcements".to_string());
        }

        if let Err(e) = self.store.write_swarm_summary(&summary) {
            tracing::warn!(error = %e, "Failed to persist swarm reinforcement");
            return Step::Allow("swarm state write failed".to_string());
        }

        let progress = format!(
            "{} swarm task(s) outstanding across {} agent(s)",
            outstanding, summary.agent_count
        );
        Step::Block {
            reinforcement_count: summary.reinforcement_count,
            reason: self.reason(
                ModeKind::Swarm,
                &progress,
                summary.reinforcement_count,
                summary.max_reinforcements,
            ),
        }
    }

    /// Active, fresh, and owned by the caller's session and project.
    fn applies(&self, state: &ModeState, now: DateTime<Utc>) -> bool {
        if !state.active {
            return false;
        }
        if is_stale(state, DECISION_STALE_THRESHOLD_MS, now) {
            tracing::debug!(started_at = ?state.started_at, "Skipping stale mode state");
            return false;
        }
        self.store
            .scope()
            .owns(state.session_id.as_deref(), state.project_path.as_deref())
    }

    fn reason(&self, mode: ModeKind, progress: &str, count: u32, max: u32) -> String {
        let scope = self.store.scope();
        let todos = self.work.incomplete_todos(scope);
        let tasks = self.work.incomplete_tasks(scope);

        let mut reason = format!(
            "[{} - REINFORCEMENT {}/{}] {}.",
            mode.name().to_uppercase(),
            count,
            max,
            progress
        );
        if todos > 0 || tasks > 0 {
            reason.push_str(&format!(
                " {} incomplete todo(s) and {} incomplete task(s) remain.",
                todos, tasks
            ));
        }
        reason.push_str(
            " The work is not done yet: keep going until it is complete. \
             When everything is finished, or to stop early, say \"cancelomc\" to end this mode cleanly.",
        );
        reason
    }

    fn trace(&self, event: &FlowEvent) {
        self.tracer.record(self.store.scope(), event);
    }
}

/// The mode the next stop would be blocked by, without writing anything.
///
/// Follows the same walk as [`ContinuationEngine::decide`]: an exhausted
/// mode, or one whose next reinforcement would pass its cap, ends the walk
/// with an allow; a completed mode is passed over.
pub fn blocking_mode(store: &StateStore, now: DateTime<Utc>) -> Option<ModeKind> {
    let scope = store.scope();
    let live = |active: bool, stale: bool, session: Option<&str>, project: Option<&str>| {
        active && !stale && scope.owns(session, project)
    };

    for mode in WALK_ORDER {
        let (count, max, pending) = if mode == ModeKind::Swarm {
            match store.read_swarm_summary() {
                Some(summary)
                    if live(
                        summary.active,
                        is_stale(&summary, DECISION_STALE_THRESHOLD_MS, now),
                        summary.session_id.as_deref(),
                        summary.project_path.as_deref(),
                    ) =>
                {
                    (
                        summary.reinforcement_count,
                        summary.max_reinforcements,
                        summary.outstanding_tasks() > 0,
                    )
                }
                _ => continue,
            }
        } else {
            match store.read(mode) {
                Some(state)
                    if live(
                        state.active,
                        is_stale(&state, DECISION_STALE_THRESHOLD_MS, now),
                        state.session_id.as_deref(),
                        state.project_path.as_deref(),
                    ) =>
                {
                    (
                        state.reinforcement_count,
                        state.max_reinforcements,
                        needs_work(mode, &state),
                    )
                }
                _ => continue,
            }
        };

        if count > max {
            return None;
        }
        if pending {
            return (count.saturating_add(1) <= max).then_some(mode);
        }
    }
    None
}

/// True while the mode's completion condition is unmet.
pub fn needs_work(mode: ModeKind, state: &ModeState) -> bool {
    match mode {
        ModeKind::Ralph => {
            let max = state
                .max_iterations
                .unwrap_or(OmcConfig::DEFAULT_RALPH_MAX_ITERATIONS);
            state.iteration.unwrap_or(1) < max
        }
        ModeKind::Autopilot | ModeKind::Team => state
            .phase
            .as_deref()
            .map_or(true, |phase| !TERMINAL_PHASES.contains(&phase)),
        ModeKind::Ultrapilot => match state.workers.as_deref() {
            None | Some([]) => true,
            Some(workers) => workers.iter().any(|w| !w.status.is_terminal()),
        },
        ModeKind::Ultrawork | ModeKind::Ecomode => true,
        ModeKind::Pipeline => {
            let total = state
                .stages
                .as_ref()
                .map_or(DEFAULT_PIPELINE_STAGES.len(), Vec::len);
            (state.current_stage.unwrap_or(0) as usize) < total
        }
        ModeKind::UltraQa => {
            let max = state.max_cycles.unwrap_or(OmcConfig::DEFAULT_ULTRAQA_MAX_CYCLES);
            state.cycle.unwrap_or(1) < max && !state.all_passing.unwrap_or(false)
        }
        _ => false,
    }
}

fn progress(mode: ModeKind, state: &ModeState) -> String {
    match mode {
        ModeKind::Ralph => format!(
            "Iteration {}/{}",
            state.iteration.unwrap_or(1),
            state
                .max_iterations
                .unwrap_or(OmcConfig::DEFAULT_RALPH_MAX_ITERATIONS)
        ),
        ModeKind::Autopilot | ModeKind::Team => {
            format!("Phase: {}", state.phase.as_deref().unwrap_or("unknown"))
        }
        ModeKind::Ultrapilot => match state.workers.as_deref() {
            None | Some([]) => "No workers have reported yet".to_string(),
            Some(workers) => {
                let finished = workers.iter().filter(|w| w.status.is_terminal()).count();
                format!("{}/{} workers finished", finished, workers.len())
            }
        },
        ModeKind::Pipeline => {
            let current = state.current_stage.unwrap_or(0) as usize;
            match state.stages.as_ref() {
                Some(stages) => format!(
                    "Stage {}/{}: {}",
                    current + 1,
                    stages.len(),
                    stages.get(current).map_or("unknown", |s| s.name())
                ),
                None => format!("Stage {}", current + 1),
            }
        }
        ModeKind::UltraQa => format!(
            "QA cycle {}/{}, tests not passing yet",
            state.cycle.unwrap_or(1),
            state.max_cycles.unwrap_or(OmcConfig::DEFAULT_ULTRAQA_MAX_CYCLES)
        ),
        _ => format!("{} mode is active", mode),
    }
}
