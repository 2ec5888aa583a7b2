//! Human-readable dump of every mode state for a project.

use chrono::Utc;
use omc_core::state::{is_stale, DECISION_STALE_THRESHOLD_MS};
use omc_core::{blocking_mode, ModeKind, StateScope, StateStore};
use std::fmt::Write as _;

pub fn run(scope: &StateScope) {
    print!("{}", render(scope));
}

pub fn render(scope: &StateScope) -> String {
    let now = Utc::now();
    let store = StateStore::new(scope.clone());
    let mut out = String::new();

    let _ = writeln!(out, "═══════════════════════════════════════════════════════════");
    let _ = writeln!(out, "  OMC Mode Status");
    let _ = writeln!(out, "═══════════════════════════════════════════════════════════");
    let _ = writeln!(out, "Project: {}", scope.project_root().display());
    let _ = writeln!(out, "Session: {}", scope.session_id().unwrap_or("(legacy scope)"));
    let _ = writeln!(out, "State dir: {}", scope.state_dir().display());
    let _ = writeln!(out);

    let _ = writeln!(out, "── Mode States ───────────────────────────────────────────");
    let states = store.all_states();
    if states.is_empty() {
        let _ = writeln!(out, "  (no mode state files)");
    }
    for (mode, state) in &states {
        let marker = match (state.active, is_stale(state, DECISION_STALE_THRESHOLD_MS, now)) {
            (true, false) if state.is_exhausted() => "✗ EXHAUSTED",
            (true, false) => "● ACTIVE",
            (true, true) => "◌ STALE",
            (false, _) => "○ INACTIVE",
        };
        let _ = writeln!(
            out,
            "  {:<11} {:<12} reinforcements {}/{}  last checked {}",
            mode.name(),
            marker,
            state.reinforcement_count,
            state.max_reinforcements,
            state.last_checked_at.as_deref().unwrap_or("never")
        );
        if !scope.owns(state.session_id.as_deref(), state.project_path.as_deref()) {
            let _ = writeln!(
                out,
                "       └─ owned by session {} / project {}",
                state.session_id.as_deref().unwrap_or("-"),
                state.project_path.as_deref().unwrap_or("-")
            );
        }
    }
    if let Some(summary) = store.read_swarm_summary() {
        let _ = writeln!(
            out,
            "  {:<11} {:<12} {} agent(s), {} task(s) outstanding",
            ModeKind::Swarm.name(),
            if summary.active { "● ACTIVE" } else { "○ INACTIVE" },
            summary.agent_count,
            summary.outstanding_tasks()
        );
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "── Would Block Stop ──────────────────────────────────────");
    match blocking_mode(&store, now) {
        Some(mode) => {
            let _ = writeln!(out, "  {}", mode.name());
        }
        None => {
            let _ = writeln!(out, "  (nothing: stop would be allowed)");
        }
    }

    out
}
