//! Turns raw matcher output into the final, ordered activation list.
//!
//! Rules apply in this order:
//!
//! 1. Deduplicate by mode, first occurrence keeps its `args`.
//! 2. `cancel` is globally exclusive.
//! 3. Pairwise overrides from [`OVERRIDES`].
//! 4. `ralph` implies `ultrawork` unless `ecomode` was requested.
//! 5. Sort by [`ModeKind`] priority.
//!
//! `ralph` and `team` deliberately have no override between them; when both
//! survive, the activation writer links their states.

use std::collections::HashSet;

use crate::types::{ModeKind, ModeMatch};

/// `(winner, loser)`: if both are present the loser is dropped.
pub const OVERRIDES: [(ModeKind, ModeKind); 4] = [
    (ModeKind::Ecomode, ModeKind::Ultrawork),
    (ModeKind::Team, ModeKind::Ultrapilot),
    (ModeKind::Team, ModeKind::Swarm),
    (ModeKind::Team, ModeKind::Autopilot),
];

/// Resolves conflicts among simultaneously matched modes.
pub fn resolve(matches: Vec<ModeMatch>) -> Vec<ModeMatch> {
    let mut seen = HashSet::new();
    let mut resolved: Vec<ModeMatch> = matches
        .into_iter()
        .filter(|m| seen.insert(m.mode))
        .collect();

    if let Some(cancel) = resolved.iter().find(|m| m.mode == ModeKind::Cancel) {
        return vec![cancel.clone()];
    }

    let present: HashSet<ModeKind> = resolved.iter().map(|m| m.mode).collect();
    let evicted: HashSet<ModeKind> = OVERRIDES
        .iter()
        .filter(|(winner, loser)| present.contains(winner) && present.contains(loser))
        .map(|(_, loser)| *loser)
        .collect();
    resolved.retain(|m| !evicted.contains(&m.mode));

    if let Some(synthesized) = persistence_implies_parallelism(&resolved) {
        resolved.push(synthesized);
    }

    resolved.sort_by_key(|m| m.mode);
    resolved
}

/// Persistence runs in parallel by default: `ralph` pulls in `ultrawork`
/// unless the cheaper `ecomode` (or `ultrawork` itself) is already present.
pub fn persistence_implies_parallelism(resolved: &[ModeMatch]) -> Option<ModeMatch> {
    let has = |mode: ModeKind| resolved.iter().any(|m| m.mode == mode);
    if has(ModeKind::Ralph) && !has(ModeKind::Ecomode) && !has(ModeKind::Ultrawork) {
        Some(ModeMatch::new(ModeKind::Ultrawork, ""))
    } else {
        None
    }
}

/// True when the resolved list needs the ralph/team linking step.
pub fn needs_team_link(resolved: &[ModeMatch]) -> bool {
    let has = |mode: ModeKind| resolved.iter().any(|m| m.mode == mode);
    has(ModeKind::Ralph) && has(ModeKind::Team)
}
