//! Core types shared by the keyword pipeline, the state store and the
//! continuation engine.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::OmcError;

// ═══════════════════════════════════════════════════════════════════════════════
// Modes
// ═══════════════════════════════════════════════════════════════════════════════

/// Every mode the engine knows about.
///
/// Variant order is the resolver's total priority order: `Ord` is derived,
/// so sorting a list of modes yields the canonical activation order.
/// `UltraQa` has no trigger phrase and sorts last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModeKind {
    Cancel,
    Ralph,
    Autopilot,
    Team,
    Ultrapilot,
    Ultrawork,
    Ecomode,
    Swarm,
    Pipeline,
    Ralplan,
    Plan,
    Tdd,
    Research,
    Ultrathink,
    Deepsearch,
    Analyze,
    Codex,
    Gemini,
    #[serde(rename = "ultraqa")]
    UltraQa,
}

impl ModeKind {
    /// All modes in priority order.
    pub const ALL: [ModeKind; 19] = [
        ModeKind::Cancel,
        ModeKind::Ralph,
        ModeKind::Autopilot,
        ModeKind::Team,
        ModeKind::Ultrapilot,
        ModeKind::Ultrawork,
        ModeKind::Ecomode,
        ModeKind::Swarm,
        ModeKind::Pipeline,
        ModeKind::Ralplan,
        ModeKind::Plan,
        ModeKind::Tdd,
        ModeKind::Research,
        ModeKind::Ultrathink,
        ModeKind::Deepsearch,
        ModeKind::Analyze,
        ModeKind::Codex,
        ModeKind::Gemini,
        ModeKind::UltraQa,
    ];

    /// Modes that own a `<mode>-state.json` file, in the order the
    /// continuation engine walks them.
    pub const PERSISTENT: [ModeKind; 8] = [
        ModeKind::Ralph,
        ModeKind::Autopilot,
        ModeKind::Team,
        ModeKind::Ultrapilot,
        ModeKind::Ultrawork,
        ModeKind::Ecomode,
        ModeKind::Pipeline,
        ModeKind::UltraQa,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ModeKind::Cancel => "cancel",
            ModeKind::Ralph => "ralph",
            ModeKind::Autopilot => "autopilot",
            ModeKind::Team => "team",
            ModeKind::Ultrapilot => "ultrapilot",
            ModeKind::Ultrawork => "ultrawork",
            ModeKind::Ecomode => "ecomode",
            ModeKind::Swarm => "swarm",
            ModeKind::Pipeline => "pipeline",
            ModeKind::Ralplan => "ralplan",
            ModeKind::Plan => "plan",
            ModeKind::Tdd => "tdd",
            ModeKind::Research => "research",
            ModeKind::Ultrathink => "ultrathink",
            ModeKind::Deepsearch => "deepsearch",
            ModeKind::Analyze => "analyze",
            ModeKind::Codex => "codex",
            ModeKind::Gemini => "gemini",
            ModeKind::UltraQa => "ultraqa",
        }
    }

    /// Whether activating this mode writes a state file.
    pub fn persists(self) -> bool {
        Self::PERSISTENT.contains(&self)
    }

    /// File name of this mode's state record.
    pub fn state_file_name(self) -> String {
        format!("{}-state.json", self.name())
    }
}

impl fmt::Display for ModeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ModeKind {
    type Err = OmcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        ModeKind::ALL
            .into_iter()
            .find(|mode| mode.name() == needle)
            .ok_or_else(|| OmcError::UnknownMode(s.to_string()))
    }
}

/// One activation produced by the matcher, consumed by the resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeMatch {
    pub mode: ModeKind,
    /// Prompt text following the trigger phrase (may be empty).
    pub args: String,
}

impl ModeMatch {
    pub fn new(mode: ModeKind, args: impl Into<String>) -> Self {
        Self {
            mode,
            args: args.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ord_follows_priority_table() {
        let mut modes = vec![ModeKind::Gemini, ModeKind::Ultrawork, ModeKind::Ralph];
        modes.sort();
        assert_eq!(
            modes,
            vec![ModeKind::Ralph, ModeKind::Ultrawork, ModeKind::Gemini]
        );
        let mut all = ModeKind::ALL.to_vec();
        all.sort();
        assert_eq!(all, ModeKind::ALL.to_vec());
    }

    #[test]
    fn parses_names_case_insensitively() {
        assert_eq!("Ralph".parse::<ModeKind>().unwrap(), ModeKind::Ralph);
        assert_eq!("ultraqa".parse::<ModeKind>().unwrap(), ModeKind::UltraQa);
        assert!("nope".parse::<ModeKind>().is_err());
    }

    #[test]
    fn serde_uses_wire_names() {
        let json = serde_json::to_string(&ModeKind::UltraQa).unwrap();
        assert_eq!(json, "\"ultraqa\"");
        let parsed: ModeKind = serde_json::from_str("\"deepsearch\"").unwrap();
        assert_eq!(parsed, ModeKind::Deepsearch);
    }

    #[test]
    fn only_stateful_modes_persist() {
        assert!(ModeKind::Ralph.persists());
        assert!(ModeKind::UltraQa.persists());
        assert!(!ModeKind::Swarm.persists());
        assert!(!ModeKind::Cancel.persists());
        assert_eq!(ModeKind::Team.state_file_name(), "team-state.json");
    }
}
