//! Keyword detection: prompt text in, ordered mode activations out.
//!
//! ```text
//! prompt → sanitize → lowercase → match_modes → resolve → [ModeMatch]
//! ```
//!
//! - [`sanitize`]: strips tags, URLs, paths and code so quoted text cannot trigger
//! - [`matcher`]: the trigger table, gated by the team feature flag
//! - [`resolver`]: exclusivity, overrides, synthesis and priority order

pub mod matcher;
pub mod resolver;
pub mod sanitize;

pub use matcher::{match_modes, MatchOptions, ModeDefinition, MODE_DEFINITIONS};
pub use resolver::{needs_team_link, resolve, OVERRIDES};
pub use sanitize::{normalize_for_matching, sanitize};

use crate::types::ModeMatch;

/// Runs the full detection pipeline over a raw user prompt.
pub fn detect_modes(prompt: &str, options: MatchOptions) -> Vec<ModeMatch> {
    let text = normalize_for_matching(prompt);
    if text.trim().is_empty() {
        return Vec::new();
    }
    resolve(match_modes(&text, options))
}
