//! Declarative trigger table: which phrases activate which mode.
//!
//! Every pattern is word-boundary anchored and runs against sanitized,
//! lowercased prompt text. A mode matches if any one of its patterns does.
//! Cancellation triggers are compound tokens so ordinary prose cannot
//! cancel a running mode by accident.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::{ModeKind, ModeMatch};

/// Longest `args` tail carried from the prompt into a match.
const MAX_ARGS_CHARS: usize = 500;

/// Words that turn "team" into ordinary prose ("my team", "the team").
const TEAM_QUALIFIERS: &[&str] = &["my", "the", "our", "a", "his", "her", "their", "its", "your"];

/// A single trigger phrase.
#[derive(Debug)]
pub struct ActivationPattern {
    regex: Regex,
    /// A match is discarded when the word right before it is in this list.
    rejected_qualifiers: &'static [&'static str],
}

impl ActivationPattern {
    fn new(pattern: &str) -> Self {
        Self::qualified(pattern, &[])
    }

    fn qualified(pattern: &str, rejected_qualifiers: &'static [&'static str]) -> Self {
        Self {
            regex: Regex::new(pattern).unwrap(),
            rejected_qualifiers,
        }
    }

    /// Byte offset just past the first acceptable match.
    fn find_end(&self, text: &str) -> Option<usize> {
        self.regex
            .find_iter(text)
            .find(|m| !self.is_qualified(&text[..m.start()]))
            .map(|m| m.end())
    }

    fn is_qualified(&self, before: &str) -> bool {
        if self.rejected_qualifiers.is_empty() {
            return false;
        }
        before
            .split_whitespace()
            .last()
            .is_some_and(|word| self.rejected_qualifiers.contains(&word))
    }
}

/// Static definition of one keyword-activated mode.
#[derive(Debug)]
pub struct ModeDefinition {
    pub mode: ModeKind,
    pub patterns: Vec<ActivationPattern>,
    /// Whether activation writes a state file that outlives the turn.
    pub persists: bool,
    /// Only evaluated when the coordinated-team feature flag is on.
    pub requires_team_flag: bool,
}

impl ModeDefinition {
    fn new(mode: ModeKind, patterns: Vec<ActivationPattern>) -> Self {
        Self {
            mode,
            patterns,
            persists: mode.persists(),
            requires_team_flag: mode == ModeKind::Team,
        }
    }

    fn find_end(&self, text: &str) -> Option<usize> {
        self.patterns
            .iter()
            .filter_map(|pattern| pattern.find_end(text))
            .min()
    }
}

pub static MODE_DEFINITIONS: Lazy<Vec<ModeDefinition>> = Lazy::new(|| {
    use ActivationPattern as P;
    vec![
        ModeDefinition::new(ModeKind::Cancel, vec![P::new(r"\b(?:cancelomc|stopomc)\b")]),
        ModeDefinition::new(
            ModeKind::Ralph,
            vec![
                P::new(r"\bralph\b"),
                P::new(r"\bdon['’]?t stop\b"),
                P::new(r"\bmust complete\b"),
                P::new(r"\bkeep going until\b"),
            ],
        ),
        ModeDefinition::new(
            ModeKind::Autopilot,
            vec![
                P::new(r"\bauto[- ]?pilot\b"),
                P::new(r"\bfull auto\b"),
                P::new(r"\bfullsend\b"),
            ],
        ),
        ModeDefinition::new(
            ModeKind::Team,
            vec![
                P::qualified(r"\bteam\b", TEAM_QUALIFIERS),
                P::new(r"\bcoordinated team\b"),
            ],
        ),
        ModeDefinition::new(
            ModeKind::Ultrapilot,
            vec![P::new(r"\bultra-?pilot\b"), P::new(r"\bparallel build\b")],
        ),
        ModeDefinition::new(
            ModeKind::Ultrawork,
            vec![P::new(r"\bultrawork\b"), P::new(r"\bulw\b")],
        ),
        ModeDefinition::new(
            ModeKind::Ecomode,
            vec![
                P::new(r"\beco\b"),
                P::new(r"\beco-?mode\b"),
                P::new(r"\bsave[- ]tokens\b"),
            ],
        ),
        ModeDefinition::new(
            ModeKind::Swarm,
            vec![
                P::new(r"\bswarm\s+\d+\s+agents?\b"),
                P::new(r"\bswarm mode\b"),
                P::new(r"\bcoordinated agents\b"),
            ],
        ),
        ModeDefinition::new(
            ModeKind::Pipeline,
            vec![P::new(r"\bpipeline\b"), P::new(r"\bchain agents\b")],
        ),
        ModeDefinition::new(ModeKind::Ralplan, vec![P::new(r"\bralplan\b")]),
        ModeDefinition::new(
            ModeKind::Plan,
            vec![
                P::new(r"\bplan (?:this|the)\b"),
                P::new(r"\bdeep[- ]interview\b"),
                P::new(r"\binterview me\b"),
            ],
        ),
        ModeDefinition::new(
            ModeKind::Tdd,
            vec![
                P::new(r"\btdd\b"),
                P::new(r"\btest[- ]first\b"),
                P::new(r"\bred[- ]green\b"),
            ],
        ),
        ModeDefinition::new(ModeKind::Research, vec![P::new(r"\bresearch\b")]),
        ModeDefinition::new(
            ModeKind::Ultrathink,
            vec![P::new(r"\bultrathink\b"), P::new(r"\bthink (?:hard|deeply)\b")],
        ),
        ModeDefinition::new(
            ModeKind::Deepsearch,
            vec![
                P::new(r"\bdeep[- ]?search\b"),
                P::new(r"\bsearch (?:the|this) codebase\b"),
                P::new(r"\bfind in (?:the )?codebase\b"),
            ],
        ),
        ModeDefinition::new(
            ModeKind::Analyze,
            vec![P::new(r"\bdeep[- ]?analy[sz]e\b"), P::new(r"\binvestigate\b")],
        ),
        ModeDefinition::new(
            ModeKind::Codex,
            vec![P::new(r"\b(?:ask|use|delegate to) (?:codex|gpt)\b")],
        ),
        ModeDefinition::new(
            ModeKind::Gemini,
            vec![P::new(r"\b(?:ask|use|delegate to) gemini\b")],
        ),
    ]
});

/// Inputs that gate parts of the trigger table.
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchOptions {
    pub team_enabled: bool,
}

/// Evaluates the trigger table against sanitized, lowercased text.
///
/// Output order carries no meaning; the resolver imposes priority.
pub fn match_modes(text: &str, options: MatchOptions) -> Vec<ModeMatch> {
    MODE_DEFINITIONS
        .iter()
        .filter(|def| options.team_enabled || !def.requires_team_flag)
        .filter_map(|def| {
            def.find_end(text)
                .map(|end| ModeMatch::new(def.mode, trailing_args(&text[end..])))
        })
        .collect()
}

fn trailing_args(rest: &str) -> String {
    rest.trim_start_matches(|c: char| c.is_whitespace() || c == ',' || c == ':')
        .trim_end()
        .chars()
        .take(MAX_ARGS_CHARS)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn modes(text: &str, team_enabled: bool) -> Vec<ModeKind> {
        let mut found: Vec<_> = match_modes(text, MatchOptions { team_enabled })
            .into_iter()
            .map(|m| m.mode)
            .collect();
        found.sort();
        found
    }

    #[test]
    fn ralph_phrase_matches_once() {
        assert_eq!(
            modes("ralph, don't stop until this is done", false),
            vec![ModeKind::Ralph]
        );
    }

    #[test]
    fn cancel_requires_compound_token() {
        assert_eq!(modes("cancelomc", false), vec![ModeKind::Cancel]);
        assert!(modes("please cancel that", false).is_empty());
        assert!(modes("stop omc", false).is_empty());
    }

    #[test]
    fn team_is_gated_by_feature_flag() {
        assert!(modes("team build the api", false).is_empty());
        assert_eq!(modes("team build the api", true), vec![ModeKind::Team]);
    }

    #[test]
    fn possessive_team_is_prose() {
        assert!(modes("ask my team about it", true).is_empty());
        assert!(modes("the team agreed", true).is_empty());
        assert_eq!(modes("the team agreed, team go", true), vec![ModeKind::Team]);
    }

    #[test]
    fn word_boundaries_are_respected() {
        assert!(modes("ralphie and ecological", false).is_empty());
        assert_eq!(modes("eco please", false), vec![ModeKind::Ecomode]);
    }

    #[test]
    fn multiple_modes_can_match() {
        assert_eq!(
            modes("ultrawork with tdd and deepsearch", false),
            vec![ModeKind::Ultrawork, ModeKind::Tdd, ModeKind::Deepsearch]
        );
    }

    #[test]
    fn args_carry_the_trailing_prompt() {
        let matches = match_modes("pipeline: explore -> fix", MatchOptions::default());
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].args, "explore -> fix");
    }

    #[test]
    fn delegation_modes_need_a_verb() {
        assert!(modes("codex is a tool", false).is_empty());
        assert_eq!(modes("ask codex to review", false), vec![ModeKind::Codex]);
        assert_eq!(modes("use gemini for ui", false), vec![ModeKind::Gemini]);
    }
}
