//! Compiled regex patterns for prompt sanitization and session-id checks.
//!
//! These patterns are compiled once on first use and reused for every
//! prompt the hook sees. Update these when prompt framing conventions change.

use once_cell::sync::Lazy;
use regex::Regex;

// ═══════════════════════════════════════════════════════════════════════════════
// Prompt Sanitization Regexes
// ═══════════════════════════════════════════════════════════════════════════════

/// Opening tag of an XML-like block. The matching close tag is located by
/// name in code, since the regex crate has no backreferences.
pub static RE_OPEN_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<([A-Za-z][\w-]*)(?:\s[^<>]*)?>").unwrap());
pub static RE_SELF_CLOSING_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<[A-Za-z][\w-]*(?:\s[^<>]*)?/>").unwrap());
pub static RE_URL: Lazy<Regex> = Lazy::new(|| Regex::new(r"https?://\S+").unwrap());
/// A `word/word/.../word` run, optionally rooted at `/`. Group 1 keeps the
/// boundary character that preceded the path.
pub static RE_FILE_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?m)(^|[\s"'`(])/?(?:[\w.-]+/)+[\w.-]+"#).unwrap());
pub static RE_FENCED_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)```.*?```").unwrap());
pub static RE_INLINE_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"`[^`\n]+`").unwrap());

// ═══════════════════════════════════════════════════════════════════════════════
// Scope Validation
// ═══════════════════════════════════════════════════════════════════════════════

/// Session ids become directory names, so only a conservative alphabet passes.
pub static RE_SESSION_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_-]{0,255}$").unwrap());

// ═══════════════════════════════════════════════════════════════════════════════
// Pipeline Stage Parsing
// ═══════════════════════════════════════════════════════════════════════════════

/// Splits `explore -> plan -> execute` style stage chains.
pub static RE_STAGE_ARROW: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*(?:->|→|=>)\s*").unwrap());
