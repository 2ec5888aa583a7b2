//! Prompt sanitization ahead of keyword matching.
//!
//! Removes every region of a prompt that quotes rather than instructs, so a
//! mode name inside a pasted snippet, a URL or a file path cannot trigger an
//! activation. Removal order is fixed: tag blocks, self-closing tags, URLs,
//! file paths, fenced code, inline code.

use crate::patterns::{
    RE_FENCED_CODE, RE_FILE_PATH, RE_INLINE_CODE, RE_OPEN_TAG, RE_SELF_CLOSING_TAG, RE_URL,
};

/// Strips quoted regions from `text`. Pure and case-preserving.
pub fn sanitize(text: &str) -> String {
    let without_blocks = strip_tag_blocks(text);
    let without_tags = RE_SELF_CLOSING_TAG.replace_all(&without_blocks, "");
    let without_urls = RE_URL.replace_all(&without_tags, "");
    let without_paths = RE_FILE_PATH.replace_all(&without_urls, "${1}");
    let without_fences = RE_FENCED_CODE.replace_all(&without_paths, "");
    RE_INLINE_CODE.replace_all(&without_fences, "").into_owned()
}

/// Sanitizes and case-folds a prompt for the matcher.
pub fn normalize_for_matching(text: &str) -> String {
    sanitize(text).to_lowercase()
}

/// Removes `<name ...>body</name>` blocks, bodies included.
///
/// The nearest closing tag with the same name ends the block. An opening tag
/// with no closing partner is left in place.
fn strip_tag_blocks(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(open) = RE_OPEN_TAG.captures(rest) {
        let (Some(whole), Some(name)) = (open.get(0), open.get(1)) else {
            break;
        };
        let after_open = &rest[whole.end()..];
        let closing = format!("</{}>", name.as_str());

        match after_open.find(&closing) {
            Some(idx) => {
                out.push_str(&rest[..whole.start()]);
                rest = &after_open[idx + closing.len()..];
            }
            None => {
                out.push_str(&rest[..whole.end()]);
                rest = after_open;
            }
        }
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removes_tag_blocks_with_multiline_bodies() {
        let input = "before <system-reminder>\nralph\nultrawork\n</system-reminder> after";
        assert_eq!(sanitize(input), "before  after");
    }

    #[test]
    fn keeps_unclosed_tags() {
        assert_eq!(sanitize("a <b> ralph"), "a <b> ralph");
    }

    #[test]
    fn removes_self_closing_tags() {
        assert_eq!(sanitize("x <ralph mode=\"on\"/> y"), "x  y");
    }

    #[test]
    fn removes_urls() {
        let out = sanitize("see https://example.com/ralph/docs for ralph");
        assert!(!out.contains("example.com"));
        assert!(out.ends_with("for ralph"));
    }

    #[test]
    fn removes_file_paths_but_keeps_boundary() {
        assert_eq!(sanitize("open src/ultrawork/mod.rs now"), "open  now");
        assert_eq!(sanitize("(/tmp/team/x)"), "()");
    }

    #[test]
    fn removes_fenced_and_inline_code() {
        let input = "fix it\n```\nautopilot run\n```\nand `ultrawork` too";
        let out = sanitize(input);
        assert!(!out.contains("autopilot"));
        assert!(!out.contains("ultrawork"));
        assert!(out.contains("fix it"));
    }

    #[test]
    fn preserves_case_until_normalized() {
        assert_eq!(sanitize("RALPH go"), "RALPH go");
        assert_eq!(normalize_for_matching("RALPH go"), "ralph go");
    }

    #[test]
    fn tag_bodies_go_before_code_is_considered() {
        // A backtick inside a tag body must not pair with one outside it.
        let input = "<note>`</note> ralph `x`";
        assert_eq!(sanitize(input), " ralph ");
    }
}
