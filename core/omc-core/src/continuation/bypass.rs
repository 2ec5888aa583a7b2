//! Stop reasons that end the session no matter which modes are active.
//!
//! Blocking these would deadlock the host: it cannot reclaim context, honor
//! a user cancellation, or recover from a failed login by continuing.

use crate::hook::StopEvent;

const CONTEXT_LIMIT_MARKERS: [&str; 9] = [
    "context_limit",
    "context_window",
    "context_exceeded",
    "context_full",
    "max_context",
    "token_limit",
    "max_tokens",
    "conversation_too_long",
    "input_too_long",
];

const ABORT_EXACT: [&str; 4] = ["aborted", "abort", "cancel", "interrupt"];
const ABORT_MARKERS: [&str; 4] = ["user_cancel", "user_interrupt", "ctrl_c", "manual_stop"];

const AUTH_MARKERS: [&str; 4] = ["authentication", "unauthorized", "401", "403"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopBypass {
    ContextLimit,
    UserAbort,
    AuthFailure,
}

impl StopBypass {
    pub fn as_str(self) -> &'static str {
        match self {
            StopBypass::ContextLimit => "context_limit",
            StopBypass::UserAbort => "user_abort",
            StopBypass::AuthFailure => "auth_failure",
        }
    }
}

/// Returns the bypass a stop event qualifies for, if any.
///
/// Context limits win over aborts, which win over auth failures; the order
/// only matters for the reported reason.
pub fn classify_stop(event: &StopEvent) -> Option<StopBypass> {
    let reasons: Vec<String> = [&event.stop_reason, &event.end_turn_reason]
        .into_iter()
        .flatten()
        .map(|reason| reason.trim().to_lowercase())
        .filter(|reason| !reason.is_empty())
        .collect();

    let any_contains = |markers: &[&str]| {
        reasons
            .iter()
            .any(|reason| markers.iter().any(|marker| reason.contains(marker)))
    };

    if any_contains(&CONTEXT_LIMIT_MARKERS) {
        return Some(StopBypass::ContextLimit);
    }

    let exact_abort = reasons
        .iter()
        .any(|reason| ABORT_EXACT.contains(&reason.as_str()));
    if event.user_requested || exact_abort || any_contains(&ABORT_MARKERS) {
        return Some(StopBypass::UserAbort);
    }

    if any_contains(&AUTH_MARKERS) {
        return Some(StopBypass::AuthFailure);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_reason(reason: &str) -> StopEvent {
        StopEvent {
            stop_reason: Some(reason.to_string()),
            ..StopEvent::default()
        }
    }

    #[test]
    fn context_limit_reasons() {
        for reason in ["context_window_exceeded", "MAX_TOKENS", "conversation_too_long"] {
            assert_eq!(classify_stop(&with_reason(reason)), Some(StopBypass::ContextLimit), "{reason}");
        }
    }

    #[test]
    fn end_turn_reason_is_checked_too() {
        let event = StopEvent {
            stop_reason: Some("end_turn".into()),
            end_turn_reason: Some("token_limit_reached".into()),
            ..StopEvent::default()
        };
        assert_eq!(classify_stop(&event), Some(StopBypass::ContextLimit));
    }

    #[test]
    fn user_abort_signals() {
        assert_eq!(classify_stop(&with_reason("abort")), Some(StopBypass::UserAbort));
        assert_eq!(classify_stop(&with_reason("user_cancel_request")), Some(StopBypass::UserAbort));
        let requested = StopEvent {
            user_requested: true,
            ..StopEvent::default()
        };
        assert_eq!(classify_stop(&requested), Some(StopBypass::UserAbort));
    }

    #[test]
    fn abort_words_must_match_exactly() {
        // "cancelled_by_tool" is not a user abort.
        assert_eq!(classify_stop(&with_reason("cancelled_by_tool")), None);
    }

    #[test]
    fn auth_failures() {
        assert_eq!(classify_stop(&with_reason("http 401")), Some(StopBypass::AuthFailure));
        assert_eq!(classify_stop(&with_reason("Unauthorized")), Some(StopBypass::AuthFailure));
    }

    #[test]
    fn ordinary_stops_have_no_bypass() {
        assert_eq!(classify_stop(&with_reason("end_turn")), None);
        assert_eq!(classify_stop(&StopEvent::default()), None);
    }
}
