//! Hook payload normalization and hook responses.
//!
//! Claude Code (and older tooling) describe the same event with different
//! field names: `session_id`/`sessionId`, `cwd`/`directory`, `prompt` or a
//! message body. Everything is folded into one [`HookEvent`] here, before
//! any business logic runs.
//!
//! ## Event mapping
//!
//! ```text
//! SessionStart      → SessionStart
//! UserPromptSubmit  → PromptSubmit { prompt }
//! Stop              → Stop(StopEvent)
//! SubagentStop      → SubagentStop
//! SessionEnd        → SessionEnd
//! anything else     → Unknown
//! ```

use serde::Serialize;
use serde_json::{Map, Value};
use std::path::PathBuf;

/// Raw hook payload. Alias pairs are kept as separate fields so a payload
/// carrying both spellings still reads, and each field is extracted on its
/// own so one mistyped value never costs the others.
#[derive(Debug, Clone, Default)]
pub struct HookInput {
    pub hook_event_name: Option<String>,
    pub hook_event_name_camel: Option<String>,

    pub session_id: Option<String>,
    pub session_id_camel: Option<String>,

    pub cwd: Option<String>,
    pub directory: Option<String>,

    pub prompt: Option<String>,
    pub user_prompt: Option<String>,
    pub message: Option<Value>,
    pub parts: Option<Vec<Value>>,

    pub stop_reason: Option<String>,
    pub stop_reason_camel: Option<String>,
    pub end_turn_reason: Option<String>,
    pub end_turn_reason_camel: Option<String>,
    pub user_requested: Option<bool>,
    pub user_requested_camel: Option<bool>,
    pub stop_hook_active: Option<bool>,

    pub transcript_path: Option<String>,
}

/// Normalized stop signal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StopEvent {
    pub stop_reason: Option<String>,
    pub end_turn_reason: Option<String>,
    pub user_requested: bool,
    /// Claude Code sets this when the stop follows an earlier block.
    pub stop_hook_active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookEvent {
    SessionStart,
    PromptSubmit { prompt: String },
    Stop(StopEvent),
    /// A sub-agent finished; the session itself is not stopping.
    SubagentStop,
    SessionEnd,
    Unknown { event_name: String },
}

impl HookInput {
    /// Parses a payload. Returns `None` unless the input is a JSON object.
    pub fn parse(raw: &str) -> Option<Self> {
        match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(fields)) => Some(Self::from_fields(&fields)),
            Ok(other) => {
                tracing::warn!(kind = json_kind(&other), "Hook input is not a JSON object");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "Unreadable hook input");
                None
            }
        }
    }

    fn from_fields(fields: &Map<String, Value>) -> Self {
        let text = |key: &str| fields.get(key).and_then(Value::as_str).map(str::to_string);
        let flag = |key: &str| fields.get(key).and_then(as_flag);

        Self {
            hook_event_name: text("hook_event_name"),
            hook_event_name_camel: text("hookEventName"),
            session_id: text("session_id"),
            session_id_camel: text("sessionId"),
            cwd: text("cwd"),
            directory: text("directory"),
            prompt: text("prompt"),
            user_prompt: text("user_prompt"),
            message: fields.get("message").filter(|v| v.is_object()).cloned(),
            parts: fields.get("parts").and_then(Value::as_array).cloned(),
            stop_reason: text("stop_reason"),
            stop_reason_camel: text("stopReason"),
            end_turn_reason: text("end_turn_reason"),
            end_turn_reason_camel: text("endTurnReason"),
            user_requested: flag("user_requested"),
            user_requested_camel: flag("userRequested"),
            stop_hook_active: flag("stop_hook_active"),
            transcript_path: text("transcript_path"),
        }
    }

    pub fn event_name(&self) -> Option<&str> {
        first_non_empty(&[&self.hook_event_name, &self.hook_event_name_camel])
    }

    pub fn session_id(&self) -> Option<&str> {
        first_non_empty(&[&self.session_id, &self.session_id_camel])
    }

    pub fn cwd(&self) -> Option<&str> {
        first_non_empty(&[&self.cwd, &self.directory])
    }

    /// Working directory of the event, or of this process when absent.
    pub fn resolve_cwd(&self) -> Option<PathBuf> {
        self.cwd()
            .map(PathBuf::from)
            .or_else(|| std::env::current_dir().ok())
    }

    /// Prompt text from whichever field carries it.
    pub fn prompt_text(&self) -> Option<String> {
        if let Some(prompt) = first_non_empty(&[&self.prompt, &self.user_prompt]) {
            return Some(prompt.to_string());
        }

        if let Some(text) = self
            .message
            .as_ref()
            .and_then(|message| message.get("content"))
            .and_then(content_text)
        {
            return Some(text);
        }

        self.parts.as_ref().and_then(|parts| {
            let joined = parts
                .iter()
                .filter_map(|part| part.get("text").and_then(Value::as_str))
                .collect::<Vec<_>>()
                .join(" ");
            (!joined.is_empty()).then_some(joined)
        })
    }

    pub fn stop_event(&self) -> StopEvent {
        StopEvent {
            stop_reason: first_non_empty(&[&self.stop_reason, &self.stop_reason_camel])
                .map(str::to_string),
            end_turn_reason: first_non_empty(&[&self.end_turn_reason, &self.end_turn_reason_camel])
                .map(str::to_string),
            user_requested: self.user_requested.or(self.user_requested_camel).unwrap_or(false),
            stop_hook_active: self.stop_hook_active.unwrap_or(false),
        }
    }

    pub fn to_event(&self) -> HookEvent {
        match self.event_name().unwrap_or_default() {
            "SessionStart" => HookEvent::SessionStart,
            "UserPromptSubmit" => HookEvent::PromptSubmit {
                prompt: self.prompt_text().unwrap_or_default(),
            },
            "Stop" => HookEvent::Stop(self.stop_event()),
            "SubagentStop" => HookEvent::SubagentStop,
            "SessionEnd" => HookEvent::SessionEnd,
            other => HookEvent::Unknown {
                event_name: other.to_string(),
            },
        }
    }
}

/// Booleans sometimes arrive as strings or 0/1.
fn as_flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_i64().map(|n| n != 0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Some(true),
            "false" | "0" | "no" | "" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn first_non_empty<'a>(candidates: &[&'a Option<String>]) -> Option<&'a str> {
    candidates
        .iter()
        .filter_map(|candidate| candidate.as_deref())
        .find(|value| !value.trim().is_empty())
}

/// `content` is either a string or a list of `{type: "text", text}` blocks.
fn content_text(content: &Value) -> Option<String> {
    match content {
        Value::String(s) => Some(s.clone()),
        Value::Array(blocks) => {
            let joined = blocks
                .iter()
                .filter_map(|block| block.get("text").and_then(Value::as_str))
                .collect::<Vec<_>>()
                .join(" ");
            (!joined.is_empty()).then_some(joined)
        }
        _ => None,
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Output
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HookSpecificOutput {
    #[serde(rename = "hookEventName")]
    pub hook_event_name: String,
    #[serde(rename = "additionalContext")]
    pub additional_context: String,
}

/// The single JSON object a hook prints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HookOutput {
    #[serde(rename = "continue", skip_serializing_if = "Option::is_none")]
    pub continue_session: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(rename = "hookSpecificOutput", skip_serializing_if = "Option::is_none")]
    pub hook_specific_output: Option<HookSpecificOutput>,
}

impl HookOutput {
    /// `{"continue": true}`: let the host proceed normally.
    pub fn passthrough() -> Self {
        Self {
            continue_session: Some(true),
            decision: None,
            reason: None,
            hook_specific_output: None,
        }
    }

    /// `{"decision": "block", "reason": ...}`: refuse the stop.
    pub fn block(reason: impl Into<String>) -> Self {
        Self {
            continue_session: None,
            decision: Some("block".to_string()),
            reason: Some(reason.into()),
            hook_specific_output: None,
        }
    }

    /// Passthrough that injects extra context for the assistant.
    pub fn with_context(event_name: &str, context: impl Into<String>) -> Self {
        Self {
            hook_specific_output: Some(HookSpecificOutput {
                hook_event_name: event_name.to_string(),
                additional_context: context.into(),
            }),
            ..Self::passthrough()
        }
    }

    pub fn is_block(&self) -> bool {
        self.decision.as_deref() == Some("block")
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| r#"{"continue":true}"#.to_string())
    }
}
