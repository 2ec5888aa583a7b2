//! Flow trace: an append-only record of what the engine decided and why.
//!
//! Tracing is fire-and-forget. A tracer must never fail the caller; the
//! JSONL tracer logs write failures and moves on.

use chrono::Utc;
use fs_err::{self as fs, OpenOptions};
use serde::Serialize;
use std::cell::RefCell;
use std::io::Write as _;

use crate::state::{format_timestamp, StateScope};
use crate::types::ModeKind;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum FlowEvent {
    KeywordDetected { keyword: ModeKind },
    ModeActivated { mode: ModeKind },
    ModeCancelled { modes: Vec<ModeKind> },
    StopBlocked { mode: ModeKind, reinforcement_count: u32 },
    StopAllowed { reason: String },
}

pub trait FlowTracer {
    fn record(&self, scope: &StateScope, event: &FlowEvent);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTracer;

impl FlowTracer for NoopTracer {
    fn record(&self, _scope: &StateScope, _event: &FlowEvent) {}
}

/// Keeps events in memory, for callers that want to inspect them afterwards.
#[derive(Debug, Default)]
pub struct MemoryTracer {
    events: RefCell<Vec<FlowEvent>>,
}

impl MemoryTracer {
    pub fn events(&self) -> Vec<FlowEvent> {
        self.events.borrow().clone()
    }
}

impl FlowTracer for MemoryTracer {
    fn record(&self, _scope: &StateScope, event: &FlowEvent) {
        self.events.borrow_mut().push(event.clone());
    }
}

/// Appends one JSON object per event to the scope's `flow-trace.jsonl`.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonlFlowTracer;

#[derive(Serialize)]
struct TraceLine<'a> {
    at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    session_id: Option<&'a str>,
    #[serde(flatten)]
    event: &'a FlowEvent,
}

impl JsonlFlowTracer {
    fn append(scope: &StateScope, event: &FlowEvent) -> std::io::Result<()> {
        let path = scope.flow_trace_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let line = TraceLine {
            at: format_timestamp(Utc::now()),
            session_id: scope.session_id(),
            event,
        };
        let mut json = serde_json::to_string(&line)?;
        json.push('\n');

        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        file.write_all(json.as_bytes())
    }
}

impl FlowTracer for JsonlFlowTracer {
    fn record(&self, scope: &StateScope, event: &FlowEvent) {
        if let Err(e) = Self::append(scope, event) {
            tracing::debug!(error = %e, "Flow trace write failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn jsonl_tracer_appends_lines() {
        let temp = tempdir().unwrap();
        let scope = StateScope::new(temp.path(), Some("s1"));
        let tracer = JsonlFlowTracer;

        tracer.record(&scope, &FlowEvent::KeywordDetected { keyword: ModeKind::Ralph });
        tracer.record(
            &scope,
            &FlowEvent::StopBlocked {
                mode: ModeKind::Ralph,
                reinforcement_count: 2,
            },
        );

        let content = std::fs::read_to_string(scope.flow_trace_path()).unwrap();
        let lines: Vec<serde_json::Value> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["event"], "keyword_detected");
        assert_eq!(lines[0]["keyword"], "ralph");
        assert_eq!(lines[0]["session_id"], "s1");
        assert_eq!(lines[1]["reinforcement_count"], 2);
    }

    #[test]
    fn unwritable_trace_is_swallowed() {
        let temp = tempdir().unwrap();
        // A file where the .omc directory should be makes every write fail.
        std::fs::write(temp.path().join(".omc"), "not a dir").unwrap();
        let scope = StateScope::new(temp.path(), None);
        JsonlFlowTracer.record(&scope, &FlowEvent::StopAllowed { reason: "x".into() });
    }

    #[test]
    fn memory_tracer_keeps_order() {
        let temp = tempdir().unwrap();
        let scope = StateScope::new(temp.path(), None);
        let tracer = MemoryTracer::default();
        tracer.record(&scope, &FlowEvent::ModeActivated { mode: ModeKind::Team });
        tracer.record(&scope, &FlowEvent::ModeActivated { mode: ModeKind::Ralph });
        assert_eq!(
            tracer.events(),
            vec![
                FlowEvent::ModeActivated { mode: ModeKind::Team },
                FlowEvent::ModeActivated { mode: ModeKind::Ralph },
            ]
        );
    }
}
