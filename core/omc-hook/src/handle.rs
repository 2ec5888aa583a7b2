//! Event handler for Claude Code hooks.
//!
//! Reads one JSON object from stdin and prints exactly one JSON object to
//! stdout. Every failure, including a panic, degrades to `{"continue":true}`.
//!
//! ## Event Routing
//!
//! ```text
//! SessionStart      → reap stale sessions, remind about running modes
//! UserPromptSubmit  → detect keywords, write mode state, inject context
//! Stop              → continuation decision (block or allow)
//! SubagentStop      → passthrough (the session is not stopping)
//! SessionEnd        → passthrough
//! unreadable input  → passthrough, before any state is touched
//! ```

use chrono::{DateTime, Utc};
use omc_core::state::{DECISION_STALE_THRESHOLD_MS, PROBE_STALE_THRESHOLD_MS};
use omc_core::{
    active_modes, apply_activations, detect_modes, hook_disabled, load_omc_config,
    reap_stale_sessions, resolve_project_root, team_enabled, ClaudeWorkCounter,
    ContinuationEngine, FixedWorkCounter, FlowTracer, HookEvent, HookInput, HookOutput,
    JsonlFlowTracer, MatchOptions, NoopTracer, OmcConfig, OmcError, OmcPaths, StateScope,
    StateStore, StopEvent, WorkCounter,
};
use std::io::{self, Read};
use std::panic::{self, AssertUnwindSafe};

/// Which hook entry point was invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookKind {
    /// Route on `hook_event_name`.
    Dispatch,
    KeywordDetect,
    PersistentMode,
    SessionStart,
}

impl HookKind {
    /// Name matched against `OMC_SKIP_HOOKS`.
    pub fn skip_name(self) -> &'static str {
        match self {
            HookKind::Dispatch => "handle",
            HookKind::KeywordDetect => "keyword-detector",
            HookKind::PersistentMode => "persistent-mode",
            HookKind::SessionStart => "session-start",
        }
    }
}

pub fn run(kind: HookKind, paths: Option<&OmcPaths>) {
    let mut input = String::new();
    let read = io::stdin().read_to_string(&mut input);

    let output = if hook_disabled(kind.skip_name()) {
        tracing::debug!(hook = kind.skip_name(), "Hook disabled by environment");
        HookOutput::passthrough()
    } else if let Err(e) = read {
        tracing::warn!(error = %e, "Failed to read stdin");
        HookOutput::passthrough()
    } else {
        panic::catch_unwind(AssertUnwindSafe(|| respond(kind, &input, paths, Utc::now())))
            .unwrap_or_else(|_| {
                tracing::error!(hook = kind.skip_name(), "Hook panicked, passing through");
                HookOutput::passthrough()
            })
    };

    println!("{}", output.to_json());
}

/// Computes the hook's output for one raw payload.
pub fn respond(
    kind: HookKind,
    raw: &str,
    paths: Option<&OmcPaths>,
    now: DateTime<Utc>,
) -> HookOutput {
    let Some(input) = HookInput::parse(raw) else {
        return HookOutput::passthrough();
    };
    match process(kind, &input, paths, now) {
        Ok(output) => output,
        Err(e) => {
            tracing::warn!(hook = kind.skip_name(), error = %e, "Hook failed, passing through");
            HookOutput::passthrough()
        }
    }
}

fn process(
    kind: HookKind,
    input: &HookInput,
    paths: Option<&OmcPaths>,
    now: DateTime<Utc>,
) -> Result<HookOutput, String> {
    let event = match kind {
        HookKind::Dispatch => input.to_event(),
        HookKind::KeywordDetect => HookEvent::PromptSubmit {
            prompt: input.prompt_text().unwrap_or_default(),
        },
        HookKind::PersistentMode => match input.to_event() {
            HookEvent::SubagentStop => HookEvent::SubagentStop,
            _ => HookEvent::Stop(input.stop_event()),
        },
        HookKind::SessionStart => HookEvent::SessionStart,
    };

    if let HookEvent::Unknown { event_name } = &event {
        tracing::debug!(event_name = %event_name, "Unhandled event");
        return Ok(HookOutput::passthrough());
    }
    if matches!(event, HookEvent::SessionEnd | HookEvent::SubagentStop) {
        return Ok(HookOutput::passthrough());
    }

    let cwd = input.resolve_cwd().ok_or(OmcError::NoProjectDirectory)?;
    let scope = StateScope::new(&resolve_project_root(&cwd), input.session_id());
    let store = StateStore::new(scope);
    let config = paths.map(load_omc_config).unwrap_or_default();
    let tracer: Box<dyn FlowTracer> = if config.trace_enabled {
        Box::new(JsonlFlowTracer)
    } else {
        Box::new(NoopTracer)
    };

    match event {
        HookEvent::PromptSubmit { prompt } => {
            on_prompt(&store, &prompt, &config, paths, tracer.as_ref(), now)
        }
        HookEvent::Stop(stop) => Ok(on_stop(&store, &stop, paths, tracer.as_ref(), now)),
        HookEvent::SessionStart => Ok(on_session_start(&store, now)),
        HookEvent::SubagentStop | HookEvent::SessionEnd | HookEvent::Unknown { .. } => {
            Ok(HookOutput::passthrough())
        }
    }
}

fn on_prompt(
    store: &StateStore,
    prompt: &str,
    config: &OmcConfig,
    paths: Option<&OmcPaths>,
    tracer: &dyn FlowTracer,
    now: DateTime<Utc>,
) -> Result<HookOutput, String> {
    let options = MatchOptions {
        team_enabled: paths.is_some_and(team_enabled),
    };
    let matches = detect_modes(prompt, options);
    if matches.is_empty() {
        return Ok(HookOutput::passthrough());
    }

    let report = apply_activations(store, prompt, &matches, config, tracer, now)?;
    Ok(match report.context_message() {
        Some(message) => HookOutput::with_context("UserPromptSubmit", message),
        None => HookOutput::passthrough(),
    })
}

fn on_stop(
    store: &StateStore,
    stop: &StopEvent,
    paths: Option<&OmcPaths>,
    tracer: &dyn FlowTracer,
    now: DateTime<Utc>,
) -> HookOutput {
    let work: Box<dyn WorkCounter> = match paths {
        Some(paths) => Box::new(ClaudeWorkCounter::new(paths.clone())),
        None => Box::new(FixedWorkCounter::default()),
    };

    ContinuationEngine::new(store, work.as_ref(), tracer)
        .decide(stop, now)
        .to_output()
}

fn on_session_start(store: &StateStore, now: DateTime<Utc>) -> HookOutput {
    let stats = reap_stale_sessions(store.scope(), DECISION_STALE_THRESHOLD_MS, now);
    if stats.sessions_removed > 0 || !stats.errors.is_empty() {
        tracing::info!(
            scanned = stats.sessions_scanned,
            removed = stats.sessions_removed,
            errors = ?stats.errors,
            "Stale session cleanup"
        );
    }

    let running = active_modes(store, PROBE_STALE_THRESHOLD_MS, now);
    if running.is_empty() {
        return HookOutput::passthrough();
    }

    let names: Vec<&str> = running.iter().map(|mode| mode.name()).collect();
    HookOutput::with_context(
        "SessionStart",
        format!(
            "[OMC] Active modes from an earlier turn: {}. Continue the work, or say \"cancelomc\" to end them.",
            names.join(", ")
        ),
    )
}
