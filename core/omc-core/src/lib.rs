//! # omc-core
//!
//! Mode orchestration for Claude Code hooks: keyword detection, per-mode
//! state, and the stop-event continuation decision.
//!
//! ## Design Principles
//!
//! - **Synchronous**: Every hook is a short-lived process; no async runtime.
//! - **Files are the only memory**: State lives under `<project>/.omc/state/`.
//! - **Fail open**: Missing or corrupt files read as absent. Errors never block a stop.
//! - **Table-driven**: Triggers, overrides and priority are defined once.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use omc_core::{detect_modes, apply_activations, ContinuationEngine, MatchOptions};
//!
//! let matches = detect_modes(prompt, MatchOptions { team_enabled });
//! let report = apply_activations(&store, prompt, &matches, &config, &tracer, Utc::now())?;
//!
//! // later, on Stop
//! let decision = ContinuationEngine::new(&store, &work, &tracer).decide(&stop, Utc::now());
//! ```

pub mod activation;
pub mod config;
pub mod continuation;
pub mod error;
pub mod hook;
pub mod keywords;
pub mod patterns;
pub mod state;
pub mod storage;
pub mod trace;
pub mod types;
pub mod work;

pub use activation::{activate_mode, apply_activations, cancel_all, ActivationReport};
pub use config::*;
pub use continuation::{
    blocking_mode, classify_stop, ContinuationEngine, StopBypass, StopDecision, WALK_ORDER,
};
pub use error::{OmcError, Result};
pub use hook::{HookEvent, HookInput, HookOutput, StopEvent};
pub use keywords::{detect_modes, MatchOptions};
pub use state::{
    active_modes, reap_stale_sessions, resolve_project_root, CleanupStats, ModeState, StateScope,
    StateStore, SwarmSummary,
};
pub use storage::OmcPaths;
pub use trace::{FlowEvent, FlowTracer, JsonlFlowTracer, MemoryTracer, NoopTracer};
pub use types::*;
pub use work::{ClaudeWorkCounter, FixedWorkCounter, WorkCounter};
