//! Per-mode state persistence.
//!
//! Each hook invocation is a fresh process; these files are the only memory
//! that survives between turns, restarts and parallel sessions.
//!
//! ```text
//! <project>/.omc/state/
//! ├── ralph-state.json              legacy / no-session scope
//! ├── swarm-summary.json
//! └── sessions/
//!     └── <session_id>/
//!         ├── ralph-state.json      session scope
//!         ├── ultrawork-state.json
//!         └── flow-trace.jsonl
//! ```
//!
//! # Module Structure
//!
//! - [`scope`]: (project, session) ownership, session-id validation, file layout
//! - [`store`]: atomic reads/writes/deletes of typed records
//! - [`types`]: `ModeState`, `SwarmSummary` and their progress fields
//! - [`staleness`]: fresh/stale classification with the two thresholds
//! - [`probe`]: cheap "is anything active" check
//! - [`cleanup`]: reaper for abandoned session directories
//! - [`path_utils`]: path normalization and project-root discovery

pub mod cleanup;
pub mod path_utils;
pub mod probe;
pub mod scope;
pub mod staleness;
mod store;
pub mod types;

pub use cleanup::{reap_stale_sessions, CleanupStats};
pub use path_utils::{comparison_key, resolve_project_root};
pub use probe::active_modes;
pub use scope::{is_valid_session_id, StateScope};
pub use staleness::{is_stale, DECISION_STALE_THRESHOLD_MS, PROBE_STALE_THRESHOLD_MS};
pub use store::StateStore;
pub use types::{
    format_timestamp, parse_timestamp, ModeState, PipelineStage, SwarmSummary, Timestamped,
    WorkerState, WorkerStatus,
};
