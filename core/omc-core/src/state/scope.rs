//! Ownership scope of persisted state: a project root plus an optional
//! session id, and the on-disk layout derived from it.
//!
//! ```text
//! <project>/.omc/state/<mode>-state.json                       legacy scope
//! <project>/.omc/state/sessions/<session_id>/<mode>-state.json session scope
//! ```
//!
//! The session id becomes a directory name. Anything outside
//! `[alnum][alnum_-]{0,255}` is dropped at construction, which degrades the
//! scope to legacy instead of letting a crafted id escape the state dir.

use std::path::{Path, PathBuf};

use crate::error::{OmcError, Result};
use crate::patterns::RE_SESSION_ID;
use crate::types::ModeKind;

use super::path_utils::comparison_key;

pub const OMC_DIR: &str = ".omc";
pub const STATE_DIR: &str = "state";
pub const SESSIONS_DIR: &str = "sessions";
pub const SWARM_SUMMARY_FILE: &str = "swarm-summary.json";
pub const FLOW_TRACE_FILE: &str = "flow-trace.jsonl";

/// Returns true if `session_id` is safe to use as a path segment.
pub fn is_valid_session_id(session_id: &str) -> bool {
    RE_SESSION_ID.is_match(session_id)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateScope {
    project_root: PathBuf,
    session_id: Option<String>,
}

impl StateScope {
    /// Builds a scope, discarding an unsafe session id.
    pub fn new(project_root: &Path, session_id: Option<&str>) -> Self {
        let session_id = session_id.filter(|id| !id.is_empty()).and_then(|id| {
            if is_valid_session_id(id) {
                Some(id.to_string())
            } else {
                tracing::warn!(
                    session_id = %id.escape_debug(),
                    "Rejected unsafe session id, falling back to legacy scope"
                );
                None
            }
        });

        Self {
            project_root: project_root.to_path_buf(),
            session_id,
        }
    }

    /// Builds a scope, refusing an unsafe session id instead of discarding it.
    pub fn try_new(project_root: &Path, session_id: Option<&str>) -> Result<Self> {
        match session_id {
            Some(id) if !id.is_empty() && !is_valid_session_id(id) => {
                Err(OmcError::InvalidSessionId(id.to_string()))
            }
            _ => Ok(Self::new(project_root, session_id)),
        }
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Same project, no session.
    pub fn legacy(&self) -> Self {
        Self {
            project_root: self.project_root.clone(),
            session_id: None,
        }
    }

    /// `<project>/.omc/state`
    pub fn state_root(&self) -> PathBuf {
        self.project_root.join(OMC_DIR).join(STATE_DIR)
    }

    /// `<project>/.omc/state/sessions`
    pub fn sessions_root(&self) -> PathBuf {
        self.state_root().join(SESSIONS_DIR)
    }

    /// Directory holding this scope's files: the session dir when a session
    /// id is known, otherwise the shared legacy dir.
    pub fn state_dir(&self) -> PathBuf {
        match &self.session_id {
            Some(id) => self.sessions_root().join(id),
            None => self.state_root(),
        }
    }

    pub fn mode_state_path(&self, mode: ModeKind) -> PathBuf {
        self.state_dir().join(mode.state_file_name())
    }

    pub fn legacy_mode_state_path(&self, mode: ModeKind) -> PathBuf {
        self.state_root().join(mode.state_file_name())
    }

    pub fn swarm_summary_path(&self) -> PathBuf {
        self.state_dir().join(SWARM_SUMMARY_FILE)
    }

    pub fn flow_trace_path(&self) -> PathBuf {
        self.state_dir().join(FLOW_TRACE_FILE)
    }

    /// True if a record owned by (`session_id`, `project_path`) may act in
    /// this scope.
    ///
    /// A record naming a session only matches that exact session. A record
    /// naming a project only matches that project after normalization.
    pub fn owns(&self, session_id: Option<&str>, project_path: Option<&str>) -> bool {
        if let Some(owner) = session_id {
            if self.session_id.as_deref() != Some(owner) {
                return false;
            }
        }

        match project_path {
            Some(path) => {
                comparison_key(Path::new(path)) == comparison_key(&self.project_root)
            }
            None => true,
        }
    }
}
