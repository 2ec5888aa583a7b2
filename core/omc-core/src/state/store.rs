//! File-backed per-mode state persistence.
//!
//! One JSON file per mode per scope (see [`super::scope`] for the layout).
//! Several hook processes may touch the same file concurrently, so:
//!
//! - Writes go through a temp file in the same directory and an atomic rename.
//!   A concurrent reader sees the old content or the new, never a mix.
//! - Reads are defensive. Missing, empty or corrupt files read as `None`.
//! - Deletes are idempotent.
//! - A session-scoped read never falls back to the legacy shared file.

use std::io::{ErrorKind, Write};
use std::path::Path;

use fs_err as fs;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::NamedTempFile;

use crate::error::{OmcError, Result};
use crate::types::ModeKind;

use super::scope::StateScope;
use super::types::{ModeState, SwarmSummary};

/// Typed access to the state files of one scope.
#[derive(Debug, Clone)]
pub struct StateStore {
    scope: StateScope,
}

impl StateStore {
    pub fn new(scope: StateScope) -> Self {
        Self { scope }
    }

    pub fn scope(&self) -> &StateScope {
        &self.scope
    }

    pub fn read(&self, mode: ModeKind) -> Option<ModeState> {
        read_json(&self.scope.mode_state_path(mode))
    }

    pub fn write(&self, mode: ModeKind, state: &ModeState) -> Result<()> {
        write_json_atomic(&self.scope.mode_state_path(mode), state)
    }

    pub fn delete(&self, mode: ModeKind) -> Result<()> {
        remove_if_exists(&self.scope.mode_state_path(mode))
    }

    pub fn read_swarm_summary(&self) -> Option<SwarmSummary> {
        read_json(&self.scope.swarm_summary_path())
    }

    pub fn write_swarm_summary(&self, summary: &SwarmSummary) -> Result<()> {
        write_json_atomic(&self.scope.swarm_summary_path(), summary)
    }

    pub fn delete_swarm_summary(&self) -> Result<()> {
        remove_if_exists(&self.scope.swarm_summary_path())
    }

    /// Every readable persisting-mode state in this scope, in walk order.
    pub fn all_states(&self) -> Vec<(ModeKind, ModeState)> {
        ModeKind::PERSISTENT
            .into_iter()
            .filter_map(|mode| self.read(mode).map(|state| (mode, state)))
            .collect()
    }

    /// Deletes every state file this scope may touch.
    ///
    /// With a session id, the session dir is cleared and legacy files are
    /// removed only when unowned or owned by this same session. Returns the
    /// modes whose files were present.
    pub fn delete_all(&self) -> Result<Vec<ModeKind>> {
        let mut removed = Vec::new();
        let mut first_error = None;

        for mode in ModeKind::PERSISTENT {
            if self.scope.mode_state_path(mode).exists() {
                removed.push(mode);
            }
            if let Err(e) = self.delete(mode) {
                first_error.get_or_insert(e);
            }
        }
        if let Err(e) = self.delete_swarm_summary() {
            first_error.get_or_insert(e);
        }

        if let Some(session_id) = self.scope.session_id() {
            let legacy = StateStore::new(self.scope.legacy());
            for mode in ModeKind::PERSISTENT {
                let Some(state) = legacy.read(mode) else {
                    continue;
                };
                let owned = state
                    .session_id
                    .as_deref()
                    .map_or(true, |owner| owner == session_id);
                if owned {
                    if let Err(e) = legacy.delete(mode) {
                        first_error.get_or_insert(e);
                    } else if !removed.contains(&mode) {
                        removed.push(mode);
                    }
                }
            }
            let swarm_owned = legacy
                .read_swarm_summary()
                .is_some_and(|s| s.session_id.as_deref().map_or(true, |o| o == session_id));
            if swarm_owned {
                if let Err(e) = legacy.delete_swarm_summary() {
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(removed),
        }
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return None,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to read state file");
            return None;
        }
    };

    if content.trim().is_empty() {
        tracing::debug!(path = %path.display(), "Empty state file");
        return None;
    }

    match serde_json::from_str(&content) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Corrupt state file, ignoring");
            None
        }
    }
}

fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let parent_dir = path
        .parent()
        .ok_or_else(|| OmcError::NoParentDirectory(path.to_path_buf()))?;
    fs::create_dir_all(parent_dir)
        .map_err(|e| OmcError::io("Failed to create state directory", e))?;

    let content = serde_json::to_string_pretty(value)
        .map_err(|e| OmcError::json("Failed to serialize state", e))?;

    let mut temp_file = NamedTempFile::new_in(parent_dir)
        .map_err(|e| OmcError::io("Failed to create temp state file", e))?;
    temp_file
        .write_all(content.as_bytes())
        .map_err(|e| OmcError::io("Failed to write temp state file", e))?;
    temp_file
        .flush()
        .map_err(|e| OmcError::io("Failed to flush temp state file", e))?;
    temp_file
        .persist(path)
        .map_err(|e| OmcError::io(format!("Failed to commit {}", path.display()), e.error))?;

    Ok(())
}

fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(OmcError::io("Failed to delete state file", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OmcConfig;
    use chrono::Utc;
    use tempfile::tempdir;

    fn state_for(scope: &StateScope, mode: ModeKind) -> ModeState {
        ModeState::new(mode, "prompt", "", scope, &OmcConfig::default(), Utc::now())
    }

    #[test]
    fn read_missing_returns_none() {
        let temp = tempdir().unwrap();
        let store = StateStore::new(StateScope::new(temp.path(), Some("s1")));
        assert!(store.read(ModeKind::Ralph).is_none());
    }

    #[test]
    fn write_then_read_round_trips() {
        let temp = tempdir().unwrap();
        let scope = StateScope::new(temp.path(), Some("s1"));
        let store = StateStore::new(scope.clone());
        let state = state_for(&scope, ModeKind::Ralph);

        store.write(ModeKind::Ralph, &state).unwrap();
        assert_eq!(store.read(ModeKind::Ralph), Some(state));
        assert!(temp
            .path()
            .join(".omc/state/sessions/s1/ralph-state.json")
            .exists());
    }

    #[test]
    fn write_leaves_no_temp_files_behind() {
        let temp = tempdir().unwrap();
        let scope = StateScope::new(temp.path(), None);
        let store = StateStore::new(scope.clone());
        store.write(ModeKind::Ultrawork, &state_for(&scope, ModeKind::Ultrawork)).unwrap();
        store.write(ModeKind::Ultrawork, &state_for(&scope, ModeKind::Ultrawork)).unwrap();

        let entries: Vec<_> = std::fs::read_dir(scope.state_root())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(entries, vec!["ultrawork-state.json".to_string()]);
    }

    #[test]
    fn session_read_never_falls_back_to_legacy() {
        let temp = tempdir().unwrap();
        let legacy_scope = StateScope::new(temp.path(), None);
        StateStore::new(legacy_scope.clone())
            .write(ModeKind::Ralph, &state_for(&legacy_scope, ModeKind::Ralph))
            .unwrap();

        let session_store = StateStore::new(StateScope::new(temp.path(), Some("s1")));
        assert!(session_store.read(ModeKind::Ralph).is_none());
        assert!(StateStore::new(legacy_scope).read(ModeKind::Ralph).is_some());
    }

    #[test]
    fn corrupt_and_empty_files_read_as_none() {
        let temp = tempdir().unwrap();
        let scope = StateScope::new(temp.path(), None);
        std::fs::create_dir_all(scope.state_root()).unwrap();
        std::fs::write(scope.mode_state_path(ModeKind::Ralph), "{oops").unwrap();
        std::fs::write(scope.mode_state_path(ModeKind::Team), "  ").unwrap();

        let store = StateStore::new(scope);
        assert!(store.read(ModeKind::Ralph).is_none());
        assert!(store.read(ModeKind::Team).is_none());
    }

    #[test]
    fn delete_is_idempotent() {
        let temp = tempdir().unwrap();
        let scope = StateScope::new(temp.path(), Some("s1"));
        let store = StateStore::new(scope.clone());
        store.write(ModeKind::Ecomode, &state_for(&scope, ModeKind::Ecomode)).unwrap();

        store.delete(ModeKind::Ecomode).unwrap();
        store.delete(ModeKind::Ecomode).unwrap();
        store.delete(ModeKind::Pipeline).unwrap();
        assert!(store.read(ModeKind::Ecomode).is_none());
    }

    #[test]
    fn delete_all_spares_legacy_files_of_other_sessions() {
        let temp = tempdir().unwrap();
        let legacy_scope = StateScope::new(temp.path(), None);
        let legacy = StateStore::new(legacy_scope.clone());

        let mut foreign = state_for(&legacy_scope, ModeKind::Autopilot);
        foreign.session_id = Some("other".to_string());
        legacy.write(ModeKind::Autopilot, &foreign).unwrap();
        legacy.write(ModeKind::Ultrawork, &state_for(&legacy_scope, ModeKind::Ultrawork)).unwrap();

        let scope = StateScope::new(temp.path(), Some("mine"));
        let store = StateStore::new(scope.clone());
        store.write(ModeKind::Ralph, &state_for(&scope, ModeKind::Ralph)).unwrap();

        let removed = store.delete_all().unwrap();
        assert!(removed.contains(&ModeKind::Ralph));
        assert!(removed.contains(&ModeKind::Ultrawork));
        assert!(store.read(ModeKind::Ralph).is_none());
        assert!(legacy.read(ModeKind::Ultrawork).is_none());
        assert!(legacy.read(ModeKind::Autopilot).is_some());
    }

    #[test]
    fn swarm_summary_round_trips() {
        let temp = tempdir().unwrap();
        let store = StateStore::new(StateScope::new(temp.path(), Some("s1")));
        let summary = SwarmSummary {
            active: true,
            tasks_pending: 3,
            ..SwarmSummary::default()
        };
        store.write_swarm_summary(&summary).unwrap();
        assert_eq!(store.read_swarm_summary().unwrap().tasks_pending, 3);
        store.delete_swarm_summary().unwrap();
        store.delete_swarm_summary().unwrap();
        assert!(store.read_swarm_summary().is_none());
    }
}
