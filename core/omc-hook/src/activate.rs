//! Explicit mode control for slash-command skills.
//!
//! Unlike the hook entry points these commands report errors: the caller is
//! a skill that can show them, not the host's stop path.

use chrono::Utc;
use omc_core::{
    activate_mode, cancel_all, load_omc_config, resolve_project_root, JsonlFlowTracer, ModeKind,
    OmcPaths, StateScope, StateStore,
};
use std::path::{Path, PathBuf};

/// Builds the scope for `directory` (default: current directory).
pub fn resolve_scope(directory: Option<&Path>, session_id: Option<&str>) -> Result<StateScope, String> {
    let cwd = match directory {
        Some(dir) => dir.to_path_buf(),
        None => std::env::current_dir().map_err(|e| format!("Cannot determine current directory: {}", e))?,
    };
    StateScope::try_new(&resolve_project_root(&cwd), session_id).map_err(String::from)
}

pub fn activate(
    mode: &str,
    prompt: &str,
    directory: Option<PathBuf>,
    session_id: Option<String>,
    paths: Option<&OmcPaths>,
) -> Result<(), String> {
    let mode: ModeKind = mode.parse()?;
    let scope = resolve_scope(directory.as_deref(), session_id.as_deref())?;
    let store = StateStore::new(scope);
    let config = paths.map(load_omc_config).unwrap_or_default();

    let state = activate_mode(&store, mode, prompt, &config, &JsonlFlowTracer, Utc::now())?;
    let json = serde_json::to_string_pretty(&state)
        .map_err(|e| format!("Failed to serialize state: {}", e))?;
    println!("{}", json);
    Ok(())
}

pub fn cancel(directory: Option<PathBuf>, session_id: Option<String>) -> Result<(), String> {
    let scope = resolve_scope(directory.as_deref(), session_id.as_deref())?;
    let removed = cancel_all(&StateStore::new(scope), &JsonlFlowTracer)?;

    if removed.is_empty() {
        println!("No active modes to cancel.");
    } else {
        let names: Vec<&str> = removed.iter().map(|mode| mode.name()).collect();
        println!("Cancelled: {}", names.join(", "));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn activate_then_cancel_round_trip() {
        let project = TempDir::new().unwrap();
        let dir = Some(project.path().to_path_buf());

        activate("ultraqa", "make ci green", dir.clone(), Some("s1".into()), None).unwrap();
        let scope = resolve_scope(Some(project.path()), Some("s1")).unwrap();
        let state = StateStore::new(scope.clone()).read(ModeKind::UltraQa).unwrap();
        assert_eq!(state.original_prompt, "make ci green");

        cancel(dir, Some("s1".into())).unwrap();
        assert!(!scope.mode_state_path(ModeKind::UltraQa).exists());
    }

    #[test]
    fn unsafe_session_id_is_reported() {
        let project = TempDir::new().unwrap();
        let dir = Some(project.path().to_path_buf());
        let err = activate("ralph", "", dir.clone(), Some("../escape".into()), None).unwrap_err();
        assert!(err.contains("Invalid session id"));
        assert!(cancel(dir, Some("a/b".into())).is_err());
        assert!(!project.path().join(".omc").exists());
    }

    #[test]
    fn activate_rejects_unknown_and_advisory_modes() {
        let project = TempDir::new().unwrap();
        let dir = Some(project.path().to_path_buf());
        assert!(activate("warpdrive", "", dir.clone(), None, None).is_err());
        assert!(activate("tdd", "", dir, None, None).is_err());
    }
}
