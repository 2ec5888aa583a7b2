//! Storage configuration and path management outside the project tree.
//!
//! Project-local paths (`<project>/.omc/state/...`) hang off
//! [`crate::state::StateScope`]. Everything under the user's home lives here:
//!
//! - `~/.claude` (read-only for us): settings, todos, tasks, our config file
//! - `~/.omc` (ours): hook logs
//!
//! Production code uses `OmcPaths::from_home()`. Tests use
//! `OmcPaths::with_roots(temp/.claude, temp/.omc)` for isolation.

use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct OmcPaths {
    /// Root directory for Claude Code data (default: ~/.claude)
    claude_root: PathBuf,
    /// Root directory for our own user-level data (default: ~/.omc)
    omc_root: PathBuf,
}

impl OmcPaths {
    /// Paths rooted at the current user's home directory.
    pub fn from_home() -> Option<Self> {
        dirs::home_dir().map(|home| Self {
            claude_root: home.join(".claude"),
            omc_root: home.join(".omc"),
        })
    }

    pub fn with_roots(claude_root: PathBuf, omc_root: PathBuf) -> Self {
        Self {
            claude_root,
            omc_root,
        }
    }

    pub fn claude_root(&self) -> &Path {
        &self.claude_root
    }

    pub fn omc_root(&self) -> &Path {
        &self.omc_root
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Configuration
    // ─────────────────────────────────────────────────────────────────────────────

    /// Path to .omc-config.json (engine tuning).
    pub fn config_file(&self) -> PathBuf {
        self.claude_root.join(".omc-config.json")
    }

    /// Path to Claude Code's settings.json (feature flag source).
    pub fn settings_file(&self) -> PathBuf {
        self.claude_root.join("settings.json")
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Work Trackers
    // ─────────────────────────────────────────────────────────────────────────────

    /// Path to todos/ (one `<session>-*.json` array per agent).
    pub fn todos_dir(&self) -> PathBuf {
        self.claude_root.join("todos")
    }

    /// Path to tasks/<session>/ (one JSON file per task).
    pub fn session_tasks_dir(&self, session_id: &str) -> PathBuf {
        self.claude_root.join("tasks").join(session_id)
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Logs
    // ─────────────────────────────────────────────────────────────────────────────

    pub fn log_dir(&self) -> PathBuf {
        self.omc_root.join("logs")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_hang_off_injected_roots() {
        let paths = OmcPaths::with_roots(PathBuf::from("/h/.claude"), PathBuf::from("/h/.omc"));
        assert_eq!(paths.config_file(), PathBuf::from("/h/.claude/.omc-config.json"));
        assert_eq!(paths.settings_file(), PathBuf::from("/h/.claude/settings.json"));
        assert_eq!(paths.todos_dir(), PathBuf::from("/h/.claude/todos"));
        assert_eq!(
            paths.session_tasks_dir("s1"),
            PathBuf::from("/h/.claude/tasks/s1")
        );
        assert_eq!(paths.log_dir(), PathBuf::from("/h/.omc/logs"));
    }
}
