//! Configuration loading and feature flags.
//!
//! Every lookup here degrades to defaults. A missing or malformed file must
//! never keep a hook from answering.

use fs_err as fs;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

use crate::storage::OmcPaths;

/// Environment variable (and settings.json `env` key) gating the team mode.
pub const TEAM_FLAG_ENV: &str = "CLAUDE_CODE_EXPERIMENTAL_AGENT_TEAMS";

/// Disables every hook when truthy.
pub const DISABLE_ENV: &str = "DISABLE_OMC";

/// Comma-separated hook names to skip.
pub const SKIP_HOOKS_ENV: &str = "OMC_SKIP_HOOKS";

/// Engine tuning, read from `~/.claude/.omc-config.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OmcConfig {
    /// Cap on blocked stops per mode before it is considered exhausted.
    pub max_reinforcements: u32,
    pub ralph_max_iterations: u32,
    pub ultraqa_max_cycles: u32,
    /// Write flow-trace lines next to session state.
    pub trace_enabled: bool,
}

impl OmcConfig {
    pub const DEFAULT_MAX_REINFORCEMENTS: u32 = 50;
    pub const DEFAULT_RALPH_MAX_ITERATIONS: u32 = 10;
    pub const DEFAULT_ULTRAQA_MAX_CYCLES: u32 = 5;
}

impl Default for OmcConfig {
    fn default() -> Self {
        Self {
            max_reinforcements: Self::DEFAULT_MAX_REINFORCEMENTS,
            ralph_max_iterations: Self::DEFAULT_RALPH_MAX_ITERATIONS,
            ultraqa_max_cycles: Self::DEFAULT_ULTRAQA_MAX_CYCLES,
            trace_enabled: true,
        }
    }
}

/// Loads the engine config, returning defaults if the file is missing or bad.
pub fn load_omc_config(paths: &OmcPaths) -> OmcConfig {
    let path = paths.config_file();
    match fs::read_to_string(&path) {
        Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), error = %e, "Malformed config, using defaults");
            OmcConfig::default()
        }),
        Err(_) => OmcConfig::default(),
    }
}

/// Whether the coordinated team mode may activate.
///
/// The process environment wins over `settings.json`'s `env` block.
pub fn team_enabled(paths: &OmcPaths) -> bool {
    team_enabled_from(&paths.settings_file(), env::var(TEAM_FLAG_ENV).ok())
}

fn team_enabled_from(settings_path: &Path, env_value: Option<String>) -> bool {
    if let Some(value) = env_value {
        return is_truthy(&value);
    }

    #[derive(Deserialize)]
    struct Settings {
        #[serde(default)]
        env: std::collections::HashMap<String, serde_json::Value>,
    }

    fs::read_to_string(settings_path)
        .ok()
        .and_then(|content| serde_json::from_str::<Settings>(&content).ok())
        .and_then(|settings| settings.env.get(TEAM_FLAG_ENV).cloned())
        .map(|value| match value {
            serde_json::Value::String(s) => is_truthy(&s),
            serde_json::Value::Bool(b) => b,
            serde_json::Value::Number(n) => n.as_i64() == Some(1),
            _ => false,
        })
        .unwrap_or(false)
}

/// Returns true if the named hook has been switched off via the environment.
pub fn hook_disabled(hook_name: &str) -> bool {
    hook_disabled_from(
        hook_name,
        env::var(DISABLE_ENV).ok().as_deref(),
        env::var(SKIP_HOOKS_ENV).ok().as_deref(),
    )
}

fn hook_disabled_from(hook_name: &str, disable_all: Option<&str>, skip_list: Option<&str>) -> bool {
    if disable_all.is_some_and(is_truthy) {
        return true;
    }
    skip_list.is_some_and(|list| list.split(',').any(|entry| entry.trim() == hook_name))
}

pub fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
