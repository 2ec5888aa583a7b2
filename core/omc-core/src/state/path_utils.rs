//! Project-root discovery and the path key used for ownership checks.

use std::path::{Path, PathBuf};

/// Key under which two spellings of the same directory compare equal.
///
/// Existing paths are canonicalized, so symlinks collapse onto their
/// target. Trailing separators are dropped (a bare root stays `/`), and on
/// macOS and Windows the key is lowercased to match their filesystems.
pub fn comparison_key(path: &Path) -> String {
    let resolved = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    let text = resolved.to_string_lossy();
    let text = match text.trim_end_matches(['/', '\\']) {
        "" if !text.is_empty() => "/",
        trimmed => trimmed,
    };

    if cfg!(any(target_os = "macos", target_os = "windows")) {
        text.to_lowercase()
    } else {
        text.to_string()
    }
}

/// Finds the project root for a working directory: the nearest ancestor
/// holding a `.git` entry (a directory, or a file for linked worktrees).
/// Falls back to `cwd` itself outside a repository.
pub fn resolve_project_root(cwd: &Path) -> PathBuf {
    let start = if cwd.is_absolute() {
        cwd.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|dir| dir.join(cwd))
            .unwrap_or_else(|_| cwd.to_path_buf())
    };

    start
        .ancestors()
        .find(|dir| dir.join(".git").exists())
        .map(Path::to_path_buf)
        .unwrap_or(start)
}
