//! Read-only view of outstanding work tracked by Claude Code itself.
//!
//! Counts are always scoped to the current session and project. A global
//! scan would pick up abandoned todos from unrelated projects and keep
//! modes alive for work nobody is doing.

use fs_err as fs;
use serde::Deserialize;
use std::path::Path;
use walkdir::WalkDir;

use crate::state::StateScope;
use crate::storage::OmcPaths;

pub trait WorkCounter {
    /// Incomplete entries in the session's task list.
    fn incomplete_tasks(&self, scope: &StateScope) -> u32;
    /// Incomplete todos for this session plus the project's own todo file.
    fn incomplete_todos(&self, scope: &StateScope) -> u32;
}

/// Fixed counts, for callers without a tracker.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixedWorkCounter {
    pub tasks: u32,
    pub todos: u32,
}

impl WorkCounter for FixedWorkCounter {
    fn incomplete_tasks(&self, _scope: &StateScope) -> u32 {
        self.tasks
    }

    fn incomplete_todos(&self, _scope: &StateScope) -> u32 {
        self.todos
    }
}

/// Reads Claude Code's `todos/` and `tasks/` directories.
#[derive(Debug, Clone)]
pub struct ClaudeWorkCounter {
    paths: OmcPaths,
}

impl ClaudeWorkCounter {
    pub fn new(paths: OmcPaths) -> Self {
        Self { paths }
    }
}

#[derive(Debug, Deserialize)]
struct WorkItem {
    #[serde(default)]
    status: String,
}

impl WorkItem {
    fn is_incomplete(&self) -> bool {
        !matches!(
            self.status.as_str(),
            "completed" | "complete" | "done" | "cancelled" | "canceled" | "deleted"
        )
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TodoFile {
    List(Vec<WorkItem>),
    Wrapped { todos: Vec<WorkItem> },
}

impl TodoFile {
    fn incomplete(&self) -> u32 {
        let items = match self {
            TodoFile::List(items) | TodoFile::Wrapped { todos: items } => items,
        };
        items.iter().filter(|item| item.is_incomplete()).count() as u32
    }
}

fn count_todo_file(path: &Path) -> u32 {
    fs::read_to_string(path)
        .ok()
        .and_then(|content| serde_json::from_str::<TodoFile>(&content).ok())
        .map_or(0, |file| file.incomplete())
}

impl WorkCounter for ClaudeWorkCounter {
    fn incomplete_tasks(&self, scope: &StateScope) -> u32 {
        let Some(session_id) = scope.session_id() else {
            return 0;
        };

        WalkDir::new(self.paths.session_tasks_dir(session_id))
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "json"))
            .filter_map(|entry| fs::read_to_string(entry.path()).ok())
            .filter_map(|content| serde_json::from_str::<WorkItem>(&content).ok())
            .filter(|item| item.is_incomplete())
            .count() as u32
    }

    fn incomplete_todos(&self, scope: &StateScope) -> u32 {
        let project_todos = count_todo_file(&scope.project_root().join(".omc").join("todos.json"));

        let Some(session_id) = scope.session_id() else {
            return project_todos;
        };

        let exact_name = format!("{}.json", session_id);
        let prefix = format!("{}-", session_id);
        let session_todos: u32 = WalkDir::new(self.paths.todos_dir())
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| {
                let name = entry.file_name().to_string_lossy();
                name == exact_name.as_str() || (name.starts_with(&prefix) && name.ends_with(".json"))
            })
            .map(|entry| count_todo_file(entry.path()))
            .sum();

        project_todos + session_todos
    }
}
