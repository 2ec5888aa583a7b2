//! Serialized state types for per-mode records.
//!
//! Files are written by this crate and by external skills, so every field is
//! optional on read and unknown fields survive a rewrite through `extra`.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::OmcConfig;
use crate::patterns::RE_STAGE_ARROW;
use crate::types::ModeKind;

use super::scope::StateScope;

/// Stage chain used when a pipeline prompt names none.
pub const DEFAULT_PIPELINE_STAGES: [&str; 4] = ["explore", "plan", "execute", "verify"];

const MAX_STAGE_NAME_CHARS: usize = 60;

fn default_max_reinforcements() -> u32 {
    OmcConfig::DEFAULT_MAX_REINFORCEMENTS
}

/// Status of one ultrapilot worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WorkerStatus {
    #[default]
    Pending,
    #[serde(alias = "running")]
    InProgress,
    #[serde(alias = "completed", alias = "done")]
    Complete,
    #[serde(alias = "error")]
    Failed,
    #[serde(other)]
    Unknown,
}

impl WorkerStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, WorkerStatus::Complete | WorkerStatus::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerState {
    pub id: String,
    #[serde(default)]
    pub status: WorkerStatus,
}

/// A pipeline stage, either a bare name or a name with a status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PipelineStage {
    Named(String),
    Detailed {
        name: String,
        #[serde(default)]
        status: Option<String>,
    },
}

impl PipelineStage {
    pub fn name(&self) -> &str {
        match self {
            PipelineStage::Named(name) | PipelineStage::Detailed { name, .. } => name,
        }
    }
}

/// Anything carrying the two timestamps the staleness check needs.
pub trait Timestamped {
    fn started_at(&self) -> Option<&str>;
    fn last_checked_at(&self) -> Option<&str>;
}

/// Persistent record of one mode in one (project, session) scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModeState {
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub started_at: Option<String>,
    #[serde(default)]
    pub last_checked_at: Option<String>,
    #[serde(default, alias = "prompt")]
    pub original_prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_path: Option<String>,
    #[serde(default)]
    pub reinforcement_count: u32,
    #[serde(default = "default_max_reinforcements")]
    pub max_reinforcements: u32,

    // Mode-specific progress (all optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iteration: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_iterations: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workers: Option<Vec<WorkerState>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_stage: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stages: Option<Vec<PipelineStage>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cycle: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_cycles: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all_passing: Option<bool>,

    // Cross-links between cooperating modes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linked_team: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linked_ralph: Option<bool>,

    /// Fields written by other tools, preserved verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ModeState {
    /// Fresh active state for `mode`, owned by `scope`.
    pub fn new(
        mode: ModeKind,
        prompt: &str,
        args: &str,
        scope: &StateScope,
        config: &OmcConfig,
        now: DateTime<Utc>,
    ) -> Self {
        let stamp = format_timestamp(now);
        let mut state = ModeState {
            active: true,
            started_at: Some(stamp.clone()),
            last_checked_at: Some(stamp),
            original_prompt: prompt.to_string(),
            session_id: scope.session_id().map(str::to_string),
            project_path: Some(scope.project_root().to_string_lossy().into_owned()),
            reinforcement_count: 0,
            max_reinforcements: config.max_reinforcements,
            iteration: None,
            max_iterations: None,
            phase: None,
            workers: None,
            current_stage: None,
            stages: None,
            cycle: None,
            max_cycles: None,
            all_passing: None,
            linked_team: None,
            linked_ralph: None,
            extra: Map::new(),
        };

        match mode {
            ModeKind::Ralph => {
                state.iteration = Some(1);
                state.max_iterations = Some(config.ralph_max_iterations);
            }
            ModeKind::Autopilot => state.phase = Some("expansion".to_string()),
            ModeKind::Team => state.phase = Some("team-plan".to_string()),
            ModeKind::Ultrapilot => state.workers = Some(Vec::new()),
            ModeKind::Pipeline => {
                state.current_stage = Some(0);
                state.stages = Some(parse_pipeline_stages(args));
            }
            ModeKind::UltraQa => {
                state.cycle = Some(1);
                state.max_cycles = Some(config.ultraqa_max_cycles);
                state.all_passing = Some(false);
            }
            _ => {}
        }

        state
    }

    /// Records that the engine looked at this state just now.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_checked_at = Some(format_timestamp(now));
    }

    /// True once the counter has gone past its cap.
    pub fn is_exhausted(&self) -> bool {
        self.reinforcement_count > self.max_reinforcements
    }
}

impl Timestamped for ModeState {
    fn started_at(&self) -> Option<&str> {
        self.started_at.as_deref()
    }

    fn last_checked_at(&self) -> Option<&str> {
        self.last_checked_at.as_deref()
    }
}

/// Side-channel summary for the swarm mode, written by the swarm executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwarmSummary {
    #[serde(default)]
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_path: Option<String>,
    #[serde(default)]
    pub started_at: Option<String>,
    #[serde(default, alias = "updated_at")]
    pub last_checked_at: Option<String>,
    #[serde(default)]
    pub agent_count: u32,
    #[serde(default)]
    pub tasks_pending: u32,
    #[serde(default)]
    pub tasks_claimed: u32,
    #[serde(default)]
    pub tasks_done: u32,
    #[serde(default)]
    pub tasks_failed: u32,
    #[serde(default)]
    pub reinforcement_count: u32,
    #[serde(default = "default_max_reinforcements")]
    pub max_reinforcements: u32,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for SwarmSummary {
    fn default() -> Self {
        Self {
            active: false,
            session_id: None,
            project_path: None,
            started_at: None,
            last_checked_at: None,
            agent_count: 0,
            tasks_pending: 0,
            tasks_claimed: 0,
            tasks_done: 0,
            tasks_failed: 0,
            reinforcement_count: 0,
            max_reinforcements: default_max_reinforcements(),
            extra: Map::new(),
        }
    }
}

impl SwarmSummary {
    pub fn outstanding_tasks(&self) -> u32 {
        self.tasks_pending.saturating_add(self.tasks_claimed)
    }
}

impl Timestamped for SwarmSummary {
    fn started_at(&self) -> Option<&str> {
        self.started_at.as_deref()
    }

    fn last_checked_at(&self) -> Option<&str> {
        self.last_checked_at.as_deref()
    }
}

/// Formats a timestamp the way every state file stores it.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parses an RFC3339 timestamp. Returns None for malformed input.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Reads a `a -> b -> c` chain out of the pipeline prompt tail.
fn parse_pipeline_stages(args: &str) -> Vec<PipelineStage> {
    let segments: Vec<String> = RE_STAGE_ARROW
        .split(args)
        .map(|segment| {
            segment
                .trim()
                .trim_end_matches(|c: char| c.is_ascii_punctuation())
                .chars()
                .take(MAX_STAGE_NAME_CHARS)
                .collect::<String>()
        })
        .filter(|segment| !segment.is_empty())
        .collect();

    if segments.len() < 2 {
        return DEFAULT_PIPELINE_STAGES
            .iter()
            .map(|name| PipelineStage::Named(name.to_string()))
            .collect();
    }

    segments.into_iter().map(PipelineStage::Named).collect()
}
