//! omc-hook: CLI hook handler for mode activation and stop continuation.
//!
//! Called directly by Claude Code hooks configured in ~/.claude/settings.json.
//!
//! ## Subcommands
//!
//! - `handle`: Route a hook event on its `hook_event_name` (reads JSON from stdin)
//! - `keyword-detect`, `persistent-mode`, `session-start`: Single-event entry points
//! - `activate`, `cancel`: Explicit mode control for skills
//! - `status`: Inspect mode state for a project

mod activate;
mod handle;
mod logging;
mod status;

use clap::{Args, Parser, Subcommand};
use handle::HookKind;
use omc_core::OmcPaths;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "omc-hook")]
#[command(about = "Mode orchestration hooks for Claude Code")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Project and session a command acts on.
#[derive(Args, Debug)]
struct Target {
    /// Session ID (omit for the legacy shared scope)
    #[arg(long)]
    session_id: Option<String>,

    /// Directory inside the project (default: current directory)
    #[arg(long, value_name = "PATH")]
    directory: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Handle a hook event (reads JSON from stdin)
    Handle,

    /// UserPromptSubmit: detect mode keywords and activate modes
    KeywordDetect,

    /// Stop: decide whether an active mode blocks the stop
    PersistentMode,

    /// SessionStart: reap stale sessions and remind about running modes
    SessionStart,

    /// Start a mode explicitly, replacing any previous state
    Activate {
        /// Mode name (e.g. ultraqa, ralph, pipeline)
        #[arg(value_name = "MODE")]
        mode: String,

        #[command(flatten)]
        target: Target,

        /// Prompt text recorded with the state
        #[arg(long, default_value = "")]
        prompt: String,
    },

    /// Cancel every mode for a project/session
    Cancel {
        #[command(flatten)]
        target: Target,
    },

    /// Print every mode state for a project
    Status {
        #[command(flatten)]
        target: Target,
    },
}

fn main() {
    let paths = OmcPaths::from_home();
    let _logging_guard = logging::init(paths.as_ref());
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Handle => {
            handle::run(HookKind::Dispatch, paths.as_ref());
            Ok(())
        }
        Commands::KeywordDetect => {
            handle::run(HookKind::KeywordDetect, paths.as_ref());
            Ok(())
        }
        Commands::PersistentMode => {
            handle::run(HookKind::PersistentMode, paths.as_ref());
            Ok(())
        }
        Commands::SessionStart => {
            handle::run(HookKind::SessionStart, paths.as_ref());
            Ok(())
        }
        Commands::Activate {
            mode,
            target,
            prompt,
        } => activate::activate(
            &mode,
            &prompt,
            target.directory,
            target.session_id,
            paths.as_ref(),
        ),
        Commands::Cancel { target } => activate::cancel(target.directory, target.session_id),
        Commands::Status { target } => {
            activate::resolve_scope(target.directory.as_deref(), target.session_id.as_deref())
                .map(|scope| status::run(&scope))
        }
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "omc-hook command failed");
        eprintln!("omc-hook: {}", e);
        std::process::exit(1);
    }
}
