//! File logging for the hook binary.
//!
//! stdout carries the single decision object, so logs only ever go to a daily
//! file under `~/.omc/logs/`. `OMC_DEBUG_LOG=1` forces debug; otherwise the
//! filter comes from `OMC_LOG` (default `info`).

use fs_err as fs;
use omc_core::{is_truthy, OmcPaths};
use std::env;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

const LOG_FILE_PREFIX: &str = "omc-hook.log";

/// Installs the global subscriber. The guard must live until exit or
/// buffered lines are lost.
pub fn init(paths: Option<&OmcPaths>) -> Option<WorkerGuard> {
    let log_dir = paths?.log_dir();
    if let Err(e) = fs::create_dir_all(&log_dir) {
        eprintln!("omc-hook: logging disabled: {}", e);
        return None;
    }

    let appender = tracing_appender::rolling::daily(&log_dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::fmt()
        .with_env_filter(filter())
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .ok()?;

    Some(guard)
}

fn filter() -> EnvFilter {
    let debug_enabled = env::var("OMC_DEBUG_LOG")
        .map(|value| is_truthy(&value))
        .unwrap_or(false);
    if debug_enabled {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("OMC_LOG").unwrap_or_else(|_| EnvFilter::new("info"))
    }
}
