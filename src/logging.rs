//! Tracing setup: a compact stdout layer plus a non-blocking file mirror.
//!
//! The file mirror goes to `DOCSEARCH_LOG_FILE` when set, else `logs/docsearch.log`. Failing to
//! open it only drops the file layer; stdout logging still comes up.
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use tracing_appender::{
    non_blocking::{NonBlocking, WorkerGuard},
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Environment variable naming an explicit log file.
pub const LOG_FILE_ENV: &str = "DOCSEARCH_LOG_FILE";

const DEFAULT_LOG_DIR: &str = "logs";
const DEFAULT_LOG_FILE: &str = "docsearch.log";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Install the global subscriber. `RUST_LOG` filters events (default `info`).
///
/// Calling this more than once is harmless; later calls leave the first subscriber in place.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let target = log_target(std::env::var(LOG_FILE_ENV).ok());

    let file_layer = match open_writer(&target) {
        Ok(writer) => Some(
            fmt::layer()
                .with_writer(writer)
                .with_target(true)
                .with_ansi(false)
                .compact(),
        ),
        Err(err) => {
            eprintln!("File logging disabled ({}): {err}", target.display());
            None
        }
    };

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(false).compact())
        .with(file_layer)
        .try_init();
}

/// Resolve the log file path from the optional override.
fn log_target(explicit: Option<String>) -> PathBuf {
    match explicit.map(|value| value.trim().to_string()) {
        Some(path) if !path.is_empty() => PathBuf::from(path),
        _ => Path::new(DEFAULT_LOG_DIR).join(DEFAULT_LOG_FILE),
    }
}

/// Open `path` for appending behind a non-blocking writer whose guard lives for the process.
fn open_writer(path: &Path) -> Result<NonBlocking, String> {
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| "log path has no file name".to_string())?;

    std::fs::create_dir_all(directory).map_err(|err| err.to_string())?;
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name)
        .build(directory)
        .map_err(|err| err.to_string())?;

    let (writer, guard) = tracing_appender::non_blocking(appender);
    let _ = LOG_GUARD.set(guard);
    Ok(writer)
}
