//! Logging bootstrap for the storage engine.
//!
//! # Responsibility
//! - Initialize rolling file logs exactly once per process.
//!
//! # Invariants
//! - Re-initialization with the same directory and level is a no-op.
//! - Conflicting re-initialization is rejected, never applied halfway.
//! - Initialization reports failures as errors, it does not panic.

use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming, WriteMode};
use log::info;
use once_cell::sync::OnceCell;
use std::path::{Path, PathBuf};

const LOG_BASENAME: &str = "lodgebook";
const MAX_LOG_FILE_BYTES: u64 = 10 * 1024 * 1024;
const KEPT_LOG_FILES: usize = 5;

static ACTIVE: OnceCell<ActiveLogging> = OnceCell::new();

struct ActiveLogging {
    level: &'static str,
    directory: PathBuf,
    _handle: LoggerHandle,
}

/// Default level per build mode: `debug` for debug builds, else `info`.
pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

/// Starts file logging under `directory` at `level`.
///
/// Idempotent for an identical (level, directory) pair; any other
/// repeated call fails with a description of the conflict.
pub fn init_logging(level: &str, directory: &Path) -> Result<(), String> {
    let level = canonical_level(level)?;

    let state = ACTIVE.get_or_try_init(|| -> Result<ActiveLogging, String> {
        std::fs::create_dir_all(directory)
            .map_err(|err| format!("cannot create log directory `{}`: {err}", directory.display()))?;

        let handle = Logger::try_with_str(level)
            .map_err(|err| format!("invalid log level `{level}`: {err}"))?
            .log_to_file(
                FileSpec::default()
                    .directory(directory)
                    .basename(LOG_BASENAME),
            )
            .rotate(
                Criterion::Size(MAX_LOG_FILE_BYTES),
                Naming::Numbers,
                Cleanup::KeepLogFiles(KEPT_LOG_FILES),
            )
            .write_mode(WriteMode::BufferAndFlush)
            .append()
            .start()
            .map_err(|err| format!("cannot start logger: {err}"))?;

        info!(
            "event=logging_init module=core status=ok level={level} dir={} version={}",
            directory.display(),
            env!("CARGO_PKG_VERSION")
        );

        Ok(ActiveLogging {
            level,
            directory: directory.to_path_buf(),
            _handle: handle,
        })
    })?;

    if state.level != level || state.directory != directory {
        return Err(format!(
            "logging already active at `{}` level `{}`; refusing `{}` level `{level}`",
            state.directory.display(),
            state.level,
            directory.display(),
        ));
    }
    Ok(())
}

/// Returns `(level, directory)` when logging is active.
pub fn logging_status() -> Option<(&'static str, &'static Path)> {
    ACTIVE
        .get()
        .map(|state| (state.level, state.directory.as_path()))
}

fn canonical_level(level: &str) -> Result<&'static str, String> {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Ok("trace"),
        "debug" => Ok("debug"),
        "info" => Ok("info"),
        "warn" | "warning" => Ok("warn"),
        "error" => Ok("error"),
        other => Err(format!(
            "unsupported log level `{other}`; expected trace|debug|info|warn|error"
        )),
    }
}
