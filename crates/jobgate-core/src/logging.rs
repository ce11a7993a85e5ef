//! Tracing setup: append to a log file under the XDG state dir, or stderr.
//!
//! Producer workers run on named threads (`jobgate-<type>-<id>`), so thread
//! names are part of every line.

use anyhow::{Context, Result};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

/// Used when `RUST_LOG` is unset or invalid.
const DEFAULT_FILTER: &str = "info,jobgate=debug";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

fn install(writer: BoxMakeWriter) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(writer)
        .with_ansi(false)
        .with_thread_names(true)
        .try_init()
        .map_err(|e| anyhow::anyhow!("install subscriber: {e}"))
}

/// `~/.local/state/jobgate/jobgate.log` (or the `$XDG_STATE_HOME` equivalent).
pub fn default_log_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("jobgate")?;
    Ok(xdg_dirs.get_state_home().join("jobgate").join("jobgate.log"))
}

/// Logs to the default file. Returns Err when the file cannot be opened or a
/// subscriber is already installed; callers fall back to [`init_logging_stderr`].
pub fn init_logging() -> Result<()> {
    init_logging_at(&default_log_path()?)
}

/// Logs to `path`, creating parent directories as needed.
pub fn init_logging_at(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).with_context(|| format!("create log dir {}", dir.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open log file {}", path.display()))?;

    install(BoxMakeWriter::new(Mutex::new(file)))?;
    tracing::info!("jobgate logging to {}", path.display());
    Ok(())
}

/// Logs to stderr. Never fails; a second subscriber is silently ignored.
pub fn init_logging_stderr() {
    let _ = install(BoxMakeWriter::new(std::io::stderr));
}
