//! # Logging Setup
//!
//! Installs the global `tracing` subscriber: a console layer plus a plain-text file
//! layer at `{log_dir}/relay.log`. The file is recreated on every start.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

pub const LOG_FILE: &str = "relay.log";
const DEFAULT_FILTER: &str = "info,reqwest=warn,hyper=warn,tungstenite=warn,tokio_tungstenite=warn";

/// The returned guard flushes the file writer on drop; keep it alive for the
/// lifetime of the process.
pub fn init(log_dir: &Path) -> Result<WorkerGuard> {
    let log_path = prepare_log_dir(log_dir)?;

    let file_appender = tracing_appender::rolling::never(log_dir, LOG_FILE);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_FILTER));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false);
    let console_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stdout);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    tracing::debug!(path = %log_path.display(), "file logging enabled");
    Ok(guard)
}

/// Ensures the directory exists and clears the previous session's log.
fn prepare_log_dir(log_dir: &Path) -> Result<std::path::PathBuf> {
    fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;

    let log_path = log_dir.join(LOG_FILE);
    if log_path.exists() {
        fs::remove_file(&log_path)
            .with_context(|| format!("Failed to clear {}", log_path.display()))?;
    }
    Ok(log_path)
}
