//! Tracing subscriber setup for the CLI.

use std::fs::OpenOptions;
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{MirrorError, Result};
use crate::progress::ProgressDisplay;

/// Install the global subscriber.
///
/// Events go to stderr, pausing `progress` bars while each line is written,
/// and, when `log_file` is given, are appended to that file as plain text.
/// `RUST_LOG` takes precedence over `level`. The returned guard flushes the
/// file writer and must be kept alive until exit.
pub fn init_logging(
    level: &str,
    log_file: Option<&Path>,
    progress: &ProgressDisplay,
) -> Result<Option<WorkerGuard>> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => level_filter(level)?,
    };

    let stderr_layer = fmt::layer()
        .with_writer(progress.log_writer())
        .with_target(false)
        .compact();

    let (file_layer, guard) = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| MirrorError::InvalidConfig(format!("logging already initialised: {}", e)))?;

    Ok(guard)
}

fn level_filter(level: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(level)
        .map_err(|e| MirrorError::InvalidConfig(format!("log level '{}': {}", level, e)))
}
