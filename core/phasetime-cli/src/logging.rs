//! Logging setup for the `phasetime` binary.
//!
//! Everything at or above the `PHASETIME_LOG` filter (default `info`) goes to
//! a daily rolling file under the storage root's `logs/` directory. Warnings
//! and errors are mirrored to stderr. If the log directory cannot be created
//! only the stderr layer is installed.

use std::env;
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

const LOG_ENV: &str = "PHASETIME_LOG";
const LOG_FILE_PREFIX: &str = "phasetime";

/// Installs the global subscriber. Keep the returned guard alive until exit
/// so buffered file output is flushed.
pub fn init(logs_dir: &Path) -> Option<WorkerGuard> {
    let filter = env::var(LOG_ENV)
        .ok()
        .and_then(|value| EnvFilter::try_new(value).ok())
        .unwrap_or_else(|| EnvFilter::new("info"));

    let (file_layer, guard) = match open_appender(logs_dir) {
        Ok(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        Err(err) => {
            eprintln!("phasetime: file logging disabled: {}", err);
            (None, None)
        }
    };

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(LevelFilter::WARN);

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .try_init();

    guard
}

fn open_appender(logs_dir: &Path) -> Result<RollingFileAppender, String> {
    fs_err::create_dir_all(logs_dir).map_err(|err| err.to_string())?;
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix("log")
        .build(logs_dir)
        .map_err(|err| format!("Failed to open log file: {}", err))
}
