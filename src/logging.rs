//! Log setup.
//!
//! Everything goes to one append-only file. The console only sees the
//! notices `main` prints itself.

use std::path::{Path, PathBuf};

use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{DEFAULT_LOG_FILE, DEFAULT_LOG_LEVEL, LogSettings};

const TIME_FORMAT: &str = "%H:%M:%S";

/// Install the global subscriber. Returns the log file path.
///
/// Fails when the log directory or file cannot be created. A second call
/// leaves the first subscriber in place.
pub fn init(settings: &LogSettings) -> Result<PathBuf, InitError> {
    let (dir, file_name) = split_log_path(&settings.file);
    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name.as_str())
        .build(&dir)?;

    let filter = EnvFilter::try_new(&settings.level).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_appender)
                .with_timer(ChronoLocal::new(TIME_FORMAT.to_string()))
                .with_ansi(false)
                .with_target(true),
        )
        .try_init();

    Ok(dir.join(file_name))
}

/// Split into (directory, file name); a bare name lands in the working directory
fn split_log_path(path: &Path) -> (PathBuf, String) {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| DEFAULT_LOG_FILE.to_string());
    (dir, file_name)
}
