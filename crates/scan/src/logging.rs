use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::error::ScanError;

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// File name prefix, e.g. `sync` gives `sync.2026-10-14`.
    pub component: String,
    pub dir: PathBuf,
    pub to_stderr: bool,
    /// Used when `RUST_LOG` is unset or invalid.
    pub default_filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            component: "multibox".to_string(),
            dir: home.join(".multibox/logs"),
            to_stderr: false,
            default_filter: "info".to_string(),
        }
    }
}

/// Installs the global subscriber. Keep the guard alive for as long as logs
/// should reach the file.
pub fn init_logging(config: &LogConfig) -> Result<WorkerGuard, ScanError> {
    std::fs::create_dir_all(&config.dir)
        .map_err(|e| ScanError::Logging(format!("create {}: {e}", config.dir.display())))?;

    let file_appender = tracing_appender::rolling::daily(&config.dir, &config.component);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true);

    let stderr_layer = config.to_stderr.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .with_target(false)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .map_err(|e| ScanError::Logging(e.to_string()))?;

    Ok(guard)
}
