//! Logging setup, log retention and build information.

use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::warn;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::AppConfig;

/// Prefix of the rolling log files (`terminal.YYYY-MM-DD`).
pub const LOG_FILE_PREFIX: &str = "terminal";

const DEFAULT_FILTER: &str = "info,ticket_terminal_lib=debug";

// ---------------------------------------------------------------------------
// About
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AboutInfo {
    pub version: &'static str,
    pub build_timestamp: &'static str,
    pub git_sha: &'static str,
    pub platform: &'static str,
    pub arch: &'static str,
    pub rust_version: &'static str,
    /// Reported by `GET /Version/Info` when the backend is reachable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend_version: Option<String>,
}

pub fn about_info(backend_version: Option<String>) -> AboutInfo {
    AboutInfo {
        version: env!("CARGO_PKG_VERSION"),
        build_timestamp: env!("BUILD_TIMESTAMP"),
        git_sha: env!("BUILD_GIT_SHA"),
        platform: std::env::consts::OS,
        arch: std::env::consts::ARCH,
        rust_version: env!("CARGO_PKG_RUST_VERSION"),
        backend_version,
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

/// Install the global subscriber: console output plus a daily-rolling JSON
/// file under the configured log directory. Old files are pruned first.
///
/// The returned guard flushes the file writer; keep it alive for the
/// lifetime of the process.
pub fn init_logging(config: &AppConfig) -> Result<WorkerGuard, String> {
    let log_dir = config.log_dir();
    fs::create_dir_all(&log_dir).map_err(|e| format!("Failed to create log dir: {e}"))?;
    prune_old_logs(&log_dir, config.log_retention_files);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let file_appender = tracing_appender::rolling::daily(&log_dir, LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true);
    let console_layer = fmt::layer().with_target(true);
    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| format!("Failed to install log subscriber: {e}"))?;

    Ok(guard)
}

/// Keep the `keep` most recent log files in `log_dir`, deleting the rest.
/// Returns how many files were removed.
pub fn prune_old_logs(log_dir: &Path, keep: usize) -> usize {
    let Ok(entries) = fs::read_dir(log_dir) else {
        return 0;
    };

    let mut log_files: Vec<(std::path::PathBuf, std::time::SystemTime)> = entries
        .flatten()
        .filter(|entry| {
            entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.starts_with(&format!("{LOG_FILE_PREFIX}.")))
        })
        .filter(|entry| entry.path().is_file())
        .map(|entry| {
            let modified = entry
                .metadata()
                .ok()
                .and_then(|m| m.modified().ok())
                .unwrap_or(std::time::UNIX_EPOCH);
            (entry.path(), modified)
        })
        .collect();

    // Newest first; ties broken by name so dated files order correctly.
    log_files.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| b.0.cmp(&a.0)));

    let mut removed = 0;
    for (path, _) in log_files.iter().skip(keep) {
        match fs::remove_file(path) {
            Ok(()) => removed += 1,
            Err(e) => warn!("Failed to prune log file {}: {e}", path.display()),
        }
    }
    removed
}
