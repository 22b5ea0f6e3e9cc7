//! Logging initialization.
//!
//! stdout carries the stdio protocol, so the console layer writes to stderr
//! and stays at `warn` unless `RUST_LOG` says otherwise. When file logging is
//! enabled, a non-blocking `tracing-appender` writer appends to the first
//! log path that can be opened.

use crate::config::{LOG_FILE_NAME, LoggingSettings};
use std::fs::{File, OpenOptions};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

const CONSOLE_DEFAULT_LEVEL: &str = "warn";

/// Where file log lines go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    File(PathBuf),
    /// File logging was not requested, or no candidate could be opened.
    Disabled,
}

/// Keeps the file writer alive. Dropping it flushes pending lines.
pub struct LoggingGuard {
    pub target: LogTarget,
    /// Problems found while choosing the log file.
    pub warnings: Vec<String>,
    _guard: Option<WorkerGuard>,
}

impl LoggingGuard {
    /// Flush and close the file writer.
    pub fn flush(self) {
        drop(self);
    }
}

/// Log file candidates in preference order: the explicit path, then the
/// working directory, the home directory and the temp directory.
pub fn candidate_paths(explicit: Option<&Path>) -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    if let Some(path) = explicit {
        candidates.push(path.to_path_buf());
    }
    if let Ok(cwd) = std::env::current_dir() {
        candidates.push(cwd.join(LOG_FILE_NAME));
    }
    if let Some(home) = dirs::home_dir() {
        candidates.push(home.join(LOG_FILE_NAME));
    }
    candidates.push(std::env::temp_dir().join(LOG_FILE_NAME));
    candidates
}

/// Open the first candidate that accepts appends.
pub fn open_first_writable(
    candidates: &[PathBuf],
    warnings: &mut Vec<String>,
) -> Option<(PathBuf, File)> {
    for path in candidates {
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => return Some((path.clone(), file)),
            Err(e) => warnings.push(format!("Cannot open log file {}: {}", path.display(), e)),
        }
    }
    None
}

/// Resolve the file sink for the given settings.
pub fn resolve_log_file(
    settings: &LoggingSettings,
    warnings: &mut Vec<String>,
) -> Option<(PathBuf, File)> {
    if !settings.enabled {
        return None;
    }
    open_first_writable(&candidate_paths(settings.path.as_deref()), warnings)
}

/// Install the global subscriber.
///
/// `level` applies to the file sink; `RUST_LOG` overrides both sinks.
pub fn init(level: &str, json: bool, settings: &LoggingSettings) -> LoggingGuard {
    let mut warnings = Vec::new();
    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();

    let console_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(CONSOLE_DEFAULT_LEVEL));
    if json {
        layers.push(
            fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_filter(console_filter)
                .boxed(),
        );
    } else {
        layers.push(
            fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_ansi(std::io::stderr().is_terminal())
                .with_filter(console_filter)
                .boxed(),
        );
    }

    let (target, guard) = match resolve_log_file(settings, &mut warnings) {
        Some((path, file)) => {
            let (writer, guard) = tracing_appender::non_blocking(file);
            let file_filter = EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(level))
                .unwrap_or_else(|_| EnvFilter::new("info"));
            if json {
                layers.push(
                    fmt::layer()
                        .json()
                        .with_writer(writer)
                        .with_filter(file_filter)
                        .boxed(),
                );
            } else {
                layers.push(
                    fmt::layer()
                        .with_target(true)
                        .with_ansi(false)
                        .with_writer(writer)
                        .with_filter(file_filter)
                        .boxed(),
                );
            }
            (LogTarget::File(path), Some(guard))
        }
        None => {
            if settings.enabled {
                warnings.push("No writable log file location found; file logging disabled".into());
            }
            (LogTarget::Disabled, None)
        }
    };

    if let Err(e) = tracing_subscriber::registry().with(layers).try_init() {
        eprintln!("Logging already initialized: {}", e);
    }

    LoggingGuard {
        target,
        warnings,
        _guard: guard,
    }
}
