//! Logging configuration for zkgen
//!
//! Logging uses the `tracing` framework with level filtering, pretty or
//! compact output, and daily-rotated log files. Console output goes to
//! stderr so generated source on stdout stays clean.

use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::{Error, Result};

const DEFAULT_LOG_FILE: &str = "zkgen.log";

/// Log output destination
#[derive(Debug, Clone)]
pub enum LogOutput {
    /// Output to stderr
    Stderr,
    /// Output to a file with rotation
    File(PathBuf),
    /// Output to both stderr and file
    Both(PathBuf),
}

/// Log format style
#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    /// Human-readable multi-line format
    Pretty,
    /// Compact single-line format (default)
    Compact,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Minimum log level filter
    pub level: String,
    /// Output destination
    pub output: LogOutput,
    /// Format style
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            output: LogOutput::Stderr,
            format: LogFormat::Compact,
        }
    }
}

impl LogConfig {
    /// Create config with info level
    pub fn info() -> Self {
        Self {
            level: "info".to_string(),
            ..Default::default()
        }
    }

    /// Create config with debug level
    pub fn debug() -> Self {
        Self {
            level: "debug".to_string(),
            ..Default::default()
        }
    }

    /// Create config with warn level
    pub fn warn() -> Self {
        Self::default()
    }

    /// Set log output to file with rotation
    pub fn with_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.output = LogOutput::File(path.into());
        self
    }

    /// Set log output to both stderr and file
    pub fn with_both<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.output = LogOutput::Both(path.into());
        self
    }

    /// Set log format
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Set log level filter
    pub fn with_level<S: Into<String>>(mut self, level: S) -> Self {
        self.level = level.into();
        self
    }

    /// Initialize global logging with this configuration
    ///
    /// `RUST_LOG` overrides the configured level. Returns a guard that must
    /// be kept alive while logging to a file; dropping it flushes and stops
    /// the writer thread.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use zkgen::logging::LogConfig;
    ///
    /// let _guard = LogConfig::info().init()?;
    /// # Ok::<(), zkgen::Error>(())
    /// ```
    pub fn init(self) -> Result<Option<WorkerGuard>> {
        let env_filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&self.level))
            .map_err(|e| {
                Error::InvalidConfiguration(format!("invalid log level '{}': {}", self.level, e))
            })?;

        let installed = match self.output {
            LogOutput::Stderr => {
                let layer = fmt::layer().with_writer(std::io::stderr);
                let result = match self.format {
                    LogFormat::Pretty => tracing_subscriber::registry()
                        .with(env_filter)
                        .with(layer.pretty())
                        .try_init(),
                    LogFormat::Compact => tracing_subscriber::registry()
                        .with(env_filter)
                        .with(layer.compact())
                        .try_init(),
                };
                result.map(|_| None)
            }
            LogOutput::File(path) => {
                let (non_blocking, guard) = rolling_writer(&path);
                let layer = fmt::layer().with_writer(non_blocking).with_ansi(false);
                let result = match self.format {
                    LogFormat::Pretty => tracing_subscriber::registry()
                        .with(env_filter)
                        .with(layer.pretty())
                        .try_init(),
                    LogFormat::Compact => tracing_subscriber::registry()
                        .with(env_filter)
                        .with(layer.compact())
                        .try_init(),
                };
                result.map(|_| Some(guard))
            }
            LogOutput::Both(path) => {
                let (non_blocking, guard) = rolling_writer(&path);

                // both layers share the compact format to keep the layer types simple
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt::layer().with_writer(std::io::stderr).compact())
                    .with(
                        fmt::layer()
                            .with_writer(non_blocking)
                            .with_ansi(false)
                            .compact(),
                    )
                    .try_init()
                    .map(|_| Some(guard))
            }
        };

        installed.map_err(|e| {
            Error::InvalidConfiguration(format!("logging already initialized: {}", e))
        })
    }
}

fn rolling_writer(path: &Path) -> (tracing_appender::non_blocking::NonBlocking, WorkerGuard) {
    let directory = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(DEFAULT_LOG_FILE);
    let file_appender = tracing_appender::rolling::daily(directory, file_name);
    tracing_appender::non_blocking(file_appender)
}
