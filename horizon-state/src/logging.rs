//! Logging setup for applications embedding the Horizon SDK
//!
//! The SDK itself only emits `tracing` events; this module installs a
//! subscriber for applications that do not bring their own.

use tracing_subscriber::{fmt, EnvFilter, Registry};

/// Logging mode for different use cases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoggingMode {
    /// No subscriber installed
    Silent,
    /// Compact stderr output
    Development,
    /// Verbose output with thread ids and source locations
    Debug,
}

impl LoggingMode {
    /// Parse the value of `HORIZON_LOG_MODE`; anything unknown is silent
    pub fn from_env_value(value: Option<&str>) -> Self {
        match value {
            Some("development") => LoggingMode::Development,
            Some("debug") => LoggingMode::Debug,
            _ => LoggingMode::Silent,
        }
    }
}

/// Logging configuration error
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Failed to initialize tracing subscriber: {0}")]
    TracingInit(String),
}

/// Initialize logging with the specified mode
///
/// Call this once, early, before connecting.
///
/// ```rust,ignore
/// horizon_state::logging::init_logging(LoggingMode::Development)?;
/// ```
///
/// # Environment Variables
///
/// - `HORIZON_LOG_LEVEL`: filter directive, e.g. `horizon_state=debug`
/// - `RUST_LOG`: used when `HORIZON_LOG_LEVEL` is unset
pub fn init_logging(mode: LoggingMode) -> Result<(), LoggingError> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    match mode {
        LoggingMode::Silent => Ok(()),
        LoggingMode::Development => Registry::default()
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_names(true)
                    .compact(),
            )
            .with(env_filter("info"))
            .try_init()
            .map_err(|e| LoggingError::TracingInit(e.to_string())),
        LoggingMode::Debug => Registry::default()
            .with(
                fmt::layer()
                    .pretty()
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .with(env_filter("debug"))
            .try_init()
            .map_err(|e| LoggingError::TracingInit(e.to_string())),
    }
}

/// Initialize logging from `HORIZON_LOG_MODE` (`silent`, `development`, `debug`)
pub fn init_logging_from_env() -> Result<(), LoggingError> {
    let mode = std::env::var("HORIZON_LOG_MODE").ok();
    init_logging(LoggingMode::from_env_value(mode.as_deref()))
}

fn env_filter(default_level: &str) -> EnvFilter {
    std::env::var("HORIZON_LOG_LEVEL")
        .or_else(|_| std::env::var("RUST_LOG"))
        .map(EnvFilter::new)
        .unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Whether a global subscriber is already installed
pub fn is_initialized() -> bool {
    tracing::dispatcher::has_been_set()
}
