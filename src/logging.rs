//! Structured logging for the morphological parser.
//!
//! This module provides structured logging using the `tracing` crate, with
//! support for different log levels, structured fields, and spans.

use crate::config::env::EnvConfig;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the logging system.
///
/// This should be called once at program startup. The log level can be
/// controlled via the `MORPHOPARSE_LOG_LEVEL` environment variable, with
/// `RUST_LOG` honored as a fallback/override.
pub fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let config = EnvConfig::from_env();

    let filter = match config.log_level.as_str() {
        "trace" => EnvFilter::new("trace"),
        "debug" => EnvFilter::new("debug"),
        "info" => EnvFilter::new("info"),
        "warn" => EnvFilter::new("warn"),
        "error" => EnvFilter::new("error"),
        _ => EnvFilter::new("info"),
    };

    let filter = filter.add_directive(
        std::env::var("RUST_LOG")
            .unwrap_or_else(|_| "info".to_string())
            .parse()?,
    );

    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(config.debug_mode)
        .with_thread_names(config.debug_mode)
        .with_file(config.debug_mode)
        .with_line_number(config.debug_mode);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}

/// Initialize logging for tests.
#[cfg(test)]
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("debug")
        .with_test_writer()
        .try_init();
}

// Re-export commonly used tracing macros.
pub use tracing::{debug, error, info, trace, warn};
pub use tracing::{debug_span, error_span, info_span, trace_span, warn_span};
pub use tracing::{event, span};

/// Log an external toolkit invocation (foma/flookup/estimate-ngram) with
/// structured fields.
#[macro_export]
macro_rules! log_toolkit {
    ($level:expr, $command:expr, $($field:tt)*) => {
        tracing::event!(
            $level,
            command = %$command,
            category = "toolkit",
            $($field)*
        );
    };
}

/// Log cache hit/miss/persist operations with structured fields.
#[macro_export]
macro_rules! log_cache {
    ($level:expr, $operation:expr, $($field:tt)*) => {
        tracing::event!(
            $level,
            operation = %$operation,
            category = "cache",
            $($field)*
        );
    };
}

/// Log performance metrics.
#[macro_export]
macro_rules! log_perf {
    ($operation:expr, $duration_ms:expr, $($field:tt)*) => {
        tracing::event!(
            tracing::Level::INFO,
            operation = %$operation,
            duration_ms = $duration_ms,
            category = "performance",
            $($field)*
        );
    };
}

/// Create a span for tracking an operation on a parser workspace.
#[macro_export]
macro_rules! parser_span {
    ($name:expr) => {
        tracing::info_span!($name)
    };
    ($name:expr, $($field:tt)*) => {
        tracing::info_span!($name, $($field)*)
    };
}
