//! Shared logging utilities for consistent tracing across the engine

use chrono::{DateTime, Utc};

/// Log level used when none is configured
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Build the target filter used by the engine binaries
pub fn filter_directive(log_level: Option<&str>) -> String {
    let base_level = log_level.unwrap_or(DEFAULT_LOG_LEVEL);
    format!("dispatcher={base_level},shared={base_level},reqwest=warn,hyper=warn")
}

/// Initialize the stdout tracing subscriber with an optional log level
///
/// `RUST_LOG` takes precedence over the computed directive when set.
pub fn init_tracing_with_level(log_level: Option<&str>) {
    use tracing_subscriber::{EnvFilter, fmt};

    let directive = filter_directive(log_level);
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&directive));

    // A subscriber may already be installed (tests, embedding services)
    let installed = fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .try_init()
        .is_ok();

    if installed {
        tracing::debug!("Tracing initialized ({})", directive);
    }
}

/// Get formatted timestamp for consistent logging
pub fn format_timestamp() -> String {
    let now: DateTime<Utc> = Utc::now();
    now.format("%H:%M:%S%.3f").to_string()
}

/// Macro for request-aware info logging
#[macro_export]
macro_rules! dispatch_info {
    ($request_id:expr, $($arg:tt)*) => {
        tracing::info!(
            request_id = %$request_id,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Macro for request-aware warning logging
#[macro_export]
macro_rules! dispatch_warn {
    ($request_id:expr, $($arg:tt)*) => {
        tracing::warn!(
            request_id = %$request_id,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Macro for request-aware error logging
#[macro_export]
macro_rules! dispatch_error {
    ($request_id:expr, $($arg:tt)*) => {
        tracing::error!(
            request_id = %$request_id,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Macro for request-aware debug logging
#[macro_export]
macro_rules! dispatch_debug {
    ($request_id:expr, $($arg:tt)*) => {
        tracing::debug!(
            request_id = %$request_id,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}
