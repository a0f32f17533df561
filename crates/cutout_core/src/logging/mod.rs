//! Logging infrastructure for Batch Cutout.
//!
//! All modules log through the `tracing` ecosystem; this module owns the
//! global subscriber setup. User-facing status announcements are a separate
//! concern and live in [`crate::summary`].

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Log verbosity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Parse from a settings string, falling back to `Info`.
    pub fn from_setting(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "trace" => LogLevel::Trace,
            "debug" => LogLevel::Debug,
            "warn" | "warning" => LogLevel::Warn,
            "error" => LogLevel::Error,
            _ => LogLevel::Info,
        }
    }
}

/// Initialize global tracing subscriber for application-wide logging.
///
/// This sets up a subscriber that:
/// - Respects RUST_LOG environment variable
/// - Falls back to the provided default level
/// - Outputs to stderr with timestamps
///
/// Should be called once at application startup.
pub fn init_tracing(default_level: LogLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_to_filter_str(default_level)));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(false))
        .with(filter)
        .init();
}

/// Convert LogLevel to filter string.
fn level_to_filter_str(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Trace => "trace",
        LogLevel::Debug => "debug",
        LogLevel::Info => "info",
        LogLevel::Warn => "warn",
        LogLevel::Error => "error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_parses_from_settings() {
        assert_eq!(LogLevel::from_setting("debug"), LogLevel::Debug);
        assert_eq!(LogLevel::from_setting("WARNING"), LogLevel::Warn);
        assert_eq!(LogLevel::from_setting("nonsense"), LogLevel::Info);
    }

    #[test]
    fn filter_strings_match_levels() {
        assert_eq!(level_to_filter_str(LogLevel::Trace), "trace");
        assert_eq!(level_to_filter_str(LogLevel::Error), "error");
    }
}
