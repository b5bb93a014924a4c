//! Structured logging for the stream client
//!
//! This module provides a small, ergonomic logging API with:
//! - Automatic debug mode filtering from command-line arguments
//! - Standard log levels (Error/Warning/Info/Debug/Verbose)
//! - Per-module debug control via --debug-<module> flags
//! - Dual output: colored console + optional file
//!
//! ## Usage
//!
//! ```rust
//! use supplystream::logger::{self, LogTag};
//!
//! logger::error(LogTag::Transport, "Connection refused");
//! logger::warning(LogTag::Classifier, "Dropping malformed frame");
//! logger::info(LogTag::Supervisor, "Connected");
//! logger::debug(LogTag::Subscription, "Subscribe frame sent"); // Only if --debug-subscription
//! logger::verbose(LogTag::Transport, "Raw frame: ..."); // Only if --verbose
//! ```
//!
//! ## Initialization
//!
//! Call once at startup:
//! ```rust
//! supplystream::logger::init();
//! ```
//!
//! Logging before `init()` works with the default configuration (info level,
//! console only).

mod config;
mod core;
mod file;
mod format;
mod levels;
mod tags;

pub use config::{
    get_logger_config, init_from_args, set_logger_config, update_logger_config, LoggerConfig,
};
pub use levels::LogLevel;
pub use tags::LogTag;

use std::path::Path;

/// Initialize the logger system
///
/// Reads `--debug-<tag>`, `--verbose`, `--quiet` and `--log-file` from the
/// command line. Safe to call more than once.
pub fn init() {
    config::init_from_args();

    let file_path = get_logger_config().file_path;
    if let Some(path) = file_path {
        file::init_file_logging(&path);
    }
}

/// Route log lines to a file in addition to the console
///
/// Used when the log file comes from the configuration file rather than the
/// command line.
pub fn set_log_file(path: &Path) {
    update_logger_config(|cfg| cfg.file_path = Some(path.to_path_buf()));
    file::init_file_logging(path);
}

/// Log at ERROR level (always shown)
pub fn error(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Error, message);
}

/// Log at WARNING level (shown unless a stricter minimum level is set)
pub fn warning(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Warning, message);
}

/// Log at INFO level (standard operations)
pub fn info(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Info, message);
}

/// Log at DEBUG level
///
/// Debug logs are ONLY shown when the --debug-<module> flag for the tag is
/// provided.
///
/// # Example
/// ```rust
/// use supplystream::logger::{self, LogTag};
///
/// // Only shown with --debug-supervisor
/// logger::debug(LogTag::Supervisor, "Reconnect scheduled in 3000ms");
/// ```
pub fn debug(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Debug, message);
}

/// Log at VERBOSE level (only with --verbose)
pub fn verbose(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Verbose, message);
}

/// Force flush all pending log writes
pub fn flush() {
    file::flush_file_logging();
}
