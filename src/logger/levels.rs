//! Severity of a stream log line
//!
//! The logger drops anything above its `min_level`. `Debug` lines also pass
//! when their tag has a `--debug-<tag>` flag, so `--debug-fallback` shows
//! generator ticks without raising the floor for the transport.

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    /// Failed connects, rejected configs
    Error = 0,
    /// Dropped frames, lagged subscribers
    Warning = 1,
    /// State changes; the default floor
    Info = 2,
    Debug = 3,
    /// Per-frame traces
    Verbose = 4,
}

impl LogLevel {
    /// Label printed in the console and file columns
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warning => "WARNING",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
            LogLevel::Verbose => "VERBOSE",
        }
    }

    /// Reads `logging.level` from the config file; `warn` and `trace` are accepted too
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" => Some(LogLevel::Error),
            "warning" | "warn" => Some(LogLevel::Warning),
            "info" => Some(LogLevel::Info),
            "debug" => Some(LogLevel::Debug),
            "verbose" | "trace" => Some(LogLevel::Verbose),
            _ => None,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
