/// Core logging implementation with automatic filtering
use super::config::{get_logger_config, is_debug_enabled_for_tag, is_verbose_enabled_for_tag};
use super::levels::LogLevel;
use super::tags::LogTag;

/// Check if a log message should be displayed
///
/// Filtering rules:
/// 1. Errors are always shown
/// 2. Debug level requires --debug-<module> for that tag (or a global debug level)
/// 3. Verbose level requires --verbose OR --verbose-<module> for that tag
/// 4. Other levels are compared against the minimum level threshold
/// 5. If enabled_tags is non-empty, tag must be in the set
pub fn should_log(tag: &LogTag, level: LogLevel) -> bool {
    if level == LogLevel::Error {
        return true;
    }

    let allowed = match level {
        LogLevel::Debug => is_debug_enabled_for_tag(tag),
        LogLevel::Verbose => is_verbose_enabled_for_tag(tag),
        _ => level <= get_logger_config().min_level,
    };
    if !allowed {
        return false;
    }

    let config = get_logger_config();
    config.enabled_tags.is_empty() || config.enabled_tags.contains(&tag.to_debug_key())
}

/// Internal logging function with automatic filtering
pub fn log_internal(tag: LogTag, level: LogLevel, message: &str) {
    if !should_log(&tag, level) {
        return;
    }

    super::format::format_and_log(tag, level, message);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::config::{set_logger_config, LoggerConfig};

    #[test]
    fn test_filtering_rules() {
        let mut config = LoggerConfig::default();
        config.debug_tags.insert("transport".to_string());
        config.console = false;
        set_logger_config(config);

        assert!(should_log(&LogTag::Stats, LogLevel::Error));
        assert!(should_log(&LogTag::Stats, LogLevel::Info));
        assert!(should_log(&LogTag::Transport, LogLevel::Debug));
        assert!(!should_log(&LogTag::Supervisor, LogLevel::Debug));
        assert!(!should_log(&LogTag::Transport, LogLevel::Verbose));

        set_logger_config(LoggerConfig::default());
    }
}
