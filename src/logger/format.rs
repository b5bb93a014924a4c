//! Log formatting and output with ANSI colors
//!
//! Handles:
//! - Colorized console output with tag and level formatting
//! - Dual output (console + file)
//! - Broken pipe handling for piped commands

use super::config::get_logger_config;
use super::file::write_to_file;
use super::levels::LogLevel;
use super::tags::LogTag;
use chrono::Local;
use colored::*;
use std::io::{stdout, ErrorKind, Write};

/// Log format widths for alignment
const TAG_WIDTH: usize = 10;
const LEVEL_WIDTH: usize = 7;

/// Format and output a log message
pub fn format_and_log(tag: LogTag, level: LogLevel, message: &str) {
    let now = Local::now();

    if get_logger_config().console {
        let console_line = format!(
            "{} [{}] [{}] {}",
            now.format("%H:%M:%S").to_string().dimmed(),
            format_tag(&tag),
            format_level(level),
            message
        );
        print_stdout_safe(&console_line);
    }

    let file_line = format!(
        "{} [{}] [{}] {}",
        now.format("%Y-%m-%d %H:%M:%S"),
        tag.to_plain_string(),
        level.as_str(),
        message
    );
    write_to_file(&file_line);
}

/// Format a tag with appropriate color
fn format_tag(tag: &LogTag) -> ColoredString {
    let label = format!("{:<width$}", tag.to_plain_string(), width = TAG_WIDTH);
    match tag {
        LogTag::System => label.bright_yellow().bold(),
        LogTag::Transport => label.bright_blue().bold(),
        LogTag::Supervisor => label.bright_cyan().bold(),
        LogTag::Subscription => label.cyan().bold(),
        LogTag::Classifier => label.bright_magenta().bold(),
        LogTag::Fallback => label.yellow().bold(),
        LogTag::Stats => label.bright_green().bold(),
        LogTag::Notifications => label.green().bold(),
    }
}

/// Format a level label with appropriate color
fn format_level(level: LogLevel) -> ColoredString {
    let label = format!("{:<width$}", level.as_str(), width = LEVEL_WIDTH);
    match level {
        LogLevel::Error => label.bright_red().bold(),
        LogLevel::Warning => label.bright_yellow().bold(),
        LogLevel::Info => label.bright_white(),
        LogLevel::Debug => label.dimmed(),
        LogLevel::Verbose => label.dimmed().italic(),
    }
}

/// Print to stdout, ignoring broken pipes (e.g. `stream_monitor | head`)
fn print_stdout_safe(line: &str) {
    let mut out = stdout().lock();
    if let Err(e) = writeln!(out, "{}", line) {
        if e.kind() != ErrorKind::BrokenPipe {
            eprintln!("{}", line);
        }
        return;
    }
    let _ = out.flush();
}
