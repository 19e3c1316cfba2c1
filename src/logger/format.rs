//! Console formatting with ANSI colors and word wrapping

use super::config::get_logger_config;
use super::levels::LogLevel;
use super::tags::LogTag;
use chrono::Local;
use colored::*;
use std::io::{stdout, ErrorKind, Write};

const TAG_WIDTH: usize = 10;
const LEVEL_WIDTH: usize = 8;

/// Maximum line length before wrapping
const MAX_LINE_LENGTH: usize = 145;

pub fn format_and_log(tag: &LogTag, level: LogLevel, message: &str) {
    let colored_output = get_logger_config().colored;
    let time = Local::now().format("%H:%M:%S").to_string();

    let tag_label = format!("{:<width$}", tag.to_plain_string(), width = TAG_WIDTH);
    let level_label = format!("{:<width$}", level.as_str(), width = LEVEL_WIDTH);

    let prefix = if colored_output {
        format!(
            "{} [{}] [{}] ",
            time.dimmed(),
            color_tag(tag, &tag_label),
            color_level(level, &level_label)
        )
    } else {
        format!("{} [{}] [{}] ", time, tag_label, level_label)
    };

    // Visible width of the prefix, colors excluded
    let prefix_width = time.len() + TAG_WIDTH + LEVEL_WIDTH + 7;
    let available = MAX_LINE_LENGTH.saturating_sub(prefix_width).max(50);

    let chunks = wrap_text(message, available);
    let continuation = " ".repeat(prefix_width);

    for (i, chunk) in chunks.iter().enumerate() {
        if i == 0 {
            print_stdout_safe(&format!("{}{}", prefix, chunk));
        } else {
            print_stdout_safe(&format!("{}{}", continuation, chunk));
        }
    }
}

fn color_tag(tag: &LogTag, label: &str) -> ColoredString {
    match tag {
        LogTag::System => label.bright_yellow().bold(),
        LogTag::Config => label.bright_white().bold(),
        LogTag::Monitor => label.bright_cyan().bold(),
        LogTag::Api => label.bright_purple().bold(),
        LogTag::Cache => label.bright_blue().bold(),
        LogTag::RateLimit => label.bright_magenta().bold(),
        LogTag::Alerts => label.bright_red().bold(),
        LogTag::Other(_) => label.white().bold(),
    }
}

fn color_level(level: LogLevel, label: &str) -> ColoredString {
    match level {
        LogLevel::Error => label.bright_red().bold(),
        LogLevel::Warning => label.bright_yellow().bold(),
        LogLevel::Info => label.white().bold(),
        LogLevel::Debug => label.bright_black(),
        LogLevel::Verbose => label.dimmed(),
    }
}

/// Print to stdout, exiting quietly if the pipe was closed
fn print_stdout_safe(message: &str) {
    let mut out = stdout().lock();
    if let Err(e) = writeln!(out, "{}", message).and_then(|_| out.flush()) {
        if e.kind() == ErrorKind::BrokenPipe {
            std::process::exit(0);
        }
        let _ = writeln!(std::io::stderr(), "Logger stdout error: {}", e);
    }
}

/// Wrap text at word boundaries, keeping existing newlines
fn wrap_text(text: &str, max_width: usize) -> Vec<String> {
    let mut result = Vec::new();

    for line in text.split('\n') {
        if line.chars().count() <= max_width {
            result.push(line.to_string());
            continue;
        }

        let mut current = String::new();
        for word in line.split_whitespace() {
            let current_len = current.chars().count();
            let word_len = word.chars().count();

            if current.is_empty() {
                current = word.to_string();
            } else if current_len + word_len + 1 <= max_width {
                current.push(' ');
                current.push_str(word);
            } else {
                result.push(std::mem::take(&mut current));
                current = word.to_string();
            }
        }
        if !current.is_empty() {
            result.push(current);
        }
    }

    if result.is_empty() {
        result.push(String::new());
    }
    result
}
