/// Logger configuration and command-line flag parsing
use super::levels::LogLevel;
use super::tags::LogTag;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::collections::HashSet;

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// Lines above this level are dropped
    pub min_level: LogLevel,
    /// Tags whose debug output is enabled
    pub debug_tags: HashSet<String>,
    /// Tags whose verbose output is enabled without the global --verbose
    pub verbose_tags: HashSet<String>,
    /// Emit ANSI colors
    pub colored: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            min_level: LogLevel::Info,
            debug_tags: HashSet::new(),
            verbose_tags: HashSet::new(),
            colored: true,
        }
    }
}

static LOGGER_CONFIG: Lazy<RwLock<LoggerConfig>> =
    Lazy::new(|| RwLock::new(LoggerConfig::default()));

pub fn get_logger_config() -> LoggerConfig {
    LOGGER_CONFIG.read().clone()
}

pub fn set_logger_config(config: LoggerConfig) {
    *LOGGER_CONFIG.write() = config;
}

pub fn update_logger_config<F: FnOnce(&mut LoggerConfig)>(f: F) {
    let mut config = LOGGER_CONFIG.write();
    f(&mut config);
}

/// Build a logger configuration from raw command-line arguments
///
/// Recognized flags: `--debug-<tag>`, `--verbose`, `--verbose-<tag>`,
/// `--quiet`, `--no-color`.
pub fn config_from_args(args: &[String]) -> LoggerConfig {
    let mut config = LoggerConfig::default();

    for arg in args {
        if arg == "--verbose" {
            config.min_level = LogLevel::Verbose;
        } else if arg == "--quiet" {
            config.min_level = LogLevel::Warning;
        } else if arg == "--no-color" {
            config.colored = false;
        } else if let Some(tag) = arg.strip_prefix("--debug-") {
            config
                .debug_tags
                .insert(LogTag::from_debug_key(tag).to_debug_key());
        } else if let Some(tag) = arg.strip_prefix("--verbose-") {
            config
                .verbose_tags
                .insert(LogTag::from_debug_key(tag).to_debug_key());
        }
    }

    // Debug output needs the threshold lifted past Info
    if !config.debug_tags.is_empty() && config.min_level < LogLevel::Debug {
        config.min_level = LogLevel::Debug;
    }

    config
}

/// Initialize the global logger configuration from `std::env::args`
pub fn init_from_args() {
    let args: Vec<String> = std::env::args().collect();
    set_logger_config(config_from_args(&args));
}

/// Enable debug output for additional tags (e.g. from the config file)
pub fn enable_debug_tags<I, S>(tags: I)
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    update_logger_config(|config| {
        for tag in tags {
            config
                .debug_tags
                .insert(LogTag::from_debug_key(tag.as_ref()).to_debug_key());
        }
        if !config.debug_tags.is_empty() && config.min_level < LogLevel::Debug {
            config.min_level = LogLevel::Debug;
        }
    });
}

pub fn is_debug_enabled_for_tag(tag: &LogTag) -> bool {
    LOGGER_CONFIG.read().debug_tags.contains(&tag.to_debug_key())
}

pub fn is_verbose_enabled_for_tag(tag: &LogTag) -> bool {
    LOGGER_CONFIG.read().verbose_tags.contains(&tag.to_debug_key())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_debug_flags_enable_tag_and_raise_threshold() {
        let config = config_from_args(&args(&["cryptowatch", "--debug-cache", "--debug-api"]));
        assert!(config.debug_tags.contains("cache"));
        assert!(config.debug_tags.contains("api"));
        assert_eq!(config.min_level, LogLevel::Debug);
    }

    #[test]
    fn test_quiet_and_no_color() {
        let config = config_from_args(&args(&["cryptowatch", "--quiet", "--no-color"]));
        assert_eq!(config.min_level, LogLevel::Warning);
        assert!(!config.colored);
    }

    #[test]
    fn test_defaults_without_flags() {
        let config = config_from_args(&args(&["cryptowatch", "--once"]));
        assert_eq!(config.min_level, LogLevel::Info);
        assert!(config.debug_tags.is_empty());
    }
}
