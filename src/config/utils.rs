/// Configuration loading, saving and sanity checks
use super::schemas::Config;
use crate::logger::{self, LogTag};
use crate::validator;
use std::path::Path;

/// Default configuration file path
pub const CONFIG_FILE_PATH: &str = "data/config.toml";

/// Load configuration from a TOML file
///
/// A missing file yields the defaults; a file that exists but does not
/// parse is an error, so a typo never silently resets the symbol list.
pub fn load_config_from_path(path: impl AsRef<Path>) -> Result<Config, String> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(Config::default());
    }

    let contents = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config file '{}': {}", path.display(), e))?;

    parse_config(&contents)
        .map_err(|e| format!("Failed to parse config file '{}': {}", path.display(), e))
}

pub fn parse_config(contents: &str) -> Result<Config, String> {
    toml::from_str::<Config>(contents).map_err(|e| e.to_string())
}

/// Write `config` as pretty TOML, creating parent directories
pub fn save_config(config: &Config, path: impl AsRef<Path>) -> Result<(), String> {
    let path = path.as_ref();
    let config_str =
        toml::to_string_pretty(config).map_err(|e| format!("Failed to serialize config: {}", e))?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| {
                format!("Failed to create config directory '{}': {}", parent.display(), e)
            })?;
        }
    }

    std::fs::write(path, config_str)
        .map_err(|e| format!("Failed to write config file '{}': {}", path.display(), e))
}

/// Human-readable problems in a loaded configuration
///
/// None of these are fatal: the rate limiter clamps bad limits and the
/// monitor skips bad symbols, but the user should hear about them.
pub fn validate_config(config: &Config) -> Vec<String> {
    let mut problems = Vec::new();

    for entry in &config.monitor.symbols {
        if !validator::validate_symbol(&entry.symbol) {
            problems.push(format!("monitor.symbols: '{}' is not a valid symbol", entry.symbol));
        }
    }

    if config.rate_limit.windows.is_empty() {
        problems.push("rate_limit.windows is empty, built-in windows will be used".to_string());
    }

    for window in &config.rate_limit.windows {
        if window.max_requests == 0 {
            problems.push(format!(
                "rate_limit window '{}': max_requests must be at least 1",
                window.name
            ));
        }
        if window.duration_secs == 0 {
            problems.push(format!(
                "rate_limit window '{}': duration_secs must be at least 1",
                window.name
            ));
        }
        if window.manual_max_requests > window.max_requests {
            problems.push(format!(
                "rate_limit window '{}': manual_max_requests ({}) exceeds max_requests ({})",
                window.name, window.manual_max_requests, window.max_requests
            ));
        }
    }

    let pct = config.rate_limit.manual_safety_percent;
    if !(pct > 0.0 && pct <= 100.0) {
        problems.push(format!(
            "rate_limit.manual_safety_percent must be in (0, 100], got {}",
            pct
        ));
    }

    problems
}

/// Log every problem `validate_config` finds and return how many there were
///
/// Startup continues either way; a bad entry only loses itself.
pub fn report_config_problems(config: &Config) -> usize {
    let problems = validate_config(config);
    for problem in &problems {
        logger::warning(LogTag::Config, problem);
    }
    problems.len()
}
