//! Structured logging for CryptoWatch
//!
//! - Standard levels (Error/Warning/Info/Debug/Verbose)
//! - Per-subsystem debug control via `--debug-<tag>` flags
//! - Colored console output
//!
//! ## Usage
//!
//! ```rust
//! use cryptowatch::logger::{self, LogTag};
//!
//! logger::warning(LogTag::Api, "Ticker request failed, skipping cycle");
//! logger::debug(LogTag::Cache, "Cache HIT for klines BTCUSDT"); // Only if --debug-cache
//! ```
//!
//! Call [`init`] once at startup. Records emitted through the `log` crate
//! by dependencies are forwarded to the same output under `LogTag::System`.

mod config;
mod core;
mod format;
mod levels;
mod tags;

pub use config::{
    config_from_args, enable_debug_tags, get_logger_config, init_from_args, set_logger_config,
    update_logger_config, LoggerConfig,
};
pub use levels::LogLevel;
pub use tags::LogTag;

/// Initialize the logger from command-line arguments and install the `log` bridge
pub fn init() {
    config::init_from_args();
    install_log_bridge();
}

/// Log at ERROR level (always shown)
pub fn error(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Error, message);
}

/// Log at WARNING level
pub fn warning(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Warning, message);
}

/// Log at INFO level
pub fn info(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Info, message);
}

/// Log at DEBUG level, only shown with `--debug-<tag>`
pub fn debug(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Debug, message);
}

/// Log at VERBOSE level, only shown with `--verbose`
pub fn verbose(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Verbose, message);
}

struct LogBridge;

impl log::Log for LogBridge {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        // Dependency chatter only at warning and above unless --verbose
        metadata.level() <= log::Level::Warn
            || get_logger_config().min_level == LogLevel::Verbose
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let message = format!("{}: {}", record.target(), record.args());
        core::log_internal(
            LogTag::System,
            LogLevel::from_log_level(record.level()),
            &message,
        );
    }

    fn flush(&self) {}
}

static LOG_BRIDGE: LogBridge = LogBridge;

fn install_log_bridge() {
    // A second init (tests, embedding apps) keeps the first logger
    if log::set_logger(&LOG_BRIDGE).is_ok() {
        log::set_max_level(log::LevelFilter::Trace);
    }
}
