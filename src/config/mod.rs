//! TOML configuration with embedded defaults

pub mod macros;
pub mod schemas;
pub mod utils;

pub use schemas::{
    default_windows, ApiConfig, CacheConfig, Config, LoggingConfig, MonitorConfig,
    MonitoredSymbol, RateLimitConfig, WindowLimitConfig,
};
pub use utils::{
    load_config_from_path, parse_config, report_config_problems, save_config, validate_config,
    CONFIG_FILE_PATH,
};
