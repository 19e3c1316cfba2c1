/// Command-line interface
///
/// Logging flags (`--debug-<tag>`, `--verbose-<tag>`, `--verbose`, `--quiet`,
/// `--no-color`) are
/// declared here so clap accepts them; the logger reads the same flags from
/// the raw arguments during `logger::init`.
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(
    name = "cryptowatch",
    version,
    about = "Headless crypto market monitor with rate-limited Binance and CoinGecko access"
)]
pub struct Args {
    /// Configuration file (created with defaults when missing)
    #[arg(long, value_name = "PATH", default_value = crate::config::CONFIG_FILE_PATH)]
    pub config: PathBuf,

    /// Run a single monitoring cycle and exit
    #[arg(long, conflicts_with_all = ["manual", "symbol", "list_symbols"])]
    pub once: bool,

    /// Run a manual refresh of every symbol and exit
    #[arg(long, conflicts_with_all = ["symbol", "list_symbols"])]
    pub manual: bool,

    /// Force an update of one monitored symbol and exit
    #[arg(long, value_name = "SYMBOL", conflicts_with = "list_symbols")]
    pub symbol: Option<String>,

    /// Print every exchange symbol quoted in the configured quote asset
    #[arg(long)]
    pub list_symbols: bool,

    /// Show verbose output for all subsystems
    #[arg(long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only show warnings and errors
    #[arg(long)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    #[arg(long = "debug-system")]
    pub debug_system: bool,

    #[arg(long = "debug-config")]
    pub debug_config: bool,

    #[arg(long = "debug-monitor")]
    pub debug_monitor: bool,

    #[arg(long = "debug-api")]
    pub debug_api: bool,

    #[arg(long = "debug-cache")]
    pub debug_cache: bool,

    #[arg(long = "debug-ratelimit")]
    pub debug_ratelimit: bool,

    #[arg(long = "debug-alerts")]
    pub debug_alerts: bool,

    #[arg(long = "verbose-system")]
    pub verbose_system: bool,

    #[arg(long = "verbose-config")]
    pub verbose_config: bool,

    #[arg(long = "verbose-monitor")]
    pub verbose_monitor: bool,

    #[arg(long = "verbose-api")]
    pub verbose_api: bool,

    #[arg(long = "verbose-cache")]
    pub verbose_cache: bool,

    #[arg(long = "verbose-ratelimit")]
    pub verbose_ratelimit: bool,

    #[arg(long = "verbose-alerts")]
    pub verbose_alerts: bool,
}

/// What the process does after startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunMode {
    Continuous,
    Once,
    Manual,
    Symbol(String),
    ListSymbols,
}

impl Args {
    pub fn mode(&self) -> RunMode {
        if self.list_symbols {
            RunMode::ListSymbols
        } else if let Some(symbol) = &self.symbol {
            RunMode::Symbol(symbol.trim().to_uppercase())
        } else if self.manual {
            RunMode::Manual
        } else if self.once {
            RunMode::Once
        } else {
            RunMode::Continuous
        }
    }

    /// Debug keys switched on from the command line
    pub fn debug_tags(&self) -> Vec<&'static str> {
        [
            (self.debug_system, "system"),
            (self.debug_config, "config"),
            (self.debug_monitor, "monitor"),
            (self.debug_api, "api"),
            (self.debug_cache, "cache"),
            (self.debug_ratelimit, "ratelimit"),
            (self.debug_alerts, "alerts"),
        ]
        .into_iter()
        .filter_map(|(enabled, key)| enabled.then_some(key))
        .collect()
    }

    /// Tags whose verbose output is switched on without the global `--verbose`
    pub fn verbose_tags(&self) -> Vec<&'static str> {
        [
            (self.verbose_system, "system"),
            (self.verbose_config, "config"),
            (self.verbose_monitor, "monitor"),
            (self.verbose_api, "api"),
            (self.verbose_cache, "cache"),
            (self.verbose_ratelimit, "ratelimit"),
            (self.verbose_alerts, "alerts"),
        ]
        .into_iter()
        .filter_map(|(enabled, key)| enabled.then_some(key))
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_continuous() {
        let args = Args::parse_from(["cryptowatch"]);
        assert_eq!(args.mode(), RunMode::Continuous);
        assert_eq!(args.config, PathBuf::from("data/config.toml"));
        assert!(args.debug_tags().is_empty());
    }

    #[test]
    fn test_symbol_mode_normalizes_case() {
        let args = Args::parse_from(["cryptowatch", "--symbol", "btcusdt", "--debug-api", "--debug-cache"]);
        assert_eq!(args.mode(), RunMode::Symbol("BTCUSDT".to_string()));
        assert_eq!(args.debug_tags(), vec!["api", "cache"]);
    }

    #[test]
    fn test_per_tag_verbose_flags_accepted() {
        let args = Args::try_parse_from(["cryptowatch", "--verbose-cache", "--verbose-ratelimit"]).unwrap();
        assert_eq!(args.verbose_tags(), vec!["cache", "ratelimit"]);
        assert!(args.debug_tags().is_empty());

        let raw: Vec<String> = ["cryptowatch", "--verbose-cache"].iter().map(|s| s.to_string()).collect();
        let logger = crate::logger::config_from_args(&raw);
        assert!(logger.verbose_tags.contains("cache"));
    }

    #[test]
    fn test_conflicting_modes_rejected() {
        assert!(Args::try_parse_from(["cryptowatch", "--once", "--manual"]).is_err());
        assert!(Args::try_parse_from(["cryptowatch", "--verbose", "--quiet"]).is_err());
    }
}
