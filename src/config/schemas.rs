/// Configuration schemas - all config structures defined once with defaults
///
/// Every numeric limit below is a tunable, not a protocol constant. The
/// defaults sit comfortably under Binance's and CoinGecko's public quotas.
use crate::alerts::AlertRule;
use crate::config_struct;
use std::collections::HashMap;

// ============================================================================
// MONITOR CONFIGURATION
// ============================================================================

config_struct! {
    /// One symbol under watch and its optional alert rule
    pub struct MonitoredSymbol {
        symbol: String = String::new(),
        alert: Option<AlertRule> = None,
    }
}

impl MonitoredSymbol {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            alert: None,
        }
    }

    pub fn with_alert(mut self, rule: AlertRule) -> Self {
        self.alert = Some(rule);
        self
    }
}

config_struct! {
    /// Background monitoring loop
    pub struct MonitorConfig {
        /// Pause between two full cycles
        check_interval_seconds: u64 = 300,
        /// Pause between two symbols inside a cycle
        symbol_pause_ms: u64 = 200,
        /// Poll interval while no symbols are configured
        idle_poll_seconds: u64 = 5,
        kline_interval: String = "1h".to_string(),
        kline_limit: u32 = 300,
        quote_asset: String = "USDT".to_string(),
        symbols: Vec<MonitoredSymbol> = Vec::new(),
        /// Base asset -> CoinGecko coin name, e.g. "BTC" -> "Bitcoin".
        /// Assets not listed here are matched by CoinGecko ticker symbol.
        coingecko_names: HashMap<String, String> = HashMap::new(),
    }
}

impl MonitorConfig {
    pub fn symbol_names(&self) -> Vec<String> {
        self.symbols.iter().map(|s| s.symbol.clone()).collect()
    }

    pub fn find_symbol(&self, symbol: &str) -> Option<&MonitoredSymbol> {
        self.symbols.iter().find(|s| s.symbol == symbol)
    }
}

// ============================================================================
// RATE LIMIT CONFIGURATION
// ============================================================================

config_struct! {
    /// One sliding window: at most `max_requests` per `duration_secs`
    pub struct WindowLimitConfig {
        name: String = "1min".to_string(),
        duration_secs: u64 = 60,
        max_requests: usize = 50,
        /// Stricter ceiling applied while a manual refresh is running
        manual_max_requests: usize = 30,
    }
}

impl WindowLimitConfig {
    pub fn new(
        name: impl Into<String>,
        duration_secs: u64,
        max_requests: usize,
        manual_max_requests: usize,
    ) -> Self {
        Self {
            name: name.into(),
            duration_secs,
            max_requests,
            manual_max_requests,
        }
    }
}

pub fn default_windows() -> Vec<WindowLimitConfig> {
    vec![
        WindowLimitConfig::new("1min", 60, 50, 30),
        WindowLimitConfig::new("5min", 300, 200, 120),
    ]
}

config_struct! {
    /// Outbound request budget shared by every API call
    pub struct RateLimitConfig {
        windows: Vec<WindowLimitConfig> = default_windows(),
        /// A manual refresh is offered only while every window is below this share of its limit
        manual_safety_percent: f64 = 80.0,
        /// First cooldown after a 429, doubled for each consecutive one
        backoff_base_ms: u64 = 1000,
        backoff_max_secs: u64 = 120,
        /// Hard ceiling for any cooldown, Retry-After included
        max_cooldown_secs: u64 = 300,
    }
}

// ============================================================================
// CACHE CONFIGURATION
// ============================================================================

config_struct! {
    /// Response cache TTLs per endpoint
    pub struct CacheConfig {
        klines_ttl_secs: u64 = 180,
        ticker_ttl_secs: u64 = 60,
        market_caps_ttl_secs: u64 = 300,
        dominance_ttl_secs: u64 = 300,
        coins_list_ttl_secs: u64 = 3600,
        capacity: usize = 2000,
    }
}

// ============================================================================
// API CONFIGURATION
// ============================================================================

config_struct! {
    /// Upstream endpoints
    pub struct ApiConfig {
        binance_base_url: String = "https://api.binance.com".to_string(),
        coingecko_base_url: String = "https://api.coingecko.com/api/v3".to_string(),
        timeout_secs: u64 = 10,
        coingecko_api_key: Option<String> = None,
    }
}

// ============================================================================
// LOGGING CONFIGURATION
// ============================================================================

config_struct! {
    pub struct LoggingConfig {
        /// Same effect as passing --debug-<tag> for each entry
        debug_tags: Vec<String> = Vec::new(),
        verbose: bool = false,
    }
}

// ============================================================================
// ROOT CONFIGURATION
// ============================================================================

config_struct! {
    pub struct Config {
        monitor: MonitorConfig = MonitorConfig::default(),
        rate_limit: RateLimitConfig = RateLimitConfig::default(),
        cache: CacheConfig = CacheConfig::default(),
        apis: ApiConfig = ApiConfig::default(),
        logging: LoggingConfig = LoggingConfig::default(),
    }
}
