/// Per-endpoint cache TTLs
///
/// TTLs follow endpoint volatility:
/// - Ticker: short (prices move every second)
/// - Klines: medium (one 1h candle changes slowly)
/// - Market caps / global dominance: long (CoinGecko refreshes slowly)
/// - Coins list: very long (listings change rarely)
use crate::config::CacheConfig;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CachedEndpoint {
    Klines,
    Ticker,
    MarketCaps,
    Dominance,
    CoinsList,
    ExchangeSymbols,
}

impl CachedEndpoint {
    /// Function identity used in request descriptors
    pub fn function_name(&self) -> &'static str {
        match self {
            CachedEndpoint::Klines => "get_klines_data",
            CachedEndpoint::Ticker => "get_ticker_data",
            CachedEndpoint::MarketCaps => "get_market_caps",
            CachedEndpoint::Dominance => "get_btc_dominance",
            CachedEndpoint::CoinsList => "get_coins_list",
            CachedEndpoint::ExchangeSymbols => "get_exchange_symbols",
        }
    }

    pub fn ttl(&self, config: &CacheConfig) -> Duration {
        let secs = match self {
            CachedEndpoint::Klines => config.klines_ttl_secs,
            CachedEndpoint::Ticker => config.ticker_ttl_secs,
            CachedEndpoint::MarketCaps => config.market_caps_ttl_secs,
            CachedEndpoint::Dominance => config.dominance_ttl_secs,
            CachedEndpoint::CoinsList | CachedEndpoint::ExchangeSymbols => {
                config.coins_list_ttl_secs
            }
        };
        Duration::from_secs(secs)
    }

    pub fn all() -> [CachedEndpoint; 6] {
        [
            CachedEndpoint::Klines,
            CachedEndpoint::Ticker,
            CachedEndpoint::MarketCaps,
            CachedEndpoint::Dominance,
            CachedEndpoint::CoinsList,
            CachedEndpoint::ExchangeSymbols,
        ]
    }
}

/// Largest TTL in use; entries older than this can never be served again
pub fn max_ttl(config: &CacheConfig) -> Duration {
    CachedEndpoint::all()
        .iter()
        .map(|endpoint| endpoint.ttl(config))
        .max()
        .unwrap_or(Duration::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ttls() {
        let config = CacheConfig::default();
        assert_eq!(CachedEndpoint::Klines.ttl(&config), Duration::from_secs(180));
        assert_eq!(CachedEndpoint::Ticker.ttl(&config), Duration::from_secs(60));
        assert_eq!(CachedEndpoint::MarketCaps.ttl(&config), Duration::from_secs(300));
        assert_eq!(CachedEndpoint::Dominance.ttl(&config), Duration::from_secs(300));
        assert_eq!(max_ttl(&config), Duration::from_secs(3600));
    }
}
