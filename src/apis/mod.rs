//! Upstream market data APIs
//!
//! These clients do no caching and no rate limiting of their own; every
//! call is expected to go through `market::MarketDataService`, which owns
//! the shared cache and limiter.

pub mod binance;
pub mod client;
pub mod coingecko;
pub mod manager;

pub use binance::types::{Kline, Ticker24h};
pub use coingecko::types::{CoinListing, CoinMarket};
pub use manager::ApiManager;

use crate::errors::CryptoWatchResult;
use async_trait::async_trait;
use serde_json::Value;

/// Raw access to the exchanges, one method per endpoint
#[async_trait]
pub trait MarketApi: Send + Sync {
    async fn fetch_klines(
        &self,
        symbol: &str,
        interval: &str,
        limit: u32,
    ) -> CryptoWatchResult<Vec<Kline>>;

    async fn fetch_tickers(&self) -> CryptoWatchResult<Vec<Ticker24h>>;

    /// Every symbol listed on the exchange, unsorted
    async fn fetch_exchange_symbols(&self) -> CryptoWatchResult<Vec<String>>;

    async fn fetch_coins_list(&self) -> CryptoWatchResult<Vec<CoinListing>>;

    async fn fetch_coin_markets(&self, ids: &[String]) -> CryptoWatchResult<Vec<CoinMarket>>;

    /// Raw `/global` document
    async fn fetch_global(&self) -> CryptoWatchResult<Value>;
}
