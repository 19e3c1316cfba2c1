/// Live API manager - the production [`MarketApi`]
///
/// Holds one client per upstream. Construction is cheap and happens once in
/// `main`; the manager is then shared behind an `Arc<dyn MarketApi>`.
use super::binance::types::{Kline, Ticker24h};
use super::binance::BinanceClient;
use super::coingecko::types::{CoinListing, CoinMarket};
use super::coingecko::CoinGeckoClient;
use super::MarketApi;
use crate::config::ApiConfig;
use crate::errors::CryptoWatchResult;
use crate::logger::{self, LogTag};
use async_trait::async_trait;
use serde_json::Value;

pub struct ApiManager {
    pub binance: BinanceClient,
    pub coingecko: CoinGeckoClient,
}

impl ApiManager {
    pub fn new(config: &ApiConfig) -> Result<Self, String> {
        logger::info(
            LogTag::Api,
            &format!(
                "Initializing API clients (binance: {}, coingecko: {}, timeout {}s)",
                config.binance_base_url, config.coingecko_base_url, config.timeout_secs
            ),
        );

        Ok(Self {
            binance: BinanceClient::new(&config.binance_base_url, config.timeout_secs)?,
            coingecko: CoinGeckoClient::new(
                &config.coingecko_base_url,
                config.timeout_secs,
                config.coingecko_api_key.clone(),
            )?,
        })
    }
}

#[async_trait]
impl MarketApi for ApiManager {
    async fn fetch_klines(
        &self,
        symbol: &str,
        interval: &str,
        limit: u32,
    ) -> CryptoWatchResult<Vec<Kline>> {
        self.binance.fetch_klines(symbol, interval, limit).await
    }

    async fn fetch_tickers(&self) -> CryptoWatchResult<Vec<Ticker24h>> {
        self.binance.fetch_tickers().await
    }

    async fn fetch_exchange_symbols(&self) -> CryptoWatchResult<Vec<String>> {
        self.binance.fetch_exchange_symbols().await
    }

    async fn fetch_coins_list(&self) -> CryptoWatchResult<Vec<CoinListing>> {
        self.coingecko.fetch_coins_list().await
    }

    async fn fetch_coin_markets(&self, ids: &[String]) -> CryptoWatchResult<Vec<CoinMarket>> {
        self.coingecko.fetch_coin_markets(ids).await
    }

    async fn fetch_global(&self) -> CryptoWatchResult<Value> {
        self.coingecko.fetch_global().await
    }
}
