/// Cached, rate-limited access to Binance and CoinGecko
///
/// The cache and limiter are injected so that every caller in the process
/// (background cycle, manual refresh, single-symbol update) shares one
/// network budget and one set of cached responses.
use super::{CachedResponse, MarketCache, DOMINANCE_UNAVAILABLE};
use crate::apis::coingecko::extract_btc_dominance;
use crate::apis::{CoinListing, Kline, MarketApi, Ticker24h};
use crate::cache::{CachedEndpoint, RequestDescriptor};
use crate::config::CacheConfig;
use crate::errors::{CryptoWatchError, CryptoWatchResult};
use crate::logger::{self, LogTag};
use crate::rate_limiter::RateLimiter;
use crate::validator;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

pub struct MarketDataService {
    api: Arc<dyn MarketApi>,
    cache: Arc<MarketCache>,
    limiter: Arc<RateLimiter>,
    ttls: CacheConfig,
}

impl MarketDataService {
    pub fn new(
        api: Arc<dyn MarketApi>,
        cache: Arc<MarketCache>,
        limiter: Arc<RateLimiter>,
        ttls: CacheConfig,
    ) -> Self {
        Self {
            api,
            cache,
            limiter,
            ttls,
        }
    }

    pub fn cache(&self) -> &Arc<MarketCache> {
        &self.cache
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    pub fn ttls(&self) -> &CacheConfig {
        &self.ttls
    }

    /// Candles for one symbol
    ///
    /// The symbol is validated before any permit is spent.
    pub async fn klines(
        &self,
        symbol: &str,
        interval: &str,
        limit: u32,
    ) -> CryptoWatchResult<Arc<Vec<Kline>>> {
        if !validator::validate_symbol(symbol) {
            return Err(CryptoWatchError::InvalidSymbol(symbol.to_string()));
        }

        let descriptor = RequestDescriptor::new(CachedEndpoint::Klines.function_name())
            .param("symbol", symbol)
            .param("interval", interval)
            .param("limit", limit);

        if let Some(CachedResponse::Klines(klines)) = self.cached(&descriptor, CachedEndpoint::Klines) {
            return Ok(klines);
        }

        self.limiter.wait_if_needed().await;
        let result = self.api.fetch_klines(symbol, interval, limit).await;
        let klines = Arc::new(self.settle(result)?);

        self.cache.set(&descriptor, CachedResponse::Klines(Arc::clone(&klines)));
        Ok(klines)
    }

    /// 24h statistics for every symbol, keyed by symbol
    pub async fn tickers(&self) -> CryptoWatchResult<Arc<HashMap<String, Ticker24h>>> {
        let descriptor = RequestDescriptor::new(CachedEndpoint::Ticker.function_name());

        if let Some(CachedResponse::Tickers(tickers)) = self.cached(&descriptor, CachedEndpoint::Ticker) {
            return Ok(tickers);
        }

        self.limiter.wait_if_needed().await;
        let result = self.api.fetch_tickers().await;
        let tickers: HashMap<String, Ticker24h> = self
            .settle(result)?
            .into_iter()
            .map(|ticker| (ticker.symbol.clone(), ticker))
            .collect();
        let tickers = Arc::new(tickers);

        self.cache.set(&descriptor, CachedResponse::Tickers(Arc::clone(&tickers)));
        Ok(tickers)
    }

    pub async fn coins_list(&self) -> CryptoWatchResult<Arc<Vec<CoinListing>>> {
        let descriptor = RequestDescriptor::new(CachedEndpoint::CoinsList.function_name());

        if let Some(CachedResponse::CoinsList(coins)) = self.cached(&descriptor, CachedEndpoint::CoinsList) {
            return Ok(coins);
        }

        self.limiter.wait_if_needed().await;
        let result = self.api.fetch_coins_list().await;
        let coins = Arc::new(self.settle(result)?);

        self.cache.set(&descriptor, CachedResponse::CoinsList(Arc::clone(&coins)));
        Ok(coins)
    }

    /// USD market caps for exchange symbols, keyed by symbol
    ///
    /// Each base asset is resolved to a CoinGecko listing through `names`
    /// (`BTC` -> `Bitcoin`, matched against listing names) when it has an
    /// entry there, otherwise by the listing's own ticker symbol. Symbols
    /// with no listing are left out. The cache slot depends only on the set
    /// of coin ids, not on the order symbols were passed in.
    pub async fn market_caps(
        &self,
        symbols: &[String],
        names: &HashMap<String, String>,
    ) -> CryptoWatchResult<Arc<HashMap<String, Option<f64>>>> {
        let wanted: Vec<(&str, &str)> = symbols
            .iter()
            .filter_map(|symbol| Some((symbol.as_str(), validator::base_asset(symbol)?)))
            .collect();

        if wanted.is_empty() {
            return Ok(Arc::new(HashMap::new()));
        }

        let coins = self.coins_list().await?;
        let mut symbols_by_id: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (symbol, base) in wanted {
            let listing = match names.get(base) {
                Some(name) => coins.iter().find(|coin| coin.name.eq_ignore_ascii_case(name)),
                None => coins.iter().find(|coin| coin.symbol.eq_ignore_ascii_case(base)),
            };
            match listing {
                Some(coin) => symbols_by_id
                    .entry(coin.id.clone())
                    .or_default()
                    .push(symbol.to_string()),
                None => logger::debug(
                    LogTag::Api,
                    &format!("No CoinGecko listing for {}", symbol),
                ),
            }
        }

        if symbols_by_id.is_empty() {
            return Ok(Arc::new(HashMap::new()));
        }

        let ids: Vec<String> = symbols_by_id.keys().cloned().collect();
        let descriptor = RequestDescriptor::new(CachedEndpoint::MarketCaps.function_name())
            .param("ids", ids.clone());

        if let Some(CachedResponse::MarketCaps(caps)) = self.cached(&descriptor, CachedEndpoint::MarketCaps) {
            return Ok(caps);
        }

        self.limiter.wait_if_needed().await;
        let result = self.api.fetch_coin_markets(&ids).await;
        let markets = self.settle(result)?;

        let mut caps = HashMap::new();
        for market in markets {
            if let Some(owners) = symbols_by_id.get(&market.id) {
                for symbol in owners {
                    caps.insert(symbol.clone(), market.market_cap);
                }
            }
        }
        let caps = Arc::new(caps);

        self.cache.set(&descriptor, CachedResponse::MarketCaps(Arc::clone(&caps)));
        Ok(caps)
    }

    /// BTC dominance formatted like `52.34%`
    ///
    /// A payload without a usable value yields `N/A`, which is not cached so
    /// the next call tries again.
    pub async fn btc_dominance(&self) -> CryptoWatchResult<String> {
        let descriptor = RequestDescriptor::new(CachedEndpoint::Dominance.function_name());

        if let Some(CachedResponse::Dominance(value)) = self.cached(&descriptor, CachedEndpoint::Dominance) {
            return Ok(value);
        }

        self.limiter.wait_if_needed().await;
        let result = self.api.fetch_global().await;
        let global = self.settle(result)?;

        match extract_btc_dominance(&global) {
            Some(dominance) => {
                let formatted = format!("{:.2}%", dominance);
                self.cache
                    .set(&descriptor, CachedResponse::Dominance(formatted.clone()));
                Ok(formatted)
            }
            None => {
                logger::warning(LogTag::Api, "BTC dominance missing from CoinGecko /global payload");
                Ok(DOMINANCE_UNAVAILABLE.to_string())
            }
        }
    }

    /// Sorted exchange symbols quoted in `quote`, e.g. every `*USDT` pair
    ///
    /// Falls back to `fallback` when the exchange cannot be reached.
    pub async fn quote_symbols(&self, quote: &str, fallback: &[String]) -> Vec<String> {
        match self.exchange_symbols().await {
            Ok(all) => {
                let mut symbols: Vec<String> = all
                    .iter()
                    .filter(|s| s.ends_with(quote) && validator::validate_symbol(s))
                    .cloned()
                    .collect();
                symbols.sort();
                symbols.dedup();
                logger::info(
                    LogTag::Api,
                    &format!("{} {} symbols listed on Binance", symbols.len(), quote),
                );
                symbols
            }
            Err(e) => {
                logger::warning(
                    LogTag::Api,
                    &format!("Could not list Binance symbols ({}), using configured symbols", e),
                );
                fallback.to_vec()
            }
        }
    }

    async fn exchange_symbols(&self) -> CryptoWatchResult<Arc<Vec<String>>> {
        let descriptor = RequestDescriptor::new(CachedEndpoint::ExchangeSymbols.function_name());

        if let Some(CachedResponse::ExchangeSymbols(symbols)) =
            self.cached(&descriptor, CachedEndpoint::ExchangeSymbols)
        {
            return Ok(symbols);
        }

        self.limiter.wait_if_needed().await;
        let result = self.api.fetch_exchange_symbols().await;
        let symbols = Arc::new(self.settle(result)?);

        self.cache
            .set(&descriptor, CachedResponse::ExchangeSymbols(Arc::clone(&symbols)));
        Ok(symbols)
    }

    /// Drop every cached response so the next reads go to the network
    pub fn force_refresh(&self) {
        self.cache.clear();
        logger::info(LogTag::Cache, "Cache cleared for forced refresh");
    }

    /// Sweep entries no endpoint could still serve
    pub fn purge_stale(&self) -> usize {
        let removed = self.cache.purge_older_than(crate::cache::max_ttl(&self.ttls));
        if removed > 0 {
            logger::debug(LogTag::Cache, &format!("Purged {} stale entries", removed));
        }
        removed
    }

    fn cached(&self, descriptor: &RequestDescriptor, endpoint: CachedEndpoint) -> Option<CachedResponse> {
        self.cache.get(descriptor, endpoint.ttl(&self.ttls))
    }

    /// Feed the outcome of a request back into the limiter
    fn settle<T>(&self, result: CryptoWatchResult<T>) -> CryptoWatchResult<T> {
        match &result {
            Ok(_) => self.limiter.record_success(),
            Err(CryptoWatchError::Throttled {
                endpoint,
                retry_after_secs,
            }) => {
                logger::warning(
                    LogTag::Api,
                    &format!("{} throttled us (retry after {:?}s)", endpoint, retry_after_secs),
                );
                self.limiter
                    .record_throttled(retry_after_secs.map(Duration::from_secs));
            }
            Err(e) => logger::debug(LogTag::Api, &format!("Request failed: {}", e)),
        }
        result
    }
}
