//! Fetch-through market data
//!
//! Every upstream read goes `cache -> rate limiter -> request -> cache`.

mod service;

pub use service::MarketDataService;

use crate::apis::{CoinListing, Kline, Ticker24h};
use std::collections::HashMap;
use std::sync::Arc;

/// Payloads kept in the shared response cache
///
/// Large payloads sit behind an `Arc` so a cache hit is a pointer copy.
#[derive(Debug, Clone)]
pub enum CachedResponse {
    Klines(Arc<Vec<Kline>>),
    Tickers(Arc<HashMap<String, Ticker24h>>),
    MarketCaps(Arc<HashMap<String, Option<f64>>>),
    Dominance(String),
    CoinsList(Arc<Vec<CoinListing>>),
    ExchangeSymbols(Arc<Vec<String>>),
}

pub type MarketCache = crate::cache::ResponseCache<CachedResponse>;

/// Shown wherever BTC dominance is unknown
pub const DOMINANCE_UNAVAILABLE: &str = "N/A";
