/// Binance public market data client
///
/// Endpoints used:
/// 1. /api/v3/klines - candlesticks for one symbol
/// 2. /api/v3/ticker/24hr - 24h statistics for every symbol
/// 3. /api/v3/exchangeInfo - list of tradable symbols
pub mod types;

use self::types::{Kline, Ticker24h};
use crate::apis::client::HttpClient;
use crate::errors::{CryptoWatchError, CryptoWatchResult};
use serde_json::Value;

pub struct BinanceClient {
    http_client: HttpClient,
    base_url: String,
}

impl BinanceClient {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, String> {
        Ok(Self {
            http_client: HttpClient::new(timeout_secs)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn fetch_klines(
        &self,
        symbol: &str,
        interval: &str,
        limit: u32,
    ) -> CryptoWatchResult<Vec<Kline>> {
        let url = format!("{}/api/v3/klines", self.base_url);
        let query = [
            ("symbol", symbol.to_string()),
            ("interval", interval.to_string()),
            ("limit", limit.to_string()),
        ];
        let body = self.http_client.get_json("binance/klines", &url, &query, &[]).await?;
        parse_klines(&body)
    }

    pub async fn fetch_tickers(&self) -> CryptoWatchResult<Vec<Ticker24h>> {
        let url = format!("{}/api/v3/ticker/24hr", self.base_url);
        let body = self.http_client.get_json("binance/ticker/24hr", &url, &[], &[]).await?;
        parse_tickers(&body)
    }

    pub async fn fetch_exchange_symbols(&self) -> CryptoWatchResult<Vec<String>> {
        let url = format!("{}/api/v3/exchangeInfo", self.base_url);
        let body = self.http_client.get_json("binance/exchangeInfo", &url, &[], &[]).await?;
        parse_exchange_symbols(&body)
    }
}

pub fn parse_klines(body: &Value) -> CryptoWatchResult<Vec<Kline>> {
    let rows = body
        .as_array()
        .ok_or_else(|| CryptoWatchError::parse("klines", "expected an array of rows"))?;
    Ok(rows.iter().filter_map(Kline::from_row).collect())
}

pub fn parse_tickers(body: &Value) -> CryptoWatchResult<Vec<Ticker24h>> {
    let entries = body
        .as_array()
        .ok_or_else(|| CryptoWatchError::parse("ticker/24hr", "expected an array of tickers"))?;
    Ok(entries.iter().filter_map(Ticker24h::from_value).collect())
}

pub fn parse_exchange_symbols(body: &Value) -> CryptoWatchResult<Vec<String>> {
    let symbols = body
        .get("symbols")
        .and_then(Value::as_array)
        .ok_or_else(|| CryptoWatchError::parse("exchangeInfo", "missing 'symbols' array"))?;

    Ok(symbols
        .iter()
        .filter_map(|s| s.get("symbol").and_then(Value::as_str))
        .map(str::to_string)
        .collect())
}
