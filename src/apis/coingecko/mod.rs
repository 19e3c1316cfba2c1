/// CoinGecko API client
///
/// API Documentation: https://docs.coingecko.com/reference/introduction
///
/// Endpoints implemented:
/// 1. /coins/list - id, symbol and name of every coin
/// 2. /coins/markets?vs_currency=usd&ids=... - market data for selected coins
/// 3. /global - aggregate market data, including BTC dominance
pub mod types;

use self::types::{CoinListing, CoinMarket};
use crate::apis::client::HttpClient;
use crate::errors::{CryptoWatchError, CryptoWatchResult};
use serde_json::Value;

const API_KEY_HEADER: &str = "x-cg-demo-api-key";

pub struct CoinGeckoClient {
    http_client: HttpClient,
    base_url: String,
    api_key: Option<String>,
}

impl CoinGeckoClient {
    pub fn new(base_url: &str, timeout_secs: u64, api_key: Option<String>) -> Result<Self, String> {
        Ok(Self {
            http_client: HttpClient::new(timeout_secs)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        })
    }

    async fn get(&self, endpoint: &str, path: &str, query: &[(&str, String)]) -> CryptoWatchResult<Value> {
        let url = format!("{}{}", self.base_url, path);
        match &self.api_key {
            Some(key) => {
                self.http_client
                    .get_json(endpoint, &url, query, &[(API_KEY_HEADER, key.as_str())])
                    .await
            }
            None => self.http_client.get_json(endpoint, &url, query, &[]).await,
        }
    }

    pub async fn fetch_coins_list(&self) -> CryptoWatchResult<Vec<CoinListing>> {
        let body = self.get("coingecko/coins/list", "/coins/list", &[]).await?;
        let entries = body
            .as_array()
            .ok_or_else(|| CryptoWatchError::parse("coins/list", "expected an array"))?;
        Ok(entries.iter().filter_map(CoinListing::from_value).collect())
    }

    pub async fn fetch_coin_markets(&self, ids: &[String]) -> CryptoWatchResult<Vec<CoinMarket>> {
        let query = [("vs_currency", "usd".to_string()), ("ids", ids.join(","))];
        let body = self.get("coingecko/coins/markets", "/coins/markets", &query).await?;
        let entries = body
            .as_array()
            .ok_or_else(|| CryptoWatchError::parse("coins/markets", "expected an array"))?;
        Ok(entries.iter().filter_map(CoinMarket::from_value).collect())
    }

    pub async fn fetch_global(&self) -> CryptoWatchResult<Value> {
        self.get("coingecko/global", "/global", &[]).await
    }
}

/// BTC share of total market cap from a `/global` payload
///
/// Looks at `data.market_cap_percentage.btc`, then a top-level
/// `market_cap_percentage.btc`, then any numeric `btc` key anywhere in the
/// document. Non-positive values count as missing.
pub fn extract_btc_dominance(global: &Value) -> Option<f64> {
    let direct = global
        .get("data")
        .and_then(|d| d.get("market_cap_percentage"))
        .or_else(|| global.get("market_cap_percentage"))
        .and_then(|p| p.get("btc"))
        .and_then(Value::as_f64);

    direct
        .or_else(|| find_numeric_key(global, "btc"))
        .filter(|v| v.is_finite() && *v > 0.0)
}

fn find_numeric_key(value: &Value, key: &str) -> Option<f64> {
    match value {
        Value::Object(map) => map.iter().find_map(|(k, v)| {
            if k.eq_ignore_ascii_case(key) {
                if let Some(n) = v.as_f64() {
                    return Some(n);
                }
            }
            find_numeric_key(v, key)
        }),
        Value::Array(items) => items.iter().find_map(|item| find_numeric_key(item, key)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_dominance_from_standard_payload() {
        let global = json!({"data": {"market_cap_percentage": {"btc": 52.345, "eth": 17.1}}});
        assert_eq!(extract_btc_dominance(&global), Some(52.345));
    }

    #[test]
    fn test_dominance_from_flat_and_nested_payloads() {
        assert_eq!(
            extract_btc_dominance(&json!({"market_cap_percentage": {"btc": 48.0}})),
            Some(48.0)
        );
        assert_eq!(
            extract_btc_dominance(&json!({"stats": [{"shares": {"BTC": 50.5}}]})),
            Some(50.5)
        );
    }

    #[test]
    fn test_dominance_missing_or_zero() {
        assert_eq!(extract_btc_dominance(&json!({"data": {}})), None);
        assert_eq!(
            extract_btc_dominance(&json!({"data": {"market_cap_percentage": {"btc": 0}}})),
            None
        );
        assert_eq!(extract_btc_dominance(&json!({"btc": "52"})), None);
    }
}
