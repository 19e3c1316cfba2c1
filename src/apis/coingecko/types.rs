/// CoinGecko response records
use crate::validator::parse_finite;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One entry of `/coins/list`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinListing {
    pub id: String,
    pub symbol: String,
    pub name: String,
}

impl CoinListing {
    pub fn from_value(value: &Value) -> Option<Self> {
        let id = non_empty_str(value, "id")?;
        Some(Self {
            id,
            symbol: non_empty_str(value, "symbol").unwrap_or_default(),
            name: non_empty_str(value, "name").unwrap_or_default(),
        })
    }
}

/// One entry of `/coins/markets`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoinMarket {
    pub id: String,
    /// USD market cap; CoinGecko sends `null` for coins it cannot price
    pub market_cap: Option<f64>,
}

impl CoinMarket {
    pub fn from_value(value: &Value) -> Option<Self> {
        let id = non_empty_str(value, "id")?;
        let market_cap = parse_finite(&value.get("market_cap")).filter(|cap| *cap >= 0.0);
        Some(Self { id, market_cap })
    }
}

fn non_empty_str(value: &Value, field: &str) -> Option<String> {
    value
        .get(field)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
