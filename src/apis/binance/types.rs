/// Binance response records
///
/// Built leniently from raw JSON: every numeric field goes through the
/// validator, so a missing or malformed value becomes `0.0` instead of an
/// error.
use crate::validator::{safe_float, safe_price};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One entry of `/api/v3/ticker/24hr`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ticker24h {
    pub symbol: String,
    pub last_price: f64,
    pub price_change_percent: f64,
    /// 24h volume in the quote asset
    pub quote_volume: f64,
}

impl Ticker24h {
    /// `None` only when the entry has no symbol
    pub fn from_value(value: &Value) -> Option<Self> {
        let symbol = value.get("symbol")?.as_str()?.trim();
        if symbol.is_empty() {
            return None;
        }

        Some(Self {
            symbol: symbol.to_string(),
            last_price: safe_price(&value.get("lastPrice")),
            price_change_percent: safe_float(&value.get("priceChangePercent")),
            quote_volume: safe_price(&value.get("quoteVolume")),
        })
    }
}

/// One row of `/api/v3/klines`
///
/// Binance sends positional arrays:
/// `[open_time, open, high, low, close, volume, close_time, ...]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Kline {
    pub open_time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub close_time: i64,
}

impl Kline {
    pub fn from_row(row: &Value) -> Option<Self> {
        let fields = row.as_array()?;
        let time_at = |i: usize| fields.get(i).and_then(Value::as_i64).unwrap_or(0);

        Some(Self {
            open_time: time_at(0),
            open: safe_price(&fields.get(1)),
            high: safe_price(&fields.get(2)),
            low: safe_price(&fields.get(3)),
            close: safe_price(&fields.get(4)),
            volume: safe_price(&fields.get(5)),
            close_time: time_at(6),
        })
    }
}
