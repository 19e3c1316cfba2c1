/// Boundary sanitizers for values coming back from the exchanges
///
/// Every function here is total: malformed input degrades to `false` or
/// `0.0` instead of an error, so one bad payload never stops the monitor
/// from processing the remaining symbols.
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

/// Quote assets accepted as trading-pair suffixes, longest first so
/// `FDUSD` is matched before `USD`-style suffixes
pub const KNOWN_QUOTE_ASSETS: &[&str] = &[
    "FDUSD", "USDT", "USDC", "BUSD", "TUSD", "BTC", "ETH", "BNB", "EUR", "TRY", "BRL",
];

const MAX_SYMBOL_LEN: usize = 20;

static SYMBOL_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z0-9]+$").expect("static symbol regex"));

/// Anything that might hold a number in an API payload
pub trait RawNumber {
    fn to_f64(&self) -> Option<f64>;
}

impl RawNumber for Value {
    fn to_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.to_f64(),
            _ => None,
        }
    }
}

impl RawNumber for str {
    fn to_f64(&self) -> Option<f64> {
        self.trim().parse::<f64>().ok()
    }
}

impl RawNumber for String {
    fn to_f64(&self) -> Option<f64> {
        self.as_str().to_f64()
    }
}

impl RawNumber for f64 {
    fn to_f64(&self) -> Option<f64> {
        Some(*self)
    }
}

impl RawNumber for i64 {
    fn to_f64(&self) -> Option<f64> {
        Some(*self as f64)
    }
}

impl RawNumber for u64 {
    fn to_f64(&self) -> Option<f64> {
        Some(*self as f64)
    }
}

impl<T: RawNumber + ?Sized> RawNumber for &T {
    fn to_f64(&self) -> Option<f64> {
        (**self).to_f64()
    }
}

impl<T: RawNumber> RawNumber for Option<T> {
    fn to_f64(&self) -> Option<f64> {
        self.as_ref().and_then(|v| v.to_f64())
    }
}

/// Parse to a finite float, `None` for anything else (NaN and infinities included)
pub fn parse_finite<R: RawNumber + ?Sized>(raw: &R) -> Option<f64> {
    raw.to_f64().filter(|v| v.is_finite())
}

/// Non-negative price, `0.0` on conversion failure or negative input
pub fn safe_price<R: RawNumber + ?Sized>(raw: &R) -> f64 {
    match parse_finite(raw) {
        Some(v) if v >= 0.0 => v,
        _ => 0.0,
    }
}

/// Signed float (percent changes), `0.0` on conversion failure
pub fn safe_float<R: RawNumber + ?Sized>(raw: &R) -> f64 {
    parse_finite(raw).unwrap_or(0.0)
}

/// Whether `symbol` looks like an exchange trading pair such as `BTCUSDT`
///
/// Requires uppercase alphanumerics, a known quote-asset suffix and a
/// non-empty base asset in front of it.
pub fn validate_symbol(symbol: &str) -> bool {
    if symbol.is_empty() || symbol.len() > MAX_SYMBOL_LEN || !SYMBOL_SHAPE.is_match(symbol) {
        return false;
    }
    split_symbol(symbol).is_some()
}

/// `validate_symbol` for untyped input; non-strings are rejected
pub fn validate_symbol_value(raw: &Value) -> bool {
    raw.as_str().map(validate_symbol).unwrap_or(false)
}

/// Split `BTCUSDT` into (`BTC`, `USDT`)
pub fn split_symbol(symbol: &str) -> Option<(&str, &str)> {
    KNOWN_QUOTE_ASSETS.iter().find_map(|quote| {
        symbol
            .strip_suffix(quote)
            .filter(|base| !base.is_empty())
            .map(|base| (base, *quote))
    })
}

/// Base asset of a pair, e.g. `ETH` for `ETHUSDT`
pub fn base_asset(symbol: &str) -> Option<&str> {
    split_symbol(symbol).map(|(base, _)| base)
}
