use crate::apis::Ticker24h;
use crate::indicators::{BollingerSignal, EmaCross, IndicatorSnapshot, MacdSignal};
use serde::{Deserialize, Serialize};

/// Everything the UI shows for one symbol after an update
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSnapshot {
    pub symbol: String,
    pub current_price: f64,
    pub price_change_24h: f64,
    pub volume_24h: f64,
    pub market_cap: Option<f64>,
    pub rsi: Option<f64>,
    /// RSI with two decimals, or `N/A`
    pub rsi_signal: String,
    pub bollinger: BollingerSignal,
    pub macd: MacdSignal,
    pub ema_cross: EmaCross,
}

impl AnalysisSnapshot {
    /// Ticker fields only; indicators stay neutral until klines arrive
    pub fn from_ticker(symbol: &str, ticker: Option<&Ticker24h>, market_cap: Option<f64>) -> Self {
        let ticker = ticker.cloned().unwrap_or_default();
        Self {
            symbol: symbol.to_string(),
            current_price: ticker.last_price,
            price_change_24h: ticker.price_change_percent,
            volume_24h: ticker.quote_volume,
            market_cap,
            rsi: None,
            rsi_signal: "N/A".to_string(),
            ..Self::default()
        }
    }

    pub fn with_indicators(mut self, indicators: IndicatorSnapshot) -> Self {
        self.rsi = indicators.rsi;
        self.rsi_signal = indicators
            .rsi
            .map(|rsi| format!("{:.2}", rsi))
            .unwrap_or_else(|| "N/A".to_string());
        self.bollinger = indicators.bollinger;
        self.macd = indicators.macd;
        self.ema_cross = indicators.ema_cross;
        self
    }
}
