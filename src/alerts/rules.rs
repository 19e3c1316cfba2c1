/// Alert rule model, as stored in the config file
///
/// Every condition is off unless present: threshold conditions are enabled
/// by giving a value, signal conditions by setting the flag.
///
/// ```toml
/// [[monitor.symbols]]
/// symbol = "BTCUSDT"
///
/// [monitor.symbols.alert]
/// notes = "Watch the 60k support"
///
/// [monitor.symbols.alert.conditions]
/// price_below = 60000.0
/// rsi_overbought = 70.0
/// ema_golden_cross = true
/// capital_outflow = { volume_pct_of_mcap = 10.0, price_change_pct = -5.0 }
/// ```
use serde::{Deserialize, Serialize};

/// 24h volume as a share of market cap combined with a 24h price move
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CapitalFlowCondition {
    /// Fires when 24h volume exceeds this percentage of market cap
    pub volume_pct_of_mcap: f64,
    /// Outflow: 24h change below this. Inflow: 24h change above this.
    pub price_change_pct: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConditions {
    pub price_below: Option<f64>,
    pub price_above: Option<f64>,
    pub rsi_oversold: Option<f64>,
    pub rsi_overbought: Option<f64>,
    pub bollinger_below: bool,
    pub bollinger_above: bool,
    pub macd_bearish_cross: bool,
    pub macd_bullish_cross: bool,
    pub ema_death_cross: bool,
    pub ema_golden_cross: bool,
    pub capital_outflow: Option<CapitalFlowCondition>,
    pub capital_inflow: Option<CapitalFlowCondition>,
}

impl AlertConditions {
    pub fn enabled_count(&self) -> usize {
        [
            self.price_below.is_some(),
            self.price_above.is_some(),
            self.rsi_oversold.is_some(),
            self.rsi_overbought.is_some(),
            self.bollinger_below,
            self.bollinger_above,
            self.macd_bearish_cross,
            self.macd_bullish_cross,
            self.ema_death_cross,
            self.ema_golden_cross,
            self.capital_outflow.is_some(),
            self.capital_inflow.is_some(),
        ]
        .iter()
        .filter(|enabled| **enabled)
        .count()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertRule {
    pub conditions: AlertConditions,
    /// Free text appended to every alert message
    pub notes: Option<String>,
}

impl AlertRule {
    pub fn is_empty(&self) -> bool {
        self.conditions.enabled_count() == 0
    }
}
