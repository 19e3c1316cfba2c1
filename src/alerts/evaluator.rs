/// Matching alert rules against one analysis snapshot
use super::rules::{AlertRule, CapitalFlowCondition};
use crate::indicators::{BollingerSignal, EmaCross, MacdSignal};
use crate::monitor::AnalysisSnapshot;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TriggerKind {
    PriceBelow,
    PriceAbove,
    RsiOversold,
    RsiOverbought,
    BollingerBelow,
    BollingerAbove,
    MacdBearishCross,
    MacdBullishCross,
    EmaDeathCross,
    EmaGoldenCross,
    CapitalOutflow,
    CapitalInflow,
}

impl TriggerKind {
    /// Key into the UI's sound table
    pub fn sound_key(&self) -> &'static str {
        match self {
            TriggerKind::RsiOverbought => "overbought",
            TriggerKind::RsiOversold => "oversold",
            TriggerKind::EmaGoldenCross => "golden_cross",
            TriggerKind::EmaDeathCross => "death_cross",
            TriggerKind::PriceAbove => "price_above",
            TriggerKind::PriceBelow => "price_below",
            TriggerKind::CapitalOutflow | TriggerKind::CapitalInflow => "critical_alert",
            TriggerKind::BollingerBelow
            | TriggerKind::BollingerAbove
            | TriggerKind::MacdBearishCross
            | TriggerKind::MacdBullishCross => "default_alert",
        }
    }
}

impl fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertTrigger {
    pub kind: TriggerKind,
    /// Human-readable description with the values that fired it
    pub message: String,
}

impl AlertTrigger {
    fn new(kind: TriggerKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Every condition of `rule` that holds for `snapshot`
///
/// Conditions that need data the snapshot lacks (no price, no RSI, no
/// market cap) never fire.
pub fn evaluate(rule: &AlertRule, snapshot: &AnalysisSnapshot) -> Vec<AlertTrigger> {
    let c = &rule.conditions;
    let price = snapshot.current_price;
    let mut triggers = Vec::new();

    if let Some(flow) = &c.capital_outflow {
        if let Some(volume_pct) = volume_pct_of_mcap(snapshot) {
            if volume_pct > flow.volume_pct_of_mcap && snapshot.price_change_24h < flow.price_change_pct {
                triggers.push(AlertTrigger::new(
                    TriggerKind::CapitalOutflow,
                    flow_message("outflow", volume_pct, "<", flow),
                ));
            }
        }
    }

    if let Some(flow) = &c.capital_inflow {
        if let Some(volume_pct) = volume_pct_of_mcap(snapshot) {
            if volume_pct > flow.volume_pct_of_mcap && snapshot.price_change_24h > flow.price_change_pct {
                triggers.push(AlertTrigger::new(
                    TriggerKind::CapitalInflow,
                    flow_message("inflow", volume_pct, ">", flow),
                ));
            }
        }
    }

    if price > 0.0 {
        if let Some(limit) = c.price_below {
            if price <= limit {
                triggers.push(AlertTrigger::new(
                    TriggerKind::PriceBelow,
                    format!("Price below ${:.2} (current: ${:.2})", limit, price),
                ));
            }
        }
        if let Some(limit) = c.price_above {
            if price >= limit {
                triggers.push(AlertTrigger::new(
                    TriggerKind::PriceAbove,
                    format!("Price above ${:.2} (current: ${:.2})", limit, price),
                ));
            }
        }
    }

    if let Some(rsi) = snapshot.rsi {
        if let Some(level) = c.rsi_oversold {
            if rsi <= level {
                triggers.push(AlertTrigger::new(
                    TriggerKind::RsiOversold,
                    format!("RSI oversold (RSI <= {:.2} | current: {:.2})", level, rsi),
                ));
            }
        }
        if let Some(level) = c.rsi_overbought {
            if rsi >= level {
                triggers.push(AlertTrigger::new(
                    TriggerKind::RsiOverbought,
                    format!("RSI overbought (RSI >= {:.2} | current: {:.2})", level, rsi),
                ));
            }
        }
    }

    if c.bollinger_below && snapshot.bollinger == BollingerSignal::Below {
        triggers.push(AlertTrigger::new(
            TriggerKind::BollingerBelow,
            "Price below the lower Bollinger band",
        ));
    }
    if c.bollinger_above && snapshot.bollinger == BollingerSignal::Above {
        triggers.push(AlertTrigger::new(
            TriggerKind::BollingerAbove,
            "Price above the upper Bollinger band",
        ));
    }

    if c.macd_bearish_cross && snapshot.macd == MacdSignal::BearishCross {
        triggers.push(AlertTrigger::new(TriggerKind::MacdBearishCross, "MACD: bearish cross"));
    }
    if c.macd_bullish_cross && snapshot.macd == MacdSignal::BullishCross {
        triggers.push(AlertTrigger::new(TriggerKind::MacdBullishCross, "MACD: bullish cross"));
    }

    if c.ema_death_cross && snapshot.ema_cross == EmaCross::DeathCross {
        triggers.push(AlertTrigger::new(
            TriggerKind::EmaDeathCross,
            "EMA: death cross (EMA 50 below EMA 200)",
        ));
    }
    if c.ema_golden_cross && snapshot.ema_cross == EmaCross::GoldenCross {
        triggers.push(AlertTrigger::new(
            TriggerKind::EmaGoldenCross,
            "EMA: golden cross (EMA 50 above EMA 200)",
        ));
    }

    triggers
}

fn volume_pct_of_mcap(snapshot: &AnalysisSnapshot) -> Option<f64> {
    snapshot
        .market_cap
        .filter(|cap| *cap > 0.0)
        .map(|cap| snapshot.volume_24h / cap * 100.0)
}

fn flow_message(direction: &str, volume_pct: f64, cmp: &str, flow: &CapitalFlowCondition) -> String {
    format!(
        "Significant capital {} (volume {:.2}% of market cap > {:.2}%, 24h change {} {:.2}%)",
        direction, volume_pct, flow.volume_pct_of_mcap, cmp, flow.price_change_pct
    )
}
