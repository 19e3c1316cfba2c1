/// Technical signals computed from kline closes
///
/// The indicator math comes from the `ta` crate; this module only decides
/// how much history each one needs and turns the latest values into the
/// discrete signals that alert rules match on.
use serde::{Deserialize, Serialize};
use std::fmt;
use ta::indicators::{
    BollingerBands, ExponentialMovingAverage, MovingAverageConvergenceDivergence,
    RelativeStrengthIndex,
};
use ta::Next;

pub const RSI_PERIOD: usize = 14;
pub const BOLLINGER_PERIOD: usize = 20;
pub const BOLLINGER_STD_DEV: f64 = 2.0;
pub const MACD_FAST: usize = 12;
pub const MACD_SLOW: usize = 26;
pub const MACD_SIGNAL: usize = 9;
pub const EMA_FAST: usize = 50;
pub const EMA_SLOW: usize = 200;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BollingerSignal {
    /// Price above the upper band
    Above,
    /// Price below the lower band
    Below,
    #[default]
    None,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MacdSignal {
    /// MACD line crossed above its signal line on the latest candle
    BullishCross,
    BearishCross,
    #[default]
    None,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EmaCross {
    /// EMA 50 crossed above EMA 200
    GoldenCross,
    /// EMA 50 crossed below EMA 200
    DeathCross,
    #[default]
    None,
}

impl fmt::Display for BollingerSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BollingerSignal::Above => "Above Band",
            BollingerSignal::Below => "Below Band",
            BollingerSignal::None => "None",
        })
    }
}

impl fmt::Display for MacdSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MacdSignal::BullishCross => "Bullish Cross",
            MacdSignal::BearishCross => "Bearish Cross",
            MacdSignal::None => "None",
        })
    }
}

impl fmt::Display for EmaCross {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EmaCross::GoldenCross => "Golden Cross",
            EmaCross::DeathCross => "Death Cross",
            EmaCross::None => "None",
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    /// `None` with fewer than `RSI_PERIOD + 1` closes
    pub rsi: Option<f64>,
    pub bollinger: BollingerSignal,
    pub macd: MacdSignal,
    pub ema_cross: EmaCross,
}

/// Signals for a close series (oldest first) and the live price
///
/// Bollinger bands are built from the closes and compared against
/// `current_price`, which normally comes from the 24h ticker. Any indicator
/// without enough history reports its neutral value.
pub fn analyze(closes: &[f64], current_price: f64) -> IndicatorSnapshot {
    IndicatorSnapshot {
        rsi: rsi(closes),
        bollinger: bollinger_signal(closes, current_price),
        macd: macd_signal(closes),
        ema_cross: ema_cross(closes),
    }
}

pub fn rsi(closes: &[f64]) -> Option<f64> {
    if closes.len() < RSI_PERIOD + 1 {
        return None;
    }
    let mut indicator = RelativeStrengthIndex::new(RSI_PERIOD).ok()?;
    closes
        .iter()
        .map(|close| indicator.next(*close))
        .last()
        .filter(|value| value.is_finite())
}

pub fn bollinger_signal(closes: &[f64], current_price: f64) -> BollingerSignal {
    if closes.len() < BOLLINGER_PERIOD || current_price <= 0.0 {
        return BollingerSignal::None;
    }
    let Ok(mut bands) = BollingerBands::new(BOLLINGER_PERIOD, BOLLINGER_STD_DEV) else {
        return BollingerSignal::None;
    };
    let Some(latest) = closes.iter().map(|close| bands.next(*close)).last() else {
        return BollingerSignal::None;
    };

    if latest.upper <= 0.0 {
        BollingerSignal::None
    } else if current_price > latest.upper {
        BollingerSignal::Above
    } else if current_price < latest.lower {
        BollingerSignal::Below
    } else {
        BollingerSignal::None
    }
}

pub fn macd_signal(closes: &[f64]) -> MacdSignal {
    if closes.len() < MACD_SLOW + MACD_SIGNAL {
        return MacdSignal::None;
    }
    let Ok(mut macd) = MovingAverageConvergenceDivergence::new(MACD_FAST, MACD_SLOW, MACD_SIGNAL)
    else {
        return MacdSignal::None;
    };
    let lines: Vec<(f64, f64)> = closes
        .iter()
        .map(|close| {
            let output = macd.next(*close);
            (output.macd, output.signal)
        })
        .collect();

    match last_cross(&lines) {
        Some(Cross::Up) => MacdSignal::BullishCross,
        Some(Cross::Down) => MacdSignal::BearishCross,
        None => MacdSignal::None,
    }
}

pub fn ema_cross(closes: &[f64]) -> EmaCross {
    if closes.len() < EMA_SLOW.max(2) {
        return EmaCross::None;
    }
    let (Ok(mut fast), Ok(mut slow)) = (
        ExponentialMovingAverage::new(EMA_FAST),
        ExponentialMovingAverage::new(EMA_SLOW),
    ) else {
        return EmaCross::None;
    };
    let lines: Vec<(f64, f64)> = closes
        .iter()
        .map(|close| (fast.next(*close), slow.next(*close)))
        .collect();

    match last_cross(&lines) {
        Some(Cross::Up) => EmaCross::GoldenCross,
        Some(Cross::Down) => EmaCross::DeathCross,
        None => EmaCross::None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cross {
    Up,
    Down,
}

/// Strict crossing of the first line over the second between the last two points
fn last_cross(lines: &[(f64, f64)]) -> Option<Cross> {
    let [.., (prev_a, prev_b), (last_a, last_b)] = lines else {
        return None;
    };
    if prev_a < prev_b && last_a > last_b {
        Some(Cross::Up)
    } else if prev_a > prev_b && last_a < last_b {
        Some(Cross::Down)
    } else {
        None
    }
}
