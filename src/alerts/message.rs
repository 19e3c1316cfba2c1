/// Alert events and their user-facing text
use super::evaluator::AlertTrigger;
use crate::monitor::AnalysisSnapshot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One freshly fired alert, ready for presentation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    pub symbol: String,
    pub trigger: AlertTrigger,
    pub message: String,
    pub sound_key: String,
    pub snapshot: AnalysisSnapshot,
    pub fired_at: DateTime<Utc>,
}

impl AlertEvent {
    pub fn new(trigger: AlertTrigger, snapshot: &AnalysisSnapshot, notes: Option<&str>) -> Self {
        Self {
            symbol: snapshot.symbol.clone(),
            message: format_alert_message(&trigger, snapshot, notes),
            sound_key: trigger.kind.sound_key().to_string(),
            trigger,
            snapshot: snapshot.clone(),
            fired_at: Utc::now(),
        }
    }
}

pub fn format_alert_message(
    trigger: &AlertTrigger,
    snapshot: &AnalysisSnapshot,
    notes: Option<&str>,
) -> String {
    let market_cap = snapshot
        .market_cap
        .map(|cap| format!("${}", group_thousands(cap, 0)))
        .unwrap_or_else(|| "N/A".to_string());
    let notes = notes.map(str::trim).filter(|n| !n.is_empty()).unwrap_or("None");

    format!(
        "ALERT: {}\n\n\
         Trigger: {}\n\
         Current price: ${}\n\
         24h volume: ${}\n\
         Market cap: {}\n\
         24h change: {:.2}%\n\n\
         Notes: {}",
        snapshot.symbol,
        trigger.message,
        group_thousands(snapshot.current_price, 2),
        group_thousands(snapshot.volume_24h, 0),
        market_cap,
        snapshot.price_change_24h,
        notes
    )
}

/// `1234567.891` with 2 decimals -> `1,234,567.89`
pub fn group_thousands(value: f64, decimals: usize) -> String {
    let formatted = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (formatted.as_str(), None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3 + 4);
    for (i, digit) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if value < 0.0 && formatted.chars().any(|c| c.is_ascii_digit() && c != '0') {
        "-"
    } else {
        ""
    };
    match frac_part {
        Some(frac) => format!("{}{}.{}", sign, grouped, frac),
        None => format!("{}{}", sign, grouped),
    }
}
