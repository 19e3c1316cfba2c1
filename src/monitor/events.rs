use super::snapshot::AnalysisSnapshot;
use crate::alerts::AlertEvent;
use serde::{Deserialize, Serialize};

/// Messages from the monitor to whoever renders them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum MonitorEvent {
    Data(AnalysisSnapshot),
    Alert(AlertEvent),
    /// BTC dominance text, e.g. `52.34%` or `N/A`
    Dominance(String),
    CycleCompleted(CycleSummary),
    ManualUpdate(ManualUpdateStatus),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleSummary {
    pub analyzed: usize,
    pub skipped: usize,
    pub alerts: usize,
    /// Ended early because shutdown was requested
    pub interrupted: bool,
    /// No ticker data, nothing analyzed
    pub ticker_unavailable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ManualUpdateStatus {
    /// Refused by the rate limiter; nothing was fetched
    Rejected { reason: String },
    Started { total: usize },
    Progress { completed: usize, total: usize },
    Completed { updated: usize, total: usize },
}

impl ManualUpdateStatus {
    pub fn is_rejected(&self) -> bool {
        matches!(self, ManualUpdateStatus::Rejected { .. })
    }
}
