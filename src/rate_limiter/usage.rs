//! Read-only usage snapshots for status displays

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowUsage {
    pub name: String,
    pub duration_secs: u64,
    pub requests: usize,
    /// Ceiling currently in force (the manual one while manual mode is on)
    pub limit: usize,
    pub percentage: f64,
}

impl WindowUsage {
    pub fn remaining(&self) -> usize {
        self.limit.saturating_sub(self.requests)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimitUsage {
    pub windows: Vec<WindowUsage>,
    pub manual_mode: bool,
    pub cooldown_remaining_secs: u64,
}

impl RateLimitUsage {
    pub fn window(&self, name: &str) -> Option<&WindowUsage> {
        self.windows.iter().find(|w| w.name == name)
    }

    /// Highest occupancy across all windows
    pub fn peak_percentage(&self) -> f64 {
        self.windows
            .iter()
            .map(|w| w.percentage)
            .fold(0.0, f64::max)
    }

    /// One-line summary, e.g. `1min: 12/50 (24%), 5min: 40/200 (20%)`
    pub fn summary(&self) -> String {
        let mut parts: Vec<String> = self
            .windows
            .iter()
            .map(|w| format!("{}: {}/{} ({:.0}%)", w.name, w.requests, w.limit, w.percentage))
            .collect();
        if self.manual_mode {
            parts.push("manual mode".to_string());
        }
        if self.cooldown_remaining_secs > 0 {
            parts.push(format!("cooldown {}s", self.cooldown_remaining_secs));
        }
        parts.join(", ")
    }
}

/// Answer of `RateLimiter::can_perform_manual_update`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualUpdateCheck {
    pub allowed: bool,
    pub message: String,
}

impl ManualUpdateCheck {
    pub fn allowed(message: impl Into<String>) -> Self {
        Self {
            allowed: true,
            message: message.into(),
        }
    }

    pub fn denied(message: impl Into<String>) -> Self {
        Self {
            allowed: false,
            message: message.into(),
        }
    }
}

impl From<ManualUpdateCheck> for (bool, String) {
    fn from(check: ManualUpdateCheck) -> Self {
        (check.allowed, check.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usage() -> RateLimitUsage {
        RateLimitUsage {
            windows: vec![
                WindowUsage {
                    name: "1min".to_string(),
                    duration_secs: 60,
                    requests: 12,
                    limit: 50,
                    percentage: 24.0,
                },
                WindowUsage {
                    name: "5min".to_string(),
                    duration_secs: 300,
                    requests: 40,
                    limit: 200,
                    percentage: 20.0,
                },
            ],
            manual_mode: false,
            cooldown_remaining_secs: 0,
        }
    }

    #[test]
    fn test_summary_and_lookup() {
        let usage = usage();
        assert_eq!(usage.summary(), "1min: 12/50 (24%), 5min: 40/200 (20%)");
        assert_eq!(usage.window("5min").map(|w| w.remaining()), Some(160));
        assert!(usage.window("1h").is_none());
        assert_eq!(usage.peak_percentage(), 24.0);
    }

    #[test]
    fn test_snapshot_serializes_for_ui() {
        let mut usage = usage();
        usage.cooldown_remaining_secs = 7;
        let json = serde_json::to_value(&usage).unwrap();
        assert_eq!(json["windows"][0]["requests"], 12);
        assert_eq!(json["cooldown_remaining_secs"], 7);
    }

    #[test]
    fn test_check_converts_to_tuple() {
        let (ok, msg): (bool, String) = ManualUpdateCheck::denied("busy").into();
        assert!(!ok);
        assert_eq!(msg, "busy");
    }
}
