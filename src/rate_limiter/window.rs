//! Sliding-window accounting over the shared timestamp log

use crate::config::WindowLimitConfig;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

/// One tracked horizon with its normal and manual-mode ceilings
#[derive(Debug, Clone, PartialEq)]
pub struct WindowLimit {
    pub name: String,
    pub duration: Duration,
    pub max_requests: usize,
    pub manual_max_requests: usize,
}

impl WindowLimit {
    /// Build from config, clamping nonsense values
    ///
    /// Durations and limits of zero become one, and the manual ceiling is
    /// never allowed above the normal one.
    pub fn from_config(config: &WindowLimitConfig) -> Self {
        let max_requests = config.max_requests.max(1);
        Self {
            name: config.name.clone(),
            duration: Duration::from_secs(config.duration_secs.max(1)),
            max_requests,
            manual_max_requests: config.manual_max_requests.clamp(1, max_requests),
        }
    }

    pub fn effective_limit(&self, manual_mode: bool) -> usize {
        if manual_mode {
            self.manual_max_requests
        } else {
            self.max_requests
        }
    }

    /// Whether a request issued at `ts` still counts at `now`
    pub fn contains(&self, ts: Instant, now: Instant) -> bool {
        now.saturating_duration_since(ts) < self.duration
    }

    /// Requests of the log that fall inside this window
    pub fn count(&self, log: &VecDeque<Instant>, now: Instant) -> usize {
        log.iter().filter(|ts| self.contains(**ts, now)).count()
    }

    /// Time until fewer than `allowed` requests remain in the window
    ///
    /// `None` when the window already holds fewer than `allowed`. The log
    /// must be sorted ascending.
    pub fn time_until_below(
        &self,
        log: &VecDeque<Instant>,
        now: Instant,
        allowed: usize,
    ) -> Option<Duration> {
        let allowed = allowed.max(1);
        let count = self.count(log, now);
        if count < allowed {
            return None;
        }
        // Oldest in-window entry that has to age out for the count to drop below `allowed`
        let index = log.len() - allowed;
        let expires_at = log[index] + self.duration;
        Some(expires_at.saturating_duration_since(now))
    }
}
