/// Multi-window sliding rate limiter shared by every outbound request
///
/// One timestamp log, pruned to the widest window, is checked against each
/// configured window; admission is the AND of all of them plus "no active
/// cooldown". The lock is taken once per accounting pass and is never held
/// across a sleep.
use super::backoff::ExponentialBackoff;
use super::guard::ManualUpdateGuard;
use super::usage::{ManualUpdateCheck, RateLimitUsage, WindowUsage};
use super::window::WindowLimit;
use crate::config::{default_windows, RateLimitConfig};
use crate::logger::{self, LogTag};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

/// Floor for a single sleep inside `wait_if_needed`
const MIN_WAIT: Duration = Duration::from_millis(1);

const DEFAULT_SAFETY_PERCENT: f64 = 80.0;

struct LimiterState {
    /// Issue times of granted permits, ascending
    timestamps: VecDeque<Instant>,
    manual_flag: bool,
    manual_holds: usize,
    cooldown_until: Option<Instant>,
}

impl LimiterState {
    fn manual_mode(&self) -> bool {
        self.manual_flag || self.manual_holds > 0
    }

    fn cooldown_remaining(&self, now: Instant) -> Duration {
        self.cooldown_until
            .map(|until| until.saturating_duration_since(now))
            .unwrap_or(Duration::ZERO)
    }

    /// Ascending and nothing in the future
    fn is_consistent(&self, now: Instant) -> bool {
        let mut previous: Option<Instant> = None;
        for ts in &self.timestamps {
            if *ts > now || previous.map_or(false, |p| *ts < p) {
                return false;
            }
            previous = Some(*ts);
        }
        true
    }

    /// Clamp future entries to `now` and re-sort; true if anything changed
    fn repair(&mut self, now: Instant) -> bool {
        if self.is_consistent(now) {
            return false;
        }
        for ts in self.timestamps.iter_mut() {
            if *ts > now {
                *ts = now;
            }
        }
        self.timestamps.make_contiguous().sort();
        true
    }

    fn prune(&mut self, now: Instant, horizon: Duration) {
        while let Some(front) = self.timestamps.front() {
            if now.saturating_duration_since(*front) >= horizon {
                self.timestamps.pop_front();
            } else {
                break;
            }
        }
    }
}

/// Why a permit cannot be granted right now
struct Blocked {
    wait: Duration,
    reason: String,
}

pub struct RateLimiter {
    windows: Vec<WindowLimit>,
    /// Longest window; older timestamps are irrelevant
    horizon: Duration,
    manual_safety_percent: f64,
    max_cooldown: Duration,
    backoff: ExponentialBackoff,
    state: Mutex<LimiterState>,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        let window_configs = if config.windows.is_empty() {
            logger::warning(
                LogTag::RateLimit,
                "No rate limit windows configured, using built-in defaults",
            );
            default_windows()
        } else {
            config.windows.clone()
        };
        let windows: Vec<WindowLimit> = window_configs.iter().map(WindowLimit::from_config).collect();

        let horizon = windows
            .iter()
            .map(|w| w.duration)
            .max()
            .unwrap_or(Duration::from_secs(60));

        let pct = config.manual_safety_percent;
        let manual_safety_percent = if pct.is_finite() && pct > 0.0 {
            pct.min(100.0)
        } else {
            DEFAULT_SAFETY_PERCENT
        };

        let backoff = ExponentialBackoff::new(
            Duration::from_millis(config.backoff_base_ms.max(1)),
            Duration::from_secs(config.backoff_max_secs),
        );

        let limiter = Self {
            windows,
            horizon,
            manual_safety_percent,
            max_cooldown: Duration::from_secs(config.max_cooldown_secs.max(1)),
            backoff,
            state: Mutex::new(LimiterState {
                timestamps: VecDeque::new(),
                manual_flag: false,
                manual_holds: 0,
                cooldown_until: None,
            }),
        };

        logger::debug(
            LogTag::RateLimit,
            &format!(
                "Rate limiter initialized: {}",
                limiter
                    .windows
                    .iter()
                    .map(|w| format!(
                        "{} {}s max {} (manual {})",
                        w.name,
                        w.duration.as_secs(),
                        w.max_requests,
                        w.manual_max_requests
                    ))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        );

        limiter
    }

    /// Replace the throttle backoff policy
    pub fn with_backoff(mut self, backoff: ExponentialBackoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn windows(&self) -> &[WindowLimit] {
        &self.windows
    }

    /// Block until one more request fits every window, then reserve it
    ///
    /// Never fails. Each pass sleeps until the oldest timestamp of the most
    /// constraining window ages out (or the cooldown ends) and re-checks, so
    /// the total wait is bounded by the longest window plus the cooldown.
    pub async fn wait_if_needed(&self) {
        loop {
            let (blocked, repaired) = {
                let mut state = self.state.lock();
                let now = Instant::now();
                let repaired = state.repair(now);
                state.prune(now, self.horizon);

                match self.blocked_for(&state, now) {
                    None => {
                        state.timestamps.push_back(now);
                        (None, repaired)
                    }
                    Some(blocked) => (Some(blocked), repaired),
                }
            };

            if repaired {
                logger::warning(
                    LogTag::RateLimit,
                    "Request timestamp log was inconsistent, repaired before admission",
                );
            }

            let Some(blocked) = blocked else {
                return;
            };

            logger::debug(
                LogTag::RateLimit,
                &format!(
                    "Limit reached ({}), waiting {:.1}s",
                    blocked.reason,
                    blocked.wait.as_secs_f64()
                ),
            );
            tokio::time::sleep(blocked.wait.max(MIN_WAIT)).await;
        }
    }

    /// Reserve a slot only if one is free right now
    pub fn try_acquire(&self) -> bool {
        let mut state = self.state.lock();
        let now = Instant::now();
        state.repair(now);
        state.prune(now, self.horizon);

        if self.blocked_for(&state, now).is_some() {
            return false;
        }
        state.timestamps.push_back(now);
        true
    }

    /// Whether a burst of manual requests is safe right now, with a reason
    ///
    /// Pure read. Every window must sit below `manual_safety_percent` of the
    /// ceiling currently in force, no cooldown may be active, and the
    /// timestamp log must be consistent; anything else is a denial.
    pub fn can_perform_manual_update(&self) -> ManualUpdateCheck {
        let state = self.state.lock();
        let now = Instant::now();

        if !state.is_consistent(now) {
            return ManualUpdateCheck::denied(
                "Rate limiter state is inconsistent, manual update unavailable for now",
            );
        }

        let cooldown = state.cooldown_remaining(now);
        if !cooldown.is_zero() {
            return ManualUpdateCheck::denied(format!(
                "API cooldown active, try again in {}s",
                ceil_secs(cooldown)
            ));
        }

        let manual = state.manual_mode();
        for window in &self.windows {
            let limit = window.effective_limit(manual);
            let threshold = self.manual_threshold(limit);
            if let Some(wait) = window.time_until_below(&state.timestamps, now, threshold) {
                let count = window.count(&state.timestamps, now);
                return ManualUpdateCheck::denied(format!(
                    "Too many recent requests in the {} window ({}/{}), try again in {}s",
                    window.name,
                    count,
                    limit,
                    ceil_secs(wait)
                ));
            }
        }

        let usage = self.usage_from(&state, now);
        ManualUpdateCheck::allowed(format!("Manual update available ({})", usage.summary()))
    }

    pub fn get_current_usage(&self) -> RateLimitUsage {
        let state = self.state.lock();
        self.usage_from(&state, Instant::now())
    }

    /// Toggle the stricter manual-mode ceilings
    ///
    /// Prefer [`manual_update_guard`](Self::manual_update_guard), which
    /// cannot be left on by an early return.
    pub fn set_manual_update_mode(&self, enabled: bool) {
        self.state.lock().manual_flag = enabled;
        logger::info(
            LogTag::RateLimit,
            &format!("Manual update mode {}", if enabled { "enabled" } else { "disabled" }),
        );
    }

    pub fn is_manual_mode(&self) -> bool {
        self.state.lock().manual_mode()
    }

    pub fn manual_update_guard(&self) -> ManualUpdateGuard<'_> {
        ManualUpdateGuard::new(self)
    }

    pub(super) fn acquire_manual_hold(&self) {
        let holds = {
            let mut state = self.state.lock();
            state.manual_holds += 1;
            state.manual_holds
        };
        logger::debug(LogTag::RateLimit, &format!("Manual update hold acquired ({} active)", holds));
    }

    pub(super) fn release_manual_hold(&self) {
        let holds = {
            let mut state = self.state.lock();
            state.manual_holds = state.manual_holds.saturating_sub(1);
            state.manual_holds
        };
        logger::debug(LogTag::RateLimit, &format!("Manual update hold released ({} active)", holds));
    }

    /// Upstream answered 429/418: start or extend a cooldown
    ///
    /// The cooldown is the larger of the server's Retry-After and the next
    /// backoff step, capped at `max_cooldown_secs`. Returns the cooldown
    /// applied by this call.
    pub fn record_throttled(&self, retry_after: Option<Duration>) -> Duration {
        let step = self.backoff.next_delay();
        let cooldown = retry_after.unwrap_or(Duration::ZERO).max(step).min(self.max_cooldown);

        let now = Instant::now();
        let until = now + cooldown;
        {
            let mut state = self.state.lock();
            state.cooldown_until = match state.cooldown_until {
                Some(existing) if existing > until => Some(existing),
                _ => Some(until),
            };
        }

        logger::warning(
            LogTag::RateLimit,
            &format!(
                "Throttled by upstream (consecutive: {}), cooling down for {:.1}s",
                self.backoff.attempt(),
                cooldown.as_secs_f64()
            ),
        );
        cooldown
    }

    /// A request went through; the next throttle starts from the base delay
    pub fn record_success(&self) {
        if self.backoff.attempt() > 0 {
            self.backoff.reset();
            logger::debug(LogTag::RateLimit, "Backoff reset after successful request");
        }
    }

    pub fn cooldown_remaining(&self) -> Duration {
        self.state.lock().cooldown_remaining(Instant::now())
    }

    pub fn consecutive_throttles(&self) -> u64 {
        self.backoff.attempt()
    }

    fn manual_threshold(&self, limit: usize) -> usize {
        ((limit as f64 * self.manual_safety_percent / 100.0).floor() as usize).max(1)
    }

    fn blocked_for(&self, state: &LimiterState, now: Instant) -> Option<Blocked> {
        let mut blocked: Option<Blocked> = None;

        let cooldown = state.cooldown_remaining(now);
        if !cooldown.is_zero() {
            blocked = Some(Blocked {
                wait: cooldown,
                reason: "cooldown".to_string(),
            });
        }

        let manual = state.manual_mode();
        for window in &self.windows {
            let limit = window.effective_limit(manual);
            if let Some(wait) = window.time_until_below(&state.timestamps, now, limit) {
                if blocked.as_ref().map_or(true, |b| wait > b.wait) {
                    blocked = Some(Blocked {
                        wait,
                        reason: format!("{} window full at {}", window.name, limit),
                    });
                }
            }
        }

        blocked
    }

    fn usage_from(&self, state: &LimiterState, now: Instant) -> RateLimitUsage {
        let manual = state.manual_mode();
        let windows = self
            .windows
            .iter()
            .map(|window| {
                let requests = window.count(&state.timestamps, now);
                let limit = window.effective_limit(manual);
                WindowUsage {
                    name: window.name.clone(),
                    duration_secs: window.duration.as_secs(),
                    requests,
                    limit,
                    percentage: requests as f64 / limit as f64 * 100.0,
                }
            })
            .collect();

        RateLimitUsage {
            windows,
            manual_mode: manual,
            cooldown_remaining_secs: ceil_secs(state.cooldown_remaining(now)),
        }
    }

    #[cfg(test)]
    pub(crate) fn replace_timestamps(&self, timestamps: Vec<Instant>) {
        self.state.lock().timestamps = timestamps.into();
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("windows", &self.windows)
            .field("manual_safety_percent", &self.manual_safety_percent)
            .field("max_cooldown", &self.max_cooldown)
            .finish_non_exhaustive()
    }
}

fn ceil_secs(duration: Duration) -> u64 {
    duration.as_secs() + u64::from(duration.subsec_nanos() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WindowLimitConfig;
    use std::sync::Arc;

    fn limiter_with(windows: Vec<WindowLimitConfig>) -> RateLimiter {
        let config = RateLimitConfig {
            windows,
            ..RateLimitConfig::default()
        };
        RateLimiter::new(&config).with_backoff(ExponentialBackoff::with_jitter(
            Duration::from_secs(1),
            Duration::from_secs(120),
            0.0,
        ))
    }

    fn default_limiter() -> RateLimiter {
        limiter_with(default_windows())
    }

    #[tokio::test(start_paused = true)]
    async fn test_eleventh_call_waits_for_first_to_age_out() {
        let limiter = limiter_with(vec![WindowLimitConfig::new("1min", 60, 10, 10)]);
        let start = Instant::now();
        let mut issued = Vec::new();

        for _ in 0..15 {
            limiter.wait_if_needed().await;
            issued.push(Instant::now());
        }

        for ts in &issued[..10] {
            assert_eq!(ts.duration_since(start), Duration::ZERO);
        }
        assert!(issued[10].duration_since(start) >= Duration::from_secs(60));

        // No 60s span ever holds more than 10 permits
        for (i, ts) in issued.iter().enumerate() {
            let in_window = issued[..=i]
                .iter()
                .filter(|earlier| ts.duration_since(**earlier) < Duration::from_secs(60))
                .count();
            assert!(in_window <= 10, "call {} saw {} in window", i, in_window);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_most_restrictive_window_wins() {
        let limiter = limiter_with(vec![
            WindowLimitConfig::new("1min", 60, 5, 5),
            WindowLimitConfig::new("5min", 300, 8, 8),
        ]);
        let start = Instant::now();
        let mut issued = Vec::new();

        for _ in 0..9 {
            limiter.wait_if_needed().await;
            issued.push(Instant::now().duration_since(start));
        }

        assert_eq!(issued[4], Duration::ZERO);
        assert_eq!(issued[5], Duration::from_secs(60));
        assert_eq!(issued[7], Duration::from_secs(60));
        // 1min has room again but 5min is full until the first five age out
        assert_eq!(issued[8], Duration::from_secs(300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_mode_applies_stricter_ceiling_to_waits() {
        let limiter = limiter_with(vec![WindowLimitConfig::new("1min", 60, 10, 3)]);
        let start = Instant::now();

        let _guard = limiter.manual_update_guard();
        for _ in 0..3 {
            limiter.wait_if_needed().await;
        }
        assert_eq!(start.elapsed(), Duration::ZERO);

        limiter.wait_if_needed().await;
        assert!(start.elapsed() >= Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_check_is_stricter_in_manual_mode() {
        let limiter = default_limiter();
        for _ in 0..30 {
            assert!(limiter.try_acquire());
        }

        // 30 of 50 is under 80%; 30 of the manual 30 is not
        let check = limiter.can_perform_manual_update();
        assert!(check.allowed, "{}", check.message);

        limiter.set_manual_update_mode(true);
        let check = limiter.can_perform_manual_update();
        assert!(!check.allowed);
        assert!(check.message.contains("1min"), "{}", check.message);

        limiter.set_manual_update_mode(false);
        assert!(limiter.can_perform_manual_update().allowed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_check_denied_near_normal_limit() {
        let limiter = default_limiter();
        for _ in 0..40 {
            limiter.wait_if_needed().await;
        }
        let (allowed, message) = limiter.can_perform_manual_update().into();
        assert!(!allowed);
        assert!(message.contains("40/50"), "{}", message);
        assert!(message.contains("try again in 60s"), "{}", message);

        tokio::time::advance(Duration::from_secs(60)).await;
        assert!(limiter.can_perform_manual_update().allowed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_check_does_not_mutate() {
        let limiter = default_limiter();
        limiter.try_acquire();
        let before = limiter.get_current_usage();
        let _ = limiter.can_perform_manual_update();
        let _ = limiter.can_perform_manual_update();
        assert_eq!(limiter.get_current_usage(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cooldown_denies_regardless_of_occupancy() {
        let limiter = default_limiter();
        assert!(limiter.can_perform_manual_update().allowed);

        let applied = limiter.record_throttled(Some(Duration::from_secs(30)));
        assert_eq!(applied, Duration::from_secs(30));

        let check = limiter.can_perform_manual_update();
        assert!(!check.allowed);
        assert!(check.message.contains("cooldown"), "{}", check.message);
        assert_eq!(limiter.get_current_usage().cooldown_remaining_secs, 30);
        assert!(!limiter.try_acquire());

        tokio::time::advance(Duration::from_secs(31)).await;
        assert!(limiter.cooldown_remaining().is_zero());
        assert!(limiter.can_perform_manual_update().allowed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_if_needed_waits_out_cooldown() {
        let limiter = default_limiter();
        limiter.record_throttled(Some(Duration::from_secs(10)));

        let start = Instant::now();
        limiter.wait_if_needed().await;
        assert!(start.elapsed() >= Duration::from_secs(10));
        assert_eq!(limiter.get_current_usage().window("1min").map(|w| w.requests), Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_grows_and_resets() {
        let limiter = default_limiter();

        assert_eq!(limiter.record_throttled(None), Duration::from_secs(1));
        assert_eq!(limiter.record_throttled(None), Duration::from_secs(2));
        assert_eq!(limiter.record_throttled(None), Duration::from_secs(4));
        assert_eq!(limiter.consecutive_throttles(), 3);

        limiter.record_success();
        assert_eq!(limiter.consecutive_throttles(), 0);
        assert_eq!(limiter.record_throttled(None), Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cooldown_is_capped() {
        let config = RateLimitConfig {
            max_cooldown_secs: 3,
            ..RateLimitConfig::default()
        };
        let limiter = RateLimiter::new(&config);
        assert_eq!(limiter.record_throttled(Some(Duration::from_secs(600))), Duration::from_secs(3));
        assert!(limiter.cooldown_remaining() <= Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shorter_throttle_does_not_shorten_cooldown() {
        let limiter = default_limiter();
        limiter.record_throttled(Some(Duration::from_secs(60)));
        limiter.record_throttled(Some(Duration::from_secs(5)));
        assert_eq!(limiter.cooldown_remaining(), Duration::from_secs(60));
    }

    #[test]
    fn test_guard_releases_manual_mode() {
        let limiter = default_limiter();
        {
            let _outer = limiter.manual_update_guard();
            {
                let _inner = limiter.manual_update_guard();
                assert!(limiter.is_manual_mode());
            }
            assert!(limiter.is_manual_mode());
        }
        assert!(!limiter.is_manual_mode());
    }

    #[test]
    fn test_guard_releases_on_panic() {
        let limiter = default_limiter();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = limiter.manual_update_guard();
            panic!("refresh failed");
        }));
        assert!(result.is_err());
        assert!(!limiter.is_manual_mode());
    }

    #[test]
    fn test_explicit_flag_survives_guard_drop() {
        let limiter = default_limiter();
        limiter.set_manual_update_mode(true);
        drop(limiter.manual_update_guard());
        assert!(limiter.is_manual_mode());
        limiter.set_manual_update_mode(false);
        assert!(!limiter.is_manual_mode());
    }

    #[tokio::test(start_paused = true)]
    async fn test_usage_snapshot_tracks_mode() {
        let limiter = default_limiter();
        for _ in 0..3 {
            limiter.wait_if_needed().await;
        }

        let usage = limiter.get_current_usage();
        let minute = usage.window("1min").unwrap();
        assert_eq!(minute.requests, 3);
        assert_eq!(minute.limit, 50);
        assert!((minute.percentage - 6.0).abs() < 1e-9);
        assert_eq!(usage.window("5min").unwrap().limit, 200);
        assert!(!usage.manual_mode);

        let _guard = limiter.manual_update_guard();
        let usage = limiter.get_current_usage();
        let minute = usage.window("1min").unwrap();
        assert_eq!(minute.limit, 30);
        assert!((minute.percentage - 10.0).abs() < 1e-9);
        assert!(usage.manual_mode);
    }

    #[tokio::test(start_paused = true)]
    async fn test_inconsistent_log_denies_then_repairs() {
        let limiter = default_limiter();
        limiter.replace_timestamps(vec![Instant::now() + Duration::from_secs(10)]);

        let check = limiter.can_perform_manual_update();
        assert!(!check.allowed);
        assert!(check.message.contains("inconsistent"), "{}", check.message);

        let start = Instant::now();
        limiter.wait_if_needed().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(limiter.get_current_usage().window("1min").unwrap().requests, 2);
        assert!(limiter.can_perform_manual_update().allowed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unsorted_log_is_inconsistent() {
        let limiter = default_limiter();
        let early = Instant::now();
        tokio::time::advance(Duration::from_secs(10)).await;
        let late = Instant::now();

        limiter.replace_timestamps(vec![late, early]);
        assert!(!limiter.can_perform_manual_update().allowed);

        assert!(limiter.try_acquire());
        assert!(limiter.can_perform_manual_update().allowed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_waiters_share_budget() {
        let limiter = Arc::new(limiter_with(vec![WindowLimitConfig::new("1min", 60, 5, 5)]));
        let start = Instant::now();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                tokio::spawn(async move {
                    limiter.wait_if_needed().await;
                    start.elapsed()
                })
            })
            .collect();

        let mut elapsed = Vec::new();
        for handle in handles {
            elapsed.push(handle.await.unwrap());
        }

        assert_eq!(elapsed.iter().filter(|e| e.is_zero()).count(), 5);
        assert_eq!(
            elapsed.iter().filter(|e| **e >= Duration::from_secs(60)).count(),
            3
        );
    }

    #[test]
    fn test_empty_window_config_falls_back_to_defaults() {
        let limiter = limiter_with(Vec::new());
        assert_eq!(limiter.windows().len(), 2);
        assert_eq!(limiter.windows()[1].duration, Duration::from_secs(300));
    }
}
