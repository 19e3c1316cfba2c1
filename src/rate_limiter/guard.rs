//! Scoped manual-update mode

use super::limiter::RateLimiter;

/// Keeps the limiter in manual-update mode until dropped
///
/// Release happens on every exit path, early returns and panics included.
/// Guards nest: the limiter leaves manual mode when the last one goes.
#[must_use = "manual mode ends as soon as the guard is dropped"]
pub struct ManualUpdateGuard<'a> {
    limiter: &'a RateLimiter,
}

impl<'a> ManualUpdateGuard<'a> {
    pub(super) fn new(limiter: &'a RateLimiter) -> Self {
        limiter.acquire_manual_hold();
        Self { limiter }
    }
}

impl Drop for ManualUpdateGuard<'_> {
    fn drop(&mut self) {
        self.limiter.release_manual_hold();
    }
}
