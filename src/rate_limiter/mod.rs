//! Outbound request budget
//!
//! A single [`RateLimiter`] is shared (behind an `Arc`) by every component
//! that talks to an exchange. Background work calls
//! [`RateLimiter::wait_if_needed`] before each request; interactive actions
//! ask [`RateLimiter::can_perform_manual_update`] first and then run under a
//! [`ManualUpdateGuard`].

mod backoff;
mod guard;
mod limiter;
mod usage;
mod window;

pub use backoff::ExponentialBackoff;
pub use guard::ManualUpdateGuard;
pub use limiter::RateLimiter;
pub use usage::{ManualUpdateCheck, RateLimitUsage, WindowUsage};
pub use window::WindowLimit;
