//! CryptoWatch: a headless market monitor for Binance and CoinGecko
//!
//! Every outbound request goes through one shared [`cache::ResponseCache`]
//! and one [`rate_limiter::RateLimiter`]. Analysis results and alerts are
//! published as [`monitor::MonitorEvent`]s for whatever UI sits on top.

pub mod alerts;
pub mod apis;
pub mod arguments;
pub mod cache;
pub mod config;
pub mod errors;
pub mod indicators;
pub mod logger;
pub mod market;
pub mod monitor;
pub mod rate_limiter;
pub mod shutdown;
pub mod validator;
