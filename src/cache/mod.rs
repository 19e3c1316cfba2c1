//! Response cache consulted before every outbound request

pub mod config;
pub mod key;
pub mod manager;

pub use config::{max_ttl, CachedEndpoint};
pub use key::{CacheKey, ParamValue, RequestDescriptor};
pub use manager::{CacheMetrics, ResponseCache, DEFAULT_CAPACITY};
