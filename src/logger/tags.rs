/// Subsystem tags attached to every log line
///
/// The debug key (`--debug-<key>`) of each tag is its lowercase name.

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LogTag {
    System,
    Config,
    Monitor,
    Api,
    Cache,
    RateLimit,
    Alerts,
    Other(String),
}

impl LogTag {
    /// Key used by `--debug-<key>` flags and `logging.debug_tags`
    pub fn to_debug_key(&self) -> String {
        match self {
            LogTag::System => "system".to_string(),
            LogTag::Config => "config".to_string(),
            LogTag::Monitor => "monitor".to_string(),
            LogTag::Api => "api".to_string(),
            LogTag::Cache => "cache".to_string(),
            LogTag::RateLimit => "ratelimit".to_string(),
            LogTag::Alerts => "alerts".to_string(),
            LogTag::Other(s) => s.to_lowercase(),
        }
    }

    /// Uncolored label written to non-terminal sinks
    pub fn to_plain_string(&self) -> String {
        match self {
            LogTag::Other(s) => s.to_uppercase(),
            tag => tag.to_debug_key().to_uppercase(),
        }
    }

    pub fn from_debug_key(key: &str) -> LogTag {
        match key.to_lowercase().as_str() {
            "system" => LogTag::System,
            "config" => LogTag::Config,
            "monitor" => LogTag::Monitor,
            "api" => LogTag::Api,
            "cache" => LogTag::Cache,
            "ratelimit" | "rate-limit" | "rate_limit" => LogTag::RateLimit,
            "alerts" => LogTag::Alerts,
            other => LogTag::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for LogTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_plain_string())
    }
}
