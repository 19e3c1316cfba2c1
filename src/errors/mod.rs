/// Error types for the market data fetch layer
///
/// The resilience core (validator, cache, rate limiter) never returns
/// errors. Only the HTTP clients and the fetch-through service do, and the
/// monitor turns every one of them into a logged warning plus a default.
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum CryptoWatchError {
    #[error("Network error calling {endpoint}: {message}")]
    Network { endpoint: String, message: String },

    #[error("HTTP {status} from {endpoint}")]
    HttpStatus { endpoint: String, status: u16 },

    #[error("Throttled by {endpoint} (retry after {retry_after_secs:?}s)")]
    Throttled {
        endpoint: String,
        retry_after_secs: Option<u64>,
    },

    #[error("Failed to parse {data_type}: {message}")]
    Parse { data_type: String, message: String },

    #[error("Invalid symbol '{0}'")]
    InvalidSymbol(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

pub type CryptoWatchResult<T> = Result<T, CryptoWatchError>;

impl CryptoWatchError {
    pub fn network(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        CryptoWatchError::Network {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    pub fn parse(data_type: impl Into<String>, message: impl Into<String>) -> Self {
        CryptoWatchError::Parse {
            data_type: data_type.into(),
            message: message.into(),
        }
    }

    /// True for responses that should feed the rate limiter's cooldown
    pub fn is_throttle(&self) -> bool {
        matches!(self, CryptoWatchError::Throttled { .. })
    }
}

impl From<reqwest::Error> for CryptoWatchError {
    fn from(err: reqwest::Error) -> Self {
        let endpoint = err
            .url()
            .map(|u| u.path().to_string())
            .unwrap_or_else(|| "unknown".to_string());
        CryptoWatchError::Network {
            endpoint,
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for CryptoWatchError {
    fn from(err: serde_json::Error) -> Self {
        CryptoWatchError::Parse {
            data_type: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}
