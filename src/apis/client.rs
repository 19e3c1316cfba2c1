/// Base HTTP client shared by the exchange clients
use crate::errors::{CryptoWatchError, CryptoWatchResult};
use crate::logger::{self, LogTag};
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::{Duration, Instant};

/// HTTP client wrapper with timeout and status classification
pub struct HttpClient {
    client: Client,
    timeout: Duration,
}

impl HttpClient {
    pub fn new(timeout_secs: u64) -> Result<Self, String> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(concat!("cryptowatch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| format!("Failed to create HTTP client: {}", e))?;

        Ok(Self {
            client,
            timeout: Duration::from_secs(timeout_secs),
        })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// GET `url` and decode the body as JSON
    ///
    /// 429 and 418 become [`CryptoWatchError::Throttled`] carrying the
    /// Retry-After header when the server sent one; any other non-2xx
    /// status becomes [`CryptoWatchError::HttpStatus`].
    pub async fn get_json(
        &self,
        endpoint: &str,
        url: &str,
        query: &[(&str, String)],
        headers: &[(&str, &str)],
    ) -> CryptoWatchResult<Value> {
        let mut request = self.client.get(url).header("Accept", "application/json");
        if !query.is_empty() {
            request = request.query(query);
        }
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        let start = Instant::now();
        let response = request
            .send()
            .await
            .map_err(|e| CryptoWatchError::network(endpoint, e.to_string()))?;
        let status = response.status();

        if is_throttle_status(status) {
            let retry_after_secs = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(parse_retry_after);
            return Err(CryptoWatchError::Throttled {
                endpoint: endpoint.to_string(),
                retry_after_secs,
            });
        }

        if !status.is_success() {
            return Err(CryptoWatchError::HttpStatus {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| CryptoWatchError::network(endpoint, e.to_string()))?;

        logger::debug(
            LogTag::Api,
            &format!(
                "GET {} -> {} ({} bytes, {}ms)",
                endpoint,
                status.as_u16(),
                body.len(),
                start.elapsed().as_millis()
            ),
        );

        serde_json::from_str(&body).map_err(|e| CryptoWatchError::parse(endpoint, e.to_string()))
    }
}

/// Binance answers 418 once an IP ignores repeated 429s
pub fn is_throttle_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::IM_A_TEAPOT
}

/// Retry-After in delta-seconds form; HTTP-date values are ignored
pub fn parse_retry_after(raw: &str) -> Option<u64> {
    raw.trim().parse::<u64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_throttle_statuses() {
        assert!(is_throttle_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_throttle_status(StatusCode::IM_A_TEAPOT));
        assert!(!is_throttle_status(StatusCode::SERVICE_UNAVAILABLE));
        assert!(!is_throttle_status(StatusCode::OK));
    }

    #[test]
    fn test_parse_retry_after() {
        assert_eq!(parse_retry_after("30"), Some(30));
        assert_eq!(parse_retry_after(" 5 "), Some(5));
        assert_eq!(parse_retry_after("Wed, 21 Oct 2015 07:28:00 GMT"), None);
        assert_eq!(parse_retry_after("-1"), None);
    }
}
