//! Shared HTTP session for the TWSE tiers.
//!
//! Wraps a pooled `reqwest::Client` with a fixed per-request timeout and
//! a bounded retry policy: transient statuses (429 and 5xx) on GET are
//! retried with linear backoff up to [`MAX_ATTEMPTS`] attempts.

use std::time::Duration;

use log::debug;
use reqwest::{Client, StatusCode};

use crate::errors::MarketDataError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_ATTEMPTS: u32 = 3;
const BACKOFF_STEP: Duration = Duration::from_secs(1);

#[derive(Clone)]
pub(crate) struct HttpSession {
    client: Client,
}

impl HttpSession {
    pub(crate) fn new() -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { client }
    }

    /// GET `url` and return the response body as text.
    ///
    /// Retries 429/5xx with linear backoff; all other failures map
    /// straight to a [`MarketDataError`] tagged with `provider`.
    pub(crate) async fn get_text(
        &self,
        provider: &'static str,
        url: &str,
    ) -> Result<String, MarketDataError> {
        let mut attempt = 0;
        loop {
            attempt += 1;

            let response = match self.client.get(url).send().await {
                Ok(response) => response,
                Err(e) if e.is_timeout() => {
                    return Err(MarketDataError::Timeout {
                        provider: provider.to_string(),
                    })
                }
                Err(e) => return Err(MarketDataError::Network(e)),
            };

            let status = response.status();
            if retryable(status) && attempt < MAX_ATTEMPTS {
                debug!(
                    "{}: HTTP {} on attempt {}, backing off",
                    provider, status, attempt
                );
                tokio::time::sleep(BACKOFF_STEP * attempt).await;
                continue;
            }

            if status == StatusCode::TOO_MANY_REQUESTS {
                return Err(MarketDataError::RateLimited {
                    provider: provider.to_string(),
                });
            }

            if !status.is_success() {
                return Err(MarketDataError::ProviderError {
                    provider: provider.to_string(),
                    message: format!("HTTP {}", status),
                });
            }

            return response
                .text()
                .await
                .map_err(|e| MarketDataError::ProviderError {
                    provider: provider.to_string(),
                    message: format!("Failed to read response: {}", e),
                });
        }
    }
}

fn retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_statuses_are_retryable() {
        assert!(retryable(StatusCode::TOO_MANY_REQUESTS));
        assert!(retryable(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(retryable(StatusCode::SERVICE_UNAVAILABLE));
        assert!(!retryable(StatusCode::NOT_FOUND));
        assert!(!retryable(StatusCode::OK));
    }
}
