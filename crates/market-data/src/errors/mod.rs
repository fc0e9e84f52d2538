//! Error types for the market data crate.

use thiserror::Error;

/// Errors that can occur while querying a price source.
///
/// The resolution chain treats every error as "no result for this tier"
/// and moves on, so these exist for logging and for tests, not for
/// propagation out of the chain.
#[derive(Error, Debug)]
pub enum MarketDataError {
    /// The source rate limited the request (HTTP 429) and the retry
    /// budget is spent.
    #[error("Rate limited: {provider}")]
    RateLimited { provider: String },

    /// The request to the source timed out.
    #[error("Timeout: {provider}")]
    Timeout { provider: String },

    /// The source answered but the payload could not be interpreted.
    #[error("Invalid response from {provider}: {message}")]
    InvalidResponse { provider: String, message: String },

    /// Any other source-specific failure.
    #[error("Provider error: {provider} - {message}")]
    ProviderError { provider: String, message: String },

    /// A transport-level error from the HTTP client.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl MarketDataError {
    /// Whether a retry against the same source could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::Timeout { .. } | Self::Network(_)
        )
    }
}
