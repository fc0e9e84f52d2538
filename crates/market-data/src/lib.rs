//! etfwatch market data crate
//!
//! Resolves a daily price for a Taiwan-listed security via an ordered
//! fallback of sources:
//!
//! 1. TWSE MIS intraday quotes (only for the current processing date)
//! 2. TWSE daily exchange report (only for past dates)
//! 3. Yahoo Finance (any date, tried last)
//!
//! The chain never fails: a ticker no source can price resolves to `0.0`
//! so downstream valuation always completes. Internally each tier reports
//! a typed [`TierOutcome`] so callers and tests can tell a confirmed price
//! from an exhausted chain.
//!
//! Resolved prices are cached per `(ticker, date)` for the life of the
//! [`PriceResolver`]; a cache hit short-circuits the whole chain. Calls
//! to upstream sources go through a shared token-bucket [`RateLimiter`].

pub mod chain;
pub mod errors;
pub mod models;
pub mod provider;

pub use chain::{PriceCache, PriceResolver, RateLimiter};
pub use errors::MarketDataError;
pub use models::{PriceQuote, Resolution, TierOutcome};
pub use provider::twse_day::TwseDayProvider;
pub use provider::twse_mis::TwseMisProvider;
pub use provider::yahoo::YahooFallbackProvider;
pub use provider::PriceProvider;
