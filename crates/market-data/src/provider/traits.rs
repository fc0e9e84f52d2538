//! Price provider trait definition.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::errors::MarketDataError;
use crate::models::TierOutcome;

/// One tier of the price resolution chain.
///
/// Implementations are date-gated: a tier that does not serve the
/// requested date returns [`TierOutcome::NotApplicable`] instead of
/// attempting a fetch. `today` is passed in rather than read from the
/// clock so the gating is testable.
#[async_trait]
pub trait PriceProvider: Send + Sync {
    /// Unique identifier for this tier (used for logging, rate limiting
    /// and the `source` field of resolved quotes).
    fn id(&self) -> &'static str;

    /// Whether this tier serves `date` at all. The chain skips tiers
    /// that answer `false` without consuming a rate limit token, so the
    /// gate must be a pure date comparison, never a network probe.
    fn supports(&self, date: NaiveDate, today: NaiveDate) -> bool;

    /// Fetch the daily price for `ticker` on `date`.
    ///
    /// Returns `Ok(TierOutcome::NotFound)` when the source answered but
    /// has no matching price; partial or nearest-date matches are never
    /// substituted. Transport and payload failures are `Err`, which the
    /// chain logs and treats the same as `NotFound`.
    async fn daily_close(
        &self,
        ticker: &str,
        date: NaiveDate,
        today: NaiveDate,
    ) -> Result<TierOutcome, MarketDataError>;
}
