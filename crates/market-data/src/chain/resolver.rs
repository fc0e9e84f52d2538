//! Ordered-fallback price resolution.

use std::sync::Arc;

use chrono::{Local, NaiveDate};
use log::{debug, warn};

use crate::chain::{PriceCache, RateLimitConfig, RateLimiter};
use crate::errors::MarketDataError;
use crate::models::{Resolution, TierOutcome};
use crate::provider::PriceProvider;
use crate::provider::{twse_day::TwseDayProvider, twse_mis::TwseMisProvider, yahoo::YahooFallbackProvider};

/// The MIS endpoint is the touchiest upstream; hold it near one request
/// per second, which mirrors the delay it implicitly expects.
const MIS_REQUESTS_PER_MINUTE: u32 = 60;

/// Runs the tiers in order for a `(ticker, date)` pair, first result
/// wins. Owns the per-run cache and the shared rate limiter.
pub struct PriceResolver {
    providers: Vec<Arc<dyn PriceProvider>>,
    cache: PriceCache,
    limiter: RateLimiter,
}

impl PriceResolver {
    /// Build a resolver over an explicit tier list, in fallback order.
    pub fn new(providers: Vec<Arc<dyn PriceProvider>>) -> Self {
        Self {
            providers,
            cache: PriceCache::new(),
            limiter: RateLimiter::new(),
        }
    }

    /// The standard Taiwan-market chain: MIS intraday, then the daily
    /// exchange report, then Yahoo Finance.
    pub fn taiwan_market() -> Result<Self, MarketDataError> {
        let resolver = Self::new(vec![
            Arc::new(TwseMisProvider::new()),
            Arc::new(TwseDayProvider::new()),
            Arc::new(YahooFallbackProvider::new()?),
        ]);
        resolver.limiter.configure(
            "TWSE_MIS",
            RateLimitConfig {
                requests_per_minute: MIS_REQUESTS_PER_MINUTE,
                burst_capacity: 1.0,
            },
        );
        Ok(resolver)
    }

    pub fn cache(&self) -> &PriceCache {
        &self.cache
    }

    /// Resolve a price, degrading to `0.0` when every tier comes up
    /// empty. Never fails.
    pub async fn resolve_price(&self, ticker: &str, date: NaiveDate) -> f64 {
        self.resolve(ticker, date).await.price()
    }

    /// Resolve with the current processing date taken from the clock.
    pub async fn resolve(&self, ticker: &str, date: NaiveDate) -> Resolution {
        self.resolve_as_of(ticker, date, Local::now().date_naive())
            .await
    }

    /// Resolve with an explicit "today", which gates the date-sensitive
    /// tiers. Split out so tests control the clock.
    pub async fn resolve_as_of(
        &self,
        ticker: &str,
        date: NaiveDate,
        today: NaiveDate,
    ) -> Resolution {
        if ticker.is_empty() {
            return Resolution::Exhausted;
        }

        if let Some(hit) = self.cache.get(ticker, date) {
            debug!("Price cache hit for {} on {}", ticker, date);
            return Resolution::Found(hit);
        }

        for provider in &self.providers {
            // Gate first: a tier that does not serve this date must not
            // cost a token, or historical runs stall on the intraday
            // tier's bucket.
            if !provider.supports(date, today) {
                debug!("{} not applicable for {} on {}", provider.id(), ticker, date);
                continue;
            }
            self.limiter.acquire(provider.id()).await;

            match provider.daily_close(ticker, date, today).await {
                Ok(TierOutcome::Found(quote)) => {
                    debug!(
                        "Resolved {} on {} to {} via {}",
                        ticker, date, quote.price, provider.id()
                    );
                    self.cache.insert(quote.clone());
                    return Resolution::Found(quote);
                }
                Ok(TierOutcome::NotApplicable) => {
                    debug!("{} not applicable for {} on {}", provider.id(), ticker, date);
                }
                Ok(TierOutcome::NotFound) => {
                    debug!("{} has no price for {} on {}", provider.id(), ticker, date);
                }
                Err(e) => {
                    // A failing tier must not take the chain down.
                    warn!("{} failed for {} on {}: {}", provider.id(), ticker, date, e);
                }
            }
        }

        Resolution::Exhausted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PriceQuote;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    enum Script {
        Found(f64),
        NotApplicable,
        NotFound,
        Fail,
    }

    struct ScriptedProvider {
        id: &'static str,
        script: Script,
        applicable: bool,
        calls: AtomicUsize,
    }

    impl ScriptedProvider {
        fn new(id: &'static str, script: Script) -> Arc<Self> {
            Arc::new(Self {
                id,
                script,
                applicable: true,
                calls: AtomicUsize::new(0),
            })
        }

        /// A tier whose date gate rejects every request.
        fn gated(id: &'static str, script: Script) -> Arc<Self> {
            Arc::new(Self {
                id,
                script,
                applicable: false,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PriceProvider for ScriptedProvider {
        fn id(&self) -> &'static str {
            self.id
        }

        fn supports(&self, _date: NaiveDate, _today: NaiveDate) -> bool {
            self.applicable
        }

        async fn daily_close(
            &self,
            ticker: &str,
            date: NaiveDate,
            _today: NaiveDate,
        ) -> Result<TierOutcome, MarketDataError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.script {
                Script::Found(price) => Ok(TierOutcome::Found(PriceQuote {
                    ticker: ticker.to_string(),
                    date,
                    price,
                    source: self.id.to_string(),
                })),
                Script::NotApplicable => Ok(TierOutcome::NotApplicable),
                Script::NotFound => Ok(TierOutcome::NotFound),
                Script::Fail => Err(MarketDataError::ProviderError {
                    provider: self.id.to_string(),
                    message: "boom".to_string(),
                }),
            }
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()
    }

    #[tokio::test]
    async fn first_applicable_tier_wins() {
        let first = ScriptedProvider::new("FIRST", Script::NotApplicable);
        let second = ScriptedProvider::new("SECOND", Script::Found(100.0));
        let third = ScriptedProvider::new("THIRD", Script::Found(999.0));
        let resolver =
            PriceResolver::new(vec![first.clone(), second.clone(), third.clone()]);

        let resolution = resolver.resolve_as_of("2330", date(), date()).await;
        assert_eq!(resolution.price(), 100.0);
        assert_eq!(resolution.source(), Some("SECOND"));
        assert_eq!(third.calls(), 0);
    }

    #[tokio::test]
    async fn inapplicable_tier_consumes_no_rate_limit_token() {
        let intraday = ScriptedProvider::gated("TWSE_MIS", Script::Found(999.0));
        let daily = ScriptedProvider::new("TWSE_DAY", Script::Found(593.0));
        let resolver = PriceResolver::new(vec![intraday.clone(), daily.clone()]);
        resolver.limiter.configure(
            "TWSE_MIS",
            RateLimitConfig {
                requests_per_minute: 60,
                burst_capacity: 1.0,
            },
        );
        resolver.limiter.configure(
            "TWSE_DAY",
            RateLimitConfig {
                requests_per_minute: 6000,
                burst_capacity: 3.0,
            },
        );

        for ticker in ["2330", "2317", "2454"] {
            assert_eq!(resolver.resolve_price(ticker, date()).await, 593.0);
        }

        assert_eq!(intraday.calls(), 0);
        // The skipped tier's bucket still holds its only token.
        assert!(resolver.limiter.try_acquire("TWSE_MIS"));
    }

    #[tokio::test]
    async fn tier_errors_are_swallowed() {
        let failing = ScriptedProvider::new("FAILING", Script::Fail);
        let fallback = ScriptedProvider::new("FALLBACK", Script::Found(42.0));
        let resolver = PriceResolver::new(vec![failing.clone(), fallback.clone()]);

        let price = resolver.resolve_price("2330", date()).await;
        assert_eq!(price, 42.0);
        assert_eq!(failing.calls(), 1);
    }

    #[tokio::test]
    async fn exhausted_chain_degrades_to_zero() {
        let empty = ScriptedProvider::new("EMPTY", Script::NotFound);
        let failing = ScriptedProvider::new("FAILING", Script::Fail);
        let resolver = PriceResolver::new(vec![empty.clone(), failing.clone()]);

        assert_eq!(resolver.resolve_price("2330", date()).await, 0.0);
        assert_eq!(
            resolver.resolve_as_of("2330", date(), date()).await,
            Resolution::Exhausted
        );
    }

    #[tokio::test]
    async fn cache_hit_short_circuits_the_chain() {
        let provider = ScriptedProvider::new("ONLY", Script::Found(593.0));
        let resolver = PriceResolver::new(vec![provider.clone()]);

        let first = resolver.resolve_price("2330", date()).await;
        let second = resolver.resolve_price("2330", date()).await;

        assert_eq!(first, second);
        // Two resolutions, at most one network round trip.
        assert_eq!(provider.calls(), 1);
        assert_eq!(resolver.cache().len(), 1);
    }

    #[tokio::test]
    async fn exhaustion_is_not_cached() {
        let empty = ScriptedProvider::new("EMPTY", Script::NotFound);
        let resolver = PriceResolver::new(vec![empty.clone()]);

        resolver.resolve_price("2330", date()).await;
        resolver.resolve_price("2330", date()).await;

        // Failures retry next time instead of pinning a zero.
        assert_eq!(empty.calls(), 2);
        assert!(resolver.cache().is_empty());
    }

    #[tokio::test]
    async fn empty_ticker_resolves_to_zero_without_lookups() {
        let provider = ScriptedProvider::new("ONLY", Script::Found(1.0));
        let resolver = PriceResolver::new(vec![provider.clone()]);

        assert_eq!(resolver.resolve_price("", date()).await, 0.0);
        assert_eq!(provider.calls(), 0);
    }
}
