//! Per-run price cache.
//!
//! Keyed by `(ticker, date)` and owned by the resolver, so its lifetime
//! is the serving process, not a global. Only successful resolutions are
//! stored: an exhausted chain is retried on the next request instead of
//! pinning a sentinel zero.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::NaiveDate;
use log::warn;

use crate::models::PriceQuote;

type PriceKey = (String, NaiveDate);

#[derive(Default)]
pub struct PriceCache {
    entries: Mutex<HashMap<PriceKey, PriceQuote>>,
}

impl PriceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock the entry map, recovering from poison. Worst case after a
    /// panic elsewhere is a stale or missing cache entry, which is
    /// strictly better than taking the resolver down.
    fn lock_entries(&self) -> MutexGuard<'_, HashMap<PriceKey, PriceQuote>> {
        self.entries.lock().unwrap_or_else(|poisoned| {
            warn!("Price cache mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    pub fn get(&self, ticker: &str, date: NaiveDate) -> Option<PriceQuote> {
        self.lock_entries()
            .get(&(ticker.to_string(), date))
            .cloned()
    }

    pub fn insert(&self, quote: PriceQuote) {
        self.lock_entries()
            .insert((quote.ticker.clone(), quote.date), quote);
    }

    pub fn len(&self) -> usize {
        self.lock_entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock_entries().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quote(ticker: &str, day: u32, price: f64) -> PriceQuote {
        PriceQuote {
            ticker: ticker.to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            price,
            source: "TWSE_DAY".to_string(),
        }
    }

    #[test]
    fn insert_then_get_round_trips() {
        let cache = PriceCache::new();
        cache.insert(quote("2330", 2, 593.0));

        let hit = cache.get("2330", NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(hit.map(|q| q.price), Some(593.0));
    }

    #[test]
    fn key_includes_the_date() {
        let cache = PriceCache::new();
        cache.insert(quote("2330", 2, 593.0));
        cache.insert(quote("2330", 3, 598.0));

        assert_eq!(cache.len(), 2);
        let day3 = cache.get("2330", NaiveDate::from_ymd_opt(2024, 1, 3).unwrap());
        assert_eq!(day3.map(|q| q.price), Some(598.0));
    }

    #[test]
    fn miss_returns_none() {
        let cache = PriceCache::new();
        assert!(cache
            .get("0050", NaiveDate::from_ymd_opt(2024, 1, 2).unwrap())
            .is_none());
        assert!(cache.is_empty());
    }
}
