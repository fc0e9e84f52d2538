//! Yahoo Finance fallback tier.
//!
//! Tried last, for any date. Taiwan securities are listed on Yahoo under
//! either the `.TWO` (OTC) or `.TW` (main board) suffix; both variants
//! are queried over a one-day window anchored at the requested date. If
//! neither yields an exact-date row, the tier falls back once more to
//! Yahoo's latest-known-price facility.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use log::debug;
use time::OffsetDateTime;
use yahoo_finance_api as yahoo;

use crate::errors::MarketDataError;
use crate::models::{PriceQuote, TierOutcome};
use crate::provider::PriceProvider;

const PROVIDER_ID: &str = "YAHOO";
const MARKET_SUFFIXES: [&str; 2] = [".TWO", ".TW"];

pub struct YahooFallbackProvider {
    connector: yahoo::YahooConnector,
}

impl YahooFallbackProvider {
    pub fn new() -> Result<Self, MarketDataError> {
        let connector = yahoo::YahooConnector::new().map_err(|e| MarketDataError::ProviderError {
            provider: PROVIDER_ID.to_string(),
            message: format!("Failed to initialize Yahoo connector: {}", e),
        })?;
        Ok(Self { connector })
    }

    /// Close price for `symbol` on exactly `date`, or `None`.
    ///
    /// Failures are swallowed here so the caller can move on to the next
    /// suffix variant; the chain already treats this tier as best-effort.
    async fn close_on_date(&self, symbol: &str, date: NaiveDate) -> Option<f64> {
        let start = day_start_utc(date);
        let end = day_start_utc(date + chrono::Duration::days(1));

        let response = match self
            .connector
            .get_quote_history(
                symbol,
                to_offset_datetime(start),
                to_offset_datetime(end),
            )
            .await
        {
            Ok(response) => response,
            Err(e) => {
                debug!("{}: history lookup failed for {}: {}", PROVIDER_ID, symbol, e);
                return None;
            }
        };

        let quotes = match response.quotes() {
            Ok(quotes) => quotes,
            Err(e) => {
                debug!("{}: no quotes for {}: {}", PROVIDER_ID, symbol, e);
                return None;
            }
        };

        quotes
            .into_iter()
            .find(|quote| {
                Utc.timestamp_opt(quote.timestamp as i64, 0)
                    .single()
                    .map(|ts| ts.date_naive() == date)
                    .unwrap_or(false)
            })
            .map(|quote| quote.close)
    }

    /// Last known price for the main-board listing, any date.
    async fn latest_known_price(&self, ticker: &str) -> Option<f64> {
        let symbol = format!("{}.TW", ticker);
        let response = match self.connector.get_latest_quotes(&symbol, "1d").await {
            Ok(response) => response,
            Err(e) => {
                debug!("{}: latest lookup failed for {}: {}", PROVIDER_ID, symbol, e);
                return None;
            }
        };
        response.last_quote().ok().map(|quote| quote.close)
    }
}

fn day_start_utc(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

fn to_offset_datetime(dt: DateTime<Utc>) -> OffsetDateTime {
    OffsetDateTime::from_unix_timestamp(dt.timestamp())
        .unwrap_or_else(|_| OffsetDateTime::now_utc())
}

#[async_trait]
impl PriceProvider for YahooFallbackProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn supports(&self, _date: NaiveDate, _today: NaiveDate) -> bool {
        true
    }

    async fn daily_close(
        &self,
        ticker: &str,
        date: NaiveDate,
        _today: NaiveDate,
    ) -> Result<TierOutcome, MarketDataError> {
        for suffix in MARKET_SUFFIXES {
            let symbol = format!("{}{}", ticker, suffix);
            if let Some(price) = self.close_on_date(&symbol, date).await {
                return Ok(TierOutcome::Found(PriceQuote {
                    ticker: ticker.to_string(),
                    date,
                    price,
                    source: PROVIDER_ID.to_string(),
                }));
            }
        }

        match self.latest_known_price(ticker).await {
            Some(price) => Ok(TierOutcome::Found(PriceQuote {
                ticker: ticker.to_string(),
                date,
                price,
                source: PROVIDER_ID.to_string(),
            })),
            None => Ok(TierOutcome::NotFound),
        }
    }
}
