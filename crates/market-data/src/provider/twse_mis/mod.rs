//! TWSE MIS intraday quote tier.
//!
//! Queries the exchange's real-time quote endpoint. Only applicable when
//! the requested date is the current processing date; historical dates
//! fall through to the daily-report tier.
//!
//! A ticker may be listed on the main board (`tse_`) or the OTC market
//! (`otc_`); both prefixes are tried in order.

use async_trait::async_trait;
use chrono::NaiveDate;
use log::debug;
use serde::Deserialize;

use crate::errors::MarketDataError;
use crate::models::{PriceQuote, TierOutcome};
use crate::provider::{HttpSession, PriceProvider};

const PROVIDER_ID: &str = "TWSE_MIS";
const BASE_URL: &str = "https://mis.twse.com.tw/stock/api/getStockInfo.jsp";
const MARKET_PREFIXES: [&str; 2] = ["tse_", "otc_"];

/// Response from getStockInfo.jsp.
#[derive(Debug, Deserialize)]
struct MisResponse {
    #[serde(rename = "msgArray", default)]
    msg_array: Vec<MisRow>,
}

/// One quoted security. All fields arrive as strings; `-` is the
/// exchange's placeholder for "no value yet".
#[derive(Debug, Deserialize, Default)]
pub(crate) struct MisRow {
    /// Ticker
    #[serde(default)]
    pub c: Option<String>,
    /// Last trade price
    #[serde(default)]
    pub z: Option<String>,
    /// Opening price
    #[serde(default)]
    pub oz: Option<String>,
    /// Best bid price
    #[serde(default)]
    pub ob: Option<String>,
    /// Previous-day reference price
    #[serde(default)]
    pub y: Option<String>,
}

pub struct TwseMisProvider {
    session: HttpSession,
}

impl TwseMisProvider {
    pub fn new() -> Self {
        Self {
            session: HttpSession::new(),
        }
    }
}

impl Default for TwseMisProvider {
    fn default() -> Self {
        Self::new()
    }
}

/// Pick the intraday price for `ticker` out of a quote batch.
///
/// Preference order is last trade, then open, then best bid, where each
/// falls through only when the field is absent. A row whose preferred
/// price is the `-` placeholder, or whose reference price is zero (not
/// trading today), yields nothing.
pub(crate) fn extract_price(rows: &[MisRow], ticker: &str) -> Option<f64> {
    for row in rows {
        if row.c.as_deref() != Some(ticker) {
            continue;
        }

        let candidate = [&row.z, &row.oz, &row.ob]
            .into_iter()
            .flatten()
            .find(|value| !value.is_empty());
        let Some(candidate) = candidate else { continue };
        if candidate == "-" {
            continue;
        }

        let reference: f64 = row
            .y
            .as_deref()
            .and_then(|value| value.parse().ok())
            .unwrap_or(0.0);
        if reference == 0.0 {
            continue;
        }

        if let Ok(price) = candidate.parse::<f64>() {
            return Some(price);
        }
    }
    None
}

#[async_trait]
impl PriceProvider for TwseMisProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn supports(&self, date: NaiveDate, today: NaiveDate) -> bool {
        date == today
    }

    async fn daily_close(
        &self,
        ticker: &str,
        date: NaiveDate,
        today: NaiveDate,
    ) -> Result<TierOutcome, MarketDataError> {
        if date != today {
            return Ok(TierOutcome::NotApplicable);
        }

        for prefix in MARKET_PREFIXES {
            let url = format!(
                "{}?ex_ch={}{}.tw&json=1&delay=0",
                BASE_URL, prefix, ticker
            );
            let body = self.session.get_text(PROVIDER_ID, &url).await?;

            // The endpoint answers HTML error pages with a 200 on some
            // failures; an unparsable body just means "try the other
            // market prefix".
            let parsed: MisResponse = match serde_json::from_str(&body) {
                Ok(parsed) => parsed,
                Err(e) => {
                    debug!("{}: unparsable body for {}{}: {}", PROVIDER_ID, prefix, ticker, e);
                    continue;
                }
            };

            if let Some(price) = extract_price(&parsed.msg_array, ticker) {
                return Ok(TierOutcome::Found(PriceQuote {
                    ticker: ticker.to_string(),
                    date,
                    price,
                    source: PROVIDER_ID.to_string(),
                }));
            }
        }

        Ok(TierOutcome::NotFound)
    }
}
