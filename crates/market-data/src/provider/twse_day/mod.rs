//! TWSE daily exchange report tier.
//!
//! The STOCK_DAY endpoint returns one full calendar month of trading
//! days per request, with row dates in the ROC calendar (Gregorian year
//! minus 1911). Only applicable when the requested date is strictly in
//! the past; the closing price is taken from the row whose date matches
//! exactly. No nearest-date substitution.

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use serde::Deserialize;

use crate::errors::MarketDataError;
use crate::models::{PriceQuote, TierOutcome};
use crate::provider::{HttpSession, PriceProvider};

const PROVIDER_ID: &str = "TWSE_DAY";
const BASE_URL: &str = "https://www.twse.com.tw/exchangeReport/STOCK_DAY";

/// ROC years are offset from Gregorian by the founding year of the
/// Republic of China.
const ROC_YEAR_OFFSET: i32 = 1911;

/// Column index of the closing price within a report row.
const CLOSE_COLUMN: usize = 6;

/// Response from STOCK_DAY. Rows are positional string arrays:
/// date, volume, value, open, high, low, close, change, transactions.
#[derive(Debug, Deserialize)]
struct DayReport {
    stat: String,
    #[serde(default)]
    data: Option<Vec<Vec<String>>>,
}

pub struct TwseDayProvider {
    session: HttpSession,
}

impl TwseDayProvider {
    pub fn new() -> Self {
        Self {
            session: HttpSession::new(),
        }
    }
}

impl Default for TwseDayProvider {
    fn default() -> Self {
        Self::new()
    }
}

/// Convert a ROC-calendar report date like `113/01/02` to a Gregorian
/// date. Returns `None` for malformed input.
pub(crate) fn roc_to_gregorian(value: &str) -> Option<NaiveDate> {
    let mut parts = value.split('/');
    let year: i32 = parts.next()?.trim().parse().ok()?;
    let month: u32 = parts.next()?.trim().parse().ok()?;
    let day: u32 = parts.next()?.trim().parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    NaiveDate::from_ymd_opt(year + ROC_YEAR_OFFSET, month, day)
}

/// Find the exact-date closing price within a month report.
pub(crate) fn closing_price_for(rows: &[Vec<String>], date: NaiveDate) -> Option<f64> {
    for row in rows {
        let row_date = row.first().and_then(|cell| roc_to_gregorian(cell));
        if row_date != Some(date) {
            continue;
        }
        return row
            .get(CLOSE_COLUMN)
            .map(|cell| cell.replace(',', ""))
            .and_then(|cell| cell.parse().ok());
    }
    None
}

#[async_trait]
impl PriceProvider for TwseDayProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn supports(&self, date: NaiveDate, today: NaiveDate) -> bool {
        date < today
    }

    async fn daily_close(
        &self,
        ticker: &str,
        date: NaiveDate,
        today: NaiveDate,
    ) -> Result<TierOutcome, MarketDataError> {
        if date >= today {
            return Ok(TierOutcome::NotApplicable);
        }

        // The endpoint is keyed on any date within the month; anchor at
        // day 01 so repeated lookups in one month share a cache-friendly
        // URL.
        let month_anchor = format!("{}{:02}01", date.year(), date.month());
        let url = format!(
            "{}?response=json&date={}&stockNo={}",
            BASE_URL, month_anchor, ticker
        );

        let body = self.session.get_text(PROVIDER_ID, &url).await?;
        let report: DayReport =
            serde_json::from_str(&body).map_err(|e| MarketDataError::InvalidResponse {
                provider: PROVIDER_ID.to_string(),
                message: e.to_string(),
            })?;

        if report.stat != "OK" {
            return Ok(TierOutcome::NotFound);
        }

        let rows = report.data.unwrap_or_default();
        match closing_price_for(&rows, date) {
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

#[cfg(test)]
mod tests {
    use super::*;

    fn report_row(date: &str, close: &str) -> Vec<String> {
        vec![
            date.to_string(),
            "35,000,000".to_string(),
            "20,700,000,000".to_string(),
            "590.00".to_string(),
            "595.00".to_string(),
            "588.00".to_string(),
            close.to_string(),
            "+3.00".to_string(),
            "45,123".to_string(),
        ]
    }

    #[test]
    fn roc_dates_convert_with_year_offset() {
        assert_eq!(
            roc_to_gregorian("113/01/02"),
            NaiveDate::from_ymd_opt(2024, 1, 2)
        );
        assert_eq!(
            roc_to_gregorian("112/12/29"),
            NaiveDate::from_ymd_opt(2023, 12, 29)
        );
    }

    #[test]
    fn malformed_roc_dates_are_rejected() {
        assert_eq!(roc_to_gregorian("20240102"), None);
        assert_eq!(roc_to_gregorian("113/01"), None);
        assert_eq!(roc_to_gregorian("113/01/02/9"), None);
        assert_eq!(roc_to_gregorian("113/13/02"), None);
    }

    #[test]
    fn exact_date_close_is_returned_with_commas_stripped() {
        let rows = vec![
            report_row("113/01/02", "593.00"),
            report_row("113/01/03", "1,005.00"),
        ];
        let date = NaiveDate::from_ymd_opt(2024, 1, 3).unwrap();
        assert_eq!(closing_price_for(&rows, date), Some(1005.0));
    }

    #[test]
    fn missing_date_yields_nothing() {
        // A non-trading day must not pick up a neighbouring row.
        let rows = vec![report_row("113/01/02", "593.00")];
        let date = NaiveDate::from_ymd_opt(2024, 1, 6).unwrap();
        assert_eq!(closing_price_for(&rows, date), None);
    }

    #[tokio::test]
    async fn current_and_future_dates_are_not_applicable() {
        let provider = TwseDayProvider::new();
        let today = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        assert!(!provider.supports(today, today));
        assert!(provider.supports(today - chrono::Duration::days(1), today));
        let outcome = provider.daily_close("2330", today, today).await.unwrap();
        assert_eq!(outcome, TierOutcome::NotApplicable);
    }
}
