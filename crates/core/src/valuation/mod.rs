//! Pricing of diff records and TWD display formatting.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::diff::{Action, DiffRecord};
use etfwatch_market_data::PriceResolver;

/// Anything that can produce a closing price for a ticker on a date.
/// Resolution failure is a price of 0, never an error, so valuation
/// proceeds even for delisted or untradeable tickers.
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn price(&self, ticker: &str, date: NaiveDate) -> f64;
}

#[async_trait]
impl PriceSource for PriceResolver {
    async fn price(&self, ticker: &str, date: NaiveDate) -> f64 {
        self.resolve_price(ticker, date).await
    }
}

/// A diff record extended with its resolved price and monetary impact.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ValuedRecord {
    pub ticker: String,
    pub name: String,
    pub old_shares: i64,
    pub new_shares: i64,
    pub delta_shares: i64,
    pub price: f64,
    pub monetary_value: f64,
    pub monetary_value_str: String,
    pub action: Action,
}

/// Cross-fund rollup over change records only.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Summary {
    pub total_value_change: String,
    pub count_added: usize,
    pub count_removed: usize,
}

impl Summary {
    /// Sum monetary values and count entries/exits across every fund's
    /// change list. Holding rows never enter the rollup.
    pub fn from_changes<'a, I>(changes: I) -> Self
    where
        I: IntoIterator<Item = &'a ValuedRecord>,
    {
        let mut total = 0.0;
        let mut count_added = 0;
        let mut count_removed = 0;
        for record in changes {
            total += record.monetary_value;
            match record.action {
                Action::Added => count_added += 1,
                Action::Removed => count_removed += 1,
                Action::Changed | Action::Holding => {}
            }
        }
        Self {
            total_value_change: format_twd_amount(Some(total)),
            count_added,
            count_removed,
        }
    }
}

/// Prices each record and computes its monetary impact. The valuation
/// basis is the share delta, except holding rows which are valued at
/// their full current position.
pub struct ValuationService {
    prices: Arc<dyn PriceSource>,
}

impl ValuationService {
    pub fn new(prices: Arc<dyn PriceSource>) -> Self {
        Self { prices }
    }

    pub async fn value(&self, records: &[DiffRecord], date: NaiveDate) -> Vec<ValuedRecord> {
        let mut valued = Vec::with_capacity(records.len());
        for record in records {
            let price = self.prices.price(&record.ticker, date).await;
            let basis = match record.action {
                Action::Holding => record.new_shares,
                _ => record.delta_shares,
            };
            let monetary_value = basis as f64 * price;
            valued.push(ValuedRecord {
                ticker: record.ticker.clone(),
                name: record.name.clone(),
                old_shares: record.old_shares,
                new_shares: record.new_shares,
                delta_shares: record.delta_shares,
                price,
                monetary_value,
                monetary_value_str: format_twd_amount(Some(monetary_value)),
                action: record.action,
            });
        }
        valued
    }
}

/// Magnitude-banded TWD rendering: one decimal of 億 above a hundred
/// million, whole 萬 above ten thousand, plain integer below, with the
/// sign leading. Missing or non-finite input renders as an em dash.
pub fn format_twd_amount(value: Option<f64>) -> String {
    let Some(n) = value else {
        return "—".to_string();
    };
    if !n.is_finite() {
        return "—".to_string();
    }
    let sign = if n < 0.0 { "-" } else { "" };
    let abs = n.abs();
    if abs >= 100_000_000.0 {
        format!("{}{:.1}億", sign, abs / 100_000_000.0)
    } else if abs >= 10_000.0 {
        format!("{}{}萬", sign, (abs / 10_000.0).round() as i64)
    } else {
        format!("{}{}", sign, abs.round() as i64)
    }
}
