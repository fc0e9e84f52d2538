//! Data model for resolved prices and per-tier outcomes.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A price resolved for one `(ticker, date)` pair.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PriceQuote {
    /// Security ticker as it appears in the fund snapshot (e.g. "2330").
    pub ticker: String,

    /// The trading date the price is for.
    pub date: NaiveDate,

    /// Closing (or last-trade) price in TWD.
    pub price: f64,

    /// Identifier of the source tier that produced the price
    /// (TWSE_MIS, TWSE_DAY, YAHOO).
    pub source: String,
}

/// The typed result of asking one tier for a price.
///
/// Transport failures are reported separately as `Err(MarketDataError)`;
/// this enum covers the cases where the tier answered.
#[derive(Clone, Debug, PartialEq)]
pub enum TierOutcome {
    /// The tier produced a usable price.
    Found(PriceQuote),

    /// The tier does not apply to the requested date (e.g. the intraday
    /// source asked for a historical date). The chain moves on without
    /// counting this as a failure.
    NotApplicable,

    /// The tier applies but has no price for this ticker/date.
    NotFound,
}

/// The final result of running the whole chain for one `(ticker, date)`.
///
/// The observable contract is "always a number, 0.0 on exhaustion"; this
/// type keeps the distinction so tests can tell a confirmed zero-value
/// security from an exhausted chain.
#[derive(Clone, Debug, PartialEq)]
pub enum Resolution {
    /// Some tier produced a price.
    Found(PriceQuote),

    /// Every tier was not applicable, empty-handed, or errored.
    Exhausted,
}

impl Resolution {
    /// Collapse to the numeric contract: the resolved price, or `0.0`.
    pub fn price(&self) -> f64 {
        match self {
            Resolution::Found(quote) => quote.price,
            Resolution::Exhausted => 0.0,
        }
    }

    /// The source tier that produced the price, if any.
    pub fn source(&self) -> Option<&str> {
        match self {
            Resolution::Found(quote) => Some(quote.source.as_str()),
            Resolution::Exhausted => None,
        }
    }
}
