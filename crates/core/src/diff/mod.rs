//! Outer-join diffing of two holdings snapshots.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::normalize::CanonicalHolding;

/// How a joined row is classified in the report.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum Action {
    Added,
    Removed,
    Changed,
    Holding,
}

/// One joined row. `delta_shares` is always `new_shares - old_shares`.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct DiffRecord {
    pub ticker: String,
    pub name: String,
    pub old_shares: i64,
    pub new_shares: i64,
    pub delta_shares: i64,
    pub action: Action,
}

/// The two projections over the joined table: rows that moved, and
/// rows still held above the materiality floor. A ticker that changed
/// and remains held appears in both.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct DiffReport {
    pub changes: Vec<DiffRecord>,
    pub holdings: Vec<DiffRecord>,
}

#[derive(Default)]
struct JoinedRow {
    old_shares: i64,
    new_shares: i64,
    old_name: String,
    new_name: String,
}

/// Full outer join on ticker, then classify. Duplicate tickers within
/// one snapshot are summed before the join so each ticker appears at
/// most once per output. Output order is ascending by ticker.
pub fn diff_holdings(
    old: &[CanonicalHolding],
    new: &[CanonicalHolding],
    materiality_floor: i64,
) -> DiffReport {
    let mut joined: BTreeMap<String, JoinedRow> = BTreeMap::new();

    for holding in old {
        let row = joined.entry(holding.ticker.clone()).or_default();
        row.old_shares += holding.shares;
        if row.old_name.is_empty() {
            row.old_name = holding.name.clone();
        }
    }
    for holding in new {
        let row = joined.entry(holding.ticker.clone()).or_default();
        row.new_shares += holding.shares;
        if row.new_name.is_empty() {
            row.new_name = holding.name.clone();
        }
    }

    let mut report = DiffReport::default();

    for (ticker, row) in joined {
        let name = if row.new_name.is_empty() {
            row.old_name.clone()
        } else {
            row.new_name.clone()
        };
        let delta = row.new_shares - row.old_shares;

        if delta != 0 {
            let action = if row.old_shares == 0 {
                Action::Added
            } else if row.new_shares <= materiality_floor {
                Action::Removed
            } else {
                Action::Changed
            };
            report.changes.push(DiffRecord {
                ticker: ticker.clone(),
                name: name.clone(),
                old_shares: row.old_shares,
                new_shares: row.new_shares,
                delta_shares: delta,
                action,
            });
        }

        if row.new_shares > materiality_floor {
            report.holdings.push(DiffRecord {
                ticker,
                name,
                old_shares: row.old_shares,
                new_shares: row.new_shares,
                delta_shares: delta,
                action: Action::Holding,
            });
        }
    }

    report
}
