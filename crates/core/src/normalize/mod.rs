//! Projection of a raw sheet into canonical holdings.

use serde::{Deserialize, Serialize};

use crate::schema::ColumnMapping;
use crate::sheet::RawTable;

/// One security position within one snapshot. Ticker is trimmed and
/// free of the trailing ".0" that numeric cell coercion leaves behind;
/// shares default to 0 when the cell is unparsable.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct CanonicalHolding {
    pub ticker: String,
    pub name: String,
    pub shares: i64,
}

/// Project the mapped columns of every row below the header into
/// holdings. Rows whose ticker cleans to empty are dropped; duplicate
/// tickers pass through untouched and are merged by the diff join.
pub fn normalize_table(
    table: &RawTable,
    header_index: usize,
    mapping: &ColumnMapping,
) -> Vec<CanonicalHolding> {
    table
        .rows()
        .iter()
        .skip(header_index + 1)
        .filter_map(|row| {
            let ticker = clean_ticker(cell(row, mapping.ticker));
            if ticker.is_empty() {
                return None;
            }
            let name = cell(row, mapping.name.unwrap_or(usize::MAX)).trim().to_string();
            let shares = parse_shares(cell(row, mapping.shares));
            Some(CanonicalHolding {
                ticker,
                name,
                shares,
            })
        })
        .collect()
}

fn cell(row: &[String], index: usize) -> &str {
    row.get(index).map(String::as_str).unwrap_or("")
}

/// Trim and strip the ".0" artifact from tickers read as floats.
pub fn clean_ticker(raw: &str) -> String {
    let trimmed = raw.trim();
    trimmed.strip_suffix(".0").unwrap_or(trimmed).to_string()
}

/// Parse a share count, tolerating thousands separators and decimal
/// renderings of whole numbers. Unparsable text is an absent holding,
/// not an error.
pub fn parse_shares(raw: &str) -> i64 {
    let cleaned = raw.trim().replace(',', "");
    if cleaned.is_empty() {
        return 0;
    }
    cleaned.parse::<f64>().map(|n| n as i64).unwrap_or(0)
}
