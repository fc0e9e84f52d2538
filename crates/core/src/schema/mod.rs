//! Header-row location and column-role inference.
//!
//! Issuer files bury the holdings table under a variable number of
//! title and disclaimer rows, and label columns inconsistently across
//! issuers and languages. The rules here are plain data: each role
//! carries its keyword set (and, for shares, an exclusion set that
//! keeps percentage columns from being mistaken for unit counts), so
//! supporting a new issuer's labels is a table edit, not new code.

use crate::errors::{ReconcileError, Result};
use crate::sheet::RawTable;

/// Semantic roles a holdings column can play.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Role {
    Ticker,
    Name,
    Shares,
    Weight,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Ticker => "ticker",
            Role::Name => "name",
            Role::Shares => "shares",
            Role::Weight => "weight",
        }
    }
}

struct RoleRule {
    role: Role,
    keywords: &'static [&'static str],
    exclusions: &'static [&'static str],
    required: bool,
}

const ROLE_RULES: &[RoleRule] = &[
    RoleRule {
        role: Role::Ticker,
        keywords: &["股票代號", "股票代碼", "證券代號", "Code", "Symbol", "Ticker"],
        exclusions: &[],
        required: true,
    },
    RoleRule {
        role: Role::Name,
        keywords: &["股票名稱", "Name", "Security Name", "證券名稱", "名稱", "Security"],
        exclusions: &[],
        required: false,
    },
    RoleRule {
        role: Role::Shares,
        keywords: &["股數", "Shares", "Volume", "持股", "持有股數", "Units", "Quantity"],
        exclusions: &["權重", "%", "Rate", "Ratio", "比例"],
        required: true,
    },
    RoleRule {
        role: Role::Weight,
        keywords: &["持股權重", "Weight", "持股權重(%)", "持股比例(%)"],
        exclusions: &[],
        required: false,
    },
];

/// Keywords that qualify a row as a header during the top-down scan.
/// The shares side is broader than the column rule ("Vol" matches
/// abbreviated labels) because at scan time we only need to recognize
/// the row, not pick a column.
const HEADER_TICKER_KEYWORDS: &[&str] =
    &["股票代號", "股票代碼", "證券代號", "Code", "Symbol", "Ticker"];
const HEADER_SHARES_KEYWORDS: &[&str] = &[
    "股數", "Shares", "Vol", "Volume", "持股", "持有股數", "Units", "Quantity",
];

/// Column indices for each resolved role. Ticker and shares are
/// mandatory; name and weight are best-effort.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ColumnMapping {
    pub ticker: usize,
    pub name: Option<usize>,
    pub shares: usize,
    pub weight: Option<usize>,
}

/// Scan rows top to bottom and return the index of the first row whose
/// cells contain both a ticker keyword and a shares keyword.
pub fn find_header_row(table: &RawTable) -> Option<usize> {
    table.rows().iter().position(|row| {
        let has_ticker = row
            .iter()
            .any(|cell| HEADER_TICKER_KEYWORDS.iter().any(|k| cell.contains(k)));
        let has_shares = row
            .iter()
            .any(|cell| HEADER_SHARES_KEYWORDS.iter().any(|k| cell.contains(k)));
        has_ticker && has_shares
    })
}

/// Map header labels to roles by substring matching, first match wins.
/// Missing required roles are reported together in one error.
pub fn infer_mapping(header: &[String]) -> Result<ColumnMapping> {
    let labels: Vec<&str> = header.iter().map(|c| c.trim()).collect();

    let mut ticker = None;
    let mut name = None;
    let mut shares = None;
    let mut weight = None;
    let mut missing = Vec::new();

    for rule in ROLE_RULES {
        let found = labels.iter().position(|label| {
            if rule.exclusions.iter().any(|ex| label.contains(ex)) {
                return false;
            }
            rule.keywords.iter().any(|k| label.contains(k))
        });

        match (found, rule.required) {
            (Some(idx), _) => match rule.role {
                Role::Ticker => ticker = Some(idx),
                Role::Name => name = Some(idx),
                Role::Shares => shares = Some(idx),
                Role::Weight => weight = Some(idx),
            },
            (None, true) => missing.push(rule.role.as_str().to_string()),
            (None, false) => {}
        }
    }

    match (ticker, shares) {
        (Some(ticker), Some(shares)) => Ok(ColumnMapping {
            ticker,
            name,
            shares,
            weight,
        }),
        _ => Err(ReconcileError::RequiredColumnMissing { roles: missing }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(rows: &[&[&str]]) -> RawTable {
        RawTable::new(
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
    }

    #[test]
    fn header_found_after_title_rows() {
        let t = table(&[
            &["Fund 0050 Holdings"],
            &[""],
            &["As of 2024-01-02"],
            &[""],
            &["Symbol", "Name", "Shares"],
            &["2330", "TSMC", "10000"],
        ]);
        assert_eq!(find_header_row(&t), Some(4));
    }

    #[test]
    fn header_requires_both_keyword_families() {
        let t = table(&[
            &["Symbol", "Name"],
            &["Name", "Shares"],
            &["Symbol", "Shares"],
        ]);
        assert_eq!(find_header_row(&t), Some(2));
    }

    #[test]
    fn no_header_in_table_of_prose() {
        let t = table(&[&["Disclaimer"], &["Contact us"]]);
        assert_eq!(find_header_row(&t), None);
    }

    #[test]
    fn chinese_labels_map_to_all_roles() {
        let header: Vec<String> = ["股票代號", "股票名稱", "股數", "持股權重(%)"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let mapping = infer_mapping(&header).unwrap();
        assert_eq!(
            mapping,
            ColumnMapping {
                ticker: 0,
                name: Some(1),
                shares: 2,
                weight: Some(3),
            }
        );
    }

    #[test]
    fn percentage_column_never_wins_the_shares_role() {
        let header: Vec<String> = ["Code", "持股比例(%)", "持股"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let mapping = infer_mapping(&header).unwrap();
        assert_eq!(mapping.shares, 2);
        // The excluded label still matches the weight rule.
        assert_eq!(mapping.weight, Some(1));
    }

    #[test]
    fn missing_roles_are_reported_together() {
        let header: Vec<String> = ["Security", "Market"].iter().map(|s| s.to_string()).collect();
        let err = infer_mapping(&header).unwrap_err();
        match err {
            ReconcileError::RequiredColumnMissing { roles } => {
                assert_eq!(roles, vec!["ticker".to_string(), "shares".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn labels_are_trimmed_before_matching() {
        let header: Vec<String> = ["  Symbol ", " Shares "].iter().map(|s| s.to_string()).collect();
        let mapping = infer_mapping(&header).unwrap();
        assert_eq!(mapping.ticker, 0);
        assert_eq!(mapping.shares, 1);
    }
}
