//! Per-fund reconciliation pipeline and the cross-fund run loop.
//!
//! One reconciliation takes two snapshot files and the newer file's
//! effective date, infers each file's layout, diffs the normalized
//! holdings, and prices the result. The run loop applies this to a
//! catalog of funds, absorbing per-fund failures so one malformed
//! snapshot never takes down the whole run.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDate;
use log::{debug, error};
use serde::ser::SerializeSeq;
use serde::{Deserialize, Serialize, Serializer};

use crate::diff::diff_holdings;
use crate::errors::{ReconcileError, Result};
use crate::normalize::{normalize_table, CanonicalHolding};
use crate::schema::{find_header_row, infer_mapping};
use crate::sheet::{WorkbookSource, XlsxWorkbook};
use crate::valuation::{PriceSource, ValuationService, ValuedRecord};

const EFFECTIVE_DATE_FORMAT: &str = "%Y%m%d";

/// Tunables for one reconciliation run.
#[derive(Clone, Copy, Debug)]
pub struct ReconcileConfig {
    /// Share count below which a residual position counts as an exit,
    /// and above which a position enters the holdings list.
    pub materiality_floor: i64,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            materiality_floor: 1000,
        }
    }
}

/// Priced output of one fund's reconciliation.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct FundReport {
    pub changes: Vec<ValuedRecord>,
    pub holdings: Vec<ValuedRecord>,
}

/// A fund with its two resolved snapshot files, newest last.
#[derive(Clone, Debug)]
pub struct FundSnapshots {
    pub code: String,
    pub old_path: PathBuf,
    pub new_path: PathBuf,
    /// Effective dates as `YYYYMMDD`, taken from the snapshot names.
    pub old_date: String,
    pub new_date: String,
}

/// The set of funds one run covers.
#[derive(Clone, Debug, Default)]
pub struct FundCatalog {
    pub funds: Vec<FundSnapshots>,
}

/// Per-fund result inside a run: a report, or the error that stopped
/// that fund.
///
/// A failed fund serializes as an empty list, so the aggregation
/// endpoint always returns a partial result rather than ever failing
/// top-level. The error itself stays available in code and in the logs.
#[derive(Clone, Debug)]
pub enum FundResult {
    Report(FundReport),
    Error { error: String },
}

impl Serialize for FundResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            FundResult::Report(report) => report.serialize(serializer),
            FundResult::Error { .. } => serializer.serialize_seq(Some(0))?.end(),
        }
    }
}

/// Snapshot dates of the run, taken from the last fund processed.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct RunDates {
    pub new: Option<String>,
    pub old: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct RunOutcome {
    pub results: BTreeMap<String, FundResult>,
    pub dates: RunDates,
}

/// Parse a `YYYYMMDD` effective date.
pub fn parse_effective_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, EFFECTIVE_DATE_FORMAT)
        .map_err(|_| ReconcileError::InvalidDate(raw.to_string()))
}

/// Read one snapshot file into holdings: first sheet with a
/// recognizable header wins, its mapping is mandatory.
pub fn read_holdings(source: &mut dyn WorkbookSource, path: &str) -> Result<Vec<CanonicalHolding>> {
    for table in source.sheets()? {
        let Some(header_index) = find_header_row(&table) else {
            continue;
        };
        let header = table.row(header_index).unwrap_or(&[]);
        let mapping = infer_mapping(header)?;
        return Ok(normalize_table(&table, header_index, &mapping));
    }
    Err(ReconcileError::HeaderNotFound {
        path: path.to_string(),
    })
}

pub struct ReconcileService {
    valuation: ValuationService,
    config: ReconcileConfig,
}

impl ReconcileService {
    pub fn new(prices: Arc<dyn PriceSource>, config: ReconcileConfig) -> Self {
        Self {
            valuation: ValuationService::new(prices),
            config,
        }
    }

    /// Reconcile one fund from its two snapshot files. `effective_date`
    /// is the newer snapshot's date as `YYYYMMDD` and anchors every
    /// price lookup.
    pub async fn reconcile(
        &self,
        old_path: &Path,
        new_path: &Path,
        effective_date: &str,
    ) -> Result<FundReport> {
        let date = parse_effective_date(effective_date)?;
        let old = load_snapshot(old_path)?;
        let new = load_snapshot(new_path)?;
        Ok(self.reconcile_holdings(&old, &new, date).await)
    }

    /// Diff and price two already-normalized snapshots.
    pub async fn reconcile_holdings(
        &self,
        old: &[CanonicalHolding],
        new: &[CanonicalHolding],
        date: NaiveDate,
    ) -> FundReport {
        let report = diff_holdings(old, new, self.config.materiality_floor);
        debug!(
            "diffed {} old vs {} new holdings into {} changes, {} held",
            old.len(),
            new.len(),
            report.changes.len(),
            report.holdings.len()
        );
        FundReport {
            changes: self.valuation.value(&report.changes, date).await,
            holdings: self.valuation.value(&report.holdings, date).await,
        }
    }

    /// Run every fund in the catalog sequentially. A fund that fails is
    /// recorded as an error entry and the run continues.
    pub async fn run_catalog(&self, catalog: &FundCatalog) -> RunOutcome {
        let mut outcome = RunOutcome::default();

        for fund in &catalog.funds {
            outcome.dates = RunDates {
                new: Some(fund.new_date.clone()),
                old: Some(fund.old_date.clone()),
            };
            match self
                .reconcile(&fund.old_path, &fund.new_path, &fund.new_date)
                .await
            {
                Ok(report) => {
                    outcome
                        .results
                        .insert(fund.code.clone(), FundResult::Report(report));
                }
                Err(e) => {
                    error!("reconciliation failed for {}: {e}", fund.code);
                    outcome.results.insert(
                        fund.code.clone(),
                        FundResult::Error {
                            error: e.to_string(),
                        },
                    );
                }
            }
        }

        outcome
    }
}

fn load_snapshot(path: &Path) -> Result<Vec<CanonicalHolding>> {
    let mut workbook = XlsxWorkbook::open(path)?;
    read_holdings(&mut workbook, &path.display().to_string())
}
