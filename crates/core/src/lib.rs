//! etfwatch core crate
//!
//! The reconciliation engine: loads two dated holdings snapshots of an
//! ETF, infers each spreadsheet's schema, normalizes both into canonical
//! (ticker, name, shares) tables, outer-joins them on ticker, classifies
//! every change, and values the affected securities through the price
//! resolution chain from `etfwatch-market-data`.
//!
//! Snapshot discovery (listing a fund's shared Drive folder, picking the
//! two most recent dated files, downloading into a bounded disk cache)
//! lives in [`snapshots`]; the engine itself only ever sees two local
//! file paths and an effective date.

pub mod diff;
pub mod errors;
pub mod normalize;
pub mod reconcile;
pub mod schema;
pub mod sheet;
pub mod snapshots;
pub mod valuation;

pub use diff::{diff_holdings, Action, DiffRecord, DiffReport};
pub use errors::{ReconcileError, Result};
pub use normalize::{normalize_table, CanonicalHolding};
pub use reconcile::{
    parse_effective_date, FundCatalog, FundReport, FundResult, FundSnapshots, ReconcileConfig,
    ReconcileService, RunDates, RunOutcome,
};
pub use schema::{find_header_row, infer_mapping, ColumnMapping, Role};
pub use sheet::{RawTable, WorkbookSource, XlsxWorkbook};
pub use snapshots::{latest_two, DriveClient, RemoteFile, SnapshotFile, SnapshotStore};
pub use valuation::{format_twd_amount, PriceSource, Summary, ValuationService, ValuedRecord};
