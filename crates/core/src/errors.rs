//! Core error types for the reconciliation engine.

use thiserror::Error;

/// Type alias for Result using our Error type.
pub type Result<T> = std::result::Result<T, ReconcileError>;

/// Errors surfaced while reconciling one fund's snapshots.
///
/// These are fund-scoped: the multi-fund runner catches them at the fund
/// boundary, logs, and emits an empty result for that fund so the other
/// funds proceed.
#[derive(Error, Debug)]
pub enum ReconcileError {
    /// No sheet in the snapshot file contains an identifiable header row.
    #[error("No header row found in any sheet of {path}")]
    HeaderNotFound { path: String },

    /// A header row was found but one or more mandatory columns could
    /// not be mapped.
    #[error("Missing required column(s): {}", roles.join(", "))]
    RequiredColumnMissing { roles: Vec<String> },

    /// The snapshot file could not be opened or read as a workbook.
    #[error("Failed to read workbook {path}: {message}")]
    Workbook { path: String, message: String },

    /// The effective date string is not YYYYMMDD.
    #[error("Invalid effective date '{0}', expected YYYYMMDD")]
    InvalidDate(String),

    /// Snapshot discovery could not produce two dated files for a fund.
    #[error("Snapshot discovery failed: {0}")]
    Discovery(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}
