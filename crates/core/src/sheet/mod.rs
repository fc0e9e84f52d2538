//! Tabular snapshot reading.
//!
//! Issuer snapshots arrive as spreadsheet files with arbitrary layouts;
//! this module flattens each sheet into a [`RawTable`] of stringified
//! cells, which is all the schema-inference layer ever looks at. The
//! [`WorkbookSource`] seam exists so the engine can be driven from
//! in-memory tables in tests.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader, Sheets};

use crate::errors::{ReconcileError, Result};

/// An unstructured grid of cells from one sheet, no assumed header.
/// Immutable once loaded.
#[derive(Clone, Debug, Default)]
pub struct RawTable {
    rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&[String]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A source of sheets in file order.
pub trait WorkbookSource {
    fn sheets(&mut self) -> Result<Vec<RawTable>>;
}

/// Workbook reader backed by calamine (xlsx, xls, xlsb, ods).
pub struct XlsxWorkbook {
    path: String,
    inner: Sheets<BufReader<File>>,
}

impl XlsxWorkbook {
    pub fn open(path: &Path) -> Result<Self> {
        let inner = open_workbook_auto(path).map_err(|e| ReconcileError::Workbook {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Ok(Self {
            path: path.display().to_string(),
            inner,
        })
    }
}

impl WorkbookSource for XlsxWorkbook {
    fn sheets(&mut self) -> Result<Vec<RawTable>> {
        let names = self.inner.sheet_names().to_vec();
        let mut sheets = Vec::with_capacity(names.len());

        for name in &names {
            let range = self
                .inner
                .worksheet_range(name)
                .map_err(|e| ReconcileError::Workbook {
                    path: self.path.clone(),
                    message: format!("sheet '{}': {}", name, e),
                })?;

            let rows = range
                .rows()
                .map(|row| row.iter().map(cell_to_string).collect())
                .collect();
            sheets.push(RawTable::new(rows));
        }

        Ok(sheets)
    }
}

/// Render one cell the way the schema and normalizer layers expect.
///
/// Whole floats render without the decimal point, so a share count read
/// as `12345.0` becomes `"12345"`. Tickers read as floats still carry a
/// `.0` artifact in some issuers' files and are cleaned later by the
/// normalizer.
fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(n) => {
            if n.fract() == 0.0 && n.abs() < 1e15 {
                format!("{}", *n as i64)
            } else {
                format!("{}", n)
            }
        }
        Data::Int(n) => format!("{}", n),
        Data::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        Data::Error(_) => String::new(),
        Data::DateTime(dt) => format!("{}", dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
    }
}
