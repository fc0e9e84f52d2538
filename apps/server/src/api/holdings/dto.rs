use std::collections::BTreeMap;

use etfwatch_core::{FundResult, RunDates, Summary};
use serde::Serialize;

/// Response body of `GET /api/holdings/changes`: the snapshot dates of
/// the run, the cross-fund rollup, and each fund's priced report (or
/// the error that stopped it).
#[derive(Serialize)]
pub struct ChangesResponse {
    pub dates: RunDates,
    pub summary: Summary,
    pub etf_details: BTreeMap<String, FundResult>,
}
