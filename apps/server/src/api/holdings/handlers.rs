use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{extract::State, Json};
use etfwatch_core::{latest_two, FundCatalog, FundResult, FundSnapshots, ReconcileError, Summary};

use super::dto::ChangesResponse;
use crate::config::FundFolder;
use crate::error::ApiResult;
use crate::main_lib::AppState;

/// Discover every fund's two most recent snapshots, reconcile them,
/// and roll the priced changes up into one response. A fund whose
/// discovery or reconciliation fails contributes an error entry and
/// never blocks the others.
pub async fn get_holding_changes(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<ChangesResponse>> {
    let mut discovery_errors: BTreeMap<String, FundResult> = BTreeMap::new();
    let mut catalog = FundCatalog::default();

    for fund in &state.funds {
        match discover_fund(&state, fund).await {
            Ok(Some(snapshots)) => catalog.funds.push(snapshots),
            Ok(None) => {
                tracing::warn!("{}: fewer than two dated snapshots in folder", fund.code);
                discovery_errors.insert(
                    fund.code.clone(),
                    FundResult::Error {
                        error: "fewer than two dated snapshot files in folder".to_string(),
                    },
                );
            }
            Err(e) => {
                tracing::error!("snapshot discovery failed for {}: {e}", fund.code);
                discovery_errors.insert(
                    fund.code.clone(),
                    FundResult::Error {
                        error: e.to_string(),
                    },
                );
            }
        }
    }

    let outcome = state.reconcile_service.run_catalog(&catalog).await;

    if let Err(e) = state.store.evict_stale() {
        tracing::warn!("snapshot eviction failed: {e}");
    }

    let summary = Summary::from_changes(
        outcome
            .results
            .values()
            .filter_map(|result| match result {
                FundResult::Report(report) => Some(report.changes.iter()),
                FundResult::Error { .. } => None,
            })
            .flatten(),
    );

    let mut etf_details = outcome.results;
    etf_details.extend(discovery_errors);

    Ok(Json(ChangesResponse {
        dates: outcome.dates,
        summary,
        etf_details,
    }))
}

/// List a fund's folder and materialize its two newest dated files.
/// `Ok(None)` means the folder holds fewer than two dated snapshots.
async fn discover_fund(
    state: &AppState,
    fund: &FundFolder,
) -> Result<Option<FundSnapshots>, ReconcileError> {
    let files = state.drive.list_folder(&fund.folder_url).await?;
    let picked = latest_two(&files);
    let [latest, previous] = picked.as_slice() else {
        return Ok(None);
    };

    tracing::info!(
        "{}: comparing {} against {}",
        fund.code,
        latest.date,
        previous.date
    );
    let new_path = state.store.materialize(&state.drive, latest).await?;
    let old_path = state.store.materialize(&state.drive, previous).await?;

    Ok(Some(FundSnapshots {
        code: fund.code.clone(),
        old_path,
        new_path,
        old_date: previous.date.clone(),
        new_date: latest.date.clone(),
    }))
}
