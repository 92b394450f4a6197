//! Selective apply API handler

use axum::{extract::State, Json};
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::models::{ProcessingResult, SyncSelection};
use crate::reconcile::Reconciler;
use crate::source::SnapshotFetcher;
use crate::AppState;

/// POST /sync/apply request
#[derive(Debug, Deserialize)]
pub struct ApplyRequest {
    pub selections: Vec<SyncSelection>,
    #[serde(default = "default_sync_metadata")]
    pub sync_metadata: bool,
}

fn default_sync_metadata() -> bool {
    true
}

/// POST /sync/apply
///
/// Applies the selected terms against one fixed snapshot. Per-item failures
/// are aggregated into the result counts; the pass always completes.
pub async fn apply(
    State(state): State<AppState>,
    Json(request): Json<ApplyRequest>,
) -> ApiResult<Json<ProcessingResult>> {
    if request.selections.is_empty() {
        return Err(ApiError::BadRequest("No selections provided".to_string()));
    }

    let fetcher = SnapshotFetcher::new(
        state.remote.as_ref(),
        state.kv.as_ref(),
        state.config.chunk_size,
    );
    let snapshot = fetcher.fetch_snapshot().await?;

    let reconciler = Reconciler::new(state.store.as_ref(), state.audit.as_ref());
    let result = reconciler
        .apply(&request.selections, &snapshot, request.sync_metadata)
        .await;

    tracing::info!(
        created = result.counters.created,
        updated = result.counters.updated,
        skipped = result.counters.skipped,
        errors = result.counters.errors,
        "Apply pass completed"
    );

    Ok(Json(result))
}
