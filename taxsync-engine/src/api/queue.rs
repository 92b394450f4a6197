//! Batch queue API handlers
//!
//! POST /queue/initialize, POST /queue/tick, GET /queue/status,
//! POST /queue/cancel. The caller polls tick until it reports done.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::{QueuePhase, QueueProgress, SyncSelection};
use crate::queue::{SyncQueue, TickOutcome};
use crate::reconcile::Reconciler;
use crate::source::SnapshotFetcher;
use crate::AppState;

/// POST /queue/initialize request
#[derive(Debug, Deserialize)]
pub struct InitializeRequest {
    pub selections: Vec<SyncSelection>,
    #[serde(default = "default_kind")]
    pub kind: String,
    #[serde(default = "default_sync_metadata")]
    pub sync_metadata: bool,
}

fn default_kind() -> String {
    "attribute_term_sync".to_string()
}

fn default_sync_metadata() -> bool {
    true
}

/// POST /queue/initialize response
#[derive(Debug, Serialize)]
pub struct InitializeResponse {
    pub job_id: Uuid,
    pub phase: QueuePhase,
    pub total: usize,
}

/// POST /queue/tick response
#[derive(Debug, Serialize)]
pub struct TickResponse {
    /// True when there is no more work to do
    pub done: bool,
    pub progress: QueueProgress,
}

fn queue_for(state: &AppState) -> SyncQueue<'_> {
    SyncQueue::new(state.kv.as_ref(), state.audit.as_ref(), state.config.batch_size)
}

/// POST /queue/initialize
///
/// Stores the full item list and fixed total. Returns 409 while another bulk
/// operation is still accepting ticks - one active operator per queue.
pub async fn initialize(
    State(state): State<AppState>,
    Json(request): Json<InitializeRequest>,
) -> ApiResult<Json<InitializeResponse>> {
    if request.selections.is_empty() {
        return Err(ApiError::BadRequest("No selections provided".to_string()));
    }

    let queue = queue_for(&state);

    let current = queue.load_status().await?;
    if current.phase.accepts_ticks() {
        return Err(ApiError::Conflict(
            "A bulk operation is already in progress".to_string(),
        ));
    }

    let queue_state = queue
        .initialize(request.selections, &request.kind, request.sync_metadata)
        .await?;

    Ok(Json(InitializeResponse {
        job_id: queue_state.job_id,
        phase: QueuePhase::Initialized,
        total: queue_state.total,
    }))
}

/// POST /queue/tick
///
/// Processes one batch and persists continuation state. Safe to call after
/// completion or cancellation - those ticks are no-ops reporting done.
pub async fn tick(State(state): State<AppState>) -> ApiResult<Json<TickResponse>> {
    let queue = queue_for(&state);

    // Skip the (potentially remote) snapshot fetch when no work is possible
    let current = queue.load_status().await?;
    if !current.phase.accepts_ticks() {
        return Ok(Json(TickResponse {
            done: true,
            progress: queue.progress().await?,
        }));
    }

    let fetcher = SnapshotFetcher::new(
        state.remote.as_ref(),
        state.kv.as_ref(),
        state.config.chunk_size,
    );
    let snapshot = fetcher.fetch_snapshot().await?;

    let reconciler = Reconciler::new(state.store.as_ref(), state.audit.as_ref());
    let outcome = queue.tick(&reconciler, &snapshot).await?;

    Ok(Json(TickResponse {
        done: matches!(outcome, TickOutcome::Drained),
        progress: queue.progress().await?,
    }))
}

/// GET /queue/status
pub async fn status(State(state): State<AppState>) -> ApiResult<Json<QueueProgress>> {
    let queue = queue_for(&state);
    Ok(Json(queue.progress().await?))
}

/// POST /queue/cancel
///
/// Irreversible: clears working state; later ticks are no-ops.
pub async fn cancel(State(state): State<AppState>) -> ApiResult<Json<QueueProgress>> {
    let queue = queue_for(&state);

    let current = queue.load_status().await?;
    if current.phase == QueuePhase::Idle {
        return Err(ApiError::NotFound(
            "No bulk operation to cancel".to_string(),
        ));
    }

    queue.cancel().await?;

    Ok(Json(queue.progress().await?))
}
