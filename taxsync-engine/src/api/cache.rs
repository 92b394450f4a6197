//! Cache invalidation API handler

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::error::ApiResult;
use crate::source::SnapshotFetcher;
use crate::AppState;

/// POST /cache/invalidate
///
/// Deletes the long-lived snapshot, every per-attribute term entry, and any
/// partial fetch checkpoint. The next fetch starts from zero.
pub async fn invalidate(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let fetcher = SnapshotFetcher::new(
        state.remote.as_ref(),
        state.kv.as_ref(),
        state.config.chunk_size,
    );

    fetcher.invalidate().await?;

    Ok(Json(json!({ "invalidated": true })))
}
