//! Health check endpoint

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::AppState;

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let uptime_seconds = (chrono::Utc::now() - state.startup_time).num_seconds();

    Json(json!({
        "status": "ok",
        "module": "taxsync-engine",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_seconds": uptime_seconds,
    }))
}
