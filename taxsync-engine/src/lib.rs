//! taxsync-engine library interface
//!
//! Exposes the engine's components and the axum application for integration
//! testing. The HTTP API is the external driver of the batch queue: every
//! request is one discrete unit of work, and all continuation state lives in
//! the database between requests.

pub mod api;
pub mod audit;
pub mod compare;
pub mod config;
pub mod error;
pub mod kv;
pub mod models;
pub mod queue;
pub mod reconcile;
pub mod source;
pub mod store;

pub use crate::config::EngineConfig;
pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;

use crate::audit::AuditLog;
use crate::kv::SqliteKvStore;
use crate::source::RemoteSource;
use crate::store::SqliteStore;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Remote catalog source
    pub remote: Arc<dyn RemoteSource>,
    /// Key-value store holding queue state and fetch caches
    pub kv: Arc<SqliteKvStore>,
    /// Local taxonomy store
    pub store: Arc<SqliteStore>,
    /// Per-item sync audit sink
    pub audit: Arc<dyn AuditLog>,
    /// Engine tunables
    pub config: EngineConfig,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        remote: Arc<dyn RemoteSource>,
        audit: Arc<dyn AuditLog>,
        config: EngineConfig,
    ) -> Self {
        Self {
            kv: Arc::new(SqliteKvStore::new(db.clone())),
            store: Arc::new(SqliteStore::new(db.clone())),
            db,
            remote,
            audit,
            config,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};

    Router::new()
        .route("/health", get(api::health::health))
        .route("/compare", get(api::compare::run_compare))
        .route("/compare/view", get(api::compare::render_compare))
        .route("/sync/apply", post(api::sync::apply))
        .route("/queue/initialize", post(api::queue::initialize))
        .route("/queue/tick", post(api::queue::tick))
        .route("/queue/status", get(api::queue::status))
        .route("/queue/cancel", post(api::queue::cancel))
        .route("/cache/invalidate", post(api::cache::invalidate))
        .with_state(state)
}
