//! taxsync-engine - Catalog Taxonomy Sync Service
//!
//! Reconciles attribute/term taxonomies between a remote catalog source and
//! the local store. The HTTP API is polled by an operator UI: comparison,
//! selective apply, and a tick-driven batch queue for bulk operations.

use anyhow::Result;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use taxsync_engine::audit::TracingAuditLog;
use taxsync_engine::config::{load_remote_config, EngineConfig};
use taxsync_engine::source::HttpRemoteSource;
use taxsync_engine::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting taxsync-engine (Catalog Taxonomy Sync)");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    // Resolve root folder and open the database
    let cli_root = std::env::args().nth(1);
    let root = taxsync_common::config::resolve_root_folder(cli_root.as_deref(), "TAXSYNC_ROOT");
    let db_path = taxsync_common::config::prepare_root_folder(&root)
        .map_err(|e| anyhow::anyhow!("Failed to initialize root folder: {}", e))?;
    info!("Database: {}", db_path.display());

    let db_pool = taxsync_common::db::init_database(&db_path).await?;
    info!("Database connection established");

    // Engine and remote configuration (settings table, env overrides)
    let config = EngineConfig::load(&db_pool).await?;
    let remote_config = load_remote_config(&db_pool).await?;
    if remote_config.base_url.is_empty() {
        tracing::warn!(
            "remote_base_url is not configured; comparison and sync requests will fail until it is set"
        );
    }

    let remote = Arc::new(HttpRemoteSource::new(remote_config)?);
    let audit = Arc::new(TracingAuditLog);

    let port = config.http_port;
    let state = AppState::new(db_pool, remote, audit, config);

    let app = taxsync_engine::build_router(state).layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;
    info!("Listening on http://127.0.0.1:{}", port);
    info!("Health check: http://127.0.0.1:{}/health", port);

    axum::serve(listener, app).await?;

    Ok(())
}
