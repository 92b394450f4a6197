//! Database initialization
//!
//! Opens (or creates) the service database, applies connection pragmas, and
//! creates the schema idempotently so every startup path is safe on both a
//! fresh and an existing database.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // Enable foreign keys
    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

    // WAL allows concurrent readers while a tick holds the writer
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;

    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    create_schema(&pool).await?;
    init_default_settings(&pool).await?;

    Ok(pool)
}

/// Create all tables (idempotent - safe to call multiple times)
///
/// Public so tests can build the schema on an in-memory pool.
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_schema_version_table(pool).await?;
    create_settings_table(pool).await?;
    create_attributes_table(pool).await?;
    create_attribute_terms_table(pool).await?;
    create_term_meta_table(pool).await?;
    create_kv_entries_table(pool).await?;
    Ok(())
}

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("INSERT OR IGNORE INTO schema_version (version) VALUES (1)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the settings table
///
/// Stores application configuration key-value pairs.
async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Local attribute taxonomy. `slug` is the identity key matched against the
/// sanitized source attribute name.
async fn create_attributes_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS attributes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            slug TEXT NOT NULL UNIQUE,
            kind TEXT NOT NULL DEFAULT 'select',
            order_by TEXT NOT NULL DEFAULT 'menu_order',
            has_archives INTEGER NOT NULL DEFAULT 0,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Terms are namespaced by `taxonomy` (the owning attribute's slug); a slug is
/// unique within its taxonomy, not globally.
async fn create_attribute_terms_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS attribute_terms (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            taxonomy TEXT NOT NULL,
            name TEXT NOT NULL,
            slug TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            UNIQUE (taxonomy, slug)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_attribute_terms_taxonomy ON attribute_terms (taxonomy)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_term_meta_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS term_meta (
            term_id INTEGER NOT NULL,
            key TEXT NOT NULL,
            value TEXT NOT NULL DEFAULT '',
            PRIMARY KEY (term_id, key),
            FOREIGN KEY (term_id) REFERENCES attribute_terms (id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Key-value entries with optional expiry. Holds queue continuation state and
/// the fetch caches; expired rows read as absent.
async fn create_kv_entries_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS kv_entries (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            expires_at TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Initialize or update default settings
///
/// Ensures all required settings exist with default values. NULL values are
/// reset to defaults.
async fn init_default_settings(pool: &SqlitePool) -> Result<()> {
    // Remote source settings
    ensure_setting(pool, "remote_base_url", "").await?;
    ensure_setting(pool, "remote_token", "").await?;
    ensure_setting(pool, "remote_timeout_secs", "30").await?;
    ensure_setting(pool, "remote_rate_limit_per_sec", "2").await?;

    // Sync engine settings
    ensure_setting(pool, "sync_batch_size", "20").await?;
    ensure_setting(pool, "fetch_chunk_size", "10").await?;

    // HTTP server settings
    ensure_setting(pool, "http_port", "5746").await?;

    Ok(())
}

async fn ensure_setting(pool: &SqlitePool, key: &str, default: &str) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO settings (key, value) VALUES (?, ?)")
        .bind(key)
        .bind(default)
        .execute(pool)
        .await?;

    sqlx::query("UPDATE settings SET value = ? WHERE key = ? AND value IS NULL")
        .bind(default)
        .bind(key)
        .execute(pool)
        .await?;

    Ok(())
}
