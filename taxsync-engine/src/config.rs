//! Engine configuration
//!
//! Tunables live in the settings table (seeded with defaults at database
//! init); remote credentials may be overridden by environment variables so
//! deployments can keep tokens out of the database.

use sqlx::SqlitePool;
use taxsync_common::{db::get_setting_or, Result};

use crate::source::http::RemoteConfig;

/// Environment override for the remote base URL
pub const ENV_REMOTE_URL: &str = "TAXSYNC_REMOTE_URL";
/// Environment override for the remote bearer token
pub const ENV_REMOTE_TOKEN: &str = "TAXSYNC_REMOTE_TOKEN";

/// Engine tunables loaded once at startup
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Items per queue tick
    pub batch_size: usize,
    /// Attributes per fetch checkpoint
    pub chunk_size: usize,
    /// HTTP listen port
    pub http_port: u16,
}

impl EngineConfig {
    pub async fn load(db: &SqlitePool) -> Result<Self> {
        Ok(Self {
            batch_size: get_setting_or(db, "sync_batch_size", 20usize).await?.max(1),
            chunk_size: get_setting_or(db, "fetch_chunk_size", 10usize).await?.max(1),
            http_port: get_setting_or(db, "http_port", 5746u16).await?,
        })
    }
}

/// Load remote connection settings, environment overriding the database.
pub async fn load_remote_config(db: &SqlitePool) -> Result<RemoteConfig> {
    let base_url = match std::env::var(ENV_REMOTE_URL) {
        Ok(url) if !url.is_empty() => url,
        _ => get_setting_or(db, "remote_base_url", String::new()).await?,
    };

    let token = match std::env::var(ENV_REMOTE_TOKEN) {
        Ok(token) if !token.is_empty() => token,
        _ => get_setting_or(db, "remote_token", String::new()).await?,
    };

    Ok(RemoteConfig {
        base_url,
        token,
        timeout_secs: get_setting_or(db, "remote_timeout_secs", 30u64).await?,
        rate_limit_per_sec: get_setting_or(db, "remote_rate_limit_per_sec", 2u32).await?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_load_uses_seeded_defaults() {
        let pool = SqlitePool::connect(":memory:").await.unwrap();
        taxsync_common::db::create_schema(&pool).await.unwrap();

        let config = EngineConfig::load(&pool).await.unwrap();

        // Nothing seeded on a bare schema: fall back to compiled defaults
        assert_eq!(config.batch_size, 20);
        assert_eq!(config.chunk_size, 10);
    }

    #[tokio::test]
    async fn test_load_reads_settings() {
        let pool = SqlitePool::connect(":memory:").await.unwrap();
        taxsync_common::db::create_schema(&pool).await.unwrap();
        taxsync_common::db::set_setting(&pool, "sync_batch_size", 5usize)
            .await
            .unwrap();

        let config = EngineConfig::load(&pool).await.unwrap();
        assert_eq!(config.batch_size, 5);
    }
}
