//! SQLite-backed key-value store

use async_trait::async_trait;
use chrono::{Duration, Utc};
use sqlx::SqlitePool;
use taxsync_common::Result;

use super::KeyValueStore;

/// Key-value store over the `kv_entries` table
#[derive(Clone)]
pub struct SqliteKvStore {
    pool: SqlitePool,
}

impl SqliteKvStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn write(&self, key: &str, value: &str, expires_at: Option<String>) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO kv_entries (key, value, expires_at, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                expires_at = excluded.expires_at,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(expires_at)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for SqliteKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let row: Option<(String, Option<String>)> =
            sqlx::query_as("SELECT value, expires_at FROM kv_entries WHERE key = ?")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

        let (value, expires_at) = match row {
            Some(row) => row,
            None => return Ok(None),
        };

        if let Some(expires_at) = expires_at {
            let expired = chrono::DateTime::parse_from_rfc3339(&expires_at)
                .map(|e| e.with_timezone(&Utc) <= Utc::now())
                .unwrap_or(true);

            if expired {
                // Lazy expiry: drop the stale row on read
                sqlx::query("DELETE FROM kv_entries WHERE key = ?")
                    .bind(key)
                    .execute(&self.pool)
                    .await?;
                return Ok(None);
            }
        }

        Ok(Some(value))
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.write(key, value, None).await
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let expires_at = (Utc::now() + ttl).to_rfc3339();
        self.write(key, value, Some(expires_at)).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM kv_entries WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<u64> {
        // ESCAPE so a literal '%' or '_' in a prefix cannot widen the match
        let escaped = prefix.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
        let result = sqlx::query("DELETE FROM kv_entries WHERE key LIKE ? ESCAPE '\\'")
            .bind(format!("{}%", escaped))
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::keys;

    async fn setup_store() -> SqliteKvStore {
        let pool = SqlitePool::connect(":memory:").await.unwrap();
        taxsync_common::db::create_schema(&pool).await.unwrap();
        SqliteKvStore::new(pool)
    }

    #[tokio::test]
    async fn test_set_get_roundtrip() {
        let store = setup_store().await;

        store.set("k", "v").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some("v".to_string()));

        store.set("k", "v2").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some("v2".to_string()));
    }

    #[tokio::test]
    async fn test_get_missing() {
        let store = setup_store().await;
        assert_eq!(store.get("absent").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_expired_entry_reads_as_absent() {
        let store = setup_store().await;

        store
            .set_with_ttl("stale", "v", Duration::seconds(-10))
            .await
            .unwrap();

        assert_eq!(store.get("stale").await.unwrap(), None);

        // The lazy delete removed the row entirely
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM kv_entries WHERE key = 'stale'")
            .fetch_one(&store.pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_unexpired_ttl_entry_is_readable() {
        let store = setup_store().await;

        store
            .set_with_ttl("fresh", "v", Duration::hours(1))
            .await
            .unwrap();

        assert_eq!(store.get("fresh").await.unwrap(), Some("v".to_string()));
    }

    #[tokio::test]
    async fn test_delete_prefix() {
        let store = setup_store().await;

        store.set(&keys::terms_key(1), "a").await.unwrap();
        store.set(&keys::terms_key(2), "b").await.unwrap();
        store.set(keys::SNAPSHOT, "c").await.unwrap();

        let removed = store.delete_prefix(keys::TERMS_PREFIX).await.unwrap();
        assert_eq!(removed, 2);

        assert_eq!(store.get(&keys::terms_key(1)).await.unwrap(), None);
        assert_eq!(store.get(keys::SNAPSHOT).await.unwrap(), Some("c".to_string()));
    }
}
