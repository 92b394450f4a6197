//! Settings database operations
//!
//! Get/set accessors for the settings table following the key-value pattern.

use crate::{Error, Result};
use sqlx::SqlitePool;

/// Generic setting getter
pub async fn get_setting<T>(db: &SqlitePool, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let row: Option<(String,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(db)
        .await
        .map_err(Error::Database)?;

    match row {
        Some((value,)) => {
            let parsed = value
                .parse::<T>()
                .map_err(|e| Error::Config(format!("Parse setting '{}' failed: {}", key, e)))?;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}

/// Generic setting getter with a fallback default
pub async fn get_setting_or<T>(db: &SqlitePool, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    Ok(get_setting(db, key).await?.unwrap_or(default))
}

/// Generic setting setter (UPSERT)
pub async fn set_setting<T>(db: &SqlitePool, key: &str, value: T) -> Result<()>
where
    T: std::fmt::Display,
{
    sqlx::query(
        "INSERT INTO settings (key, value) VALUES (?, ?)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
    )
    .bind(key)
    .bind(value.to_string())
    .execute(db)
    .await
    .map_err(Error::Database)?;

    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    async fn setup_test_db() -> SqlitePool {
        let pool = SqlitePool::connect(":memory:").await.unwrap();
        crate::db::create_schema(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn test_get_setting_not_exists() {
        let pool = setup_test_db().await;

        let result: Option<String> = get_setting(&pool, "no_such_key").await.unwrap();

        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn test_set_and_get_roundtrip() {
        let pool = setup_test_db().await;

        set_setting(&pool, "sync_batch_size", 50usize).await.unwrap();

        let result: Option<usize> = get_setting(&pool, "sync_batch_size").await.unwrap();
        assert_eq!(result, Some(50));
    }

    #[tokio::test]
    async fn test_set_setting_upsert() {
        let pool = setup_test_db().await;

        set_setting(&pool, "remote_base_url", "https://old.example").await.unwrap();
        set_setting(&pool, "remote_base_url", "https://new.example").await.unwrap();

        let result: Option<String> = get_setting(&pool, "remote_base_url").await.unwrap();
        assert_eq!(result, Some("https://new.example".to_string()));

        // Verify no duplicate entries
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM settings WHERE key = 'remote_base_url'")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_get_setting_or_default() {
        let pool = setup_test_db().await;

        let value: usize = get_setting_or(&pool, "missing_key", 7).await.unwrap();
        assert_eq!(value, 7);
    }
}
