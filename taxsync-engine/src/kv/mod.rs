//! Key-value store abstraction
//!
//! The batch queue and the fetch cache externalize all continuation state
//! through this trait - there is no implicit global storage. Entries may carry
//! an expiry; an expired entry reads as absent.
//!
//! There is deliberately no concurrency control on these keys. The engine
//! assumes a single active operator per key, enforced by the caller (e.g. the
//! UI disabling its trigger), and concurrent writers resolve last-write-wins.

use async_trait::async_trait;
use chrono::Duration;
use taxsync_common::Result;

pub mod sqlite;

pub use sqlite::SqliteKvStore;

/// Fixed key layout for persisted engine state
pub mod keys {
    /// Serialized [`crate::models::QueueState`]
    pub const QUEUE_STATE: &str = "taxsync.queue.state";
    /// Serialized [`crate::models::QueueStatus`]
    pub const QUEUE_STATUS: &str = "taxsync.queue.status";
    /// Complete attribute+term snapshot (long-lived)
    pub const SNAPSHOT: &str = "taxsync.cache.snapshot";
    /// Resumable checkpoint of an in-progress fetch
    pub const SNAPSHOT_PARTIAL: &str = "taxsync.cache.snapshot_partial";
    /// Per-attribute term cache, suffixed with the source attribute id
    pub const TERMS_PREFIX: &str = "taxsync.cache.terms.";

    pub fn terms_key(attribute_id: i64) -> String {
        format!("{}{}", TERMS_PREFIX, attribute_id)
    }
}

/// Entry TTLs
pub mod ttl {
    use chrono::Duration;

    /// Generic cached data (per-attribute term lists)
    pub fn generic() -> Duration {
        Duration::hours(1)
    }

    /// Complete attribute+term snapshot
    pub fn snapshot() -> Duration {
        Duration::hours(24)
    }

    /// Partial fetch progress
    pub fn partial() -> Duration {
        Duration::hours(2)
    }
}

/// Injected storage for queue state and cache entries
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a value; expired entries return `None`.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value without expiry.
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Write a value that expires after `ttl`.
    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    /// Delete one key (no-op when absent).
    async fn delete(&self, key: &str) -> Result<()>;

    /// Delete every key starting with `prefix`, returning the count removed.
    async fn delete_prefix(&self, prefix: &str) -> Result<u64>;
}
