//! Snapshot fetcher with partial-progress caching
//!
//! Fetching the full remote taxonomy is a two-phase, many-request operation:
//! all attributes first, then terms per attribute. The fetcher checkpoints
//! its progress through the key-value store so an interrupted fetch resumes
//! from its cursor instead of restarting, and promotes the finished snapshot
//! to a long-lived cache entry.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use taxsync_common::{Error, Result};
use tracing::{info, warn};

use super::RemoteSource;
use crate::kv::{keys, ttl, KeyValueStore};
use crate::models::{AttributeRecord, SourceSnapshot, TermRecord};

/// Resumable checkpoint of an in-progress fetch
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct PartialFetch {
    attributes: Vec<AttributeRecord>,
    terms: BTreeMap<i64, Vec<TermRecord>>,
    /// Number of attributes whose terms are fully fetched
    cursor: usize,
}

/// Two-phase snapshot fetcher over a remote source and a key-value cache
pub struct SnapshotFetcher<'a> {
    source: &'a dyn RemoteSource,
    kv: &'a dyn KeyValueStore,
    /// Attributes per checkpoint
    chunk_size: usize,
}

impl<'a> SnapshotFetcher<'a> {
    pub fn new(source: &'a dyn RemoteSource, kv: &'a dyn KeyValueStore, chunk_size: usize) -> Self {
        Self {
            source,
            kv,
            chunk_size: chunk_size.max(1),
        }
    }

    /// Return the current snapshot, preferring the long-lived cache, then an
    /// in-progress partial fetch, then the remote source.
    pub async fn fetch_snapshot(&self) -> Result<SourceSnapshot> {
        if let Some(raw) = self.kv.get(keys::SNAPSHOT).await? {
            match serde_json::from_str::<SourceSnapshot>(&raw) {
                Ok(snapshot) => return Ok(snapshot),
                Err(e) => {
                    // Corrupt cache entry: drop it and refetch
                    warn!(error = %e, "Discarding unreadable snapshot cache entry");
                    self.kv.delete(keys::SNAPSHOT).await?;
                }
            }
        }

        let mut partial = self.load_partial().await?;

        if partial.attributes.is_empty() {
            // Phase 1: attribute list. A failure here aborts with nothing
            // persisted - there is no progress worth keeping yet.
            partial.attributes = self.source.fetch_attributes().await?;
            partial.cursor = 0;
        } else {
            info!(
                cursor = partial.cursor,
                total = partial.attributes.len(),
                "Resuming interrupted taxonomy fetch"
            );
        }

        // Phase 2: terms per attribute, checkpointed every chunk
        let total = partial.attributes.len();
        let mut since_checkpoint = 0usize;

        while partial.cursor < total {
            let attribute = partial.attributes[partial.cursor].clone();

            let terms = match self.source.fetch_terms(attribute.id).await {
                Ok(terms) => terms,
                Err(e) => {
                    // Persist whatever progress exists before surfacing the
                    // error so a retry resumes rather than restarts
                    self.save_partial(&partial).await?;
                    return Err(e);
                }
            };

            self.kv
                .set_with_ttl(
                    &keys::terms_key(attribute.id),
                    &serde_json::to_string(&terms).map_err(serialize_err)?,
                    ttl::generic(),
                )
                .await?;

            partial.terms.insert(attribute.id, terms);
            partial.cursor += 1;
            since_checkpoint += 1;

            if since_checkpoint >= self.chunk_size && partial.cursor < total {
                self.save_partial(&partial).await?;
                since_checkpoint = 0;
            }
        }

        let snapshot = SourceSnapshot {
            attributes: partial.attributes,
            terms: partial.terms,
        };

        // Promote to the long-lived entry and drop the partial checkpoint;
        // the two must never both be valid after completion
        self.kv
            .set_with_ttl(
                keys::SNAPSHOT,
                &serde_json::to_string(&snapshot).map_err(serialize_err)?,
                ttl::snapshot(),
            )
            .await?;
        self.kv.delete(keys::SNAPSHOT_PARTIAL).await?;

        info!(
            attributes = snapshot.attributes.len(),
            terms = snapshot.term_count(),
            "Taxonomy snapshot fetched and cached"
        );

        Ok(snapshot)
    }

    /// Delete the long-lived snapshot, every per-attribute term entry, and
    /// the partial checkpoint, forcing the next fetch to start from zero.
    pub async fn invalidate(&self) -> Result<()> {
        self.kv.delete(keys::SNAPSHOT).await?;
        self.kv.delete(keys::SNAPSHOT_PARTIAL).await?;
        let removed = self.kv.delete_prefix(keys::TERMS_PREFIX).await?;

        info!(term_entries = removed, "Taxonomy caches invalidated");

        Ok(())
    }

    async fn load_partial(&self) -> Result<PartialFetch> {
        let raw = match self.kv.get(keys::SNAPSHOT_PARTIAL).await? {
            Some(raw) => raw,
            None => return Ok(PartialFetch::default()),
        };

        match serde_json::from_str(&raw) {
            Ok(partial) => Ok(partial),
            Err(e) => {
                warn!(error = %e, "Discarding unreadable partial fetch entry");
                self.kv.delete(keys::SNAPSHOT_PARTIAL).await?;
                Ok(PartialFetch::default())
            }
        }
    }

    async fn save_partial(&self, partial: &PartialFetch) -> Result<()> {
        self.kv
            .set_with_ttl(
                keys::SNAPSHOT_PARTIAL,
                &serde_json::to_string(partial).map_err(serialize_err)?,
                ttl::partial(),
            )
            .await
    }
}

fn serialize_err(e: serde_json::Error) -> Error {
    Error::Internal(format!("Serialize cache entry: {}", e))
}
