//! Local attribute store abstraction
//!
//! The reconciler writes through this trait; the production implementation is
//! SQLite-backed. `create_term` returns an explicit `created` flag so callers
//! classify created-vs-updated from the primitive itself, never from
//! incidental state.

use async_trait::async_trait;
use std::collections::BTreeMap;
use taxsync_common::Result;

use crate::models::{AttributeRecord, TermRecord};

pub mod sqlite;

pub use sqlite::SqliteStore;

/// Result of a term create: the id, and whether this call created the row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreatedTerm {
    pub id: i64,
    pub created: bool,
}

/// Local taxonomy storage consumed by the comparator input path and the
/// reconciler write path
#[async_trait]
pub trait LocalStore: Send + Sync {
    /// All local attributes.
    async fn list_attributes(&self) -> Result<Vec<AttributeRecord>>;

    /// One attribute by slug.
    async fn get_attribute(&self, slug: &str) -> Result<Option<AttributeRecord>>;

    /// Create an attribute, returning its id.
    async fn create_attribute(&self, record: &AttributeRecord) -> Result<i64>;

    /// All terms under one taxonomy, with tracked meta attached.
    async fn list_terms(&self, taxonomy: &str) -> Result<Vec<TermRecord>>;

    /// One term by slug, falling back to exact case-insensitive name.
    async fn get_term(&self, slug_or_name: &str, taxonomy: &str) -> Result<Option<TermRecord>>;

    /// Create a term if absent; `created` is false when the slug already
    /// existed in the taxonomy.
    async fn create_term(&self, record: &TermRecord, taxonomy: &str) -> Result<CreatedTerm>;

    /// Update a term's core fields.
    async fn update_term_core(
        &self,
        id: i64,
        name: &str,
        slug: &str,
        description: &str,
    ) -> Result<()>;

    /// Write tracked meta values (last-writer-wins UPSERT per key).
    async fn update_term_meta(&self, id: i64, meta: &BTreeMap<String, String>) -> Result<()>;
}
