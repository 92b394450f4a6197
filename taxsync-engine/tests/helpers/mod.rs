//! Shared test fixtures
#![allow(dead_code)]

use async_trait::async_trait;
use sqlx::SqlitePool;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use taxsync_common::{Error, Result};
use taxsync_engine::models::{AttributeRecord, SourceSnapshot, TermRecord};
use taxsync_engine::source::RemoteSource;

/// In-memory database with the full schema
pub async fn setup_pool() -> SqlitePool {
    let pool = SqlitePool::connect(":memory:").await.unwrap();
    taxsync_common::db::create_schema(&pool).await.unwrap();
    pool
}

pub fn attribute(id: i64, name: &str, slug: &str) -> AttributeRecord {
    AttributeRecord {
        id,
        name: name.to_string(),
        slug: slug.to_string(),
        kind: "select".to_string(),
        order_by: "menu_order".to_string(),
        has_archives: false,
    }
}

pub fn term(id: i64, attribute_id: i64, name: &str, slug: &str) -> TermRecord {
    TermRecord {
        id,
        attribute_id,
        name: name.to_string(),
        slug: slug.to_string(),
        description: String::new(),
        meta: BTreeMap::new(),
    }
}

pub fn term_with_meta(
    id: i64,
    attribute_id: i64,
    name: &str,
    slug: &str,
    meta: &[(&str, &str)],
) -> TermRecord {
    let mut t = term(id, attribute_id, name, slug);
    for (k, v) in meta {
        t.meta.insert(k.to_string(), v.to_string());
    }
    t
}

/// Snapshot built directly from fixture data
pub fn snapshot(
    attributes: Vec<AttributeRecord>,
    terms: Vec<(i64, Vec<TermRecord>)>,
) -> SourceSnapshot {
    SourceSnapshot {
        attributes,
        terms: terms.into_iter().collect(),
    }
}

/// Scripted remote source for fetch tests. Counts `fetch_terms` calls and can
/// be told to fail once a call budget is exhausted.
pub struct FakeRemoteSource {
    pub attributes: Vec<AttributeRecord>,
    pub terms: BTreeMap<i64, Vec<TermRecord>>,
    term_calls: AtomicUsize,
    /// Fail every `fetch_terms` call after this many successes
    fail_after: Mutex<Option<usize>>,
}

impl FakeRemoteSource {
    pub fn new(attributes: Vec<AttributeRecord>, terms: Vec<(i64, Vec<TermRecord>)>) -> Self {
        Self {
            attributes,
            terms: terms.into_iter().collect(),
            term_calls: AtomicUsize::new(0),
            fail_after: Mutex::new(None),
        }
    }

    pub fn fail_terms_after(&self, successes: usize) {
        *self.fail_after.lock().unwrap() = Some(successes);
    }

    pub fn clear_failure(&self) {
        *self.fail_after.lock().unwrap() = None;
    }

    pub fn term_call_count(&self) -> usize {
        self.term_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteSource for FakeRemoteSource {
    async fn fetch_attributes(&self) -> Result<Vec<AttributeRecord>> {
        Ok(self.attributes.clone())
    }

    async fn fetch_terms(&self, attribute_id: i64) -> Result<Vec<TermRecord>> {
        let calls_before = self.term_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(limit) = *self.fail_after.lock().unwrap() {
            if calls_before >= limit {
                return Err(Error::Network("Injected fetch failure".to_string()));
            }
        }

        Ok(self.terms.get(&attribute_id).cloned().unwrap_or_default())
    }
}
