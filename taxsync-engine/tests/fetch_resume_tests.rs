//! Snapshot fetcher integration tests
//!
//! An interrupted two-phase fetch must persist its partial progress and
//! resume from the cursor, fetching only what remains; the merged result must
//! match a from-scratch fetch, and completion must leave exactly one valid
//! cache entry.

mod helpers;

use helpers::{attribute, setup_pool, term, FakeRemoteSource};
use taxsync_engine::kv::{keys, KeyValueStore, SqliteKvStore};
use taxsync_engine::models::AttributeRecord;
use taxsync_engine::source::SnapshotFetcher;

fn five_attributes() -> Vec<AttributeRecord> {
    (1..=5)
        .map(|n| attribute(n, &format!("Attr {}", n), &format!("attr-{}", n)))
        .collect()
}

fn terms_for(attributes: &[AttributeRecord]) -> Vec<(i64, Vec<taxsync_engine::models::TermRecord>)> {
    attributes
        .iter()
        .map(|a| {
            (
                a.id,
                vec![term(a.id * 100, a.id, &format!("Term {}", a.id), &format!("term-{}", a.id))],
            )
        })
        .collect()
}

#[tokio::test]
async fn test_full_fetch_promotes_snapshot_and_drops_partial() {
    let pool = setup_pool().await;
    let kv = SqliteKvStore::new(pool);
    let attributes = five_attributes();
    let source = FakeRemoteSource::new(attributes.clone(), terms_for(&attributes));
    let fetcher = SnapshotFetcher::new(&source, &kv, 2);

    let snapshot = fetcher.fetch_snapshot().await.unwrap();

    assert_eq!(snapshot.attributes.len(), 5);
    assert_eq!(snapshot.term_count(), 5);

    // Post-completion: long-lived entry present, partial entry gone
    assert!(kv.get(keys::SNAPSHOT).await.unwrap().is_some());
    assert!(kv.get(keys::SNAPSHOT_PARTIAL).await.unwrap().is_none());
}

#[tokio::test]
async fn test_cached_snapshot_short_circuits_remote() {
    let pool = setup_pool().await;
    let kv = SqliteKvStore::new(pool);
    let attributes = five_attributes();
    let source = FakeRemoteSource::new(attributes.clone(), terms_for(&attributes));
    let fetcher = SnapshotFetcher::new(&source, &kv, 2);

    fetcher.fetch_snapshot().await.unwrap();
    let calls_after_first = source.term_call_count();

    // Second fetch is served from the long-lived cache
    fetcher.fetch_snapshot().await.unwrap();
    assert_eq!(source.term_call_count(), calls_after_first);
}

#[tokio::test]
async fn test_interrupted_fetch_resumes_from_cursor() {
    let pool = setup_pool().await;
    let kv = SqliteKvStore::new(pool);
    let attributes = five_attributes();
    let source = FakeRemoteSource::new(attributes.clone(), terms_for(&attributes));
    let fetcher = SnapshotFetcher::new(&source, &kv, 2);

    // Fail on the 4th term fetch: 3 of 5 attributes complete
    source.fail_terms_after(3);
    let err = fetcher.fetch_snapshot().await.unwrap_err();
    assert!(matches!(err, taxsync_common::Error::Network(_)));

    // Partial progress was persisted before the error surfaced
    let partial_raw = kv.get(keys::SNAPSHOT_PARTIAL).await.unwrap().unwrap();
    let partial: serde_json::Value = serde_json::from_str(&partial_raw).unwrap();
    assert_eq!(partial["cursor"], 3);

    // Resume: only the remaining 2 attributes are fetched
    source.clear_failure();
    let calls_before_resume = source.term_call_count();
    let snapshot = fetcher.fetch_snapshot().await.unwrap();
    assert_eq!(source.term_call_count() - calls_before_resume, 2);

    // Merged result is content-equivalent to a from-scratch fetch
    let fresh_pool = setup_pool().await;
    let fresh_kv = SqliteKvStore::new(fresh_pool);
    let fresh_source = FakeRemoteSource::new(attributes.clone(), terms_for(&attributes));
    let fresh_fetcher = SnapshotFetcher::new(&fresh_source, &fresh_kv, 2);
    let scratch = fresh_fetcher.fetch_snapshot().await.unwrap();

    assert_eq!(
        serde_json::to_value(&snapshot).unwrap(),
        serde_json::to_value(&scratch).unwrap()
    );

    // Only the long-lived entry survives completion
    assert!(kv.get(keys::SNAPSHOT_PARTIAL).await.unwrap().is_none());
    assert!(kv.get(keys::SNAPSHOT).await.unwrap().is_some());
}

#[tokio::test]
async fn test_attribute_phase_failure_persists_nothing() {
    struct DeadSource;

    #[async_trait::async_trait]
    impl taxsync_engine::source::RemoteSource for DeadSource {
        async fn fetch_attributes(
            &self,
        ) -> taxsync_common::Result<Vec<AttributeRecord>> {
            Err(taxsync_common::Error::Network("unreachable".to_string()))
        }

        async fn fetch_terms(
            &self,
            _attribute_id: i64,
        ) -> taxsync_common::Result<Vec<taxsync_engine::models::TermRecord>> {
            unreachable!("terms must not be fetched when the attribute list fails")
        }
    }

    let pool = setup_pool().await;
    let kv = SqliteKvStore::new(pool);
    let fetcher = SnapshotFetcher::new(&DeadSource, &kv, 2);

    assert!(fetcher.fetch_snapshot().await.is_err());

    assert!(kv.get(keys::SNAPSHOT).await.unwrap().is_none());
    assert!(kv.get(keys::SNAPSHOT_PARTIAL).await.unwrap().is_none());
}

#[tokio::test]
async fn test_invalidate_clears_every_cache_entry() {
    let pool = setup_pool().await;
    let kv = SqliteKvStore::new(pool);
    let attributes = five_attributes();
    let source = FakeRemoteSource::new(attributes.clone(), terms_for(&attributes));
    let fetcher = SnapshotFetcher::new(&source, &kv, 2);

    fetcher.fetch_snapshot().await.unwrap();
    assert!(kv.get(keys::SNAPSHOT).await.unwrap().is_some());
    assert!(kv.get(&keys::terms_key(1)).await.unwrap().is_some());

    fetcher.invalidate().await.unwrap();

    assert!(kv.get(keys::SNAPSHOT).await.unwrap().is_none());
    assert!(kv.get(keys::SNAPSHOT_PARTIAL).await.unwrap().is_none());
    for attr in &attributes {
        assert!(kv.get(&keys::terms_key(attr.id)).await.unwrap().is_none());
    }

    // Next fetch starts from zero
    let calls_before = source.term_call_count();
    fetcher.fetch_snapshot().await.unwrap();
    assert_eq!(source.term_call_count() - calls_before, 5);
}
