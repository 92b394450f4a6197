//! Remote attribute source
//!
//! The engine consumes the remote catalog through this trait. Failures are
//! classified at the boundary: `Error::Network` (unreachable/timeout),
//! `Error::Auth` (rejected credentials), `Error::Parse` (malformed response).
//! A fetch failure always aborts before the comparator sees any data.

use async_trait::async_trait;
use taxsync_common::Result;

use crate::models::{AttributeRecord, TermRecord};

pub mod fetcher;
pub mod http;

pub use fetcher::SnapshotFetcher;
pub use http::HttpRemoteSource;

/// Read-only view of the remote taxonomy
#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// Fetch all attributes.
    async fn fetch_attributes(&self) -> Result<Vec<AttributeRecord>>;

    /// Fetch the terms of one attribute.
    async fn fetch_terms(&self, attribute_id: i64) -> Result<Vec<TermRecord>>;
}
