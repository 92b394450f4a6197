//! Attribute and term records
//!
//! Records are built at the fetch boundary (remote) or the store boundary
//! (local) and are never mutated in place afterwards - a refresh replaces the
//! whole snapshot.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use taxsync_common::sanitize_slug;

/// Term meta keys the engine tracks. Meta outside this closed set is ignored
/// on both fetch and sync.
pub const TRACKED_META_KEYS: [&str; 3] = ["swatch_image", "suffix", "price_adjustment"];

/// One attribute taxonomy (e.g. Color)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeRecord {
    pub id: i64,
    pub name: String,
    pub slug: String,
    /// Attribute input kind (select, text, ...)
    pub kind: String,
    /// Term ordering rule advertised by the attribute
    pub order_by: String,
    pub has_archives: bool,
}

impl AttributeRecord {
    /// The identity key: sanitized slug derived from the display name.
    pub fn identity_slug(&self) -> String {
        if self.slug.is_empty() {
            sanitize_slug(&self.name)
        } else {
            sanitize_slug(&self.slug)
        }
    }

    /// The local taxonomy namespace this attribute's terms live under.
    pub fn taxonomy(&self) -> String {
        self.identity_slug()
    }
}

/// One term within an attribute taxonomy (e.g. Red)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermRecord {
    pub id: i64,
    pub attribute_id: i64,
    pub name: String,
    pub slug: String,
    pub description: String,
    /// Tracked meta only; see [`TRACKED_META_KEYS`]
    #[serde(default)]
    pub meta: BTreeMap<String, String>,
}

impl TermRecord {
    /// Keep only tracked meta keys, dropping everything else.
    pub fn retain_tracked_meta(&mut self) {
        self.meta.retain(|key, _| TRACKED_META_KEYS.contains(&key.as_str()));
    }
}

/// One internally-consistent view of the remote source: all attributes plus
/// their terms, taken at a single point in time. A reconciliation pass
/// resolves every selection against one snapshot and never re-fetches
/// mid-pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceSnapshot {
    pub attributes: Vec<AttributeRecord>,
    /// Terms keyed by source attribute id
    pub terms: BTreeMap<i64, Vec<TermRecord>>,
}

impl SourceSnapshot {
    /// Resolve a source attribute by its identity slug.
    pub fn find_attribute(&self, attribute_slug: &str) -> Option<&AttributeRecord> {
        self.attributes
            .iter()
            .find(|a| a.identity_slug() == attribute_slug)
    }

    /// Resolve a term within an attribute: slug first, then exact
    /// case-insensitive name fallback.
    pub fn find_term(
        &self,
        attribute: &AttributeRecord,
        term_slug: &str,
        term_name: Option<&str>,
    ) -> Option<&TermRecord> {
        let terms = self.terms.get(&attribute.id)?;

        if let Some(by_slug) = terms.iter().find(|t| t.slug == term_slug) {
            return Some(by_slug);
        }

        let name = term_name.unwrap_or(term_slug);
        terms.iter().find(|t| t.name.eq_ignore_ascii_case(name))
    }

    /// Total number of terms across all attributes.
    pub fn term_count(&self) -> usize {
        self.terms.values().map(Vec::len).sum()
    }
}
