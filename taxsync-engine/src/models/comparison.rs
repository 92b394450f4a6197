//! Comparison result structures
//!
//! The comparator produces a tree of attribute and term diffs; statistics are
//! derived from that tree on demand and are never cached alongside it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::records::{AttributeRecord, TermRecord};

/// Diff status for one attribute or term
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffStatus {
    /// Present on both sides with no tracked differences
    Ok,
    /// Present in source only; applying would create it locally
    New,
    /// Present on both sides with at least one differing field
    Updated,
    /// Present locally but absent from the source
    MissingSource,
}

/// Old/new pair for one differing field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChange {
    pub old: String,
    pub new: String,
}

/// Diff entry for one term
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TermDiff {
    pub source: Option<TermRecord>,
    pub local: Option<TermRecord>,
    pub status: DiffStatus,
    /// Core field differences (name, slug, description)
    #[serde(default)]
    pub changes: BTreeMap<String, FieldChange>,
    /// Tracked meta differences keyed by meta key
    #[serde(default)]
    pub meta_changes: BTreeMap<String, FieldChange>,
}

impl TermDiff {
    /// Display name used for stable ordering.
    pub fn display_name(&self) -> &str {
        self.source
            .as_ref()
            .map(|t| t.name.as_str())
            .or_else(|| self.local.as_ref().map(|t| t.name.as_str()))
            .unwrap_or_default()
    }
}

/// Diff entry for one attribute, including its term diffs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributeDiff {
    pub source: Option<AttributeRecord>,
    pub local: Option<AttributeRecord>,
    pub status: DiffStatus,
    pub terms: Vec<TermDiff>,
}

impl AttributeDiff {
    /// Display name used for stable ordering.
    pub fn display_name(&self) -> &str {
        self.source
            .as_ref()
            .map(|a| a.name.as_str())
            .or_else(|| self.local.as_ref().map(|a| a.name.as_str()))
            .unwrap_or_default()
    }
}

/// Full comparison between a source snapshot and the local store
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub attributes: Vec<AttributeDiff>,
}

/// Aggregate counts, recomputable from the result structure at any time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonStats {
    pub new_attributes: usize,
    pub missing_attributes: usize,
    pub new_terms: usize,
    pub updated_terms: usize,
    pub missing_terms: usize,
    pub total_differences: usize,
}

impl ComparisonResult {
    /// Derive statistics from the diff structure.
    pub fn statistics(&self) -> ComparisonStats {
        let mut stats = ComparisonStats::default();

        for attribute in &self.attributes {
            match attribute.status {
                DiffStatus::New => stats.new_attributes += 1,
                DiffStatus::MissingSource => stats.missing_attributes += 1,
                DiffStatus::Ok | DiffStatus::Updated => {}
            }

            for term in &attribute.terms {
                match term.status {
                    DiffStatus::New => stats.new_terms += 1,
                    DiffStatus::Updated => stats.updated_terms += 1,
                    DiffStatus::MissingSource => stats.missing_terms += 1,
                    DiffStatus::Ok => {}
                }
            }
        }

        stats.total_differences = stats.new_attributes
            + stats.missing_attributes
            + stats.new_terms
            + stats.updated_terms
            + stats.missing_terms;

        stats
    }
}
