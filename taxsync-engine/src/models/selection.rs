//! Sync selections and processing results

use serde::{Deserialize, Serialize};

/// Identifies one term a caller wants applied to the local store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSelection {
    #[serde(default)]
    pub attribute_slug: String,
    #[serde(default)]
    pub term_slug: String,
    /// Optional display name aiding the case-insensitive name fallback
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub term_name: Option<String>,
}

impl SyncSelection {
    /// A selection is processable only when both identifiers are present.
    pub fn is_valid(&self) -> bool {
        !self.attribute_slug.is_empty() && !self.term_slug.is_empty()
    }
}

/// Outcome classification for one processed selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessedOutcome {
    Created,
    Updated,
    Skipped,
    Failed,
}

/// One processed selection with its outcome and a human-readable detail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedItem {
    pub attribute_slug: String,
    pub term_slug: String,
    pub outcome: ProcessedOutcome,
    pub detail: String,
}

/// Created/updated/skipped/error counters shared by apply passes and the
/// batch queue aggregate
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncCounters {
    pub created: u32,
    pub updated: u32,
    pub skipped: u32,
    pub errors: u32,
}

impl SyncCounters {
    /// Record one outcome.
    pub fn record(&mut self, outcome: ProcessedOutcome) {
        match outcome {
            ProcessedOutcome::Created => self.created += 1,
            ProcessedOutcome::Updated => self.updated += 1,
            ProcessedOutcome::Skipped => self.skipped += 1,
            ProcessedOutcome::Failed => self.errors += 1,
        }
    }

    /// Fold another pass's counters into this one.
    pub fn absorb(&mut self, other: &SyncCounters) {
        self.created += other.created;
        self.updated += other.updated;
        self.skipped += other.skipped;
        self.errors += other.errors;
    }

    pub fn total(&self) -> u32 {
        self.created + self.updated + self.skipped + self.errors
    }
}

/// Summary of one reconciliation pass. A bulk apply always completes and
/// reports these counts, even when individual items fail.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessingResult {
    #[serde(flatten)]
    pub counters: SyncCounters,
    pub processed: Vec<ProcessedItem>,
}

impl ProcessingResult {
    /// Record one processed item, updating counters and the item list.
    pub fn push(&mut self, item: ProcessedItem) {
        self.counters.record(item.outcome);
        self.processed.push(item);
    }
}
