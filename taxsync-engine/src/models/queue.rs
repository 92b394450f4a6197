//! Batch queue state machine
//!
//! Queue state lives in the key-value store between ticks; nothing here holds
//! continuation state in memory across requests. Phases progress
//! Idle -> Initialized -> Processing -> {Completed | Cancelled}.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::selection::{SyncCounters, SyncSelection};

/// Queue lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueuePhase {
    /// No queue has been initialized
    Idle,
    /// Items stored, no tick processed yet
    Initialized,
    /// At least one tick processed, more work remains
    Processing,
    /// All batches processed, aggregate results persisted
    Completed,
    /// Cancelled by the operator; a new initialize is required
    Cancelled,
}

impl QueuePhase {
    /// Terminal phases accept no further ticks.
    pub fn is_terminal(&self) -> bool {
        matches!(self, QueuePhase::Completed | QueuePhase::Cancelled)
    }

    /// Whether a tick may perform work in this phase.
    pub fn accepts_ticks(&self) -> bool {
        matches!(self, QueuePhase::Initialized | QueuePhase::Processing)
    }
}

/// Persisted working state of one bulk operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueState {
    /// Identifies one initialize..terminal run in audit records
    pub job_id: Uuid,
    /// Remaining + processed item list; cleared when the queue finalizes
    pub items: Vec<SyncSelection>,
    /// Fixed at initialize for the life of the queue instance
    pub total: usize,
    /// Monotonic, never exceeds total
    pub processed: usize,
    /// Index of the next batch to process
    pub current_batch: usize,
    /// Operation kind label (e.g. "attribute_term_sync")
    #[serde(rename = "type")]
    pub kind: String,
    /// Whether ticks write tracked meta
    pub sync_metadata: bool,
    /// Aggregate counters across all processed batches
    pub results: SyncCounters,
}

impl QueueState {
    pub fn new(items: Vec<SyncSelection>, kind: String, sync_metadata: bool) -> Self {
        let total = items.len();
        Self {
            job_id: Uuid::new_v4(),
            items,
            total,
            processed: 0,
            current_batch: 0,
            kind,
            sync_metadata,
            results: SyncCounters::default(),
        }
    }

    /// The slice of items for the next tick, empty when the queue is drained.
    pub fn next_batch(&self, batch_size: usize) -> &[SyncSelection] {
        let start = self.current_batch.saturating_mul(batch_size);
        if start >= self.items.len() {
            return &[];
        }
        let end = (start + batch_size).min(self.items.len());
        &self.items[start..end]
    }

    /// Percentage complete, floored; 0 when the queue is empty.
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        ((self.processed * 100) / self.total).min(100) as u8
    }
}

/// Persisted queue status, written alongside the state on every transition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueStatus {
    pub phase: QueuePhase,
    pub message: String,
    pub last_updated: DateTime<Utc>,
}

impl QueueStatus {
    pub fn new(phase: QueuePhase, message: impl Into<String>) -> Self {
        Self {
            phase,
            message: message.into(),
            last_updated: Utc::now(),
        }
    }

    /// The status reported when no queue state exists at all.
    pub fn idle() -> Self {
        Self::new(QueuePhase::Idle, "No bulk operation in progress")
    }
}

/// Progress view combining status and state for the polling driver
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueProgress {
    pub phase: QueuePhase,
    pub message: String,
    pub processed: usize,
    pub total: usize,
    pub percent: u8,
    pub results: SyncCounters,
    pub last_updated: DateTime<Utc>,
}
