//! Resumable batch queue
//!
//! Wraps the reconciler in a tick-driven state machine for long-running bulk
//! operations. All continuation state is persisted through the injected
//! [`KeyValueStore`] between ticks, so any external driver (here: the HTTP
//! API polled by an operator) can advance the queue one bounded unit of work
//! at a time. Cancellation is cooperative and observed between ticks only.

use serde_json::json;
use taxsync_common::{Error, Result};

use crate::audit::{AuditLog, AuditStatus};
use crate::kv::{keys, KeyValueStore};
use crate::models::{
    QueuePhase, QueueProgress, QueueState, QueueStatus, SourceSnapshot, SyncCounters,
    SyncSelection,
};
use crate::reconcile::Reconciler;

/// Outcome of one tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// One batch was processed; more ticks may follow
    Processed {
        batch: usize,
        batch_counters: SyncCounters,
        processed: usize,
        total: usize,
    },
    /// No more work: the queue finalized on this tick, or was already in a
    /// terminal (or idle) phase
    Drained,
}

/// Tick-driven queue over persisted state
pub struct SyncQueue<'a> {
    kv: &'a dyn KeyValueStore,
    audit: &'a dyn AuditLog,
    batch_size: usize,
}

impl<'a> SyncQueue<'a> {
    pub fn new(kv: &'a dyn KeyValueStore, audit: &'a dyn AuditLog, batch_size: usize) -> Self {
        Self {
            kv,
            audit,
            batch_size: batch_size.max(1),
        }
    }

    /// Store the full item list and zeroed counters; the total is fixed for
    /// the life of this queue instance.
    pub async fn initialize(&self, items: Vec<SyncSelection>, kind: &str, sync_metadata: bool) -> Result<QueueState> {
        let state = QueueState::new(items, kind.to_string(), sync_metadata);

        self.save_state(&state).await?;
        self.save_status(&QueueStatus::new(
            QueuePhase::Initialized,
            format!("Queued {} items", state.total),
        ))
        .await?;

        self.audit.record(
            "queue_initialized",
            AuditStatus::Success,
            &format!("Queued {} items for {}", state.total, state.kind),
            &json!({ "job_id": state.job_id, "total": state.total }),
        );

        Ok(state)
    }

    /// Process the next batch. Returns [`TickOutcome::Drained`] when there is
    /// no more work - either because the queue just finalized or because it
    /// is idle/terminal.
    pub async fn tick(
        &self,
        reconciler: &Reconciler<'_>,
        snapshot: &SourceSnapshot,
    ) -> Result<TickOutcome> {
        let status = self.load_status().await?;
        if !status.phase.accepts_ticks() {
            return Ok(TickOutcome::Drained);
        }

        let mut state = self
            .load_state()
            .await?
            .ok_or_else(|| Error::Internal("Queue status present but state missing".to_string()))?;

        let batch: Vec<SyncSelection> = state.next_batch(self.batch_size).to_vec();

        if batch.is_empty() {
            return self.finalize(state).await;
        }

        let pass = reconciler.apply(&batch, snapshot, state.sync_metadata).await;

        state.results.absorb(&pass.counters);
        state.processed = (state.processed + batch.len()).min(state.total);
        state.current_batch += 1;

        let outcome = TickOutcome::Processed {
            batch: state.current_batch - 1,
            batch_counters: pass.counters,
            processed: state.processed,
            total: state.total,
        };

        if state.next_batch(self.batch_size).is_empty() {
            // That batch drained the queue: finalize within the same tick
            self.finalize(state).await?;
            return Ok(outcome);
        }

        self.save_state(&state).await?;
        self.save_status(&QueueStatus::new(
            QueuePhase::Processing,
            format!("Processed {} of {} items", state.processed, state.total),
        ))
        .await?;

        Ok(outcome)
    }

    /// Progress view for the polling driver.
    pub async fn progress(&self) -> Result<QueueProgress> {
        let status = self.load_status().await?;
        let state = self.load_state().await?;

        let (processed, total, percent, results) = match &state {
            Some(state) => (
                state.processed,
                state.total,
                state.percent(),
                state.results,
            ),
            None => (0, 0, 0, SyncCounters::default()),
        };

        Ok(QueueProgress {
            phase: status.phase,
            message: status.message,
            processed,
            total,
            percent,
            results,
            last_updated: status.last_updated,
        })
    }

    /// Cancel the queue: clears working item storage and transitions to the
    /// terminal Cancelled phase. Irreversible - a new initialize is required.
    pub async fn cancel(&self) -> Result<QueueStatus> {
        let state = self.load_state().await?;

        if let Some(mut state) = state {
            state.items.clear();
            self.save_state(&state).await?;

            self.audit.record(
                "queue_cancelled",
                AuditStatus::Warning,
                &format!("Cancelled after {} of {} items", state.processed, state.total),
                &json!({ "job_id": state.job_id }),
            );
        }

        let status = QueueStatus::new(QueuePhase::Cancelled, "Bulk operation cancelled");
        self.save_status(&status).await?;

        Ok(status)
    }

    async fn finalize(&self, mut state: QueueState) -> Result<TickOutcome> {
        // Persist aggregate results without the (potentially large) item list
        state.items.clear();
        self.save_state(&state).await?;

        self.save_status(&QueueStatus::new(
            QueuePhase::Completed,
            format!(
                "Completed {} items: {} created, {} updated, {} skipped, {} errors",
                state.total,
                state.results.created,
                state.results.updated,
                state.results.skipped,
                state.results.errors
            ),
        ))
        .await?;

        self.audit.record(
            "queue_completed",
            AuditStatus::Success,
            &format!("Bulk {} finished", state.kind),
            &json!({
                "job_id": state.job_id,
                "total": state.total,
                "created": state.results.created,
                "updated": state.results.updated,
                "skipped": state.results.skipped,
                "errors": state.results.errors,
            }),
        );

        Ok(TickOutcome::Drained)
    }

    async fn load_state(&self) -> Result<Option<QueueState>> {
        let raw = match self.kv.get(keys::QUEUE_STATE).await? {
            Some(raw) => raw,
            None => return Ok(None),
        };

        let state = serde_json::from_str(&raw)
            .map_err(|e| Error::Internal(format!("Corrupt queue state: {}", e)))?;
        Ok(Some(state))
    }

    async fn save_state(&self, state: &QueueState) -> Result<()> {
        let raw = serde_json::to_string(state)
            .map_err(|e| Error::Internal(format!("Serialize queue state: {}", e)))?;
        self.kv.set(keys::QUEUE_STATE, &raw).await
    }

    /// Status defaults to idle when nothing is persisted.
    pub async fn load_status(&self) -> Result<QueueStatus> {
        let raw = match self.kv.get(keys::QUEUE_STATUS).await? {
            Some(raw) => raw,
            None => return Ok(QueueStatus::idle()),
        };

        let status = serde_json::from_str(&raw)
            .map_err(|e| Error::Internal(format!("Corrupt queue status: {}", e)))?;
        Ok(status)
    }

    async fn save_status(&self, status: &QueueStatus) -> Result<()> {
        let raw = serde_json::to_string(status)
            .map_err(|e| Error::Internal(format!("Serialize queue status: {}", e)))?;
        self.kv.set(keys::QUEUE_STATUS, &raw).await
    }
}
