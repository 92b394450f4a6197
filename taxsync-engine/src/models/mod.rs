//! Domain models for the sync engine

pub mod comparison;
pub mod queue;
pub mod records;
pub mod selection;

pub use comparison::{
    AttributeDiff, ComparisonResult, ComparisonStats, DiffStatus, FieldChange, TermDiff,
};
pub use queue::{QueuePhase, QueueProgress, QueueState, QueueStatus};
pub use records::{AttributeRecord, SourceSnapshot, TermRecord, TRACKED_META_KEYS};
pub use selection::{ProcessedItem, ProcessedOutcome, ProcessingResult, SyncCounters, SyncSelection};
