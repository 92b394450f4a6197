//! Audit logging
//!
//! The reconciler emits one record per created/updated/failed/warned item.
//! Persistent audit storage is out of scope; the production implementation
//! forwards to `tracing` with structured fields.

use serde_json::Value;

/// Outcome classification for one audit record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditStatus {
    Success,
    Warning,
    Error,
}

impl AuditStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditStatus::Success => "success",
            AuditStatus::Warning => "warning",
            AuditStatus::Error => "error",
        }
    }
}

/// Sink for per-item sync records
pub trait AuditLog: Send + Sync {
    fn record(&self, action: &str, status: AuditStatus, message: &str, context: &Value);
}

/// Audit log that forwards to `tracing`
#[derive(Debug, Default, Clone)]
pub struct TracingAuditLog;

impl AuditLog for TracingAuditLog {
    fn record(&self, action: &str, status: AuditStatus, message: &str, context: &Value) {
        match status {
            AuditStatus::Success => {
                tracing::info!(action, status = status.as_str(), context = %context, "{}", message);
            }
            AuditStatus::Warning => {
                tracing::warn!(action, status = status.as_str(), context = %context, "{}", message);
            }
            AuditStatus::Error => {
                tracing::error!(action, status = status.as_str(), context = %context, "{}", message);
            }
        }
    }
}
