//! Reconciler
//!
//! Applies a selected subset of a diff to the local store, idempotently. A
//! pass resolves every selection against one fixed source snapshot, isolates
//! per-item failures, and always completes with a count summary - it never
//! aborts partway.

use std::collections::BTreeMap;
use std::time::Duration;

use serde_json::json;
use taxsync_common::Error;

use crate::audit::{AuditLog, AuditStatus};
use crate::models::{
    AttributeRecord, ProcessedItem, ProcessedOutcome, ProcessingResult, SourceSnapshot,
    SyncSelection, TermRecord,
};
use crate::store::LocalStore;

/// Delay before the single create-attribute re-check retry
const ATTRIBUTE_SETTLE_DELAY: Duration = Duration::from_millis(50);

/// Applies sync selections against the local store
pub struct Reconciler<'a> {
    store: &'a dyn LocalStore,
    audit: &'a dyn AuditLog,
}

impl<'a> Reconciler<'a> {
    pub fn new(store: &'a dyn LocalStore, audit: &'a dyn AuditLog) -> Self {
        Self { store, audit }
    }

    /// Apply every selection, reporting aggregate counts. `sync_metadata`
    /// controls whether tracked meta is written (last-writer-wins).
    pub async fn apply(
        &self,
        selections: &[SyncSelection],
        snapshot: &SourceSnapshot,
        sync_metadata: bool,
    ) -> ProcessingResult {
        let mut result = ProcessingResult::default();

        for selection in selections {
            if !selection.is_valid() {
                result.push(ProcessedItem {
                    attribute_slug: selection.attribute_slug.clone(),
                    term_slug: selection.term_slug.clone(),
                    outcome: ProcessedOutcome::Skipped,
                    detail: "Selection is missing attribute or term identifier".to_string(),
                });
                continue;
            }

            let item = match self.apply_one(selection, snapshot, sync_metadata).await {
                Ok(item) => item,
                Err(e) => ProcessedItem {
                    attribute_slug: selection.attribute_slug.clone(),
                    term_slug: selection.term_slug.clone(),
                    outcome: ProcessedOutcome::Failed,
                    detail: e.to_string(),
                },
            };

            let (action, status) = match item.outcome {
                ProcessedOutcome::Created => ("term_created", AuditStatus::Success),
                ProcessedOutcome::Updated => ("term_updated", AuditStatus::Success),
                ProcessedOutcome::Skipped => ("term_skipped", AuditStatus::Warning),
                ProcessedOutcome::Failed => ("term_failed", AuditStatus::Error),
            };
            self.audit.record(
                action,
                status,
                &item.detail,
                &json!({
                    "attribute": item.attribute_slug,
                    "term": item.term_slug,
                }),
            );

            result.push(item);
        }

        result
    }

    async fn apply_one(
        &self,
        selection: &SyncSelection,
        snapshot: &SourceSnapshot,
        sync_metadata: bool,
    ) -> Result<ProcessedItem, Error> {
        // Resolve from the fixed snapshot, never re-fetched mid-pass
        let source_attr = snapshot.find_attribute(&selection.attribute_slug).ok_or_else(|| {
            Error::NotFound(format!(
                "Source attribute '{}' not in snapshot",
                selection.attribute_slug
            ))
        })?;

        let source_term = snapshot
            .find_term(source_attr, &selection.term_slug, selection.term_name.as_deref())
            .ok_or_else(|| {
                Error::NotFound(format!(
                    "Source term '{}' not found under attribute '{}'",
                    selection.term_slug, selection.attribute_slug
                ))
            })?;

        let local_attr = self.ensure_attribute(source_attr, &selection.attribute_slug).await?;
        let taxonomy = local_attr.slug.clone();

        let (outcome, detail, term_id) = self.ensure_term(source_term, &taxonomy).await?;

        if sync_metadata {
            // Last-writer-wins: tracked meta is written unconditionally from
            // source values; a failure here is a warning, not an item error.
            let meta: BTreeMap<String, String> = source_term
                .meta
                .iter()
                .filter(|(key, _)| crate::models::TRACKED_META_KEYS.contains(&key.as_str()))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();

            if !meta.is_empty() {
                if let Err(e) = self.store.update_term_meta(term_id, &meta).await {
                    self.audit.record(
                        "term_meta_write",
                        AuditStatus::Warning,
                        &format!("Meta write failed: {}", e),
                        &json!({
                            "attribute": selection.attribute_slug,
                            "term": selection.term_slug,
                        }),
                    );
                }
            }
        }

        Ok(ProcessedItem {
            attribute_slug: selection.attribute_slug.clone(),
            term_slug: selection.term_slug.clone(),
            outcome,
            detail,
        })
    }

    /// Resolve the local attribute, creating it when absent. Creation is
    /// re-verified with one bounded settle retry, since taxonomy registration
    /// can lag within the same process.
    async fn ensure_attribute(
        &self,
        source_attr: &AttributeRecord,
        attribute_slug: &str,
    ) -> Result<AttributeRecord, Error> {
        if let Some(existing) = self.store.get_attribute(attribute_slug).await? {
            return Ok(existing);
        }

        let record = AttributeRecord {
            id: 0,
            name: source_attr.name.clone(),
            slug: attribute_slug.to_string(),
            kind: source_attr.kind.clone(),
            order_by: source_attr.order_by.clone(),
            has_archives: source_attr.has_archives,
        };
        self.store.create_attribute(&record).await?;

        // Idempotent re-check before proceeding
        if let Some(created) = self.store.get_attribute(attribute_slug).await? {
            return Ok(created);
        }

        tokio::time::sleep(ATTRIBUTE_SETTLE_DELAY).await;

        self.store.get_attribute(attribute_slug).await?.ok_or_else(|| {
            Error::Internal(format!(
                "Attribute '{}' not visible after create",
                attribute_slug
            ))
        })
    }

    /// Resolve the local term (slug, then case-insensitive name), creating it
    /// when absent and diffing core fields before any write when present.
    async fn ensure_term(
        &self,
        source_term: &TermRecord,
        taxonomy: &str,
    ) -> Result<(ProcessedOutcome, String, i64), Error> {
        let existing = match self.store.get_term(&source_term.slug, taxonomy).await? {
            Some(term) => Some(term),
            None => self.store.get_term(&source_term.name, taxonomy).await?,
        };

        if let Some(local) = existing {
            let differs = local.name != source_term.name
                || local.slug != source_term.slug
                || local.description != source_term.description;

            if differs {
                self.store
                    .update_term_core(
                        local.id,
                        &source_term.name,
                        &source_term.slug,
                        &source_term.description,
                    )
                    .await?;
                return Ok((
                    ProcessedOutcome::Updated,
                    format!("Updated term '{}'", source_term.slug),
                    local.id,
                ));
            }

            return Ok((
                ProcessedOutcome::Updated,
                format!("Term '{}' already current", source_term.slug),
                local.id,
            ));
        }

        let created = self.store.create_term(source_term, taxonomy).await?;
        if created.created {
            Ok((
                ProcessedOutcome::Created,
                format!("Created term '{}'", source_term.slug),
                created.id,
            ))
        } else {
            // Another path inserted it between resolve and create; treat as
            // already current
            Ok((
                ProcessedOutcome::Updated,
                format!("Term '{}' already existed", source_term.slug),
                created.id,
            ))
        }
    }
}
