//! Comparison API handlers
//!
//! A comparison is all-or-nothing: any fetch failure aborts before the
//! comparator runs, so a result is never rendered from partial source data.

use axum::{extract::State, response::Html, Json};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::compare::compare;
use crate::error::ApiResult;
use crate::models::{
    AttributeDiff, ComparisonResult, ComparisonStats, DiffStatus, SourceSnapshot, TermRecord,
};
use crate::source::SnapshotFetcher;
use crate::store::LocalStore;
use crate::AppState;

/// GET /compare response
#[derive(Debug, Serialize)]
pub struct CompareResponse {
    pub attributes: Vec<AttributeDiff>,
    pub stats: ComparisonStats,
}

/// Fetch the source snapshot (cached or live) and the full local state, then
/// run the comparator.
pub(crate) async fn build_comparison(state: &AppState) -> ApiResult<ComparisonResult> {
    let fetcher = SnapshotFetcher::new(state.remote.as_ref(), state.kv.as_ref(), state.config.chunk_size);
    let snapshot: SourceSnapshot = fetcher.fetch_snapshot().await?;

    let local_attributes = state.store.list_attributes().await?;
    let mut local_terms: BTreeMap<String, Vec<TermRecord>> = BTreeMap::new();
    for attribute in &local_attributes {
        let terms = state.store.list_terms(&attribute.slug).await?;
        local_terms.insert(attribute.slug.clone(), terms);
    }

    Ok(compare(
        &snapshot.attributes,
        &snapshot.terms,
        &local_attributes,
        &local_terms,
    ))
}

/// GET /compare
pub async fn run_compare(State(state): State<AppState>) -> ApiResult<Json<CompareResponse>> {
    let result = build_comparison(&state).await?;
    let stats = result.statistics();

    tracing::info!(
        total_differences = stats.total_differences,
        new_terms = stats.new_terms,
        updated_terms = stats.updated_terms,
        "Comparison completed"
    );

    Ok(Json(CompareResponse {
        attributes: result.attributes,
        stats,
    }))
}

/// GET /compare/view
///
/// Plain renderable diff for an operator: one line per attribute/term with a
/// status marker.
pub async fn render_compare(State(state): State<AppState>) -> ApiResult<Html<String>> {
    let result = build_comparison(&state).await?;
    let stats = result.statistics();

    let mut lines = Vec::new();
    lines.push(format!(
        "{} differences ({} new terms, {} updated, {} missing)",
        stats.total_differences, stats.new_terms, stats.updated_terms, stats.missing_terms
    ));
    lines.push(String::new());

    for attribute in &result.attributes {
        lines.push(format!(
            "{} {}",
            status_marker(attribute.status),
            attribute.display_name()
        ));

        for term in &attribute.terms {
            let mut line = format!("    {} {}", status_marker(term.status), term.display_name());

            let mut notes: Vec<String> = Vec::new();
            for (field, change) in term.changes.iter().chain(term.meta_changes.iter()) {
                notes.push(format!("{}: {} -> {}", field, change.old, change.new));
            }
            if !notes.is_empty() {
                line.push_str(&format!("  ({})", notes.join(", ")));
            }

            lines.push(line);
        }
    }

    Ok(Html(format!("<pre>{}</pre>", lines.join("\n"))))
}

fn status_marker(status: DiffStatus) -> &'static str {
    match status {
        DiffStatus::Ok => "=",
        DiffStatus::New => "+",
        DiffStatus::Updated => "~",
        DiffStatus::MissingSource => "-",
    }
}
