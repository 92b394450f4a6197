//! Attribute/term comparator
//!
//! Pure diff between a source snapshot and the local taxonomy state. Never
//! mutates its inputs and performs no I/O, so the same inputs always produce
//! the same result, in the same order.
//!
//! Identity is slug-first: a source attribute matches the local attribute
//! whose slug equals the sanitized source name; a source term matches by slug,
//! then by exact case-insensitive name.

use std::collections::{BTreeMap, HashSet};

use crate::models::{
    AttributeDiff, AttributeRecord, ComparisonResult, DiffStatus, FieldChange, TermDiff,
    TermRecord, TRACKED_META_KEYS,
};

/// Compute the full diff between source and local taxonomy snapshots.
///
/// `source_terms` is keyed by source attribute id; `local_terms` is keyed by
/// taxonomy (the local attribute slug).
pub fn compare(
    source_attributes: &[AttributeRecord],
    source_terms: &BTreeMap<i64, Vec<TermRecord>>,
    local_attributes: &[AttributeRecord],
    local_terms: &BTreeMap<String, Vec<TermRecord>>,
) -> ComparisonResult {
    let mut attributes = Vec::with_capacity(source_attributes.len());
    let mut matched_local_slugs: HashSet<String> = HashSet::new();

    for source_attr in source_attributes {
        let identity = source_attr.identity_slug();
        let local_attr = local_attributes.iter().find(|a| a.slug == identity);

        let (status, terms) = match local_attr {
            Some(local) => {
                matched_local_slugs.insert(local.slug.clone());
                let empty = Vec::new();
                let attr_source_terms = source_terms.get(&source_attr.id).unwrap_or(&empty);
                let attr_local_terms = local_terms.get(&local.slug).unwrap_or(&empty);
                (
                    DiffStatus::Ok,
                    compare_terms(attr_source_terms, attr_local_terms),
                )
            }
            None => {
                // Everything under a new attribute is itself new
                let terms = source_terms
                    .get(&source_attr.id)
                    .map(|terms| {
                        terms
                            .iter()
                            .map(|t| TermDiff {
                                source: Some(t.clone()),
                                local: None,
                                status: DiffStatus::New,
                                changes: BTreeMap::new(),
                                meta_changes: BTreeMap::new(),
                            })
                            .collect()
                    })
                    .unwrap_or_default();
                (DiffStatus::New, terms)
            }
        };

        attributes.push(AttributeDiff {
            source: Some(source_attr.clone()),
            local: local_attr.cloned(),
            status,
            terms,
        });
    }

    // Local attributes with no corresponding source entry
    for local_attr in local_attributes {
        if matched_local_slugs.contains(&local_attr.slug) {
            continue;
        }

        let terms = local_terms
            .get(&local_attr.slug)
            .map(|terms| {
                terms
                    .iter()
                    .map(|t| TermDiff {
                        source: None,
                        local: Some(t.clone()),
                        status: DiffStatus::MissingSource,
                        changes: BTreeMap::new(),
                        meta_changes: BTreeMap::new(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        attributes.push(AttributeDiff {
            source: None,
            local: Some(local_attr.clone()),
            status: DiffStatus::MissingSource,
            terms,
        });
    }

    sort_diffs(&mut attributes);

    ComparisonResult { attributes }
}

/// Diff the terms of one matched attribute.
fn compare_terms(source_terms: &[TermRecord], local_terms: &[TermRecord]) -> Vec<TermDiff> {
    let mut diffs = Vec::with_capacity(source_terms.len());
    let mut matched_local_ids: HashSet<i64> = HashSet::new();

    for source_term in source_terms {
        let local_term = match_term(source_term, local_terms, &matched_local_ids);

        let diff = match local_term {
            Some(local) => {
                matched_local_ids.insert(local.id);
                let changes = core_field_changes(source_term, local);
                let meta_changes = meta_field_changes(source_term, local);
                let status = if changes.is_empty() && meta_changes.is_empty() {
                    DiffStatus::Ok
                } else {
                    DiffStatus::Updated
                };
                TermDiff {
                    source: Some(source_term.clone()),
                    local: Some(local.clone()),
                    status,
                    changes,
                    meta_changes,
                }
            }
            None => TermDiff {
                source: Some(source_term.clone()),
                local: None,
                status: DiffStatus::New,
                changes: BTreeMap::new(),
                meta_changes: BTreeMap::new(),
            },
        };

        diffs.push(diff);
    }

    for local_term in local_terms {
        if matched_local_ids.contains(&local_term.id) {
            continue;
        }
        diffs.push(TermDiff {
            source: None,
            local: Some(local_term.clone()),
            status: DiffStatus::MissingSource,
            changes: BTreeMap::new(),
            meta_changes: BTreeMap::new(),
        });
    }

    sort_term_diffs(&mut diffs);

    diffs
}

/// Slug-first, exact case-insensitive name fallback. Terms already claimed by
/// an earlier source term are not re-matched.
fn match_term<'a>(
    source_term: &TermRecord,
    local_terms: &'a [TermRecord],
    claimed: &HashSet<i64>,
) -> Option<&'a TermRecord> {
    if let Some(by_slug) = local_terms
        .iter()
        .find(|t| !claimed.contains(&t.id) && t.slug == source_term.slug)
    {
        return Some(by_slug);
    }

    local_terms
        .iter()
        .find(|t| !claimed.contains(&t.id) && t.name.eq_ignore_ascii_case(&source_term.name))
}

/// Old/new pairs for differing core fields (exact string equality).
fn core_field_changes(source: &TermRecord, local: &TermRecord) -> BTreeMap<String, FieldChange> {
    let mut changes = BTreeMap::new();

    let fields = [
        ("name", &local.name, &source.name),
        ("slug", &local.slug, &source.slug),
        ("description", &local.description, &source.description),
    ];

    for (field, old, new) in fields {
        if old != new {
            changes.insert(
                field.to_string(),
                FieldChange {
                    old: old.clone(),
                    new: new.clone(),
                },
            );
        }
    }

    changes
}

/// Old/new pairs for differing tracked meta values. A key missing on one side
/// compares as the empty string.
fn meta_field_changes(source: &TermRecord, local: &TermRecord) -> BTreeMap<String, FieldChange> {
    let mut changes = BTreeMap::new();

    for key in TRACKED_META_KEYS {
        let source_value = source.meta.get(key).map(String::as_str).unwrap_or("");
        let local_value = local.meta.get(key).map(String::as_str).unwrap_or("");

        if !values_equal(local_value, source_value) {
            changes.insert(
                key.to_string(),
                FieldChange {
                    old: local_value.to_string(),
                    new: source_value.to_string(),
                },
            );
        }
    }

    changes
}

/// Field-specific equality: numeric-looking values compare tolerantly
/// ("1.50" == "1.5"), everything else as exact strings.
fn values_equal(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }
    match (a.trim().parse::<f64>(), b.trim().parse::<f64>()) {
        (Ok(x), Ok(y)) => (x - y).abs() < f64::EPSILON,
        _ => false,
    }
}

/// Case-insensitive ordering by display name; missing-source entries last.
fn sort_diffs(attributes: &mut [AttributeDiff]) {
    attributes.sort_by(|a, b| {
        let a_missing = a.status == DiffStatus::MissingSource;
        let b_missing = b.status == DiffStatus::MissingSource;
        a_missing
            .cmp(&b_missing)
            .then_with(|| a.display_name().to_lowercase().cmp(&b.display_name().to_lowercase()))
    });
}

fn sort_term_diffs(terms: &mut [TermDiff]) {
    terms.sort_by(|a, b| {
        let a_missing = a.status == DiffStatus::MissingSource;
        let b_missing = b.status == DiffStatus::MissingSource;
        a_missing
            .cmp(&b_missing)
            .then_with(|| a.display_name().to_lowercase().cmp(&b.display_name().to_lowercase()))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attribute(id: i64, name: &str, slug: &str) -> AttributeRecord {
        AttributeRecord {
            id,
            name: name.to_string(),
            slug: slug.to_string(),
            kind: "select".to_string(),
            order_by: "menu_order".to_string(),
            has_archives: false,
        }
    }

    fn term(id: i64, attribute_id: i64, name: &str, slug: &str) -> TermRecord {
        TermRecord {
            id,
            attribute_id,
            name: name.to_string(),
            slug: slug.to_string(),
            description: String::new(),
            meta: BTreeMap::new(),
        }
    }

    fn term_with_meta(
        id: i64,
        attribute_id: i64,
        name: &str,
        slug: &str,
        meta: &[(&str, &str)],
    ) -> TermRecord {
        let mut t = term(id, attribute_id, name, slug);
        for (k, v) in meta {
            t.meta.insert(k.to_string(), v.to_string());
        }
        t
    }

    fn source_terms(entries: Vec<(i64, Vec<TermRecord>)>) -> BTreeMap<i64, Vec<TermRecord>> {
        entries.into_iter().collect()
    }

    fn local_terms(entries: Vec<(&str, Vec<TermRecord>)>) -> BTreeMap<String, Vec<TermRecord>> {
        entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    #[test]
    fn test_identical_snapshots_have_no_differences() {
        let source_attrs = vec![attribute(1, "Color", "")];
        let src_terms = source_terms(vec![(1, vec![term(10, 1, "Red", "red")])]);
        let local_attrs = vec![attribute(100, "Color", "color")];
        let loc_terms = local_terms(vec![("color", vec![term(200, 100, "Red", "red")])]);

        let result = compare(&source_attrs, &src_terms, &local_attrs, &loc_terms);
        let stats = result.statistics();

        assert_eq!(stats.total_differences, 0);
        assert_eq!(result.attributes[0].status, DiffStatus::Ok);
        assert_eq!(result.attributes[0].terms[0].status, DiffStatus::Ok);
    }

    #[test]
    fn test_color_scenario() {
        // Source: Color with Red(slug=red, suffix=ml), Blue(slug=blue)
        // Local: color with red whose suffix differs
        let source_attrs = vec![attribute(1, "Color", "")];
        let src_terms = source_terms(vec![(
            1,
            vec![
                term_with_meta(10, 1, "Red", "red", &[("suffix", "ml")]),
                term(11, 1, "Blue", "blue"),
            ],
        )]);
        let local_attrs = vec![attribute(100, "color", "color")];
        let loc_terms = local_terms(vec![(
            "color",
            vec![term_with_meta(200, 100, "Red", "red", &[("suffix", "oz")])],
        )]);

        let result = compare(&source_attrs, &src_terms, &local_attrs, &loc_terms);

        let attr = &result.attributes[0];
        assert_eq!(attr.status, DiffStatus::Ok);

        let blue = attr.terms.iter().find(|t| t.display_name() == "Blue").unwrap();
        assert_eq!(blue.status, DiffStatus::New);

        let red = attr.terms.iter().find(|t| t.display_name() == "Red").unwrap();
        assert_eq!(red.status, DiffStatus::Updated);
        let suffix_change = red.meta_changes.get("suffix").unwrap();
        assert_eq!(suffix_change.old, "oz");
        assert_eq!(suffix_change.new, "ml");

        let stats = result.statistics();
        assert_eq!(stats.new_terms, 1);
        assert_eq!(stats.updated_terms, 1);
        assert_eq!(stats.total_differences, 2);
    }

    #[test]
    fn test_attribute_matched_by_sanitized_name() {
        // "Shirt Size" sanitizes to shirt-size and must match that local slug
        let source_attrs = vec![attribute(1, "Shirt Size", "")];
        let local_attrs = vec![attribute(100, "Shirt size", "shirt-size")];

        let result = compare(
            &source_attrs,
            &BTreeMap::new(),
            &local_attrs,
            &BTreeMap::new(),
        );

        assert_eq!(result.attributes.len(), 1);
        assert_eq!(result.attributes[0].status, DiffStatus::Ok);
    }

    #[test]
    fn test_new_and_missing_attributes() {
        let source_attrs = vec![attribute(1, "Material", "")];
        let local_attrs = vec![attribute(100, "Pattern", "pattern")];
        let loc_terms = local_terms(vec![("pattern", vec![term(200, 100, "Striped", "striped")])]);

        let result = compare(&source_attrs, &BTreeMap::new(), &local_attrs, &loc_terms);
        let stats = result.statistics();

        assert_eq!(stats.new_attributes, 1);
        assert_eq!(stats.missing_attributes, 1);
        // Terms under a missing attribute count as missing terms
        assert_eq!(stats.missing_terms, 1);
        assert_eq!(stats.total_differences, 3);

        // Missing-source attribute sorts last
        assert_eq!(result.attributes.last().unwrap().status, DiffStatus::MissingSource);
    }

    #[test]
    fn test_term_name_fallback_match() {
        let source_attrs = vec![attribute(1, "Color", "")];
        let src_terms = source_terms(vec![(1, vec![term(10, 1, "Navy Blue", "navy-blue")])]);
        let local_attrs = vec![attribute(100, "Color", "color")];
        // Different slug, same name modulo case: matches via name fallback
        let loc_terms = local_terms(vec![("color", vec![term(200, 100, "navy blue", "navy")])]);

        let result = compare(&source_attrs, &src_terms, &local_attrs, &loc_terms);

        let diff = &result.attributes[0].terms[0];
        assert_eq!(diff.status, DiffStatus::Updated);
        // The slug difference is reported as a core change
        let slug_change = diff.changes.get("slug").unwrap();
        assert_eq!(slug_change.old, "navy");
        assert_eq!(slug_change.new, "navy-blue");
        // Name matched case-insensitively but text differs, so it's a change too
        assert!(diff.changes.contains_key("name"));
    }

    #[test]
    fn test_numeric_meta_equality_is_tolerant() {
        let source_attrs = vec![attribute(1, "Size", "")];
        let src_terms = source_terms(vec![(
            1,
            vec![term_with_meta(10, 1, "Large", "large", &[("price_adjustment", "1.50")])],
        )]);
        let local_attrs = vec![attribute(100, "Size", "size")];
        let loc_terms = local_terms(vec![(
            "size",
            vec![term_with_meta(200, 100, "Large", "large", &[("price_adjustment", "1.5")])],
        )]);

        let result = compare(&source_attrs, &src_terms, &local_attrs, &loc_terms);

        assert_eq!(result.attributes[0].terms[0].status, DiffStatus::Ok);
        assert_eq!(result.statistics().total_differences, 0);
    }

    #[test]
    fn test_text_meta_equality_is_exact() {
        let source_attrs = vec![attribute(1, "Size", "")];
        let src_terms = source_terms(vec![(
            1,
            vec![term_with_meta(10, 1, "Large", "large", &[("suffix", "CM")])],
        )]);
        let local_attrs = vec![attribute(100, "Size", "size")];
        let loc_terms = local_terms(vec![(
            "size",
            vec![term_with_meta(200, 100, "Large", "large", &[("suffix", "cm")])],
        )]);

        let result = compare(&source_attrs, &src_terms, &local_attrs, &loc_terms);

        // "CM" vs "cm" is a real difference for text values
        assert_eq!(result.attributes[0].terms[0].status, DiffStatus::Updated);
    }

    #[test]
    fn test_untracked_meta_is_ignored() {
        let source_attrs = vec![attribute(1, "Size", "")];
        let src_terms = source_terms(vec![(
            1,
            vec![term_with_meta(10, 1, "Large", "large", &[("internal_rank", "3")])],
        )]);
        let local_attrs = vec![attribute(100, "Size", "size")];
        let loc_terms = local_terms(vec![(
            "size",
            vec![term_with_meta(200, 100, "Large", "large", &[("internal_rank", "7")])],
        )]);

        let result = compare(&source_attrs, &src_terms, &local_attrs, &loc_terms);

        assert_eq!(result.attributes[0].terms[0].status, DiffStatus::Ok);
    }

    #[test]
    fn test_deterministic_and_order_stable() {
        let source_attrs = vec![attribute(2, "zeta", ""), attribute(1, "Alpha", "")];
        let src_terms = source_terms(vec![
            (1, vec![term(10, 1, "b", "b"), term(11, 1, "A", "a")]),
            (2, vec![]),
        ]);
        let local_attrs = vec![attribute(100, "Orphan", "orphan")];

        let first = compare(&source_attrs, &src_terms, &local_attrs, &BTreeMap::new());
        let second = compare(&source_attrs, &src_terms, &local_attrs, &BTreeMap::new());

        let names: Vec<&str> = first.attributes.iter().map(|a| a.display_name()).collect();
        // Case-insensitive alphabetical, missing-source last
        assert_eq!(names, vec!["Alpha", "zeta", "Orphan"]);

        let term_names: Vec<&str> =
            first.attributes[0].terms.iter().map(|t| t.display_name()).collect();
        assert_eq!(term_names, vec!["A", "b"]);

        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn test_inputs_not_mutated() {
        let source_attrs = vec![attribute(1, "Color", "")];
        let src_terms = source_terms(vec![(1, vec![term(10, 1, "Red", "red")])]);
        let local_attrs = vec![attribute(100, "Color", "color")];
        let loc_terms = local_terms(vec![("color", vec![term(200, 100, "Crimson", "red")])]);

        let src_attrs_before = source_attrs.clone();
        let src_terms_before = src_terms.clone();

        let _ = compare(&source_attrs, &src_terms, &local_attrs, &loc_terms);

        assert_eq!(source_attrs, src_attrs_before);
        assert_eq!(src_terms, src_terms_before);
    }
}
