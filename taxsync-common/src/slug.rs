//! Slug sanitization
//!
//! Attribute and term identity is slug-first: the sanitized slug of a source
//! attribute name is the key used to match against local attributes, so the
//! comparator and the reconciler must share one sanitization rule.

/// Sanitize a display name into a normalized, URL-safe slug.
///
/// Lowercases ASCII alphanumerics, folds whitespace and separator runs into a
/// single hyphen, and drops everything else. Leading/trailing hyphens are
/// trimmed.
pub fn sanitize_slug(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_hyphen = false;

    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(ch.to_ascii_lowercase());
        } else if ch.is_whitespace() || matches!(ch, '-' | '_' | '/' | '.') {
            pending_hyphen = true;
        }
        // Anything else (punctuation, non-ASCII) is dropped
    }

    slug
}
