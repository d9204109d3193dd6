//! Slug derivation for theme and store identifiers.

use regex::Regex;
use std::sync::LazyLock;

/// Slug shape accepted by the registry: lowercase letters, digits and
/// hyphens, 2-64 chars, starting with an alphanumeric.
const SLUG_PATTERN: &str = r"^[a-z0-9][a-z0-9-]{1,63}$";

static SLUG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(SLUG_PATTERN).expect("slug regex is valid"));

/// Derive a URL-safe slug from a human-readable name.
///
/// Lowercases, collapses every run of non-alphanumeric characters to a
/// single hyphen and strips leading/trailing hyphens. Deterministic and
/// idempotent: `slugify(slugify(x)) == slugify(x)`.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_hyphen = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }
    slug
}

/// Check whether a client-supplied slug is acceptable as-is.
pub fn is_valid_slug(slug: &str) -> bool {
    SLUG_RE.is_match(slug)
}
