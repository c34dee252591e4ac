//! Cleanup of raw scraped text and attribute values before they become
//! [`mercury_core::Offer`] fields.

use std::sync::LazyLock;

use regex::Regex;

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Collapses every whitespace run (including newlines and NBSP) to a single
/// space and trims the ends.
#[must_use]
pub fn clean_title(raw: &str) -> String {
    WHITESPACE_RUN.replace_all(raw.trim(), " ").into_owned()
}

/// Returns the first candidate URL of a `srcset` attribute.
///
/// `"a.webp 1x, b.webp 2x"` yields `"a.webp"`. Returns `None` for an empty
/// attribute.
#[must_use]
pub fn first_srcset_url(srcset: &str) -> Option<String> {
    srcset
        .split(',')
        .filter_map(|candidate| candidate.split_whitespace().next())
        .next()
        .map(str::to_owned)
}

/// Picks an item's image: its own, else the previous item's own, else the
/// placeholder.
///
/// `previous_own` must be the previous item's *own* image, never an image it
/// inherited, so a missing image never propagates more than one item.
#[must_use]
pub fn resolve_image(own: Option<&str>, previous_own: Option<&str>, placeholder: &str) -> String {
    own.or(previous_own)
        .filter(|url| !url.trim().is_empty())
        .unwrap_or(placeholder)
        .to_owned()
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
