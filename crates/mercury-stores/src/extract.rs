//! The contract between a store and its source-specific parser.

use chrono::{DateTime, Utc};
use mercury_core::{CoreError, Offer};
use thiserror::Error;

use crate::fetch::{FetchMode, RawContent};

/// Why a single candidate item was rejected.
#[derive(Debug, Error)]
pub enum ItemError {
    #[error("missing {0}")]
    MissingField(&'static str),

    #[error(transparent)]
    Invalid(#[from] CoreError),
}

/// A candidate item that failed to parse, by position within the source.
#[derive(Debug)]
pub struct ItemFailure {
    pub index: usize,
    pub error: ItemError,
}

/// Values shared by every offer produced in one extraction pass.
#[derive(Debug, Clone, Copy)]
pub struct ExtractContext<'a> {
    pub store_id: &'a str,
    pub observed_at: DateTime<Utc>,
}

/// Result of one extraction pass: accepted offers in source order plus the
/// items that were skipped.
///
/// An extraction with no offers means the page layout was not recognized or
/// yielded nothing usable; callers must not treat it as "all offers ended".
#[derive(Debug, Default)]
pub struct Extraction {
    offers: Vec<Offer>,
    failures: Vec<ItemFailure>,
}

impl Extraction {
    /// Records the outcome for the candidate at `index`.
    pub fn push(&mut self, index: usize, outcome: Result<Offer, ItemError>) {
        match outcome {
            Ok(offer) => self.offers.push(offer),
            Err(error) => self.failures.push(ItemFailure { index, error }),
        }
    }

    #[must_use]
    pub fn offers(&self) -> &[Offer] {
        &self.offers
    }

    #[must_use]
    pub fn failures(&self) -> &[ItemFailure] {
        &self.failures
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.offers.is_empty()
    }

    #[must_use]
    pub fn into_parts(self) -> (Vec<Offer>, Vec<ItemFailure>) {
        (self.offers, self.failures)
    }
}

impl FromIterator<Result<Offer, ItemError>> for Extraction {
    fn from_iter<I: IntoIterator<Item = Result<Offer, ItemError>>>(iter: I) -> Self {
        let mut extraction = Extraction::default();
        for (index, outcome) in iter.into_iter().enumerate() {
            extraction.push(index, outcome);
        }
        extraction
    }
}

/// Source-specific parsing from raw content into offers.
///
/// Implementations must never fail as a whole: a malformed item becomes an
/// [`ItemFailure`] and the remaining items are still returned. Unrecognized
/// content yields an empty [`Extraction`].
pub trait Extractor: Send + Sync {
    /// How the fetched body should be decoded for this extractor.
    fn mode(&self) -> FetchMode;

    fn extract(&self, content: &RawContent, ctx: ExtractContext<'_>) -> Extraction;
}

#[cfg(test)]
mod tests {
    use mercury_core::Discount;

    use super::*;

    fn offer(title: &str) -> Result<Offer, ItemError> {
        Offer::new(
            "4",
            title,
            Discount::Subscription,
            "https://example.com/g",
            "https://example.com/g.png",
            Utc::now(),
        )
        .map_err(ItemError::from)
    }

    #[test]
    fn collect_splits_offers_and_failures_by_index() {
        let extraction: Extraction = vec![
            offer("First"),
            Err(ItemError::MissingField("title")),
            offer("Third"),
            offer("   "),
        ]
        .into_iter()
        .collect();

        let titles: Vec<&str> = extraction.offers().iter().map(Offer::title).collect();
        assert_eq!(titles, vec!["First", "Third"]);

        let indices: Vec<usize> = extraction.failures().iter().map(|f| f.index).collect();
        assert_eq!(indices, vec![1, 3]);
        assert!(matches!(
            extraction.failures()[1].error,
            ItemError::Invalid(CoreError::EmptyTitle)
        ));
    }

    #[test]
    fn default_extraction_is_empty() {
        let extraction = Extraction::default();
        assert!(extraction.is_empty());
        assert!(extraction.failures().is_empty());
    }
}
