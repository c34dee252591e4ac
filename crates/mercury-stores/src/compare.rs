//! Set comparison between a fresh extraction and the persisted snapshot.
//!
//! Identity is the [`OfferKey`] (`title` + `url`); no other field takes part.
//! The comparison is pure: persisting the result is the caller's job.

use std::collections::HashSet;

use mercury_core::{Offer, OfferKey};

/// Classification of one offer relative to the previous snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Added,
    Removed,
    Unchanged,
}

/// Whether an empty fresh set may be read as "every offer ended".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyExtraction {
    /// Empty input means the source was unreadable; nothing is removed.
    Untrusted,
    /// Empty input really means the source lists no offers.
    Trusted,
}

/// Outcome of [`compare`]: `added`, `removed` and `unchanged` are disjoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Comparison {
    added: Vec<Offer>,
    removed: Vec<Offer>,
    unchanged: Vec<Offer>,
}

impl Comparison {
    /// Offers in the fresh set that were not persisted, in source order.
    #[must_use]
    pub fn added(&self) -> &[Offer] {
        &self.added
    }

    /// Persisted offers missing from the fresh set.
    #[must_use]
    pub fn removed(&self) -> &[Offer] {
        &self.removed
    }

    /// Offers present in both. The persisted record is kept.
    #[must_use]
    pub fn unchanged(&self) -> &[Offer] {
        &self.unchanged
    }

    /// False when both `added` and `removed` are empty, i.e. writing the
    /// snapshot back would be a no-op.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        !self.added.is_empty() || !self.removed.is_empty()
    }

    /// New persisted snapshot: `unchanged ∪ added`.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Offer> {
        self.unchanged
            .iter()
            .chain(&self.added)
            .cloned()
            .collect()
    }

    /// Every offer with its verdict: added first, then unchanged, then removed.
    pub fn verdicts(&self) -> impl Iterator<Item = (Verdict, &Offer)> {
        self.added
            .iter()
            .map(|o| (Verdict::Added, o))
            .chain(self.unchanged.iter().map(|o| (Verdict::Unchanged, o)))
            .chain(self.removed.iter().map(|o| (Verdict::Removed, o)))
    }
}

/// Drops later offers whose key was already seen, keeping source order.
fn dedupe(offers: Vec<Offer>) -> Vec<Offer> {
    let mut seen: HashSet<OfferKey> = HashSet::with_capacity(offers.len());
    offers
        .into_iter()
        .filter(|offer| seen.insert(offer.key()))
        .collect()
}

/// Compares `fresh` against `persisted` by offer key.
///
/// Duplicates within either input collapse to their first occurrence. With
/// [`EmptyExtraction::Untrusted`], an empty `fresh` leaves everything
/// unchanged instead of marking the whole snapshot removed.
#[must_use]
pub fn compare(fresh: Vec<Offer>, persisted: Vec<Offer>, empty: EmptyExtraction) -> Comparison {
    let persisted = dedupe(persisted);

    if fresh.is_empty() && empty == EmptyExtraction::Untrusted {
        return Comparison {
            unchanged: persisted,
            ..Comparison::default()
        };
    }

    let fresh = dedupe(fresh);
    let fresh_keys: HashSet<OfferKey> = fresh.iter().map(Offer::key).collect();
    let persisted_keys: HashSet<OfferKey> = persisted.iter().map(Offer::key).collect();

    let (unchanged, removed): (Vec<Offer>, Vec<Offer>) = persisted
        .into_iter()
        .partition(|offer| fresh_keys.contains(&offer.key()));
    let added: Vec<Offer> = fresh
        .into_iter()
        .filter(|offer| !persisted_keys.contains(&offer.key()))
        .collect();

    Comparison {
        added,
        removed,
        unchanged,
    }
}

#[cfg(test)]
#[path = "compare_test.rs"]
mod tests;
