//! Persistence boundary for per-store offer snapshots.
//!
//! Each store owns a disjoint partition keyed by its `store_id`. Reads return
//! the whole partition; writes replace it atomically.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use thiserror::Error;

use crate::offers::Offer;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("failed to read offers for store {store_id}: {reason}")]
    Read { store_id: String, reason: String },

    #[error("failed to replace offers for store {store_id}: {reason}")]
    Write { store_id: String, reason: String },
}

/// Durable storage for the set of offers previously seen per store.
#[async_trait]
pub trait OfferRepository: Send + Sync {
    /// Returns every persisted offer for `store_id`; empty when none exist.
    async fn load(&self, store_id: &str) -> Result<Vec<Offer>, PersistenceError>;

    /// Replaces the persisted set for `store_id` with `offers`.
    ///
    /// Implementations must be all-or-nothing: on error the previous set is
    /// left untouched.
    async fn replace(&self, store_id: &str, offers: &[Offer]) -> Result<(), PersistenceError>;
}

/// Process-local repository, used for dry runs and tests.
#[derive(Debug, Default)]
pub struct InMemoryOfferRepository {
    partitions: Mutex<HashMap<String, Vec<Offer>>>,
}

impl InMemoryOfferRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a repository pre-populated with `offers` for `store_id`.
    #[must_use]
    pub fn with_snapshot(store_id: &str, offers: Vec<Offer>) -> Self {
        let repo = Self::default();
        if let Ok(mut partitions) = repo.partitions.lock() {
            partitions.insert(store_id.to_string(), offers);
        }
        repo
    }
}

#[async_trait]
impl OfferRepository for InMemoryOfferRepository {
    async fn load(&self, store_id: &str) -> Result<Vec<Offer>, PersistenceError> {
        let partitions = self.partitions.lock().map_err(|e| PersistenceError::Read {
            store_id: store_id.to_string(),
            reason: e.to_string(),
        })?;
        Ok(partitions.get(store_id).cloned().unwrap_or_default())
    }

    async fn replace(&self, store_id: &str, offers: &[Offer]) -> Result<(), PersistenceError> {
        let mut partitions = self.partitions.lock().map_err(|e| PersistenceError::Write {
            store_id: store_id.to_string(),
            reason: e.to_string(),
        })?;
        partitions.insert(store_id.to_string(), offers.to_vec());
        Ok(())
    }
}
