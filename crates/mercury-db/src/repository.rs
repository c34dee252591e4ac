use async_trait::async_trait;
use mercury_core::{Offer, OfferRepository, PersistenceError};
use sqlx::PgPool;

use crate::offers::{load_offers, replace_offers};

/// [`OfferRepository`] backed by the Postgres `offers` table.
#[derive(Debug, Clone)]
pub struct PgOfferRepository {
    pool: PgPool,
}

impl PgOfferRepository {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OfferRepository for PgOfferRepository {
    async fn load(&self, store_id: &str) -> Result<Vec<Offer>, PersistenceError> {
        load_offers(&self.pool, store_id)
            .await
            .map_err(|e| PersistenceError::Read {
                store_id: store_id.to_string(),
                reason: e.to_string(),
            })
    }

    async fn replace(&self, store_id: &str, offers: &[Offer]) -> Result<(), PersistenceError> {
        let inserted = replace_offers(&self.pool, store_id, offers)
            .await
            .map_err(|e| PersistenceError::Write {
                store_id: store_id.to_string(),
                reason: e.to_string(),
            })?;
        tracing::debug!(store = store_id, inserted, "replaced persisted offer set");
        Ok(())
    }
}
