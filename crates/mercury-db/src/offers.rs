//! Database operations for the `offers` table.

use chrono::{DateTime, Utc};
use mercury_core::{CoreError, Discount, Offer};
use sqlx::PgPool;

use crate::DbError;

/// A row from the `offers` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OfferRow {
    pub id: i64,
    pub store_id: String,
    /// Hex SHA-256 of `(title, url)`; unique per `store_id`.
    pub offer_key: String,
    pub title: String,
    pub url: String,
    pub image_url: String,
    /// `"subscription"` or `"percent"`.
    pub discount_kind: String,
    /// Set only when `discount_kind = 'percent'`.
    pub discount_percent: Option<i16>,
    pub observed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl OfferRow {
    /// Converts the row back into a validated [`Offer`].
    ///
    /// # Errors
    ///
    /// Returns [`CoreError`] when the stored discount or text columns fail
    /// validation.
    pub fn into_offer(self) -> Result<Offer, CoreError> {
        let discount = Discount::from_parts(&self.discount_kind, self.discount_percent)?;
        Offer::new(
            self.store_id,
            &self.title,
            discount,
            &self.url,
            self.image_url,
            self.observed_at,
        )
    }
}

/// Returns every persisted offer for `store_id` in insertion order.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails, or [`DbError::InvalidRow`]
/// if a stored row no longer validates.
pub async fn load_offers(pool: &PgPool, store_id: &str) -> Result<Vec<Offer>, DbError> {
    let rows = sqlx::query_as::<_, OfferRow>(
        "SELECT id, store_id, offer_key, title, url, image_url, \
                discount_kind, discount_percent, observed_at, created_at \
         FROM offers \
         WHERE store_id = $1 \
         ORDER BY id",
    )
    .bind(store_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|row| {
            row.into_offer().map_err(|source| DbError::InvalidRow {
                store_id: store_id.to_string(),
                source,
            })
        })
        .collect()
}

/// Replaces the persisted offer set for `store_id` with `offers`.
///
/// Runs `DELETE` and a single `INSERT … SELECT * FROM UNNEST(…)` inside one
/// transaction, so either the whole new snapshot is visible or the previous
/// one is kept. Returns the number of rows inserted.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any statement or the commit fails; the
/// transaction is rolled back on drop.
pub async fn replace_offers(
    pool: &PgPool,
    store_id: &str,
    offers: &[Offer],
) -> Result<u64, DbError> {
    let mut offer_keys: Vec<String> = Vec::with_capacity(offers.len());
    let mut titles: Vec<String> = Vec::with_capacity(offers.len());
    let mut urls: Vec<String> = Vec::with_capacity(offers.len());
    let mut image_urls: Vec<String> = Vec::with_capacity(offers.len());
    let mut discount_kinds: Vec<String> = Vec::with_capacity(offers.len());
    let mut discount_percents: Vec<Option<i16>> = Vec::with_capacity(offers.len());
    let mut observed_ats: Vec<DateTime<Utc>> = Vec::with_capacity(offers.len());

    for offer in offers {
        offer_keys.push(offer.key().fingerprint());
        titles.push(offer.title().to_string());
        urls.push(offer.url().to_string());
        image_urls.push(offer.image_url().to_string());
        discount_kinds.push(offer.discount().kind().to_string());
        discount_percents.push(offer.discount().percent());
        observed_ats.push(offer.observed_at());
    }

    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM offers WHERE store_id = $1")
        .bind(store_id)
        .execute(&mut *tx)
        .await?;

    let inserted = if offers.is_empty() {
        0
    } else {
        sqlx::query(
            "INSERT INTO offers \
                 (store_id, offer_key, title, url, image_url, \
                  discount_kind, discount_percent, observed_at) \
             SELECT $1, * FROM UNNEST(\
                  $2::text[], $3::text[], $4::text[], $5::text[], \
                  $6::text[], $7::int2[], $8::timestamptz[]) \
             ON CONFLICT (store_id, offer_key) DO NOTHING",
        )
        .bind(store_id)
        .bind(&offer_keys)
        .bind(&titles)
        .bind(&urls)
        .bind(&image_urls)
        .bind(&discount_kinds)
        .bind(&discount_percents)
        .bind(&observed_ats)
        .execute(&mut *tx)
        .await?
        .rows_affected()
    };

    tx.commit().await?;

    Ok(inserted)
}
