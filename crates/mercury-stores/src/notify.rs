//! Delivery of newly added offers to a store's notification channel.
//!
//! A failed notification is logged by the caller and never changes a run's
//! result: the offers are already persisted.

use std::time::Duration;

use async_trait::async_trait;
use mercury_core::{Offer, StoreIdentity};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("invalid webhook URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("webhook request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Announces new offers for one store.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, identity: &StoreIdentity, offers: &[Offer]) -> Result<(), NotifyError>;
}

/// JSON body sent to the webhook.
#[derive(Debug, Serialize)]
pub struct DealsPayload<'a> {
    pub store: &'a str,
    pub store_id: &'a str,
    pub service: &'a str,
    /// `null` when the store has no dedicated channel.
    pub channel: Option<u64>,
    pub offers: &'a [Offer],
}

impl<'a> DealsPayload<'a> {
    #[must_use]
    pub fn new(identity: &'a StoreIdentity, offers: &'a [Offer]) -> Self {
        Self {
            store: identity.name(),
            store_id: identity.id(),
            service: identity.service_name(),
            channel: identity.channel().map(std::num::NonZeroU64::get),
            offers,
        }
    }
}

/// Posts a [`DealsPayload`] to a fixed webhook URL.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: reqwest::Url,
}

impl WebhookNotifier {
    /// # Errors
    ///
    /// Returns [`NotifyError::InvalidUrl`] if `url` does not parse, or
    /// [`NotifyError::Http`] if the client cannot be built.
    pub fn new(url: &str, timeout_secs: u64, user_agent: &str) -> Result<Self, NotifyError> {
        let parsed = reqwest::Url::parse(url).map_err(|e| NotifyError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            client,
            url: parsed,
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, identity: &StoreIdentity, offers: &[Offer]) -> Result<(), NotifyError> {
        if offers.is_empty() {
            return Ok(());
        }
        self.client
            .post(self.url.clone())
            .json(&DealsPayload::new(identity, offers))
            .send()
            .await?
            .error_for_status()?;
        tracing::debug!(
            store = identity.name(),
            offers = offers.len(),
            "webhook notification delivered"
        );
        Ok(())
    }
}

/// Writes new offers to the log instead of an external channel.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, identity: &StoreIdentity, offers: &[Offer]) -> Result<(), NotifyError> {
        for offer in offers {
            tracing::info!(
                store = identity.name(),
                channel = identity.channel().map(std::num::NonZeroU64::get),
                title = offer.title(),
                url = offer.url(),
                discount = %offer.discount(),
                "new offer"
            );
        }
        Ok(())
    }
}
