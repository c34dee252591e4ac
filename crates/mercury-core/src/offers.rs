use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::CoreError;

/// Promotional signal attached to an [`Offer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "percent", rename_all = "snake_case")]
pub enum Discount {
    /// Free to claim with an active subscription (legacy code `1`).
    Subscription,
    /// Percentage off the regular price, `1..=100`.
    Percent(u8),
}

impl Discount {
    /// Legacy integer signal for "free with subscription".
    pub const SUBSCRIPTION_CODE: i32 = 1;

    /// Storage discriminator, e.g. `"subscription"`.
    #[must_use]
    pub fn kind(self) -> &'static str {
        match self {
            Discount::Subscription => "subscription",
            Discount::Percent(_) => "percent",
        }
    }

    /// Percentage value, `None` for non-percentage discounts.
    #[must_use]
    pub fn percent(self) -> Option<i16> {
        match self {
            Discount::Subscription => None,
            Discount::Percent(p) => Some(i16::from(p)),
        }
    }

    /// Builds a percentage discount.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidDiscount`] unless `percent` is in `1..=100`.
    pub fn percent_off(percent: u8) -> Result<Self, CoreError> {
        if (1..=100).contains(&percent) {
            Ok(Discount::Percent(percent))
        } else {
            Err(CoreError::InvalidDiscount(format!(
                "percent out of range: {percent}"
            )))
        }
    }

    /// Rebuilds a discount from its storage columns.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidDiscount`] for an unknown kind or an
    /// out-of-range percentage.
    pub fn from_parts(kind: &str, percent: Option<i16>) -> Result<Self, CoreError> {
        match (kind, percent) {
            ("subscription", _) => Ok(Discount::Subscription),
            ("percent", Some(p)) => u8::try_from(p)
                .map_err(|_| CoreError::InvalidDiscount(format!("percent out of range: {p}")))
                .and_then(Discount::percent_off),
            ("percent", None) => Err(CoreError::InvalidDiscount(
                "percent discount without a value".to_string(),
            )),
            (other, _) => Err(CoreError::InvalidDiscount(format!("unknown kind \"{other}\""))),
        }
    }
}

impl fmt::Display for Discount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Discount::Subscription => write!(f, "free with subscription"),
            Discount::Percent(p) => write!(f, "-{p}%"),
        }
    }
}

/// Identity of an offer across runs: two offers are the same entity only when
/// both title and url match exactly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OfferKey {
    title: String,
    url: String,
}

impl OfferKey {
    #[must_use]
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
        }
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Hex SHA-256 of the key, used as the per-store unique column.
    ///
    /// Title and url are joined with a NUL byte so `("ab", "c")` and
    /// `("a", "bc")` never collide.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.title.as_bytes());
        hasher.update([0u8]);
        hasher.update(self.url.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

/// One promotional listing discovered on a source page.
///
/// Fields are private so an accepted offer cannot be edited afterwards;
/// `title` and `url` are guaranteed non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Offer {
    store_id: String,
    title: String,
    discount: Discount,
    url: String,
    image_url: String,
    /// When the offer was extracted, not when the promotion started.
    observed_at: DateTime<Utc>,
}

impl Offer {
    /// Validates and builds an offer. Title and url are trimmed.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::EmptyTitle`] or [`CoreError::EmptyUrl`] when the
    /// trimmed value is empty, and [`CoreError::InvalidDiscount`] for a
    /// percentage outside `1..=100`.
    pub fn new(
        store_id: impl Into<String>,
        title: &str,
        discount: Discount,
        url: &str,
        image_url: impl Into<String>,
        observed_at: DateTime<Utc>,
    ) -> Result<Self, CoreError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(CoreError::EmptyTitle);
        }
        let url = url.trim();
        if url.is_empty() {
            return Err(CoreError::EmptyUrl {
                title: title.to_string(),
            });
        }

        if let Discount::Percent(p) = discount {
            Discount::percent_off(p)?;
        }

        Ok(Self {
            store_id: store_id.into(),
            title: title.to_string(),
            discount,
            url: url.to_string(),
            image_url: image_url.into(),
            observed_at,
        })
    }

    #[must_use]
    pub fn key(&self) -> OfferKey {
        OfferKey::new(self.title.clone(), self.url.clone())
    }

    #[must_use]
    pub fn store_id(&self) -> &str {
        &self.store_id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn discount(&self) -> Discount {
        self.discount
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    #[must_use]
    pub fn image_url(&self) -> &str {
        &self.image_url
    }

    #[must_use]
    pub fn observed_at(&self) -> DateTime<Utc> {
        self.observed_at
    }
}
