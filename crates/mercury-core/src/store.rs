use std::num::NonZeroU64;

/// Immutable identity of one store module, bound at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreIdentity {
    name: String,
    id: String,
    service_name: String,
    /// Notification channel key. `None` means no dedicated channel is configured.
    channel: Option<NonZeroU64>,
    url: String,
}

impl StoreIdentity {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        id: impl Into<String>,
        service_name: impl Into<String>,
        channel: Option<NonZeroU64>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
            service_name: service_name.into(),
            channel,
            url: url.into(),
        }
    }

    /// Short machine name, e.g. `"psplus"`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Partition key for persisted offers.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Human-readable service name, e.g. `"PlayStation Plus"`.
    #[must_use]
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    #[must_use]
    pub fn channel(&self) -> Option<NonZeroU64> {
        self.channel
    }

    /// Source page fetched on every run.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}
