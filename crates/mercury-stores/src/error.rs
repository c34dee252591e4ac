use std::time::Duration;

use mercury_core::PersistenceError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("source page not found: {url}")]
    NotFound { url: String },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("invalid source URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("fetching {url} timed out after {timeout:?}")]
    FetchTimeout { url: String, timeout: Duration },

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error("store {store} is already processing; overlapping run rejected")]
    AlreadyRunning { store: String },
}

impl StoreError {
    /// True when the source could not be fetched or decoded. These are
    /// transient from the pipeline's point of view: no offers are reported and
    /// the persisted set is left alone.
    #[must_use]
    pub fn is_source_unavailable(&self) -> bool {
        matches!(
            self,
            StoreError::Http(_)
                | StoreError::Deserialize { .. }
                | StoreError::NotFound { .. }
                | StoreError::UnexpectedStatus { .. }
                | StoreError::InvalidUrl { .. }
                | StoreError::FetchTimeout { .. }
        )
    }
}
