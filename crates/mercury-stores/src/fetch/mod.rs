//! Retrieval of raw source content over HTTP.

mod origin;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::StoreError;

pub use origin::{extract_origin, resolve_link};

/// How the body of a source page should be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    Html,
    Json,
}

impl FetchMode {
    fn accept(self) -> &'static str {
        match self {
            FetchMode::Html => "text/html,application/xhtml+xml;q=0.9,*/*;q=0.8",
            FetchMode::Json => "application/json,*/*;q=0.8",
        }
    }
}

/// Response body as handed to an extractor.
#[derive(Debug, Clone)]
pub enum RawContent {
    Html(String),
    Json(serde_json::Value),
}

impl RawContent {
    #[must_use]
    pub fn as_html(&self) -> Option<&str> {
        match self {
            RawContent::Html(body) => Some(body),
            RawContent::Json(_) => None,
        }
    }

    #[must_use]
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            RawContent::Json(value) => Some(value),
            RawContent::Html(_) => None,
        }
    }
}

/// Source of raw page content. A failed fetch means "source unavailable" for
/// this run and never touches persisted state.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str, mode: FetchMode) -> Result<RawContent, StoreError>;
}

/// [`Fetcher`] backed by a shared `reqwest::Client`.
///
/// Handles not-found (404) and other non-2xx responses as typed errors. There
/// is no retry: a failed fetch is simply reported and the next scheduled run
/// tries again.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Creates an `HttpFetcher` with the configured timeout and `User-Agent`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed (e.g., invalid TLS config).
    pub fn new(timeout_secs: u64, user_agent: &str) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    /// Fetches `url` and decodes the body according to `mode`.
    ///
    /// # Errors
    ///
    /// - [`StoreError::InvalidUrl`] if `url` does not parse.
    /// - [`StoreError::NotFound`] on HTTP 404.
    /// - [`StoreError::UnexpectedStatus`] on any other non-2xx status.
    /// - [`StoreError::Http`] on network, TLS, or timeout failure.
    /// - [`StoreError::Deserialize`] if a `FetchMode::Json` body is not valid JSON.
    async fn fetch(&self, url: &str, mode: FetchMode) -> Result<RawContent, StoreError> {
        let parsed = reqwest::Url::parse(url).map_err(|e| StoreError::InvalidUrl {
            url: url.to_owned(),
            reason: e.to_string(),
        })?;

        let response = self
            .client
            .get(parsed)
            .header(reqwest::header::ACCEPT, mode.accept())
            .header(reqwest::header::ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .header(reqwest::header::REFERER, extract_origin(url))
            .header(reqwest::header::CACHE_CONTROL, "no-cache")
            .send()
            .await?;
        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound {
                url: url.to_owned(),
            });
        }

        if !status.is_success() {
            return Err(StoreError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_owned(),
            });
        }

        let body = response.text().await?;
        tracing::debug!(url, bytes = body.len(), "fetched source page");

        match mode {
            FetchMode::Html => Ok(RawContent::Html(body)),
            FetchMode::Json => serde_json::from_str(&body)
                .map(RawContent::Json)
                .map_err(|e| StoreError::Deserialize {
                    context: format!("response from {url}"),
                    source: e,
                }),
        }
    }
}
