//! One store's end-to-end run: fetch, extract, compare, persist.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use mercury_core::{Offer, OfferRepository, StoreIdentity};

use crate::compare::{compare, Comparison, EmptyExtraction};
use crate::error::StoreError;
use crate::extract::{ExtractContext, Extractor, ItemFailure};
use crate::fetch::Fetcher;

/// How a run that reached the source ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Offers were extracted and compared against the persisted snapshot.
    Completed,
    /// The source was reachable but yielded no offers. Nothing was persisted.
    LayoutBreak,
}

/// Summary of a single [`Store::process_data`] call.
#[derive(Debug)]
pub struct RunReport {
    pub store_id: String,
    pub status: RunStatus,
    pub comparison: Comparison,
    pub item_failures: Vec<ItemFailure>,
}

impl RunReport {
    #[must_use]
    pub fn added(&self) -> &[Offer] {
        self.comparison.added()
    }

    #[must_use]
    pub fn has_new_offers(&self) -> bool {
        self.status == RunStatus::Completed && !self.comparison.added().is_empty()
    }
}

/// A configured deal source bound to its fetcher, extractor, and repository.
///
/// Runs of the same store are serialized: a call that arrives while another
/// is in flight is rejected with [`StoreError::AlreadyRunning`].
pub struct Store {
    identity: StoreIdentity,
    extractor: Box<dyn Extractor>,
    fetcher: Arc<dyn Fetcher>,
    repository: Arc<dyn OfferRepository>,
    running: tokio::sync::Mutex<()>,
    /// Offers newly added by the last successful run.
    data: Mutex<Vec<Offer>>,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}

impl Store {
    #[must_use]
    pub fn new(
        identity: StoreIdentity,
        extractor: impl Extractor + 'static,
        fetcher: Arc<dyn Fetcher>,
        repository: Arc<dyn OfferRepository>,
    ) -> Self {
        Self {
            identity,
            extractor: Box::new(extractor),
            fetcher,
            repository,
            running: tokio::sync::Mutex::new(()),
            data: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn identity(&self) -> &StoreIdentity {
        &self.identity
    }

    /// Offers added by the most recent successful run. Empty before the first
    /// run and after any failed or empty run.
    #[must_use]
    pub fn data(&self) -> Vec<Offer> {
        self.data
            .lock()
            .map(|data| data.clone())
            .unwrap_or_default()
    }

    fn set_data(&self, offers: Vec<Offer>) {
        if let Ok(mut data) = self.data.lock() {
            *data = offers;
        }
    }

    /// Runs the full pipeline once.
    ///
    /// On success the persisted snapshot for this store equals
    /// `unchanged ∪ added`, and [`Store::data`] holds `added`. An empty
    /// extraction is reported as [`RunStatus::LayoutBreak`] and leaves the
    /// persisted snapshot untouched.
    ///
    /// # Errors
    ///
    /// - [`StoreError::AlreadyRunning`] if another run of this store is in flight.
    /// - A source-unavailable error (see [`StoreError::is_source_unavailable`])
    ///   if the page could not be fetched.
    /// - [`StoreError::Persistence`] if the snapshot could not be read or
    ///   replaced; the previous snapshot stays intact.
    pub async fn process_data(&self) -> Result<RunReport, StoreError> {
        self.run(None).await
    }

    /// Like [`Store::process_data`], but gives up with
    /// [`StoreError::FetchTimeout`] if the source has not answered within
    /// `fetch_timeout`.
    ///
    /// Only the fetch is bounded. Once content is in hand the run always
    /// finishes, so a snapshot that reaches the repository is also the one
    /// reported back to the caller.
    ///
    /// # Errors
    ///
    /// Same as [`Store::process_data`], plus [`StoreError::FetchTimeout`].
    pub async fn process_data_within(
        &self,
        fetch_timeout: Duration,
    ) -> Result<RunReport, StoreError> {
        self.run(Some(fetch_timeout)).await
    }

    async fn run(&self, fetch_timeout: Option<Duration>) -> Result<RunReport, StoreError> {
        let Ok(_guard) = self.running.try_lock() else {
            return Err(StoreError::AlreadyRunning {
                store: self.identity.name().to_string(),
            });
        };
        self.set_data(Vec::new());

        let store = self.identity.name();
        let store_id = self.identity.id();

        let url = self.identity.url();
        let fetch = self.fetcher.fetch(url, self.extractor.mode());
        let content = match fetch_timeout {
            Some(timeout) => tokio::time::timeout(timeout, fetch)
                .await
                .map_err(|_| StoreError::FetchTimeout {
                    url: url.to_string(),
                    timeout,
                })??,
            None => fetch.await?,
        };

        let ctx = ExtractContext {
            store_id,
            observed_at: Utc::now(),
        };
        let (offers, item_failures) = self.extractor.extract(&content, ctx).into_parts();

        for failure in &item_failures {
            tracing::warn!(
                store,
                index = failure.index,
                error = %failure.error,
                "skipping malformed offer"
            );
        }

        if offers.is_empty() {
            tracing::error!(
                store,
                service = self.identity.service_name(),
                severity = "critical",
                skipped = item_failures.len(),
                "{} isn't returning any deals; page layout may have changed",
                self.identity.service_name()
            );
            return Ok(RunReport {
                store_id: store_id.to_string(),
                status: RunStatus::LayoutBreak,
                comparison: Comparison::default(),
                item_failures,
            });
        }

        let persisted = self.repository.load(store_id).await?;
        let comparison = compare(offers, persisted, EmptyExtraction::Untrusted);

        if comparison.has_changes() {
            self.repository
                .replace(store_id, &comparison.snapshot())
                .await?;
        }

        tracing::info!(
            store,
            added = comparison.added().len(),
            removed = comparison.removed().len(),
            unchanged = comparison.unchanged().len(),
            skipped = item_failures.len(),
            "store run complete"
        );

        self.set_data(comparison.added().to_vec());

        Ok(RunReport {
            store_id: store_id.to_string(),
            status: RunStatus::Completed,
            comparison,
            item_failures,
        })
    }

    /// Runs the pipeline and reports `1` when new offers were found and
    /// persisted, `0` otherwise. Never fails; errors are logged.
    pub async fn get(&self) -> u8 {
        match self.process_data().await {
            Ok(report) => u8::from(report.has_new_offers()),
            Err(e) => {
                log_run_error(self.identity.name(), &e);
                0
            }
        }
    }
}

/// Logs a failed run at the level its kind deserves.
pub fn log_run_error(store: &str, error: &StoreError) {
    match error {
        StoreError::AlreadyRunning { .. } => {
            tracing::warn!(store, error = %error, "run skipped");
        }
        e if e.is_source_unavailable() => {
            tracing::warn!(store, error = %e, "source unavailable; no offers this run");
        }
        e => {
            tracing::error!(store, error = %e, "store run failed");
        }
    }
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
