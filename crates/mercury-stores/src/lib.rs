//! Deal sources: fetching, per-store extraction, comparison against the
//! persisted snapshot, and notification of new offers.

pub mod compare;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod normalize;
pub mod notify;
pub mod store;
pub mod stores;

pub use compare::{compare, Comparison, EmptyExtraction, Verdict};
pub use error::StoreError;
pub use extract::{ExtractContext, Extraction, Extractor, ItemError, ItemFailure};
pub use fetch::{FetchMode, Fetcher, HttpFetcher, RawContent};
pub use notify::{DealsPayload, LogNotifier, Notifier, NotifyError, WebhookNotifier};
pub use store::{log_run_error, RunReport, RunStatus, Store};
pub use stores::{build_all, build_store, STORE_NAMES};
