use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use mercury_core::{Discount, InMemoryOfferRepository, PersistenceError};
use tokio::sync::Notify;

use super::*;
use crate::extract::{Extraction, ItemError};
use crate::fetch::{FetchMode, RawContent};

// ---------------------------------------------------------------------------
// Test doubles
// ---------------------------------------------------------------------------

struct StaticFetcher;

#[async_trait]
impl Fetcher for StaticFetcher {
    async fn fetch(&self, _url: &str, _mode: FetchMode) -> Result<RawContent, StoreError> {
        Ok(RawContent::Html(String::new()))
    }
}

struct UnavailableFetcher;

#[async_trait]
impl Fetcher for UnavailableFetcher {
    async fn fetch(&self, url: &str, _mode: FetchMode) -> Result<RawContent, StoreError> {
        Err(StoreError::UnexpectedStatus {
            status: 503,
            url: url.to_string(),
        })
    }
}

/// Blocks inside `fetch` until released, so a second run can overlap.
#[derive(Default)]
struct GatedFetcher {
    entered: Notify,
    release: Notify,
}

#[async_trait]
impl Fetcher for GatedFetcher {
    async fn fetch(&self, _url: &str, _mode: FetchMode) -> Result<RawContent, StoreError> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(RawContent::Html(String::new()))
    }
}

/// Never answers.
struct HangingFetcher;

#[async_trait]
impl Fetcher for HangingFetcher {
    async fn fetch(&self, _url: &str, _mode: FetchMode) -> Result<RawContent, StoreError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(RawContent::Html(String::new()))
    }
}

/// Emits one offer per `Some(title)` and one item failure per `None`.
#[derive(Clone, Default)]
struct ScriptedExtractor {
    items: Arc<Mutex<Vec<Option<&'static str>>>>,
}

impl ScriptedExtractor {
    fn with(items: &[Option<&'static str>]) -> Self {
        let extractor = Self::default();
        extractor.set(items);
        extractor
    }

    fn set(&self, items: &[Option<&'static str>]) {
        *self.items.lock().unwrap() = items.to_vec();
    }
}

impl Extractor for ScriptedExtractor {
    fn mode(&self) -> FetchMode {
        FetchMode::Html
    }

    fn extract(&self, _content: &RawContent, ctx: ExtractContext<'_>) -> Extraction {
        self.items
            .lock()
            .unwrap()
            .iter()
            .map(|item| match item {
                Some(title) => Offer::new(
                    ctx.store_id,
                    title,
                    Discount::Subscription,
                    &format!("https://example.com/{title}"),
                    "https://img.example.com/x.png",
                    ctx.observed_at,
                )
                .map_err(ItemError::from),
                None => Err(ItemError::MissingField("title")),
            })
            .collect()
    }
}

/// Wraps the in-memory repository, counting writes and optionally failing them.
#[derive(Default)]
struct RecordingRepository {
    inner: InMemoryOfferRepository,
    writes: AtomicUsize,
    fail_writes: bool,
}

#[async_trait]
impl OfferRepository for RecordingRepository {
    async fn load(&self, store_id: &str) -> Result<Vec<Offer>, PersistenceError> {
        self.inner.load(store_id).await
    }

    async fn replace(&self, store_id: &str, offers: &[Offer]) -> Result<(), PersistenceError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes {
            return Err(PersistenceError::Write {
                store_id: store_id.to_string(),
                reason: "connection reset".to_string(),
            });
        }
        self.inner.replace(store_id, offers).await
    }
}

fn identity() -> StoreIdentity {
    StoreIdentity::new(
        "psplus",
        "4",
        "PlayStation Plus",
        None,
        "https://www.playstation.com/en-gr/ps-plus/whats-new/",
    )
}

fn make_store(
    extractor: &ScriptedExtractor,
    fetcher: Arc<dyn Fetcher>,
    repository: Arc<RecordingRepository>,
) -> Store {
    Store::new(identity(), extractor.clone(), fetcher, repository)
}

async fn persisted_titles(repo: &RecordingRepository) -> Vec<String> {
    repo.load("4")
        .await
        .unwrap()
        .iter()
        .map(|o| o.title().to_string())
        .collect()
}

fn titles(offers: &[Offer]) -> Vec<&str> {
    offers.iter().map(Offer::title).collect()
}

/// The offer `ScriptedExtractor` produces for `title`.
fn scripted_offer(title: &str) -> Offer {
    Offer::new(
        "4",
        title,
        Discount::Subscription,
        &format!("https://example.com/{title}"),
        "https://img.example.com/x.png",
        Utc::now(),
    )
    .unwrap()
}

/// Shared buffer the fmt subscriber writes log lines into.
#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn lines_containing(&self, needle: &str) -> Vec<String> {
        String::from_utf8_lossy(&self.0.lock().unwrap())
            .lines()
            .filter(|line| line.contains(needle))
            .map(str::to_string)
            .collect()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Happy paths
// ---------------------------------------------------------------------------

#[tokio::test]
async fn first_run_reports_all_offers_as_new() {
    let extractor = ScriptedExtractor::with(&[Some("A"), Some("B"), Some("C")]);
    let repo = Arc::new(RecordingRepository::default());
    let store = make_store(&extractor, Arc::new(StaticFetcher), Arc::clone(&repo));

    assert_eq!(store.get().await, 1);
    assert_eq!(titles(&store.data()), vec!["A", "B", "C"]);
    assert_eq!(persisted_titles(&repo).await, vec!["A", "B", "C"]);
}

#[tokio::test]
async fn rotation_adds_and_removes() {
    let extractor = ScriptedExtractor::with(&[Some("A"), Some("B"), Some("C")]);
    let repo = Arc::new(RecordingRepository::default());
    let store = make_store(&extractor, Arc::new(StaticFetcher), Arc::clone(&repo));
    store.process_data().await.unwrap();

    extractor.set(&[Some("B"), Some("C"), Some("D")]);
    let report = store.process_data().await.unwrap();

    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(titles(report.added()), vec!["D"]);
    assert_eq!(titles(report.comparison.removed()), vec!["A"]);
    assert_eq!(titles(&store.data()), vec!["D"]);
    assert_eq!(persisted_titles(&repo).await, vec!["B", "C", "D"]);
}

#[tokio::test]
async fn repeat_run_is_idempotent_and_skips_write() {
    let extractor = ScriptedExtractor::with(&[Some("A"), Some("B")]);
    let repo = Arc::new(RecordingRepository::default());
    let store = make_store(&extractor, Arc::new(StaticFetcher), Arc::clone(&repo));

    assert_eq!(store.get().await, 1);
    assert_eq!(repo.writes.load(Ordering::SeqCst), 1);

    assert_eq!(store.get().await, 0);
    assert!(store.data().is_empty());
    assert_eq!(repo.writes.load(Ordering::SeqCst), 1);
    assert_eq!(persisted_titles(&repo).await, vec!["A", "B"]);
}

#[tokio::test]
async fn removal_only_run_persists_but_reports_nothing_new() {
    let extractor = ScriptedExtractor::with(&[Some("A"), Some("B")]);
    let repo = Arc::new(RecordingRepository::default());
    let store = make_store(&extractor, Arc::new(StaticFetcher), Arc::clone(&repo));
    store.get().await;

    extractor.set(&[Some("B")]);
    assert_eq!(store.get().await, 0);
    assert_eq!(persisted_titles(&repo).await, vec!["B"]);
    assert_eq!(repo.writes.load(Ordering::SeqCst), 2);
}

// ---------------------------------------------------------------------------
// Degraded extraction
// ---------------------------------------------------------------------------

#[tokio::test]
async fn malformed_item_is_skipped_with_one_warning() {
    let extractor = ScriptedExtractor::with(&[Some("A"), None, Some("C")]);
    let repo = Arc::new(RecordingRepository::default());
    let store = make_store(&extractor, Arc::new(StaticFetcher), Arc::clone(&repo));

    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer({
            let logs = logs.clone();
            move || logs.clone()
        })
        .with_ansi(false)
        .with_max_level(tracing::Level::WARN)
        .finish();
    let report = {
        let _default = tracing::subscriber::set_default(subscriber);
        store.process_data().await.unwrap()
    };

    assert_eq!(titles(report.added()), vec!["A", "C"]);
    assert_eq!(report.item_failures.len(), 1);
    assert_eq!(report.item_failures[0].index, 1);
    assert_eq!(persisted_titles(&repo).await, vec!["A", "C"]);

    let warnings = logs.lines_containing("skipping malformed offer");
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("WARN"));
    assert!(warnings[0].contains("index=1"));
}

#[tokio::test]
async fn empty_extraction_is_layout_break_and_keeps_snapshot() {
    let extractor = ScriptedExtractor::with(&[Some("A")]);
    let repo = Arc::new(RecordingRepository::default());
    let store = make_store(&extractor, Arc::new(StaticFetcher), Arc::clone(&repo));
    store.get().await;

    extractor.set(&[None, None]);
    let report = store.process_data().await.unwrap();

    assert_eq!(report.status, RunStatus::LayoutBreak);
    assert!(!report.has_new_offers());
    assert_eq!(report.item_failures.len(), 2);
    assert_eq!(repo.writes.load(Ordering::SeqCst), 1);
    assert_eq!(persisted_titles(&repo).await, vec!["A"]);
    assert_eq!(store.get().await, 0);
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unavailable_source_returns_zero_without_touching_storage() {
    let extractor = ScriptedExtractor::with(&[Some("A")]);
    let repo = Arc::new(RecordingRepository::default());
    let store = make_store(&extractor, Arc::new(UnavailableFetcher), Arc::clone(&repo));

    let err = store.process_data().await.unwrap_err();
    assert!(err.is_source_unavailable());
    assert_eq!(store.get().await, 0);
    assert_eq!(repo.writes.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn failed_write_returns_zero_and_clears_data() {
    let extractor = ScriptedExtractor::with(&[Some("A")]);
    let repo = Arc::new(RecordingRepository {
        fail_writes: true,
        ..RecordingRepository::default()
    });
    let store = make_store(&extractor, Arc::new(StaticFetcher), Arc::clone(&repo));

    assert_eq!(store.get().await, 0);
    assert!(store.data().is_empty());
    assert!(persisted_titles(&repo).await.is_empty());

    let err = store.process_data().await.unwrap_err();
    assert!(matches!(err, StoreError::Persistence(PersistenceError::Write { .. })));
}

#[tokio::test]
async fn failed_write_keeps_prior_snapshot() {
    let extractor = ScriptedExtractor::with(&[Some("A"), Some("B")]);
    let repo = Arc::new(RecordingRepository {
        fail_writes: true,
        ..RecordingRepository::default()
    });
    repo.inner
        .replace("4", &[scripted_offer("A")])
        .await
        .unwrap();
    let store = make_store(&extractor, Arc::new(StaticFetcher), Arc::clone(&repo));

    assert_eq!(store.get().await, 0);
    assert_eq!(repo.writes.load(Ordering::SeqCst), 1);
    assert!(store.data().is_empty());
    assert_eq!(persisted_titles(&repo).await, vec!["A"]);
}

#[tokio::test]
async fn fetch_deadline_fails_before_touching_storage() {
    let extractor = ScriptedExtractor::with(&[Some("A")]);
    let repo = Arc::new(RecordingRepository::default());
    let store = make_store(&extractor, Arc::new(HangingFetcher), Arc::clone(&repo));

    let err = store
        .process_data_within(Duration::from_millis(50))
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::FetchTimeout { ref url, .. } if url.contains("playstation.com")));
    assert!(err.is_source_unavailable());
    assert_eq!(repo.writes.load(Ordering::SeqCst), 0);
    assert!(store.data().is_empty());
}

#[tokio::test]
async fn fetch_deadline_does_not_cut_off_write_back() {
    let extractor = ScriptedExtractor::with(&[Some("A")]);
    let repo = Arc::new(RecordingRepository::default());
    let store = make_store(&extractor, Arc::new(StaticFetcher), Arc::clone(&repo));

    let report = store
        .process_data_within(Duration::from_secs(5))
        .await
        .unwrap();

    assert_eq!(titles(report.added()), vec!["A"]);
    assert_eq!(persisted_titles(&repo).await, vec!["A"]);
}

#[tokio::test]
async fn overlapping_run_is_rejected() {
    let extractor = ScriptedExtractor::with(&[Some("A")]);
    let repo = Arc::new(RecordingRepository::default());
    let fetcher = Arc::new(GatedFetcher::default());
    let store = Arc::new(make_store(
        &extractor,
        Arc::clone(&fetcher) as Arc<dyn Fetcher>,
        Arc::clone(&repo),
    ));

    let first = {
        let store = Arc::clone(&store);
        tokio::spawn(async move { store.process_data().await })
    };
    fetcher.entered.notified().await;

    let err = store.process_data().await.unwrap_err();
    assert!(matches!(err, StoreError::AlreadyRunning { ref store } if store == "psplus"));
    assert_eq!(store.get().await, 0);

    fetcher.release.notify_one();
    let report = first.await.unwrap().unwrap();
    assert_eq!(titles(report.added()), vec!["A"]);
    assert_eq!(repo.writes.load(Ordering::SeqCst), 1);
}
