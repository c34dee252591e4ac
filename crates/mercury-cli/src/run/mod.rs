//! `mercury run` and `mercury stores` handlers.
//!
//! Per-store failures are logged and summarized rather than propagated so a
//! single broken source does not abort the whole run.

mod runner;

use std::sync::Arc;
use std::time::Duration;

use mercury_core::{AppConfig, InMemoryOfferRepository, OfferRepository, StoreIdentity};
use mercury_db::PgOfferRepository;
use mercury_stores::{
    build_store, stores, Fetcher, HttpFetcher, LogNotifier, Notifier, WebhookNotifier,
    STORE_NAMES,
};
use tracing::Instrument;

use runner::RunLimits;

/// Print every registered store with its identity and channel.
pub(crate) fn print_stores() {
    for identity in STORE_NAMES.iter().filter_map(|name| stores::identity(name)) {
        let channel = identity
            .channel()
            .map_or_else(|| "unset".to_string(), |c| c.to_string());
        println!(
            "{:<10} id={:<4} {:<20} channel={channel:<12} {}",
            identity.name(),
            identity.id(),
            identity.service_name(),
            identity.url()
        );
    }
}

/// Resolve `--store` into the list of store identities to run.
///
/// # Errors
///
/// Returns an error naming the known stores when `filter` matches none.
pub(crate) fn select_stores(filter: Option<&str>) -> anyhow::Result<Vec<StoreIdentity>> {
    match filter {
        Some(name) => stores::identity(name).map(|i| vec![i]).ok_or_else(|| {
            anyhow::anyhow!(
                "unknown store '{name}'; known stores: {}",
                STORE_NAMES.join(", ")
            )
        }),
        None => Ok(STORE_NAMES
            .iter()
            .filter_map(|name| stores::identity(name))
            .collect()),
    }
}

/// Copy the persisted snapshot of each selected store into memory so a dry
/// run can compare without writing.
async fn seed_in_memory(
    source: &dyn OfferRepository,
    identities: &[StoreIdentity],
) -> anyhow::Result<InMemoryOfferRepository> {
    let repo = InMemoryOfferRepository::new();
    for identity in identities {
        let offers = source.load(identity.id()).await?;
        tracing::debug!(
            store = identity.name(),
            offers = offers.len(),
            "seeded dry-run snapshot"
        );
        repo.replace(identity.id(), &offers).await?;
    }
    Ok(repo)
}

fn build_notifier(config: &AppConfig, dry_run: bool) -> anyhow::Result<Box<dyn Notifier>> {
    match (&config.notify_webhook_url, dry_run) {
        (Some(url), false) => Ok(Box::new(WebhookNotifier::new(
            url,
            config.fetch_timeout_secs,
            &config.user_agent,
        )?)),
        _ => Ok(Box::new(LogNotifier)),
    }
}

/// Run the selected stores and print one summary line per store.
///
/// # Errors
///
/// Returns an error if the store filter is unknown, the HTTP client or
/// notifier cannot be built, the dry-run snapshot cannot be loaded, or every
/// selected store failed.
pub(crate) async fn run_stores(
    pool: &sqlx::PgPool,
    config: &AppConfig,
    store_filter: Option<&str>,
    dry_run: bool,
) -> anyhow::Result<()> {
    let run_id = uuid::Uuid::new_v4();
    let span = tracing::info_span!("run", %run_id, dry_run);
    run_stores_inner(pool, config, store_filter, dry_run)
        .instrument(span)
        .await
}

async fn run_stores_inner(
    pool: &sqlx::PgPool,
    config: &AppConfig,
    store_filter: Option<&str>,
    dry_run: bool,
) -> anyhow::Result<()> {
    let identities = select_stores(store_filter)?;

    let fetcher: Arc<dyn Fetcher> = Arc::new(HttpFetcher::new(
        config.fetch_timeout_secs,
        &config.user_agent,
    )?);
    let persistent: Arc<dyn OfferRepository> = Arc::new(PgOfferRepository::new(pool.clone()));
    let repository: Arc<dyn OfferRepository> = if dry_run {
        Arc::new(seed_in_memory(persistent.as_ref(), &identities).await?)
    } else {
        persistent
    };
    let notifier = build_notifier(config, dry_run)?;

    let configured: Vec<_> = identities
        .iter()
        .filter_map(|identity| {
            build_store(identity.name(), Arc::clone(&fetcher), Arc::clone(&repository))
        })
        .collect();

    tracing::info!(stores = configured.len(), "starting store run");

    let limits = RunLimits {
        max_concurrent: config.max_concurrent_stores,
        store_timeout: Duration::from_secs(config.store_timeout_secs),
    };
    let results = runner::execute(&configured, notifier.as_ref(), limits).await;

    for result in &results {
        println!("{}", result.summary_line());
    }
    if dry_run {
        println!("dry-run: nothing was written");
    }

    runner::ensure_not_all_failed(&results)
}
