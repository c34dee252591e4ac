//! Concurrent execution of configured stores.
//!
//! Each store's fetch runs under its own timeout; new offers are handed to
//! the notifier once the store has persisted them.

use std::time::Duration;

use futures::stream::{self, StreamExt};
use mercury_stores::{log_run_error, Notifier, RunStatus, Store, StoreError};

#[derive(Debug, Clone, Copy)]
pub(super) struct RunLimits {
    pub max_concurrent: usize,
    pub store_timeout: Duration,
}

/// Outcome of running a single store.
#[derive(Debug)]
pub(super) enum StoreOutcome {
    Completed {
        added: usize,
        removed: usize,
        unchanged: usize,
        skipped: usize,
    },
    LayoutBreak {
        skipped: usize,
    },
    Failed(StoreError),
    TimedOut,
}

#[derive(Debug)]
pub(super) struct StoreResult {
    pub store: String,
    pub outcome: StoreOutcome,
}

impl StoreResult {
    /// Anything other than a completed comparison counts as failed.
    pub(super) fn is_failure(&self) -> bool {
        !matches!(self.outcome, StoreOutcome::Completed { .. })
    }

    pub(super) fn summary_line(&self) -> String {
        let store = &self.store;
        match &self.outcome {
            StoreOutcome::Completed {
                added,
                removed,
                unchanged,
                skipped,
            } => format!(
                "{store}: {added} new, {removed} ended, {unchanged} unchanged, {skipped} skipped"
            ),
            StoreOutcome::LayoutBreak { skipped } => {
                format!("{store}: no offers extracted ({skipped} skipped); layout may have changed")
            }
            StoreOutcome::Failed(e) => format!("{store}: failed: {e}"),
            StoreOutcome::TimedOut => format!("{store}: timed out"),
        }
    }
}

async fn run_one(store: &Store, notifier: &dyn Notifier, timeout: Duration) -> StoreOutcome {
    let name = store.identity().name();

    let report = match store.process_data_within(timeout).await {
        Ok(report) => report,
        Err(StoreError::FetchTimeout { .. }) => {
            tracing::error!(
                store = name,
                timeout_secs = timeout.as_secs(),
                "store fetch timed out"
            );
            return StoreOutcome::TimedOut;
        }
        Err(e) => {
            log_run_error(name, &e);
            return StoreOutcome::Failed(e);
        }
    };

    if report.has_new_offers() {
        if let Err(e) = notifier.notify(store.identity(), report.added()).await {
            tracing::warn!(
                store = name,
                error = %e,
                "notification failed; offers are already persisted"
            );
        }
    }

    let skipped = report.item_failures.len();
    match report.status {
        RunStatus::Completed => StoreOutcome::Completed {
            added: report.comparison.added().len(),
            removed: report.comparison.removed().len(),
            unchanged: report.comparison.unchanged().len(),
            skipped,
        },
        RunStatus::LayoutBreak => StoreOutcome::LayoutBreak { skipped },
    }
}

/// Runs every store, at most `limits.max_concurrent` at a time. Results are
/// returned in the order of `stores`.
pub(super) async fn execute(
    stores: &[Store],
    notifier: &dyn Notifier,
    limits: RunLimits,
) -> Vec<StoreResult> {
    let max_concurrent = limits.max_concurrent.max(1);

    let mut indexed: Vec<(usize, StoreResult)> = stream::iter(stores.iter().enumerate())
        .map(|(index, store)| async move {
            let outcome = run_one(store, notifier, limits.store_timeout).await;
            (
                index,
                StoreResult {
                    store: store.identity().name().to_string(),
                    outcome,
                },
            )
        })
        .buffer_unordered(max_concurrent)
        .collect()
        .await;

    indexed.sort_by_key(|(index, _)| *index);
    indexed.into_iter().map(|(_, result)| result).collect()
}

/// Fails the command only when every selected store failed.
pub(super) fn ensure_not_all_failed(results: &[StoreResult]) -> anyhow::Result<()> {
    let failed = results.iter().filter(|r| r.is_failure()).count();

    if failed > 0 {
        tracing::warn!(
            failed_stores = failed,
            total_stores = results.len(),
            "some stores failed during the run"
        );
    }

    if !results.is_empty() && failed == results.len() {
        anyhow::bail!("all {failed} store(s) failed");
    }
    Ok(())
}

#[cfg(test)]
#[path = "runner_test.rs"]
mod tests;
