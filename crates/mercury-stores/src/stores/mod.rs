//! Registry of configured stores.

pub mod psplus;

use std::sync::Arc;

use mercury_core::{channel_from_env, OfferRepository, StoreIdentity};

use crate::fetch::Fetcher;
use crate::store::Store;

/// Machine names of every registered store, in run order.
pub const STORE_NAMES: &[&str] = &[psplus::NAME];

/// Identity of the store named `name`, with its notification channel
/// resolved from the environment. Returns `None` for an unknown name.
#[must_use]
pub fn identity(name: &str) -> Option<StoreIdentity> {
    match name {
        psplus::NAME => Some(psplus::identity(channel_from_env(psplus::NAME))),
        _ => None,
    }
}

/// Builds the store named `name`. Returns `None` for an unknown name.
#[must_use]
pub fn build_store(
    name: &str,
    fetcher: Arc<dyn Fetcher>,
    repository: Arc<dyn OfferRepository>,
) -> Option<Store> {
    let identity = identity(name)?;
    match name {
        psplus::NAME => Some(psplus::store(identity, fetcher, repository)),
        _ => None,
    }
}

/// Builds every registered store.
#[must_use]
pub fn build_all(fetcher: &Arc<dyn Fetcher>, repository: &Arc<dyn OfferRepository>) -> Vec<Store> {
    STORE_NAMES
        .iter()
        .filter_map(|name| build_store(name, Arc::clone(fetcher), Arc::clone(repository)))
        .collect()
}

#[cfg(test)]
mod tests {
    use mercury_core::InMemoryOfferRepository;

    use super::*;
    use crate::fetch::HttpFetcher;

    fn deps() -> (Arc<dyn Fetcher>, Arc<dyn OfferRepository>) {
        (
            Arc::new(HttpFetcher::new(5, "mercury-test/0.1").unwrap()),
            Arc::new(InMemoryOfferRepository::new()),
        )
    }

    #[test]
    fn build_store_knows_psplus() {
        let (fetcher, repo) = deps();
        let store = build_store("psplus", fetcher, repo).unwrap();
        assert_eq!(store.identity().id(), "4");
    }

    #[test]
    fn identity_for_unknown_name_is_none() {
        assert!(identity("steam").is_none());
        let psplus = identity("psplus").unwrap();
        assert_eq!(psplus.service_name(), "PlayStation Plus");
    }

    #[test]
    fn build_store_unknown_name_is_none() {
        let (fetcher, repo) = deps();
        assert!(build_store("steam", fetcher, repo).is_none());
    }

    #[test]
    fn build_all_covers_every_registered_name() {
        let (fetcher, repo) = deps();
        let stores = build_all(&fetcher, &repo);
        let names: Vec<&str> = stores.iter().map(|s| s.identity().name()).collect();
        assert_eq!(names, STORE_NAMES);
    }
}
