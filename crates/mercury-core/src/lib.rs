//! Domain types shared by every Mercury crate: the normalized [`Offer`]
//! record, store identity, the persistence boundary, and environment
//! configuration.

mod app_config;
mod config;
pub mod offers;
pub mod repository;
pub mod store;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use config::{
    channel_from_env, channel_var, load_app_config, load_app_config_from_env, parse_channel_id,
    resolve_channel_id,
};
pub use offers::{Discount, Offer, OfferKey};
pub use repository::{InMemoryOfferRepository, OfferRepository, PersistenceError};
pub use store::StoreIdentity;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("offer title is empty")]
    EmptyTitle,

    #[error("offer \"{title}\" has an empty url")]
    EmptyUrl { title: String },

    #[error("invalid discount: {0}")]
    InvalidDiscount(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("required environment variable {0} is not set")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
