use std::num::NonZeroU64;

use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<usize>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let database_url = require("DATABASE_URL")?;
    let env = parse_environment(&or_default("MERCURY_ENV", "development"))?;
    let log_level = or_default("MERCURY_LOG_LEVEL", "info");

    let db_max_connections = parse_u32("MERCURY_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("MERCURY_DB_MIN_CONNECTIONS", "1")?;
    if db_min_connections > db_max_connections {
        return Err(ConfigError::InvalidEnvVar {
            var: "MERCURY_DB_MIN_CONNECTIONS".to_string(),
            reason: format!(
                "{db_min_connections} exceeds MERCURY_DB_MAX_CONNECTIONS ({db_max_connections})"
            ),
        });
    }
    let db_acquire_timeout_secs = parse_u64("MERCURY_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let fetch_timeout_secs = parse_u64("MERCURY_FETCH_TIMEOUT_SECS", "30")?;
    let user_agent = or_default("MERCURY_USER_AGENT", "mercury/0.1 (deal-aggregator)");
    let max_concurrent_stores = parse_usize("MERCURY_MAX_CONCURRENT_STORES", "4")?;
    let store_timeout_secs = parse_u64("MERCURY_STORE_TIMEOUT_SECS", "120")?;
    let notify_webhook_url = lookup("MERCURY_NOTIFY_WEBHOOK_URL")
        .ok()
        .filter(|url| !url.trim().is_empty());

    Ok(AppConfig {
        database_url,
        env,
        log_level,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        fetch_timeout_secs,
        user_agent,
        max_concurrent_stores,
        store_timeout_secs,
        notify_webhook_url,
    })
}

fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "MERCURY_ENV".to_string(),
            reason: format!("unknown environment \"{other}\""),
        }),
    }
}

/// Name of the env var holding the notification channel for `store_name`,
/// e.g. `MERCURY_CHANNEL_PSPLUS`.
#[must_use]
pub fn channel_var(store_name: &str) -> String {
    format!("MERCURY_CHANNEL_{}", store_name.to_ascii_uppercase())
}

/// Parse a notification channel id.
///
/// Only plain ASCII digits are accepted. Anything else, including `"0"`,
/// resolves to `None` ("unset"); this never fails.
#[must_use]
pub fn parse_channel_id(raw: &str) -> Option<NonZeroU64> {
    let raw = raw.trim();
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse::<u64>().ok().and_then(NonZeroU64::new)
}

/// Resolve the channel for `store_name` through `lookup`.
#[must_use]
pub fn resolve_channel_id<F>(lookup: F, store_name: &str) -> Option<NonZeroU64>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    lookup(&channel_var(store_name))
        .ok()
        .and_then(|raw| parse_channel_id(&raw))
}

/// Resolve the channel for `store_name` from the process environment.
#[must_use]
pub fn channel_from_env(store_name: &str) -> Option<NonZeroU64> {
    resolve_channel_id(|key| std::env::var(key), store_name)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
