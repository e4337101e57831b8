use std::env::VarError;
use std::path::PathBuf;
use std::str::FromStr;

use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

const API_BASE_URL: &str = "VEHDRAFT_API_BASE_URL";
const ENV: &str = "VEHDRAFT_ENV";
const LOG_LEVEL: &str = "VEHDRAFT_LOG_LEVEL";
const FIELD_SCHEMA_PATH: &str = "VEHDRAFT_FIELD_SCHEMA_PATH";
const REQUEST_TIMEOUT_SECS: &str = "VEHDRAFT_REQUEST_TIMEOUT_SECS";
const USER_AGENT: &str = "VEHDRAFT_USER_AGENT";
const FIELD_SYNC_DEBOUNCE_MS: &str = "VEHDRAFT_FIELD_SYNC_DEBOUNCE_MS";
const AUTOSAVE_INTERVAL_SECS: &str = "VEHDRAFT_AUTOSAVE_INTERVAL_SECS";
const MAX_RETRIES: &str = "VEHDRAFT_MAX_RETRIES";
const RETRY_BACKOFF_BASE_MS: &str = "VEHDRAFT_RETRY_BACKOFF_BASE_MS";

const DEFAULT_USER_AGENT: &str = "vehdraft/0.1 (listing-drafts)";

/// Loads configuration from the process environment, reading `.env` first.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Same as [`load_app_config`] without touching `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

fn invalid(var: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidEnvVar {
        var: var.to_owned(),
        reason: reason.into(),
    }
}

/// Builds the config from an arbitrary variable lookup, so tests can feed a map.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, VarError>,
{
    let text = |var: &str, default: &str| lookup(var).unwrap_or_else(|_| default.to_owned());
    let number = |var: &str, default: &str| -> Result<u64, ConfigError> {
        parse_var(var, &text(var, default))
    };

    let api_base_url = lookup(API_BASE_URL)
        .map_err(|_| ConfigError::MissingEnvVar(API_BASE_URL.to_owned()))?;
    let scheme_ok = ["http://", "https://"]
        .iter()
        .any(|scheme| api_base_url.starts_with(scheme));
    if !scheme_ok {
        return Err(invalid(
            API_BASE_URL,
            format!("expected an http(s) URL, got '{api_base_url}'"),
        ));
    }

    let autosave_interval_secs = number(AUTOSAVE_INTERVAL_SECS, "60")?;
    if autosave_interval_secs == 0 {
        return Err(invalid(AUTOSAVE_INTERVAL_SECS, "must be greater than zero"));
    }

    Ok(AppConfig {
        env: parse_environment(&text(ENV, "development"))?,
        log_level: text(LOG_LEVEL, "info"),
        api_base_url,
        field_schema_path: PathBuf::from(text(FIELD_SCHEMA_PATH, "./config/fields.yaml")),
        request_timeout_secs: number(REQUEST_TIMEOUT_SECS, "30")?,
        user_agent: text(USER_AGENT, DEFAULT_USER_AGENT),
        field_sync_debounce_ms: number(FIELD_SYNC_DEBOUNCE_MS, "300")?,
        autosave_interval_secs,
        max_retries: parse_var(MAX_RETRIES, &text(MAX_RETRIES, "2"))?,
        retry_backoff_base_ms: number(RETRY_BACKOFF_BASE_MS, "500")?,
    })
}

fn parse_var<T>(var: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| invalid(var, e.to_string()))
}

fn parse_environment(raw: &str) -> Result<Environment, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "development" | "dev" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" | "prod" => Ok(Environment::Production),
        other => Err(invalid(ENV, format!("unknown environment '{other}'"))),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
