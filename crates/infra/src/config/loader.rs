//! Configuration loader
//!
//! ## Loading Strategy
//! 1. Attempt to load from environment variables
//! 2. If a required variable is missing or invalid, fall back to a file
//! 3. Probe several locations for the file
//! 4. JSON and TOML are both accepted, chosen by extension
//!
//! ## Environment Variables
//! - `SKYLIST_API_ENDPOINT` (required): GraphQL endpoint URL
//! - `SKYLIST_API_KEY`: API key sent as `x-api-key`
//! - `SKYLIST_API_TIMEOUT`: per-request timeout in seconds
//! - `SKYLIST_API_MAX_ATTEMPTS`: HTTP attempts including the first
//! - `SKYLIST_DB_PATH` (required): local store database file
//! - `SKYLIST_DB_POOL_SIZE`: connection pool size
//! - `SKYLIST_DB_ENCRYPTION_KEY`: SQLCipher key
//! - `SKYLIST_PAGE_SIZE`: records per deferred association load
//!
//! ## File Locations
//! `config.{json,toml}` or `skylist.{json,toml}` in the working directory,
//! then `config.{json,toml}` one and two levels up, then the same names
//! beside the executable.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use skylist_domain::constants::{
    DEFAULT_API_MAX_ATTEMPTS, DEFAULT_API_TIMEOUT_SECS, DEFAULT_DB_POOL_SIZE, DEFAULT_PAGE_SIZE,
};
use skylist_domain::{ApiConfig, Config, DataStoreConfig, Result, SkylistError};

const FILE_NAMES: [&str; 4] = ["config.json", "config.toml", "skylist.json", "skylist.toml"];
const PARENT_FILE_NAMES: [&str; 4] =
    ["../config.json", "../config.toml", "../../config.json", "../../config.toml"];

/// Load configuration, preferring the environment over files.
///
/// # Errors
/// Returns `SkylistError::Config` when neither source yields a valid
/// configuration.
pub fn load() -> Result<Config> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(err) => {
            tracing::debug!(error = %err, "Environment configuration incomplete, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from `SKYLIST_*` environment variables.
///
/// # Errors
/// Returns `SkylistError::Config` if a required variable is missing or a
/// numeric variable does not parse.
pub fn load_from_env() -> Result<Config> {
    let api = ApiConfig {
        endpoint: env_var("SKYLIST_API_ENDPOINT")?,
        api_key: optional_env_var("SKYLIST_API_KEY"),
        timeout_seconds: env_number("SKYLIST_API_TIMEOUT", DEFAULT_API_TIMEOUT_SECS)?,
        max_attempts: env_number("SKYLIST_API_MAX_ATTEMPTS", DEFAULT_API_MAX_ATTEMPTS)?,
    };
    let datastore = DataStoreConfig {
        path: env_var("SKYLIST_DB_PATH")?,
        pool_size: env_number("SKYLIST_DB_POOL_SIZE", DEFAULT_DB_POOL_SIZE)?,
        encryption_key: optional_env_var("SKYLIST_DB_ENCRYPTION_KEY"),
        page_size: env_number("SKYLIST_PAGE_SIZE", DEFAULT_PAGE_SIZE)?,
    };
    Ok(Config { api, datastore })
}

/// Load configuration from `path`, or from the first probed file if `None`.
///
/// # Errors
/// Returns `SkylistError::Config` if the file is missing, unreadable, of an
/// unsupported format, or invalid.
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(path) if path.exists() => path,
        Some(path) => {
            return Err(SkylistError::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        None => probe_config_paths().ok_or_else(|| {
            SkylistError::Config("No config file found in any of the standard locations".into())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|err| SkylistError::Config(format!("Failed to read config file: {err}")))?;

    parse_config(&contents, &config_path)
}

fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|err| SkylistError::Config(format!("Invalid TOML format: {err}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|err| SkylistError::Config(format!("Invalid JSON format: {err}"))),
        other => Err(SkylistError::Config(format!("Unsupported config format: {other}"))),
    }
}

/// First existing config file among the standard locations.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        candidates.extend(candidate_paths(&cwd));
    }

    if let Some(exe_dir) =
        std::env::current_exe().ok().and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        candidates.extend(candidate_paths(&exe_dir));
    }

    candidates.into_iter().find(|path| path.exists())
}

fn candidate_paths(dir: &Path) -> impl Iterator<Item = PathBuf> + '_ {
    FILE_NAMES.iter().chain(PARENT_FILE_NAMES.iter()).map(move |name| dir.join(name))
}

fn env_var(key: &str) -> Result<String> {
    std::env::var(key)
        .map_err(|_| SkylistError::Config(format!("Missing required environment variable: {key}")))
}

fn optional_env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

fn env_number<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match optional_env_var(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|err| SkylistError::Config(format!("Invalid value for {key}: {err}"))),
    }
}
