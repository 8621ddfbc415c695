//! Configuration structures

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_API_MAX_ATTEMPTS, DEFAULT_API_TIMEOUT_SECS, DEFAULT_DB_POOL_SIZE, DEFAULT_PAGE_SIZE,
};

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub datastore: DataStoreConfig,
}

/// GraphQL API endpoint settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    pub endpoint: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,
}

/// Local store settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataStoreConfig {
    pub path: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
    #[serde(default)]
    pub encryption_key: Option<String>,
    /// Records fetched per deferred association load.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

const fn default_timeout_seconds() -> u64 {
    DEFAULT_API_TIMEOUT_SECS
}

const fn default_max_attempts() -> usize {
    DEFAULT_API_MAX_ATTEMPTS
}

const fn default_pool_size() -> u32 {
    DEFAULT_DB_POOL_SIZE
}

const fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optional_fields_fall_back_to_defaults() {
        let config: Config = serde_json::from_str(
            r#"{
                "api": { "endpoint": "https://api.example.com/graphql" },
                "datastore": { "path": "/tmp/skylist.db" }
            }"#,
        )
        .unwrap();

        assert_eq!(config.api.api_key, None);
        assert_eq!(config.api.timeout_seconds, 30);
        assert_eq!(config.api.max_attempts, 3);
        assert_eq!(config.datastore.pool_size, 4);
        assert_eq!(config.datastore.page_size, 100);
    }
}
