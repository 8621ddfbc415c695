#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use skylist_domain::ApiConfig;
use skylist_infra::{GraphQLAuth, GraphQLClient, HttpClient, SqliteLocalStore};
use tempfile::TempDir;
use wiremock::MockServer;

/// Local store in a temporary directory that lives as long as the value.
pub struct TestStore {
    pub store: Arc<SqliteLocalStore>,
    _dir: TempDir,
}

impl TestStore {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("temp dir should be created");
        let store = SqliteLocalStore::open(dir.path().join("store.db"), 2, None)
            .expect("store should open");
        Self { store: Arc::new(store), _dir: dir }
    }
}

/// GraphQL client pointed at `server` with no retries.
pub fn graphql_client(server: &MockServer) -> Arc<GraphQLClient> {
    let http = HttpClient::builder()
        .timeout(Duration::from_secs(5))
        .max_attempts(1)
        .build()
        .expect("http client");
    Arc::new(GraphQLClient::new(
        format!("{}/graphql", server.uri()),
        http,
        GraphQLAuth::ApiKey("da2-test".into()),
    ))
}

pub fn api_config(server: &MockServer) -> ApiConfig {
    ApiConfig {
        endpoint: format!("{}/graphql", server.uri()),
        api_key: Some("da2-test".into()),
        timeout_seconds: 5,
        max_attempts: 1,
    }
}
