//! GraphQL client backing remote lists
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;
use skylist_core::QueryTransport;
use skylist_domain::{ApiConfig, GraphQLRequest, JsonValue, Result, SkylistError};
use tracing::{debug, warn};

use crate::http::HttpClient;

const API_KEY_HEADER: &str = "x-api-key";

/// Provides bearer tokens for authenticated GraphQL calls.
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    /// Retrieve a token to place in the `Authorization` header.
    async fn access_token(&self) -> Result<String>;
}

/// How requests to the endpoint are authorized.
#[derive(Clone, Default)]
pub enum GraphQLAuth {
    #[default]
    None,
    ApiKey(String),
    Bearer(Arc<dyn AccessTokenProvider>),
}

impl fmt::Debug for GraphQLAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::ApiKey(_) => f.write_str("ApiKey(..)"),
            Self::Bearer(_) => f.write_str("Bearer(..)"),
        }
    }
}

/// [`QueryTransport`] posting operations to a single GraphQL endpoint.
#[derive(Debug, Clone)]
pub struct GraphQLClient {
    endpoint: String,
    http_client: HttpClient,
    auth: GraphQLAuth,
}

impl GraphQLClient {
    pub fn new(endpoint: impl Into<String>, http_client: HttpClient, auth: GraphQLAuth) -> Self {
        Self { endpoint: endpoint.into(), http_client, auth }
    }

    /// Client for `config.endpoint`, using its API key when one is set.
    ///
    /// # Errors
    /// Returns `SkylistError::Config` for an empty endpoint, or the HTTP
    /// client's construction error.
    pub fn from_config(config: &ApiConfig) -> Result<Self> {
        if config.endpoint.trim().is_empty() {
            return Err(SkylistError::Config("API endpoint must not be empty".into()));
        }
        let auth = config.api_key.clone().map_or(GraphQLAuth::None, GraphQLAuth::ApiKey);
        Ok(Self::new(config.endpoint.clone(), HttpClient::from_config(config)?, auth))
    }

    /// Replace the authorization mode.
    pub fn with_auth(mut self, auth: GraphQLAuth) -> Self {
        self.auth = auth;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn execute(&self, request: &GraphQLRequest) -> Result<JsonValue> {
        let mut builder = self
            .http_client
            .request(Method::POST, &self.endpoint)
            .header("Content-Type", "application/json")
            .json(&request.to_body());
        builder = match &self.auth {
            GraphQLAuth::None => builder,
            GraphQLAuth::ApiKey(key) => builder.header(API_KEY_HEADER, key),
            GraphQLAuth::Bearer(provider) => {
                let token = provider.access_token().await?;
                builder.bearer_auth(token)
            }
        };

        let response = self.http_client.send(builder).await?;
        let status = response.status();
        debug!(status = status.as_u16(), operation = %request.decode_path, "Received GraphQL response");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SkylistError::Network(format!(
                "GraphQL endpoint returned HTTP {status}: {body}"
            )));
        }

        let envelope: GraphQLResponse = response.json().await.map_err(|err| {
            SkylistError::Decode(format!("failed to parse GraphQL response: {err}"))
        })?;

        if let Some(errors) = envelope.errors.filter(|errors| !errors.is_empty()) {
            let messages: Vec<&str> = errors.iter().map(|error| error.message.as_str()).collect();
            warn!(
                operation = %request.decode_path,
                error_count = errors.len(),
                "GraphQL response carried errors"
            );
            return Err(SkylistError::Service(format!("GraphQL errors: {}", messages.join(", "))));
        }

        envelope
            .data
            .filter(|data| !data.is_null())
            .map(JsonValue::from)
            .ok_or_else(|| SkylistError::Internal("GraphQL response missing data field".into()))
    }
}

#[async_trait]
impl QueryTransport for GraphQLClient {
    async fn query(&self, request: &GraphQLRequest) -> Result<JsonValue> {
        self.execute(request).await
    }
}

// =============================================================================
// Response types
// =============================================================================

#[derive(Debug, Deserialize)]
struct GraphQLResponse {
    data: Option<serde_json::Value>,
    errors: Option<Vec<GraphQLError>>,
}

#[derive(Debug, Deserialize)]
struct GraphQLError {
    message: String,
}
