//! Port interfaces for the backends a list reaches through
//!
//! Adapters live in `skylist-infra`; test doubles in [`crate::testing`].

use async_trait::async_trait;
use skylist_domain::{GraphQLRequest, JsonValue, ModelField, ModelSchema, Result};

/// Issues GraphQL queries against a remote API.
#[async_trait]
pub trait QueryTransport: Send + Sync {
    /// Submit `request` and return the response's `data` member.
    ///
    /// Transport failures and GraphQL `errors` are returned as errors; the
    /// list layer propagates them verbatim.
    async fn query(&self, request: &GraphQLRequest) -> Result<JsonValue>;
}

/// Synchronous query access to locally persisted records.
pub trait LocalStore: Send + Sync {
    /// Fetch up to `limit` raw records of `schema` whose `field` equals `value`.
    fn query_where(
        &self,
        schema: &ModelSchema,
        field: &ModelField,
        value: &str,
        limit: usize,
    ) -> Result<Vec<JsonValue>>;
}
