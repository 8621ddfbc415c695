//! Test doubles for list ports (feature: test-utils)
//!
//! Provides two small models with an association between them, a scripted
//! `QueryTransport`, and an in-memory `LocalStore` that counts its queries.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use skylist_domain::{
    GraphQLRequest, JsonValue, Model, ModelField, ModelSchema, Result, SkylistError,
};

use crate::ports::{LocalStore, QueryTransport};

/// Blog post with many comments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl Post {
    pub fn new(id: &str, title: &str) -> Self {
        Self { id: id.to_string(), title: Some(title.to_string()) }
    }
}

impl Model for Post {
    fn schema() -> ModelSchema {
        ModelSchema::new("Post")
            .with_field(ModelField::scalar("id"))
            .with_field(ModelField::scalar("title"))
            .with_field(ModelField::has_many("comments", "post"))
    }

    fn identifier(&self) -> &str {
        &self.id
    }
}

/// Comment belonging to a post through `postId`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub content: String,
    pub post_id: String,
}

impl Comment {
    pub fn new(id: &str, content: &str, post_id: &str) -> Self {
        Self { id: id.to_string(), content: content.to_string(), post_id: post_id.to_string() }
    }
}

impl Model for Comment {
    fn schema() -> ModelSchema {
        ModelSchema::new("Comment")
            .with_field(ModelField::scalar("id"))
            .with_field(ModelField::scalar("content"))
            .with_field(ModelField::belongs_to("post", "postId"))
    }

    fn identifier(&self) -> &str {
        &self.id
    }
}

/// `QueryTransport` answering from a queue of scripted responses.
///
/// Every submitted request is recorded. Once the queue is empty further
/// queries fail with a network error.
#[derive(Default)]
pub struct StubTransport {
    responses: Mutex<VecDeque<Result<JsonValue>>>,
    requests: Mutex<Vec<GraphQLRequest>>,
}

impl StubTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful response carrying `data`.
    pub fn respond_with(self, data: serde_json::Value) -> Self {
        self.responses.lock().push_back(Ok(JsonValue::from(data)));
        self
    }

    /// Queue a failure.
    pub fn fail_with(self, error: SkylistError) -> Self {
        self.responses.lock().push_back(Err(error));
        self
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Requests received so far, in order.
    pub fn requests(&self) -> Vec<GraphQLRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl QueryTransport for StubTransport {
    async fn query(&self, request: &GraphQLRequest) -> Result<JsonValue> {
        self.requests.lock().push(request.clone());
        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(SkylistError::Network("no scripted response left".into())))
    }
}

/// In-memory `LocalStore` over raw JSON records.
#[derive(Default)]
pub struct InMemoryLocalStore {
    records: Mutex<Vec<(String, JsonValue)>>,
    queries: AtomicUsize,
    failure: Mutex<Option<SkylistError>>,
}

impl InMemoryLocalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `record` under its model's schema name.
    pub fn insert<M: Model>(&self, record: &M) {
        if let Ok(value) = serde_json::to_value(record) {
            self.records.lock().push((M::schema().name, JsonValue::from(value)));
        }
    }

    /// Make every subsequent query fail with `error`; `None` clears it.
    pub fn set_failure(&self, error: Option<SkylistError>) {
        *self.failure.lock() = error;
    }

    /// Number of `query_where` calls served or failed so far.
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

impl LocalStore for InMemoryLocalStore {
    fn query_where(
        &self,
        schema: &ModelSchema,
        field: &ModelField,
        value: &str,
        limit: usize,
    ) -> Result<Vec<JsonValue>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.failure.lock().clone() {
            return Err(error);
        }

        let column = field.column_name();
        Ok(self
            .records
            .lock()
            .iter()
            .filter(|(model, record)| {
                *model == schema.name
                    && record.get(column).and_then(JsonValue::as_str) == Some(value)
            })
            .map(|(_, record)| record.clone())
            .take(limit)
            .collect())
    }
}
