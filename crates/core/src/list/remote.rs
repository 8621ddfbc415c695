//! Remote (GraphQL) list pages
//!
//! A remote page decodes from one of three shapes, tried in order:
//!
//! 1. An envelope `{document, variables, graphQLData}` produced after a list
//!    query. The data holds `items`/`nextToken` directly or one level down
//!    under the operation name (`{"listPosts": {"items": [...]}}`). When the
//!    `graphQLData` key is absent, the envelope's remaining keys are the data.
//! 2. A bare `{items: [...]}` object. No cursor is retained.
//! 3. A bare array.
//!
//! The envelope keeps the original document and variables so the next page
//! can be requested with the same filter and limit.

use std::fmt;
use std::sync::Arc;

use skylist_domain::constants::{
    DOCUMENT_KEY, FILTER_VARIABLE, GRAPHQL_DATA_KEY, ITEMS_KEY, LIMIT_VARIABLE, NEXT_TOKEN_KEY,
    VARIABLES_KEY,
};
use skylist_domain::{
    GraphQLRequest, JsonObject, JsonValue, Model, ModelSchema, Result, SkylistError,
};
use tracing::{debug, error};

use super::registry::{DecodedList, ListDecoder};
use super::List;
use crate::ports::QueryTransport;
use crate::query::ListQueryBuilder;

/// List response envelope carrying the request that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct ListPayload {
    pub document: String,
    pub variables: Option<JsonObject>,
    pub data: JsonValue,
}

impl ListPayload {
    /// Recognise the envelope shape; `None` if `value` is not one.
    pub fn from_json(value: &JsonValue) -> Option<Self> {
        let object = value.as_object()?;
        let document = object.get(DOCUMENT_KEY)?.as_str()?.to_owned();
        let variables = match object.get(VARIABLES_KEY) {
            None | Some(JsonValue::Null) => None,
            Some(JsonValue::Object(variables)) => Some(variables.clone()),
            Some(_) => return None,
        };
        let data = match object.get(GRAPHQL_DATA_KEY) {
            Some(data) => data.clone(),
            None => {
                let rest: JsonObject = object
                    .iter()
                    .filter(|(key, _)| *key != DOCUMENT_KEY && *key != VARIABLES_KEY)
                    .map(|(key, value)| (key.clone(), value.clone()))
                    .collect();
                if rest.is_empty() {
                    return None;
                }
                JsonValue::Object(rest)
            }
        };
        Some(Self { document, variables, data })
    }

    /// Envelope built from a request and the `data` it returned.
    pub fn from_response(request: GraphQLRequest, data: JsonValue) -> Self {
        let variables: JsonObject = request
            .variables
            .into_iter()
            .map(|(key, value)| (key, JsonValue::from(value)))
            .collect();
        Self { document: request.document, variables: Some(variables), data }
    }

    /// Envelope form accepted by [`ListPayload::from_json`].
    pub fn to_json(&self) -> JsonValue {
        let mut object = JsonObject::new();
        object.insert(DOCUMENT_KEY.into(), JsonValue::from(self.document.as_str()));
        object.insert(
            VARIABLES_KEY.into(),
            self.variables.clone().map_or(JsonValue::Null, JsonValue::Object),
        );
        object.insert(GRAPHQL_DATA_KEY.into(), self.data.clone());
        JsonValue::Object(object)
    }

    /// `items` at the top of the data, or one level down.
    pub fn items(&self) -> &[JsonValue] {
        self.lookup(ITEMS_KEY).and_then(JsonValue::as_array).unwrap_or_default()
    }

    /// `nextToken` at the top of the data, or one level down.
    pub fn next_token(&self) -> Option<&str> {
        self.lookup(NEXT_TOKEN_KEY).and_then(JsonValue::as_str)
    }

    fn lookup(&self, key: &str) -> Option<&JsonValue> {
        let direct = self.data.get(key);
        if direct.is_some_and(|value| !value.is_null()) {
            return direct;
        }
        self.data.first_entry().and_then(|(_, nested)| nested.get(key))
    }

    fn into_decoded(self, transport: Arc<dyn QueryTransport>) -> DecodedList {
        let items = self.items().to_vec();
        let next_token = self.next_token().map(str::to_owned);
        let page = RemotePage::new(transport).with_continuation(
            next_token,
            Some(self.document),
            self.variables,
        );
        DecodedList::remote(items, page)
    }
}

/// Pagination state of one remote page.
#[derive(Clone)]
pub struct RemotePage {
    transport: Arc<dyn QueryTransport>,
    next_token: Option<String>,
    document: Option<String>,
    variables: Option<JsonObject>,
}

impl RemotePage {
    /// Terminal page with no continuation state.
    pub fn new(transport: Arc<dyn QueryTransport>) -> Self {
        Self { transport, next_token: None, document: None, variables: None }
    }

    /// Attach the cursor, original document and variables of this page.
    pub fn with_continuation(
        mut self,
        next_token: Option<String>,
        document: Option<String>,
        variables: Option<JsonObject>,
    ) -> Self {
        self.next_token = next_token;
        self.document = document;
        self.variables = variables;
        self
    }

    pub fn next_token(&self) -> Option<&str> {
        self.next_token.as_deref()
    }

    pub fn document(&self) -> Option<&str> {
        self.document.as_deref()
    }

    pub fn variables(&self) -> Option<&JsonObject> {
        self.variables.as_ref()
    }

    /// True when a cursor for the following page is held.
    pub fn has_next_page(&self) -> bool {
        self.next_token.is_some()
    }

    /// Rebuild the list request for the page after this one.
    ///
    /// The stored `filter` is re-encoded as the new request's filter input
    /// and a stored numeric `limit` is carried forward (truncated to an
    /// integer) next to the cursor.
    ///
    /// # Errors
    /// - `MissingContinuation` without a cursor or original document
    /// - `InvalidFilter` if the stored filter cannot be re-encoded
    pub fn next_page_request(&self, schema: &ModelSchema) -> Result<GraphQLRequest> {
        let (Some(next_token), Some(_)) = (self.next_token.as_deref(), self.document.as_deref())
        else {
            return Err(SkylistError::MissingContinuation(
                "no cursor for a following page; check has_next_page()".into(),
            ));
        };

        let mut builder = ListQueryBuilder::new(schema);
        if let Some(filter) = self.stored_variable(FILTER_VARIABLE).and_then(JsonValue::as_object) {
            builder = builder.filter(filter).map_err(|err| {
                error!(model = %schema.name, error = %err, "Stored list filter cannot be re-encoded");
                err
            })?;
        }
        if let Some(limit) = self.stored_variable(LIMIT_VARIABLE).and_then(truncate_limit) {
            builder = builder.limit(limit);
        }
        Ok(builder.next_token(next_token).build())
    }

    /// Fetch the page after this one.
    ///
    /// # Errors
    /// See [`RemotePage::next_page_request`]; transport errors are returned
    /// unchanged.
    pub async fn next_page<M: Model>(&self) -> Result<List<M>> {
        let request = self.next_page_request(&M::schema())?;
        fetch_page(&self.transport, request).await
    }

    fn stored_variable(&self, name: &str) -> Option<&JsonValue> {
        self.variables.as_ref().and_then(|variables| variables.get(name))
    }
}

impl fmt::Debug for RemotePage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemotePage")
            .field("next_token", &self.next_token)
            .field("document", &self.document)
            .field("variables", &self.variables)
            .finish_non_exhaustive()
    }
}

/// Integer part of a stored numeric limit; anything else is dropped.
#[allow(clippy::cast_possible_truncation)]
fn truncate_limit(limit: &JsonValue) -> Option<i64> {
    match limit {
        JsonValue::Float(value) if value.is_finite() => Some(value.trunc() as i64),
        JsonValue::Float(_) => None,
        JsonValue::UInteger(_) => Some(i64::MAX),
        other => other.as_i64(),
    }
}

async fn fetch_page<M: Model>(
    transport: &Arc<dyn QueryTransport>,
    request: GraphQLRequest,
) -> Result<List<M>> {
    debug!(
        query = %request.decode_path,
        cursor = request.variables.get("nextToken").and_then(|token| token.as_str()),
        "Submitting list query"
    );
    let data = transport.query(&request).await?;
    let payload = ListPayload::from_response(request, data);
    Ok(List::from_decoded(payload.into_decoded(Arc::clone(transport))))
}

/// Decoder for GraphQL list responses.
#[derive(Clone)]
pub struct RemoteListDecoder {
    transport: Arc<dyn QueryTransport>,
}

impl RemoteListDecoder {
    /// Decoder whose pages fetch follow-ups through `transport`.
    pub fn new(transport: Arc<dyn QueryTransport>) -> Self {
        Self { transport }
    }

    /// Decode `payload` with the remote rules, regardless of sniffing.
    pub fn decode_payload(&self, payload: &JsonValue) -> DecodedList {
        if let Some(envelope) = ListPayload::from_json(payload) {
            return envelope.into_decoded(Arc::clone(&self.transport));
        }
        let items = payload.get(ITEMS_KEY).and_then(JsonValue::as_array).or_else(|| payload.as_array());
        match items {
            Some(items) => {
                DecodedList::remote(items.to_vec(), RemotePage::new(Arc::clone(&self.transport)))
            }
            None => DecodedList::empty(),
        }
    }

    /// Run a list query and decode its first page.
    ///
    /// # Errors
    /// Transport errors are returned unchanged.
    pub async fn query<M: Model>(&self, request: GraphQLRequest) -> Result<List<M>> {
        fetch_page(&self.transport, request).await
    }
}

impl ListDecoder for RemoteListDecoder {
    fn name(&self) -> &'static str {
        "remote"
    }

    fn should_decode(&self, payload: &JsonValue) -> bool {
        payload.get(ITEMS_KEY).and_then(JsonValue::as_array).is_some()
            || ListPayload::from_json(payload).is_some()
    }

    fn decode(&self, payload: &JsonValue, _schema: &ModelSchema) -> DecodedList {
        self.decode_payload(payload)
    }
}

impl fmt::Debug for RemoteListDecoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteListDecoder").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};
    use serde_json::json;
    use skylist_domain::ModelField;

    use super::*;
    use crate::list::registry::ListDecoderRegistry;
    use crate::query::paginated_list_request;
    use crate::testing::{Post, StubTransport};

    fn registry_with(transport: &Arc<StubTransport>) -> ListDecoderRegistry {
        let transport: Arc<dyn QueryTransport> = transport.clone();
        ListDecoderRegistry::new().with_decoder(RemoteListDecoder::new(transport))
    }

    fn payload(value: serde_json::Value) -> JsonValue {
        JsonValue::from(value)
    }

    const DOCUMENT: &str = "query ListPosts { listPosts { items { id } nextToken } }";

    #[test]
    fn envelope_exposes_cursor() {
        let transport = StubTransport::new().into_arc();
        let mut list: List<Post> = registry_with(&transport).decode(&payload(json!({
            "document": DOCUMENT,
            "graphQLData": {"items": [{"id": "1"}], "nextToken": "abc"}
        })));

        assert_eq!(list.len(), 1);
        assert!(list.has_next_page());
        assert_eq!(list.next_token(), Some("abc"));
    }

    #[test]
    fn envelope_reads_items_nested_under_operation_name() {
        let transport = StubTransport::new().into_arc();
        let mut list: List<Post> = registry_with(&transport).decode(&payload(json!({
            "document": DOCUMENT,
            "variables": {"limit": 2},
            "listPosts": {"items": [{"id": "1"}, {"id": "2"}], "nextToken": "next"}
        })));

        assert_eq!(list.len(), 2);
        assert_eq!(list.next_token(), Some("next"));
    }

    #[test]
    fn envelope_without_cursor_is_terminal() {
        let transport = StubTransport::new().into_arc();
        let list: List<Post> = registry_with(&transport).decode(&payload(json!({
            "document": DOCUMENT,
            "graphQLData": {"listPosts": {"items": [], "nextToken": null}}
        })));

        assert!(!list.has_next_page());
    }

    #[test]
    fn bare_items_object_keeps_no_pagination_metadata() {
        let transport = StubTransport::new().into_arc();
        let mut list: List<Post> = registry_with(&transport)
            .decode(&payload(json!({"items": [{"id": "1"}], "nextToken": "ignored"})));

        assert_eq!(list.len(), 1);
        assert!(!list.has_next_page());
    }

    #[tokio::test]
    async fn terminal_page_reports_missing_continuation() {
        let transport = StubTransport::new().into_arc();
        let list: List<Post> =
            registry_with(&transport).decode(&payload(json!({"items": [{"id": "1"}]})));

        let err = list.next_page().await.unwrap_err();
        assert!(matches!(err, SkylistError::MissingContinuation(_)));
        assert!(transport.requests().is_empty());
    }

    #[test]
    fn next_page_request_carries_filter_limit_and_cursor() {
        let transport: Arc<dyn QueryTransport> = StubTransport::new().into_arc();
        let variables = payload(json!({
            "filter": {"or": [{"id": {"eq": "1"}}, {"id": {"eq": "2"}}]},
            "limit": 1
        }));
        let page = RemotePage::new(transport).with_continuation(
            Some("abc".into()),
            Some(DOCUMENT.into()),
            variables.as_object().cloned(),
        );

        let request = page.next_page_request(&Post::schema()).unwrap();

        assert_eq!(
            serde_json::Value::Object(request.variables),
            json!({
                "filter": {"or": [{"id": {"eq": "1"}}, {"id": {"eq": "2"}}]},
                "limit": 1,
                "nextToken": "abc"
            })
        );
        assert!(request.document.contains("$filter: ModelPostFilterInput"));
        assert!(request.document.contains("$limit: Int"));
    }

    #[test]
    fn next_page_request_without_stored_variables_sends_only_cursor() {
        let transport: Arc<dyn QueryTransport> = StubTransport::new().into_arc();
        let page = RemotePage::new(transport).with_continuation(
            Some("abc".into()),
            Some(DOCUMENT.into()),
            None,
        );

        let request = page.next_page_request(&Post::schema()).unwrap();

        assert_eq!(serde_json::Value::Object(request.variables), json!({"nextToken": "abc"}));
        assert!(!request.document.contains("$limit"));
    }

    #[test]
    fn next_page_request_truncates_fractional_limit() {
        let transport: Arc<dyn QueryTransport> = StubTransport::new().into_arc();
        let page = RemotePage::new(transport).with_continuation(
            Some("abc".into()),
            Some(DOCUMENT.into()),
            payload(json!({"limit": 2.7})).as_object().cloned(),
        );

        let request = page.next_page_request(&Post::schema()).unwrap();
        assert_eq!(request.variables.get("limit"), Some(&json!(2)));
    }

    #[test]
    fn next_page_request_drops_non_numeric_limit() {
        let transport: Arc<dyn QueryTransport> = StubTransport::new().into_arc();
        let page = RemotePage::new(transport).with_continuation(
            Some("abc".into()),
            Some(DOCUMENT.into()),
            payload(json!({"limit": "5"})).as_object().cloned(),
        );

        let request = page.next_page_request(&Post::schema()).unwrap();

        assert_eq!(serde_json::Value::Object(request.variables), json!({"nextToken": "abc"}));
        assert!(!request.document.contains("$limit"));
    }

    #[test]
    fn next_page_request_keeps_large_integer_limit_exact() {
        let transport: Arc<dyn QueryTransport> = StubTransport::new().into_arc();
        let page = RemotePage::new(transport).with_continuation(
            Some("abc".into()),
            Some(DOCUMENT.into()),
            payload(json!({"limit": 9_007_199_254_740_993_i64})).as_object().cloned(),
        );

        let request = page.next_page_request(&Post::schema()).unwrap();
        assert_eq!(request.variables.get("limit"), Some(&json!(9_007_199_254_740_993_i64)));
    }

    #[test]
    fn next_page_request_requires_document() {
        let transport: Arc<dyn QueryTransport> = StubTransport::new().into_arc();
        let page = RemotePage::new(transport).with_continuation(Some("abc".into()), None, None);

        let err = page.next_page_request(&Post::schema()).unwrap_err();
        assert!(matches!(err, SkylistError::MissingContinuation(_)));
    }

    #[test]
    fn non_finite_stored_filter_is_rejected() {
        let transport: Arc<dyn QueryTransport> = StubTransport::new().into_arc();
        let mut filter = JsonObject::new();
        filter.insert("rating".into(), JsonValue::Float(f64::NAN));
        let mut variables = JsonObject::new();
        variables.insert("filter".into(), JsonValue::Object(filter));
        let page = RemotePage::new(transport).with_continuation(
            Some("abc".into()),
            Some(DOCUMENT.into()),
            Some(variables),
        );

        let err = page.next_page_request(&Post::schema()).unwrap_err();
        assert!(matches!(err, SkylistError::InvalidFilter(_)));
    }

    #[tokio::test]
    async fn fetches_next_page_through_transport() {
        let transport = StubTransport::new()
            .respond_with(json!({"items": [{"id": "2"}], "nextToken": null}))
            .into_arc();
        let list: List<Post> = registry_with(&transport).decode(&payload(json!({
            "document": DOCUMENT,
            "variables": {"limit": 1},
            "graphQLData": {"items": [{"id": "1"}], "nextToken": "abc"}
        })));

        let mut next = list.next_page().await.unwrap();

        assert_eq!(next.len(), 1);
        assert_eq!(next.get(0).unwrap().id, "2");
        assert!(!next.has_next_page());

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].variables.get("nextToken"), Some(&json!("abc")));
        assert_eq!(requests[0].variables.get("limit"), Some(&json!(1)));
    }

    #[tokio::test]
    async fn transport_errors_propagate_unchanged() {
        let transport = StubTransport::new()
            .fail_with(SkylistError::Service("Unauthorized".into()))
            .into_arc();
        let list: List<Post> = registry_with(&transport).decode(&payload(json!({
            "document": DOCUMENT,
            "graphQLData": {"items": [], "nextToken": "abc"}
        })));

        let err = list.next_page().await.unwrap_err();
        assert_eq!(err, SkylistError::Service("Unauthorized".into()));
    }

    #[tokio::test]
    async fn malformed_next_page_degrades_to_empty() {
        let transport = StubTransport::new()
            .respond_with(json!({"listPosts": {"items": [{"title": "no id"}], "nextToken": "x"}}))
            .into_arc();
        let list: List<Post> = registry_with(&transport).decode(&payload(json!({
            "document": DOCUMENT,
            "graphQLData": {"items": [], "nextToken": "abc"}
        })));

        let mut next = list.next_page().await.unwrap();
        assert_eq!(next.len(), 0);
        assert!(!next.has_next_page());
    }

    #[tokio::test]
    async fn query_then_collect_all_pages() {
        let transport = StubTransport::new()
            .respond_with(json!({"listPosts": {"items": [{"id": "1"}], "nextToken": "t1"}}))
            .respond_with(json!({"listPosts": {"items": [{"id": "2"}], "nextToken": "t2"}}))
            .respond_with(json!({"listPosts": {"items": [{"id": "3"}], "nextToken": null}}))
            .into_arc();
        let decoder = RemoteListDecoder::new(transport.clone());
        let request = paginated_list_request::<Post>(None, Some(1)).unwrap();

        let first: List<Post> = decoder.query(request).await.unwrap();
        let all = first.collect_pages().await.unwrap();

        let ids: Vec<&str> = all.iter().map(|post| post.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
        assert_eq!(transport.requests().len(), 3);
        assert!(transport
            .requests()
            .iter()
            .all(|request| request.variables.get("limit") == Some(&json!(1))));
    }

    #[test]
    fn blocking_wrapper_returns_next_page() {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .unwrap();
        let transport = StubTransport::new()
            .respond_with(json!({"items": [{"id": "2"}]}))
            .into_arc();
        let list: List<Post> = registry_with(&transport).decode(&payload(json!({
            "document": DOCUMENT,
            "graphQLData": {"items": [{"id": "1"}], "nextToken": "abc"}
        })));

        let mut next = list.next_page_blocking(runtime.handle()).unwrap();

        assert_eq!(next.get(0).unwrap().id, "2");
    }

    #[test]
    fn blocking_wrapper_rejects_current_thread_runtime() {
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        let transport = StubTransport::new()
            .respond_with(json!({"items": [{"id": "2"}]}))
            .into_arc();
        let list: List<Post> = registry_with(&transport).decode(&payload(json!({
            "document": DOCUMENT,
            "graphQLData": {"items": [{"id": "1"}], "nextToken": "abc"}
        })));

        let err = list.next_page_blocking(runtime.handle()).unwrap_err();

        assert!(matches!(err, SkylistError::Unsupported(_)));
        assert!(transport.requests().is_empty());
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Event {
        id: String,
        seq: u64,
    }

    impl Model for Event {
        fn schema() -> ModelSchema {
            ModelSchema::new("Event")
                .with_field(ModelField::scalar("id"))
                .with_field(ModelField::scalar("seq"))
        }

        fn identifier(&self) -> &str {
            &self.id
        }
    }

    #[test]
    fn large_integer_fields_decode_exactly() {
        let transport = StubTransport::new().into_arc();
        let mut list: List<Event> = registry_with(&transport).decode(&payload(json!({
            "document": DOCUMENT,
            "graphQLData": {"items": [{"id": "e1", "seq": 9_007_199_254_740_993_u64}]}
        })));

        assert_eq!(list.len(), 1);
        assert_eq!(list.get(0).unwrap().seq, 9_007_199_254_740_993);
    }

    #[test]
    fn envelope_round_trips_through_json() {
        let envelope = ListPayload::from_json(&payload(json!({
            "document": DOCUMENT,
            "variables": {"limit": 5},
            "graphQLData": {"items": [], "nextToken": "abc"}
        })))
        .unwrap();

        assert_eq!(ListPayload::from_json(&envelope.to_json()), Some(envelope));
    }

    #[test]
    fn envelope_requires_document_string() {
        assert!(ListPayload::from_json(&payload(json!({"graphQLData": {"items": []}}))).is_none());
        assert!(ListPayload::from_json(&payload(json!({"document": 1, "items": []}))).is_none());
        assert!(ListPayload::from_json(&payload(json!({"document": DOCUMENT}))).is_none());
    }
}
