//! List query construction
//!
//! Builds the `list<Plural>` GraphQL operation used for every page of a
//! remote list. Only the arguments actually supplied are declared, so a
//! request without a filter never mentions `$filter`.

use std::fmt::Write as _;

use skylist_domain::{GraphQLRequest, JsonObject, JsonValue, Model, ModelSchema, Result, SkylistError};

/// Builder for a paginated list query over one model.
#[derive(Debug, Clone)]
pub struct ListQueryBuilder<'a> {
    schema: &'a ModelSchema,
    filter: Option<serde_json::Value>,
    limit: Option<i64>,
    next_token: Option<String>,
}

impl<'a> ListQueryBuilder<'a> {
    /// Query over `schema` with no arguments.
    pub fn new(schema: &'a ModelSchema) -> Self {
        Self { schema, filter: None, limit: None, next_token: None }
    }

    /// Attach a filter, re-encoded as the `filter` input variable.
    ///
    /// # Errors
    /// Returns `SkylistError::InvalidFilter` when the filter holds a value
    /// JSON cannot carry (NaN or infinite numbers).
    pub fn filter(mut self, filter: &JsonObject) -> Result<Self> {
        let encoded = JsonValue::Object(filter.clone())
            .to_serde()
            .map_err(|err| SkylistError::InvalidFilter(err.to_string()))?;
        self.filter = Some(encoded);
        Ok(self)
    }

    /// Page size, sent as `limit: Int`.
    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Cursor of the page to fetch.
    pub fn next_token(mut self, next_token: impl Into<String>) -> Self {
        self.next_token = Some(next_token.into());
        self
    }

    /// Render the document and collect the supplied variables.
    pub fn build(self) -> GraphQLRequest {
        let query_name = self.schema.list_query_name();
        let mut variables = serde_json::Map::new();
        let mut parameters: Vec<(&str, String)> = Vec::new();

        if let Some(filter) = self.filter {
            parameters.push(("filter", self.schema.filter_input_type()));
            variables.insert("filter".into(), filter);
        }
        if let Some(limit) = self.limit {
            parameters.push(("limit", "Int".into()));
            variables.insert("limit".into(), serde_json::Value::from(limit));
        }
        if let Some(next_token) = self.next_token {
            parameters.push(("nextToken", "String".into()));
            variables.insert("nextToken".into(), serde_json::Value::String(next_token));
        }

        let document = render_document(self.schema, &query_name, &parameters);
        GraphQLRequest { document, variables, decode_path: query_name }
    }
}

fn render_document(schema: &ModelSchema, query_name: &str, parameters: &[(&str, String)]) -> String {
    let (declarations, arguments) = if parameters.is_empty() {
        (String::new(), String::new())
    } else {
        let declared: Vec<String> =
            parameters.iter().map(|(name, ty)| format!("${name}: {ty}")).collect();
        let passed: Vec<String> =
            parameters.iter().map(|(name, _)| format!("{name}: ${name}")).collect();
        (format!("({})", declared.join(", ")), format!("({})", passed.join(", ")))
    };

    let mut document = String::new();
    let _ = writeln!(document, "query List{}{declarations} {{", schema.plural());
    let _ = writeln!(document, "  {query_name}{arguments} {{");
    document.push_str("    items {\n");
    for field in schema.fields.iter().filter(|field| field.is_selectable()) {
        let _ = writeln!(document, "      {}", field.column_name());
    }
    document.push_str("      __typename\n");
    document.push_str("    }\n");
    document.push_str("    nextToken\n");
    document.push_str("  }\n");
    document.push('}');
    document
}

/// First-page request for `M`, optionally filtered and limited.
///
/// # Errors
/// Returns `SkylistError::InvalidFilter` if `filter` cannot be encoded.
pub fn paginated_list_request<M: Model>(
    filter: Option<&JsonObject>,
    limit: Option<i64>,
) -> Result<GraphQLRequest> {
    let schema = M::schema();
    let mut builder = ListQueryBuilder::new(&schema);
    if let Some(filter) = filter {
        builder = builder.filter(filter)?;
    }
    if let Some(limit) = limit {
        builder = builder.limit(limit);
    }
    Ok(builder.build())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::testing::{Comment, Post};

    #[test]
    fn renders_full_document_with_all_parameters() {
        let schema = Post::schema();
        let mut filter = JsonObject::new();
        filter.insert("title".into(), JsonValue::parse(r#"{"eq": "hello"}"#).unwrap());

        let request =
            ListQueryBuilder::new(&schema).filter(&filter).unwrap().limit(10).next_token("abc").build();

        let expected = "query ListPosts($filter: ModelPostFilterInput, $limit: Int, $nextToken: String) {\n  \
             listPosts(filter: $filter, limit: $limit, nextToken: $nextToken) {\n    \
             items {\n      id\n      title\n      __typename\n    }\n    \
             nextToken\n  }\n}";
        assert_eq!(request.document, expected);
        assert_eq!(request.decode_path, "listPosts");
        assert_eq!(
            serde_json::Value::Object(request.variables),
            json!({"filter": {"title": {"eq": "hello"}}, "limit": 10, "nextToken": "abc"})
        );
    }

    #[test]
    fn declares_only_supplied_parameters() {
        let schema = Post::schema();
        let request = ListQueryBuilder::new(&schema).next_token("abc").build();

        assert!(request.document.starts_with("query ListPosts($nextToken: String) {"));
        assert!(!request.document.contains("$filter"));
        assert!(!request.document.contains("$limit"));
        assert_eq!(request.variables.len(), 1);
    }

    #[test]
    fn selects_foreign_key_column_and_skips_has_many() {
        let request = ListQueryBuilder::new(&Comment::schema()).build();
        assert!(request.document.contains("      postId\n"));

        let request = ListQueryBuilder::new(&Post::schema()).build();
        assert!(!request.document.contains("comments"));
        assert!(request.document.starts_with("query ListPosts {\n  listPosts {"));
    }

    #[test]
    fn rejects_filters_with_non_finite_numbers() {
        let schema = Post::schema();
        let mut filter = JsonObject::new();
        filter.insert("rating".into(), JsonValue::Float(f64::INFINITY));

        let err = ListQueryBuilder::new(&schema).filter(&filter).unwrap_err();
        assert!(matches!(err, SkylistError::InvalidFilter(_)));
    }

    #[test]
    fn paginated_list_request_sets_limit() {
        let request = paginated_list_request::<Post>(None, Some(1)).unwrap();
        assert_eq!(request.variables.get("limit"), Some(&json!(1)));
        assert!(request.variables.get("nextToken").is_none());
    }
}
