//! GraphQL request payload

use serde::{Deserialize, Serialize};

/// A GraphQL operation ready to hand to a transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphQLRequest {
    /// Operation text.
    pub document: String,
    /// Variables referenced by `document`.
    pub variables: serde_json::Map<String, serde_json::Value>,
    /// Field of the response `data` holding the result (e.g. `listPosts`).
    pub decode_path: String,
}

impl GraphQLRequest {
    /// Body posted to a GraphQL endpoint.
    pub fn to_body(&self) -> serde_json::Value {
        let mut body = serde_json::json!({ "query": self.document });
        if !self.variables.is_empty() {
            body["variables"] = serde_json::Value::Object(self.variables.clone());
        }
        body
    }
}
