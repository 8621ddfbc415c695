//! Model schema descriptors
//!
//! A `ModelSchema` is the only thing the list layer knows about a record type:
//! its GraphQL naming and the fields an association can resolve against.

use std::fmt::Debug;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A typed record that can live in a `List`.
pub trait Model: Serialize + DeserializeOwned + Clone + Debug + Send + Sync + 'static {
    /// Schema describing this model's name and fields.
    fn schema() -> ModelSchema;

    /// Primary identifier of this record.
    fn identifier(&self) -> &str;
}

/// How a field relates to other models.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldKind {
    Scalar,
    /// Foreign key held by this model, stored under `target_name`.
    BelongsTo { target_name: String },
    /// Inverse side of a `BelongsTo` on the associated model.
    HasMany { associated_with: String },
}

/// A single field of a model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelField {
    pub name: String,
    pub kind: FieldKind,
}

impl ModelField {
    pub fn scalar(name: impl Into<String>) -> Self {
        Self { name: name.into(), kind: FieldKind::Scalar }
    }

    pub fn belongs_to(name: impl Into<String>, target_name: impl Into<String>) -> Self {
        Self { name: name.into(), kind: FieldKind::BelongsTo { target_name: target_name.into() } }
    }

    pub fn has_many(name: impl Into<String>, associated_with: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::HasMany { associated_with: associated_with.into() },
        }
    }

    /// Key under which this field's value is stored on the record.
    pub fn column_name(&self) -> &str {
        match &self.kind {
            FieldKind::BelongsTo { target_name } => target_name,
            FieldKind::Scalar | FieldKind::HasMany { .. } => &self.name,
        }
    }

    /// Whether this field appears in a GraphQL selection set.
    pub fn is_selectable(&self) -> bool {
        !matches!(self.kind, FieldKind::HasMany { .. })
    }
}

/// Name and fields of a model type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSchema {
    pub name: String,
    pub plural_name: Option<String>,
    pub fields: Vec<ModelField>,
}

impl ModelSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), plural_name: None, fields: Vec::new() }
    }

    pub fn with_plural_name(mut self, plural_name: impl Into<String>) -> Self {
        self.plural_name = Some(plural_name.into());
        self
    }

    pub fn with_field(mut self, field: ModelField) -> Self {
        self.fields.push(field);
        self
    }

    /// Resolve a field by name.
    pub fn field(&self, name: &str) -> Option<&ModelField> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Plural form, defaulting to `name + "s"`.
    pub fn plural(&self) -> String {
        self.plural_name.clone().unwrap_or_else(|| format!("{}s", self.name))
    }

    /// Name of the list query field, e.g. `listPosts`.
    pub fn list_query_name(&self) -> String {
        format!("list{}", self.plural())
    }

    /// GraphQL input type accepted by the list query's `filter` argument.
    pub fn filter_input_type(&self) -> String {
        format!("Model{}FilterInput", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comment_schema() -> ModelSchema {
        ModelSchema::new("Comment")
            .with_field(ModelField::scalar("id"))
            .with_field(ModelField::scalar("content"))
            .with_field(ModelField::belongs_to("post", "postId"))
    }

    #[test]
    fn resolves_fields_by_name() {
        let schema = comment_schema();

        assert_eq!(schema.field("post").map(ModelField::column_name), Some("postId"));
        assert_eq!(schema.field("content").map(ModelField::column_name), Some("content"));
        assert!(schema.field("postId").is_none());
    }

    #[test]
    fn derives_graphql_names() {
        let schema = comment_schema();
        assert_eq!(schema.list_query_name(), "listComments");
        assert_eq!(schema.filter_input_type(), "ModelCommentFilterInput");

        let people = ModelSchema::new("Person").with_plural_name("People");
        assert_eq!(people.list_query_name(), "listPeople");
    }

    #[test]
    fn has_many_fields_are_not_selectable() {
        let field = ModelField::has_many("comments", "post");
        assert!(!field.is_selectable());
        assert!(ModelField::scalar("id").is_selectable());
    }
}
