//! Associated local-store lists
//!
//! A has-many field on a locally persisted record decodes from a reference
//! payload `{"associatedId": "...", "associatedField": "..."}`. Nothing is
//! queried until the list is first read; the query then selects records of
//! the element model whose association column equals the owning id.

use std::fmt;
use std::sync::Arc;

use skylist_domain::constants::{ASSOCIATED_FIELD_KEY, ASSOCIATED_ID_KEY, DEFAULT_PAGE_SIZE};
use skylist_domain::{JsonObject, JsonValue, ModelField, ModelSchema, Result};
use tracing::{debug, warn};

use super::registry::{DecodedList, ListDecoder};
use crate::ports::LocalStore;

/// Deferred query for the records associated with one owner.
#[derive(Clone)]
pub struct AssociatedRecords {
    store: Arc<dyn LocalStore>,
    associated_id: String,
    associated_field: ModelField,
    limit: usize,
}

impl AssociatedRecords {
    pub fn new(
        store: Arc<dyn LocalStore>,
        associated_id: impl Into<String>,
        associated_field: ModelField,
    ) -> Self {
        Self {
            store,
            associated_id: associated_id.into(),
            associated_field,
            limit: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn associated_id(&self) -> &str {
        &self.associated_id
    }

    pub fn associated_field(&self) -> &ModelField {
        &self.associated_field
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub(crate) fn set_limit(&mut self, limit: usize) {
        self.limit = limit;
    }

    /// Query the store for up to `limit` raw records of `schema`.
    ///
    /// # Errors
    /// Returns the store's error unchanged.
    pub fn fetch(&self, schema: &ModelSchema) -> Result<Vec<JsonValue>> {
        debug!(
            model = %schema.name,
            field = %self.associated_field.name,
            associated_id = %self.associated_id,
            limit = self.limit,
            "Loading associated records"
        );
        self.store.query_where(schema, &self.associated_field, &self.associated_id, self.limit)
    }
}

impl fmt::Debug for AssociatedRecords {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssociatedRecords")
            .field("associated_id", &self.associated_id)
            .field("associated_field", &self.associated_field.name)
            .field("limit", &self.limit)
            .finish_non_exhaustive()
    }
}

/// Reference payload stored in place of a has-many field.
pub fn reference_payload(associated_id: &str, associated_field: &str) -> JsonValue {
    let mut object = JsonObject::new();
    object.insert(ASSOCIATED_ID_KEY.into(), JsonValue::from(associated_id));
    object.insert(ASSOCIATED_FIELD_KEY.into(), JsonValue::from(associated_field));
    JsonValue::Object(object)
}

/// Decoder for associated-record references backed by a [`LocalStore`].
#[derive(Clone)]
pub struct AssociatedListDecoder {
    store: Arc<dyn LocalStore>,
    page_size: usize,
}

impl AssociatedListDecoder {
    pub fn new(store: Arc<dyn LocalStore>) -> Self {
        Self { store, page_size: DEFAULT_PAGE_SIZE }
    }

    /// Initial limit given to every deferred list this decoder builds.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }
}

impl ListDecoder for AssociatedListDecoder {
    fn name(&self) -> &'static str {
        "associated"
    }

    fn should_decode(&self, payload: &JsonValue) -> bool {
        payload.get(ASSOCIATED_ID_KEY).and_then(JsonValue::as_str).is_some()
            && payload.get(ASSOCIATED_FIELD_KEY).and_then(JsonValue::as_str).is_some()
    }

    fn decode(&self, payload: &JsonValue, schema: &ModelSchema) -> DecodedList {
        if let Some(items) = payload.as_array() {
            return DecodedList::loaded(items.to_vec());
        }

        let associated_id = payload.get(ASSOCIATED_ID_KEY).and_then(JsonValue::as_str);
        let field_name = payload.get(ASSOCIATED_FIELD_KEY).and_then(JsonValue::as_str);
        let (Some(associated_id), Some(field_name)) = (associated_id, field_name) else {
            return DecodedList::empty();
        };

        match schema.field(field_name) {
            Some(field) => DecodedList::deferred(
                AssociatedRecords::new(Arc::clone(&self.store), associated_id, field.clone())
                    .with_limit(self.page_size),
            ),
            None => {
                warn!(
                    model = %schema.name,
                    field = field_name,
                    "Associated field is not part of the model schema; using an empty list"
                );
                DecodedList::empty()
            }
        }
    }
}

impl fmt::Debug for AssociatedListDecoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssociatedListDecoder").field("page_size", &self.page_size).finish_non_exhaustive()
    }
}
