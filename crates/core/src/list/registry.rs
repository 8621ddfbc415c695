//! List decoder registry
//!
//! Each backend contributes a [`ListDecoder`] that recognises its own payload
//! shape. The registry asks decoders in registration order and the first one
//! whose sniff matches builds the list. Build the registry once at startup and
//! share it; it is never mutated afterwards.
//!
//! Decoding never fails. A payload no decoder recognises becomes a plain list
//! if it is an array and an empty list otherwise, so a malformed page reads as
//! an empty page.

use std::fmt;
use std::sync::Arc;

use skylist_domain::{JsonValue, Model, ModelSchema};
use tracing::{debug, warn};

use super::{AssociatedRecords, List, ListSource, LoadState, RemotePage};

/// Strategy that turns one backend's payload shape into a list.
pub trait ListDecoder: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Cheap, side-effect free check whether this decoder handles `payload`.
    fn should_decode(&self, payload: &JsonValue) -> bool;

    /// Build the list parts for `payload`. Must not fail; return
    /// [`DecodedList::empty`] instead.
    fn decode(&self, payload: &JsonValue, schema: &ModelSchema) -> DecodedList;
}

/// Model-agnostic decoder output: raw items plus their source.
#[derive(Debug, Clone)]
pub struct DecodedList {
    pub(crate) items: Vec<JsonValue>,
    pub(crate) state: LoadState,
    pub(crate) source: ListSource,
}

impl DecodedList {
    /// Loaded list with no items.
    pub fn empty() -> Self {
        Self::loaded(Vec::new())
    }

    /// In-memory items, already loaded.
    pub fn loaded(items: Vec<JsonValue>) -> Self {
        Self { items, state: LoadState::Loaded, source: ListSource::InMemory }
    }

    /// One page of a remote list.
    pub fn remote(items: Vec<JsonValue>, page: RemotePage) -> Self {
        Self { items, state: LoadState::Loaded, source: ListSource::Remote(page) }
    }

    /// Associated records fetched on first access.
    pub fn deferred(records: AssociatedRecords) -> Self {
        Self { items: Vec::new(), state: LoadState::Pending, source: ListSource::Associated(records) }
    }

    pub fn items(&self) -> &[JsonValue] {
        &self.items
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    pub fn source(&self) -> &ListSource {
        &self.source
    }
}

/// Ordered, append-only set of list decoders.
#[derive(Clone, Default)]
pub struct ListDecoderRegistry {
    decoders: Vec<Arc<dyn ListDecoder>>,
}

impl ListDecoderRegistry {
    /// Registry with no decoders; every payload falls back.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `decoder`. Duplicates are kept.
    pub fn register(&mut self, decoder: Arc<dyn ListDecoder>) {
        debug!(decoder = decoder.name(), position = self.decoders.len(), "Registered list decoder");
        self.decoders.push(decoder);
    }

    /// Builder form of [`ListDecoderRegistry::register`].
    pub fn with_decoder(mut self, decoder: impl ListDecoder + 'static) -> Self {
        self.register(Arc::new(decoder));
        self
    }

    /// Number of registered decoders.
    pub fn len(&self) -> usize {
        self.decoders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decoders.is_empty()
    }

    /// Decoder names in priority order.
    pub fn decoder_names(&self) -> Vec<&'static str> {
        self.decoders.iter().map(|decoder| decoder.name()).collect()
    }

    /// Decode `payload` into a list of `M`.
    pub fn decode<M: Model>(&self, payload: &JsonValue) -> List<M> {
        let schema = M::schema();
        if let Some(decoder) = self.decoders.iter().find(|decoder| decoder.should_decode(payload)) {
            debug!(decoder = decoder.name(), model = %schema.name, "Decoding list payload");
            return List::from_decoded(decoder.decode(payload, &schema));
        }

        match payload {
            JsonValue::Array(items) => List::from_decoded(DecodedList::loaded(items.clone())),
            _ => {
                debug!(model = %schema.name, "No list decoder matched payload; using an empty list");
                List::default()
            }
        }
    }

    /// Parse `text` and decode it. Unparseable text yields an empty list.
    pub fn decode_str<M: Model>(&self, text: &str) -> List<M> {
        match JsonValue::parse(text) {
            Ok(payload) => self.decode(&payload),
            Err(err) => {
                warn!(
                    model = %M::schema().name,
                    error = %err,
                    "List payload is not valid JSON; using an empty list"
                );
                List::default()
            }
        }
    }
}

impl fmt::Debug for ListDecoderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListDecoderRegistry").field("decoders", &self.decoder_names()).finish()
    }
}
