//! # Skylist Core
//!
//! Model lists and the decoders that build them.
//!
//! This crate contains:
//! - [`List`], a lazily loaded and optionally paginated model collection
//! - [`ListDecoderRegistry`] and the remote and associated decoders
//! - The list query builder
//! - Port interfaces (traits) for the GraphQL transport and local store
//!
//! ## Architecture Principles
//! - Only depends on `skylist-domain`
//! - No database or HTTP code; adapters live in `skylist-infra`
//! - All external access goes through the traits in [`ports`]

pub mod list;
pub mod ports;
pub mod query;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use list::{
    reference_payload, AssociatedListDecoder, AssociatedRecords, DecodedList, List, ListDecoder,
    ListDecoderRegistry, ListPayload, ListSource, LoadState, RemoteListDecoder, RemotePage,
};
pub use ports::{LocalStore, QueryTransport};
pub use query::{paginated_list_request, ListQueryBuilder};
