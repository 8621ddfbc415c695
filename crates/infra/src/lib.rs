//! # Skylist Infrastructure
//!
//! Adapters for the ports defined in `skylist-core`.
//!
//! This crate contains:
//! - The GraphQL transport over a retrying HTTP client
//! - The SQLite/SQLCipher local store
//! - Configuration loading and tracing setup
//! - Backend bootstrap that registers the list decoders
//!
//! ## Architecture
//! - Implements traits defined in `skylist-core`
//! - Contains all I/O

pub mod config;
pub mod datastore;
pub mod errors;
pub mod graphql;
pub mod http;
pub mod observability;
pub mod plugins;

pub use datastore::SqliteLocalStore;
pub use errors::InfraError;
pub use graphql::{AccessTokenProvider, GraphQLAuth, GraphQLClient};
pub use http::{HttpClient, HttpClientBuilder};
pub use observability::init_tracing;
pub use plugins::{bootstrap, Backend};
