//! Domain types and models

pub mod config;
pub mod model;
pub mod request;

pub use config::{ApiConfig, Config, DataStoreConfig};
pub use model::{FieldKind, Model, ModelField, ModelSchema};
pub use request::GraphQLRequest;
