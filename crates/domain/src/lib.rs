//! # Skylist Domain
//!
//! Pure data types shared by every Skylist crate.
//!
//! This crate contains:
//! - The JSON value model used to sniff wire payloads
//! - Model schema descriptors and GraphQL request types
//! - Configuration structures
//! - Domain error types and Result definitions
//!
//! ## Architecture
//! - No dependencies on other Skylist crates
//! - No I/O, no async runtime

pub mod constants;
pub mod errors;
pub mod json;
pub mod types;

// Re-export commonly used items
pub use errors::*;
pub use json::{JsonObject, JsonValue};
pub use types::*;
