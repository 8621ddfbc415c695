//! GraphQL transport

mod client;

pub use client::{AccessTokenProvider, GraphQLAuth, GraphQLClient};
