//! Backend wiring
//!
//! Builds the transport and local store from configuration and registers
//! their list decoders. The associated decoder goes first: its reference
//! payload is the narrower shape, while the remote decoder accepts any
//! object carrying `items`.

use std::sync::Arc;

use skylist_core::{
    AssociatedListDecoder, ListDecoderRegistry, LocalStore, QueryTransport, RemoteListDecoder,
};
use skylist_domain::{Config, Result};
use tracing::info;

use crate::datastore::SqliteLocalStore;
use crate::graphql::GraphQLClient;

/// Configured backends plus the registry that decodes their list payloads.
#[derive(Debug, Clone)]
pub struct Backend {
    pub registry: ListDecoderRegistry,
    pub transport: Arc<GraphQLClient>,
    pub store: Arc<SqliteLocalStore>,
}

/// Open the local store, create the GraphQL client and register both
/// decoders.
///
/// # Errors
/// Returns the store's or client's construction error.
pub fn bootstrap(config: &Config) -> Result<Backend> {
    let transport = Arc::new(GraphQLClient::from_config(&config.api)?);
    let store = Arc::new(SqliteLocalStore::from_config(&config.datastore)?);
    let registry = registry_for(
        Arc::clone(&transport) as Arc<dyn QueryTransport>,
        Arc::clone(&store) as Arc<dyn LocalStore>,
        config.datastore.page_size,
    );

    info!(
        endpoint = %transport.endpoint(),
        decoders = ?registry.decoder_names(),
        "List backends ready"
    );
    Ok(Backend { registry, transport, store })
}

/// Registry over arbitrary port implementations.
pub fn registry_for(
    transport: Arc<dyn QueryTransport>,
    store: Arc<dyn LocalStore>,
    page_size: usize,
) -> ListDecoderRegistry {
    ListDecoderRegistry::new()
        .with_decoder(AssociatedListDecoder::new(store).with_page_size(page_size))
        .with_decoder(RemoteListDecoder::new(transport))
}

#[cfg(test)]
mod tests {
    use skylist_domain::{ApiConfig, DataStoreConfig};
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn bootstrap_registers_associated_before_remote() {
        let dir = TempDir::new().unwrap();
        let config = Config {
            api: ApiConfig {
                endpoint: "http://127.0.0.1:9/graphql".into(),
                api_key: Some("da2-test".into()),
                timeout_seconds: 1,
                max_attempts: 1,
            },
            datastore: DataStoreConfig {
                path: dir.path().join("bootstrap.db").to_string_lossy().into_owned(),
                pool_size: 1,
                encryption_key: None,
                page_size: 10,
            },
        };

        let backend = bootstrap(&config).unwrap();

        assert_eq!(backend.registry.decoder_names(), vec!["associated", "remote"]);
        assert_eq!(backend.transport.endpoint(), "http://127.0.0.1:9/graphql");
    }
}
