//! Wire keys and defaults shared across crates

/// Number of associated records fetched by a deferred local list.
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Default per-request HTTP timeout for the GraphQL transport.
pub const DEFAULT_API_TIMEOUT_SECS: u64 = 30;

/// Default number of HTTP attempts (initial try + retries).
pub const DEFAULT_API_MAX_ATTEMPTS: usize = 3;

/// Default SQLite connection pool size for the local store.
pub const DEFAULT_DB_POOL_SIZE: u32 = 4;

// Remote list payload keys
pub const ITEMS_KEY: &str = "items";
pub const NEXT_TOKEN_KEY: &str = "nextToken";
pub const DOCUMENT_KEY: &str = "document";
pub const VARIABLES_KEY: &str = "variables";
pub const GRAPHQL_DATA_KEY: &str = "graphQLData";
pub const FILTER_VARIABLE: &str = "filter";
pub const LIMIT_VARIABLE: &str = "limit";

// Associated list payload keys
pub const ASSOCIATED_ID_KEY: &str = "associatedId";
pub const ASSOCIATED_FIELD_KEY: &str = "associatedField";
