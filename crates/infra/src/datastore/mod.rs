//! Local record store

mod sqlite_store;

pub use sqlite_store::{SqliteLocalStore, SqlitePool};
