//! SQLite-backed local store.
//!
//! Records of every model share one table and are kept as JSON text:
//!
//! ```sql
//! models(model_name TEXT, id TEXT, data TEXT, PRIMARY KEY (model_name, id))
//! ```
//!
//! Association lookups compare `json_extract(data, '$.<column>')` with the
//! owning id. Rows come back in insertion order. When an encryption key is
//! configured every pooled connection is keyed through SQLCipher before use.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection, OptionalExtension};
use skylist_core::LocalStore;
use skylist_domain::{
    DataStoreConfig, JsonValue, Model, ModelField, ModelSchema, Result, SkylistError,
};
use tracing::{debug, info};

use crate::errors::InfraError;

/// Pooled SQLite connections.
pub type SqlitePool = Pool<SqliteConnectionManager>;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS models (
        model_name TEXT NOT NULL,
        id TEXT NOT NULL,
        data TEXT NOT NULL,
        PRIMARY KEY (model_name, id)
    );
";

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);
const CONNECTION_TIMEOUT: Duration = Duration::from_secs(10);

/// [`LocalStore`] over a SQLite (optionally SQLCipher) database file.
#[derive(Clone)]
pub struct SqliteLocalStore {
    pool: SqlitePool,
}

impl fmt::Debug for SqliteLocalStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.pool.state();
        f.debug_struct("SqliteLocalStore")
            .field("connections", &state.connections)
            .field("idle_connections", &state.idle_connections)
            .finish()
    }
}

impl SqliteLocalStore {
    /// Open (creating if needed) the database at `path`.
    ///
    /// # Errors
    /// Returns `SkylistError::Database` if the pool cannot be built, the key
    /// is rejected, or the schema cannot be created.
    pub fn open(
        path: impl AsRef<Path>,
        pool_size: u32,
        encryption_key: Option<String>,
    ) -> Result<Self> {
        let path = path.as_ref();
        let encrypted = encryption_key.is_some();
        let manager = SqliteConnectionManager::file(path).with_init(move |conn| {
            if let Some(key) = &encryption_key {
                conn.pragma_update(None, "key", key)?;
            }
            conn.busy_timeout(BUSY_TIMEOUT)
        });
        let pool = Pool::builder()
            .max_size(pool_size.max(1))
            .connection_timeout(CONNECTION_TIMEOUT)
            .build(manager)
            .map_err(|err| SkylistError::from(InfraError::from(err)))?;

        let store = Self { pool };
        store.with_connection(|conn| conn.execute_batch(SCHEMA))?;
        info!(path = %path.display(), pool_size, encrypted, "Opened local store");
        Ok(store)
    }

    /// Open the store described by `config`.
    ///
    /// # Errors
    /// See [`SqliteLocalStore::open`].
    pub fn from_config(config: &DataStoreConfig) -> Result<Self> {
        Self::open(&config.path, config.pool_size, config.encryption_key.clone())
    }

    /// Insert or replace `record`.
    ///
    /// # Errors
    /// Returns `SkylistError::Decode` if the record does not serialize, or
    /// `SkylistError::Database` on pool or SQL failure.
    pub fn save<M: Model>(&self, record: &M) -> Result<()> {
        let model_name = M::schema().name;
        let data = serde_json::to_string(record)?;
        let id = record.identifier().to_owned();
        debug!(model = %model_name, id = %id, "Saving record");

        self.with_connection(|conn| {
            conn.execute(
                "INSERT INTO models (model_name, id, data) VALUES (?1, ?2, ?3)
                 ON CONFLICT(model_name, id) DO UPDATE SET data = excluded.data",
                params![model_name, id, data],
            )
            .map(|_| ())
        })
    }

    /// Delete the record of `M` with `id`. Returns whether a row was removed.
    ///
    /// # Errors
    /// Returns `SkylistError::Database` on pool or SQL failure.
    pub fn delete<M: Model>(&self, id: &str) -> Result<bool> {
        let model_name = M::schema().name;
        self.with_connection(|conn| {
            conn.execute(
                "DELETE FROM models WHERE model_name = ?1 AND id = ?2",
                params![model_name, id],
            )
            .map(|removed| removed > 0)
        })
    }

    /// Fetch one record of `M` by id.
    ///
    /// # Errors
    /// Returns `SkylistError::Database` on pool or SQL failure, or
    /// `SkylistError::Decode` if the stored row does not decode into `M`.
    pub fn find<M: Model>(&self, id: &str) -> Result<Option<M>> {
        let model_name = M::schema().name;
        let data: Option<String> = self.with_connection(|conn| {
            conn.query_row(
                "SELECT data FROM models WHERE model_name = ?1 AND id = ?2",
                params![model_name, id],
                |row| row.get(0),
            )
            .optional()
        })?;
        data.map(|text| serde_json::from_str(&text).map_err(SkylistError::from)).transpose()
    }

    /// Number of stored records of `M`.
    ///
    /// # Errors
    /// Returns `SkylistError::Database` on pool or SQL failure.
    pub fn count<M: Model>(&self) -> Result<usize> {
        let model_name = M::schema().name;
        let count: i64 = self.with_connection(|conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM models WHERE model_name = ?1",
                params![model_name],
                |row| row.get(0),
            )
        })?;
        usize::try_from(count).map_err(|err| SkylistError::Internal(err.to_string()))
    }

    fn with_connection<T>(
        &self,
        operation: impl FnOnce(&Connection) -> rusqlite::Result<T>,
    ) -> Result<T> {
        let conn = self.pool.get().map_err(|err| SkylistError::from(InfraError::from(err)))?;
        operation(&conn).map_err(|err| InfraError::from(err).into())
    }
}

impl LocalStore for SqliteLocalStore {
    fn query_where(
        &self,
        schema: &ModelSchema,
        field: &ModelField,
        value: &str,
        limit: usize,
    ) -> Result<Vec<JsonValue>> {
        let json_path = format!("$.{}", field.column_name());
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let rows: Vec<String> = self.with_connection(|conn| {
            let mut stmt = conn.prepare_cached(
                "SELECT data FROM models
                 WHERE model_name = ?1 AND json_extract(data, ?2) = ?3
                 ORDER BY rowid
                 LIMIT ?4",
            )?;
            let rows = stmt
                .query_map(params![schema.name, json_path, value, limit], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<String>>>()?;
            Ok(rows)
        })?;

        debug!(
            model = %schema.name,
            field = %field.name,
            matched = rows.len(),
            "Queried associated records"
        );
        rows.iter().map(|text| JsonValue::parse(text)).collect()
    }
}

#[cfg(test)]
mod tests {
    use skylist_core::testing::{Comment, Post};
    use tempfile::TempDir;

    use super::*;

    fn open_store() -> (SqliteLocalStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = SqliteLocalStore::open(dir.path().join("store.db"), 2, None).unwrap();
        (store, dir)
    }

    #[test]
    fn save_find_and_count() {
        let (store, _dir) = open_store();
        store.save(&Post::new("p1", "hello")).unwrap();
        store.save(&Post::new("p2", "world")).unwrap();

        assert_eq!(store.count::<Post>().unwrap(), 2);
        assert_eq!(store.find::<Post>("p1").unwrap(), Some(Post::new("p1", "hello")));
        assert_eq!(store.find::<Post>("missing").unwrap(), None);
    }

    #[test]
    fn save_replaces_existing_record() {
        let (store, _dir) = open_store();
        store.save(&Post::new("p1", "draft")).unwrap();
        store.save(&Post::new("p1", "final")).unwrap();

        assert_eq!(store.count::<Post>().unwrap(), 1);
        assert_eq!(store.find::<Post>("p1").unwrap().unwrap().title.as_deref(), Some("final"));
    }

    #[test]
    fn delete_reports_whether_a_row_was_removed() {
        let (store, _dir) = open_store();
        store.save(&Post::new("p1", "hello")).unwrap();

        assert!(store.delete::<Post>("p1").unwrap());
        assert!(!store.delete::<Post>("p1").unwrap());
        assert_eq!(store.count::<Post>().unwrap(), 0);
    }

    #[test]
    fn query_where_matches_column_in_insertion_order_with_limit() {
        let (store, _dir) = open_store();
        for (id, post) in [("c1", "p1"), ("c2", "p2"), ("c3", "p1"), ("c4", "p1")] {
            store.save(&Comment::new(id, "text", post)).unwrap();
        }
        let schema = Comment::schema();
        let field = schema.field("post").unwrap().clone();

        let rows = store.query_where(&schema, &field, "p1", 2).unwrap();

        let ids: Vec<&str> = rows.iter().filter_map(|row| row.get("id")?.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c3"]);
    }

    #[test]
    fn encrypted_store_rejects_wrong_key() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("secure.db");
        {
            let store = SqliteLocalStore::open(&path, 1, Some("right-key".into())).unwrap();
            store.save(&Post::new("p1", "secret")).unwrap();
        }

        let reopened = SqliteLocalStore::open(&path, 1, Some("right-key".into())).unwrap();
        assert_eq!(reopened.count::<Post>().unwrap(), 1);
        drop(reopened);

        let result = SqliteLocalStore::open(&path, 1, Some("wrong-key".into()));
        assert!(matches!(result, Err(SkylistError::Database(_))));
    }
}
