//! Conversions from external infrastructure errors into domain errors.

use r2d2::Error as PoolError;
use reqwest::Error as HttpError;
use rusqlite::Error as SqlError;
use skylist_domain::SkylistError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub SkylistError);

impl From<InfraError> for SkylistError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<SkylistError> for InfraError {
    fn from(value: SkylistError) -> Self {
        Self(value)
    }
}

trait IntoSkylistError {
    fn into_skylist(self) -> SkylistError;
}

/* -------------------------------------------------------------------------- */
/* rusqlite::Error → SkylistError */
/* -------------------------------------------------------------------------- */

impl IntoSkylistError for SqlError {
    fn into_skylist(self) -> SkylistError {
        use rusqlite::ffi::ErrorCode;
        use rusqlite::Error as RE;

        fn looks_like_wrong_key(message: &str) -> bool {
            let lower = message.to_ascii_lowercase();
            lower.contains("not a database") || lower.contains("encrypted")
        }

        match self {
            RE::SqliteFailure(err, maybe_message) => {
                let message = maybe_message.unwrap_or_default();
                match err.code {
                    ErrorCode::DatabaseBusy => SkylistError::Database("database is busy".into()),
                    ErrorCode::DatabaseLocked => {
                        SkylistError::Database("database is locked".into())
                    }
                    ErrorCode::NotADatabase => SkylistError::Database(
                        "database key rejected or file is not a database".into(),
                    ),
                    _ if looks_like_wrong_key(&message) => SkylistError::Database(
                        "database key rejected or file is not a database".into(),
                    ),
                    _ => SkylistError::Database(format!(
                        "sqlite failure {:?} (code {}): {}",
                        err.code, err.extended_code, message
                    )),
                }
            }
            RE::QueryReturnedNoRows => SkylistError::Database("no rows returned by query".into()),
            RE::FromSqlConversionFailure(_, _, cause) => {
                SkylistError::Database(format!("failed to convert sqlite value: {cause}"))
            }
            RE::InvalidColumnType(_, name, ty) => {
                SkylistError::Database(format!("invalid column type for {name}: {ty}"))
            }
            RE::InvalidPath(path) => SkylistError::Config(format!(
                "invalid database path: {}",
                path.to_string_lossy()
            )),
            other => SkylistError::Database(other.to_string()),
        }
    }
}

impl From<SqlError> for InfraError {
    fn from(value: SqlError) -> Self {
        Self(value.into_skylist())
    }
}

/* -------------------------------------------------------------------------- */
/* r2d2::Error → SkylistError */
/* -------------------------------------------------------------------------- */

impl IntoSkylistError for PoolError {
    fn into_skylist(self) -> SkylistError {
        SkylistError::Database(format!("connection pool: {self}"))
    }
}

impl From<PoolError> for InfraError {
    fn from(value: PoolError) -> Self {
        Self(value.into_skylist())
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → SkylistError */
/* -------------------------------------------------------------------------- */

impl IntoSkylistError for HttpError {
    fn into_skylist(self) -> SkylistError {
        if self.is_timeout() {
            return SkylistError::Network("HTTP request timed out".into());
        }

        if self.is_connect() {
            return SkylistError::Network("HTTP connection failure".into());
        }

        if self.is_decode() {
            return SkylistError::Decode(format!("HTTP response body: {self}"));
        }

        if let Some(status) = self.status() {
            let code = status.as_u16();
            let message =
                format!("HTTP {} {}", code, status.canonical_reason().unwrap_or("unknown status"));

            return match code {
                401 | 403 => SkylistError::Service(message),
                429 => SkylistError::Network(message),
                400..=499 => SkylistError::InvalidInput(message),
                _ => SkylistError::Network(message),
            };
        }

        SkylistError::Network(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        Self(value.into_skylist())
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
