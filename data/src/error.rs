//! Error types for database access.

use crate::provider::DatabaseProvider;
use thiserror::Error;
use whippet_core::result::WhippetError;

/// Result type for database operations.
pub type Result<T> = std::result::Result<T, DataError>;

/// Errors raised by the database provider layer.
#[derive(Error, Debug)]
pub enum DataError {
    /// Driver, network or server error.
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// A required argument was blank.
    #[error("Argument cannot be null or blank: {0}")]
    ArgumentNull(&'static str),

    /// The provider name is not recognised.
    #[error("Unknown database provider: {0}")]
    UnknownProvider(String),

    /// The operation is not available for this provider.
    #[error("{operation} is not supported by {provider}")]
    UnsupportedProvider {
        /// Provider the operation was attempted on
        provider: DatabaseProvider,
        /// Operation name
        operation: &'static str,
    },

    /// The connection string could not be parsed or converted.
    #[error("Invalid connection string: {0}")]
    InvalidConnectionString(String),

    /// Malformed COPY data or a row that does not fit the stream.
    #[error("COPY error: {0}")]
    Copy(String),

    /// Missing or invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl DataError {
    /// Whether retrying the operation may succeed.
    ///
    /// Covers I/O failures, pool timeouts and the `PostgreSQL` connection
    /// exception class (`08xxx`), `cannot_connect_now` (`57P03`) and
    /// `too_many_connections` (`53300`).
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Sqlx(sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut) => true,
            Self::Sqlx(sqlx::Error::Database(db)) => db
                .code()
                .is_some_and(|code| code.starts_with("08") || code == "57P03" || code == "53300"),
            _ => false,
        }
    }

    /// Whether the error is a unique-constraint violation.
    #[must_use]
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Self::Sqlx(sqlx::Error::Database(db)) if db.is_unique_violation())
    }

    pub(crate) const fn unsupported(provider: DatabaseProvider, operation: &'static str) -> Self {
        Self::UnsupportedProvider {
            provider,
            operation,
        }
    }
}

impl From<DataError> for WhippetError {
    fn from(error: DataError) -> Self {
        match error {
            DataError::ArgumentNull(name) => Self::argument_null(name),
            ref e if e.is_unique_violation() => Self::Conflict(e.to_string()),
            other => Self::Database(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_timeout_is_transient() {
        assert!(DataError::Sqlx(sqlx::Error::PoolTimedOut).is_transient());
        assert!(!DataError::Sqlx(sqlx::Error::RowNotFound).is_transient());
        assert!(!DataError::Config("missing".to_string()).is_transient());
    }

    #[test]
    fn converts_into_whippet_error() {
        assert_eq!(
            WhippetError::from(DataError::ArgumentNull("database")),
            WhippetError::argument_null("database")
        );

        let converted = WhippetError::from(DataError::unsupported(DatabaseProvider::Sqlite, "login_exists"));
        assert_eq!(
            converted,
            WhippetError::Database("login_exists is not supported by SQLite".to_string())
        );
    }
}
