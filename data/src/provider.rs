//! Supported database providers.

use crate::error::DataError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Database engine behind a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseProvider {
    /// `PostgreSQL`
    PostgreSql,
    /// Microsoft SQL Server
    SqlServer,
    /// `SQLite`
    Sqlite,
}

impl DatabaseProvider {
    /// Every provider.
    pub const ALL: [Self; 3] = [Self::PostgreSql, Self::SqlServer, Self::Sqlite];

    /// Canonical lower-case name, as accepted by [`FromStr`].
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::PostgreSql => "postgresql",
            Self::SqlServer => "sqlserver",
            Self::Sqlite => "sqlite",
        }
    }

    /// Default TCP port, if the provider is a network server.
    #[must_use]
    pub const fn default_port(&self) -> Option<u16> {
        match self {
            Self::PostgreSql => Some(5432),
            Self::SqlServer => Some(1433),
            Self::Sqlite => None,
        }
    }

    /// Whether the server has logins that an installer must create.
    #[must_use]
    pub const fn has_logins(&self) -> bool {
        matches!(self, Self::PostgreSql | Self::SqlServer)
    }

    /// Whether a live connection can be opened with the bundled drivers.
    ///
    /// SQL Server is supported for connection strings and scripts only.
    #[must_use]
    pub const fn has_live_driver(&self) -> bool {
        matches!(self, Self::PostgreSql | Self::Sqlite)
    }

    /// Whether unquoted identifiers are folded to lower case by the server.
    #[must_use]
    pub const fn folds_to_lower_case(&self) -> bool {
        matches!(self, Self::PostgreSql)
    }

    /// Normalise a database name the way the server stores it.
    #[must_use]
    pub fn normalize_database_name(&self, name: &str) -> String {
        let name = name.trim();
        if self.folds_to_lower_case() {
            name.to_lowercase()
        } else {
            name.to_string()
        }
    }

    /// Quote an identifier for use in SQL text.
    #[must_use]
    pub fn quote_identifier(&self, identifier: &str) -> String {
        match self {
            Self::PostgreSql | Self::Sqlite => format!("\"{}\"", identifier.replace('"', "\"\"")),
            Self::SqlServer => format!("[{}]", identifier.replace(']', "]]")),
        }
    }
}

impl fmt::Display for DatabaseProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::PostgreSql => "PostgreSQL",
            Self::SqlServer => "SQL Server",
            Self::Sqlite => "SQLite",
        };
        f.write_str(name)
    }
}

impl FromStr for DatabaseProvider {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "pgsql" | "npgsql" => Ok(Self::PostgreSql),
            "mssql" | "sqlserver" | "sql server" => Ok(Self::SqlServer),
            "sqlite" | "sqlite3" => Ok(Self::Sqlite),
            other => Err(DataError::UnknownProvider(other.to_string())),
        }
    }
}
