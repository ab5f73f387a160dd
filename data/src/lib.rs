//! # Whippet Data
//!
//! Database provider abstraction for Whippet.
//!
//! - [`provider`]: the supported engines and their dialect differences
//! - [`connection_string`]: parsing and mutating `keyword=value;` strings
//! - [`config`]: pool and connection configuration from the environment
//! - [`connection`]: one connection facade over `PostgreSQL` and `SQLite`
//! - [`transaction`]: explicit transactions
//! - [`repository`]: a generic repository for UUID-keyed `PostgreSQL` tables
//! - [`copy`]: `PostgreSQL` COPY in binary and text format
//!
//! SQL Server is known to the provider layer (connection strings, scripts,
//! identifier quoting) but has no bundled driver; opening a live connection
//! to it returns [`DataError::UnsupportedProvider`].

pub mod config;
pub mod connection;
pub mod connection_string;
pub mod copy;
pub mod error;
pub mod provider;
pub mod repository;
pub mod transaction;

// Re-exports
pub use config::{DatabaseConfig, PoolConfig};
pub use connection::{
    DatabaseConnection, PgTypeDescriptor, PostgresConnection, SqliteConnection, WhippetConnection,
};
pub use connection_string::{ConnectionStringBuilder, Keyword};
pub use error::{DataError, Result};
pub use provider::DatabaseProvider;
pub use repository::{PgEntity, PostgresRepository};
pub use transaction::{IsolationLevel, WhippetTransaction};
