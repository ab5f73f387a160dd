//! Database connections behind one facade.
//!
//! [`DatabaseConnection`] is what installer actions and stores program
//! against. [`PostgresConnection`] and [`SqliteConnection`] implement it over
//! `sqlx` pools, and [`WhippetConnection`] picks one at runtime from a
//! [`DatabaseConfig`].
//!
//! # Example
//!
//! ```rust,no_run
//! use whippet_data::{DatabaseConfig, DatabaseConnection, DatabaseProvider, WhippetConnection};
//!
//! # async fn example() -> Result<(), whippet_data::DataError> {
//! let config = DatabaseConfig::new(
//!     DatabaseProvider::PostgreSql,
//!     "Host=localhost;Database=postgres;Username=postgres;Password=postgres",
//! )?;
//! let mut connection = WhippetConnection::open(&config).await?;
//!
//! if !connection.database_exists("whippet").await? {
//!     connection.execute("CREATE DATABASE whippet").await?;
//! }
//! connection.change_database("whippet").await?;
//! # Ok(())
//! # }
//! ```

use crate::config::{DatabaseConfig, PoolConfig};
use crate::connection_string::{ConnectionStringBuilder, sqlite_file_name};
use crate::error::{DataError, Result};
use crate::provider::DatabaseProvider;
use sqlx::postgres::types::Oid;
use sqlx::postgres::{PgConnectOptions, PgPool};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool};
use sqlx::{Postgres, Sqlite};
use std::future::Future;
use std::time::{Duration, Instant};
use whippet_runtime::metrics::DatabaseMetrics;
use whippet_runtime::{RetryPolicy, retry_with_predicate};

/// Operations every provider connection supports.
pub trait DatabaseConnection: Send + Sync {
    /// Provider behind this connection.
    fn provider(&self) -> DatabaseProvider;

    /// Connection string the connection was opened with.
    fn connection_string(&self) -> &ConnectionStringBuilder;

    /// Name of the current database.
    fn database(&self) -> Option<&str> {
        self.connection_string().database()
    }

    /// Run one statement and return the number of rows affected.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::Sqlx`] if the statement fails.
    fn execute(&self, sql: &str) -> impl Future<Output = Result<u64>> + Send;

    /// Run a script of `;`-separated statements without preparing them.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::Sqlx`] on the first failing statement.
    fn execute_script(&self, sql: &str) -> impl Future<Output = Result<u64>> + Send;

    /// Whether a database named `name` exists on the server.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::ArgumentNull`] for a blank name.
    fn database_exists(&self, name: &str) -> impl Future<Output = Result<bool>> + Send;

    /// Whether a login (role) named `name` exists on the server.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::UnsupportedProvider`] for providers without logins.
    fn login_exists(&self, name: &str) -> impl Future<Output = Result<bool>> + Send;

    /// Reconnect to another database on the same server.
    ///
    /// Only the database keyword of the connection string changes. The old
    /// pool is closed once the new one is open.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::ArgumentNull`] for a blank name and a driver error
    /// if the new database cannot be opened; the connection is unchanged then.
    fn change_database(&mut self, name: &str) -> impl Future<Output = Result<()>> + Send;

    /// Close every pooled connection.
    fn close(&self) -> impl Future<Output = ()> + Send;
}

fn require_name(name: &str) -> Result<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DataError::ArgumentNull("name"));
    }
    Ok(name)
}

async fn connect_pool<DB, F, Fut>(
    provider: DatabaseProvider,
    retry: &RetryPolicy,
    connect: F,
) -> Result<sqlx::Pool<DB>>
where
    DB: sqlx::Database,
    F: Fn() -> Fut,
    Fut: Future<Output = std::result::Result<sqlx::Pool<DB>, sqlx::Error>>,
{
    let start = Instant::now();
    let result = retry_with_predicate(
        retry,
        || {
            let attempt = connect();
            async move { attempt.await.map_err(DataError::from) }
        },
        DataError::is_transient,
    )
    .await;

    DatabaseMetrics::record_connect(provider.as_str(), result.is_ok(), start.elapsed());
    match &result {
        Ok(_) => tracing::debug!(provider = %provider, "Database connection opened"),
        Err(e) => tracing::error!(provider = %provider, error = %e, "Failed to open database connection"),
    }
    result
}

/// A `PostgreSQL` type as recorded in `pg_type`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PgTypeDescriptor {
    /// Type OID
    pub oid: u32,
    /// Schema the type lives in
    pub namespace: String,
    /// Type name
    pub name: String,
}

impl PgTypeDescriptor {
    /// `namespace.name`.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.namespace, self.name)
    }

    /// Name qualified with its schema unless the schema is `pg_catalog`.
    #[must_use]
    pub fn display_name(&self) -> String {
        if self.namespace == "pg_catalog" {
            self.name.clone()
        } else {
            self.full_name()
        }
    }
}

/// `PostgreSQL` connection pool.
#[derive(Debug, Clone)]
pub struct PostgresConnection {
    pool: PgPool,
    connection_string: ConnectionStringBuilder,
    pool_config: PoolConfig,
    retry: RetryPolicy,
}

impl PostgresConnection {
    /// Open a pool, retrying transient failures per `config.retry`.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::UnsupportedProvider`] if `config` is not for
    /// `PostgreSQL`, or the last driver error once retries are exhausted.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        if config.provider != DatabaseProvider::PostgreSql {
            return Err(DataError::unsupported(config.provider, "PostgreSQL connections"));
        }
        let pool = Self::open_pool(&config.connection_string, &config.pool, &config.retry).await?;
        Ok(Self {
            pool,
            connection_string: config.connection_string.clone(),
            pool_config: config.pool.clone(),
            retry: config.retry.clone(),
        })
    }

    /// Wrap an existing pool.
    #[must_use]
    pub fn from_pool(pool: PgPool, connection_string: ConnectionStringBuilder) -> Self {
        Self {
            pool,
            connection_string,
            pool_config: PoolConfig::default(),
            retry: RetryPolicy::default(),
        }
    }

    async fn open_pool(
        connection_string: &ConnectionStringBuilder,
        pool: &PoolConfig,
        retry: &RetryPolicy,
    ) -> Result<PgPool> {
        let options: PgConnectOptions = connection_string.to_pg_options()?;
        connect_pool(DatabaseProvider::PostgreSql, retry, || {
            pool.pool_options::<Postgres>().connect_with(options.clone())
        })
        .await
    }

    /// Underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Server version string, as reported by `SHOW server_version`.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::Sqlx`] if the query fails.
    pub async fn server_version(&self) -> Result<String> {
        let version = sqlx::query_scalar::<_, String>("SHOW server_version")
            .fetch_one(&self.pool)
            .await?;
        Ok(version)
    }

    /// Look up a type by name in `pg_type`.
    ///
    /// `name` may be qualified as `schema.type`; unqualified names prefer
    /// `pg_catalog`.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::ArgumentNull`] for a blank name or
    /// [`DataError::Sqlx`] if the query fails.
    pub async fn lookup_type(&self, name: &str) -> Result<Option<PgTypeDescriptor>> {
        let name = require_name(name)?;
        let (namespace, type_name) = match name.split_once('.') {
            Some((namespace, type_name)) => (Some(namespace), type_name),
            None => (None, name),
        };

        let row = sqlx::query_as::<_, (Oid, String, String)>(
            "SELECT t.oid, n.nspname::text, t.typname::text \
             FROM pg_catalog.pg_type t \
             JOIN pg_catalog.pg_namespace n ON n.oid = t.typnamespace \
             WHERE t.typname = $1 AND ($2::text IS NULL OR n.nspname = $2) \
             ORDER BY (n.nspname = 'pg_catalog') DESC \
             LIMIT 1",
        )
        .bind(type_name)
        .bind(namespace)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(oid, namespace, name)| PgTypeDescriptor {
            oid: oid.0,
            namespace,
            name,
        }))
    }
}

impl DatabaseConnection for PostgresConnection {
    fn provider(&self) -> DatabaseProvider {
        DatabaseProvider::PostgreSql
    }

    fn connection_string(&self) -> &ConnectionStringBuilder {
        &self.connection_string
    }

    async fn execute(&self, sql: &str) -> Result<u64> {
        let result = sqlx::query(sql).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn execute_script(&self, sql: &str) -> Result<u64> {
        let result = sqlx::raw_sql(sql).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn database_exists(&self, name: &str) -> Result<bool> {
        let name = DatabaseProvider::PostgreSql.normalize_database_name(require_name(name)?);
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM pg_catalog.pg_database WHERE datname = $1)",
        )
        .bind(&name)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn login_exists(&self, name: &str) -> Result<bool> {
        let name = DatabaseProvider::PostgreSql.normalize_database_name(require_name(name)?);
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM pg_catalog.pg_roles WHERE rolname = $1)",
        )
        .bind(&name)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn change_database(&mut self, name: &str) -> Result<()> {
        let connection_string = self.connection_string.with_database(name)?;
        let pool = Self::open_pool(&connection_string, &self.pool_config, &self.retry).await?;

        let old = std::mem::replace(&mut self.pool, pool);
        self.connection_string = connection_string;
        old.close().await;

        tracing::info!(database = ?self.database(), "Changed database");
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

/// `SQLite` connection pool. The database is the file.
#[derive(Debug, Clone)]
pub struct SqliteConnection {
    pool: SqlitePool,
    connection_string: ConnectionStringBuilder,
    pool_config: PoolConfig,
    retry: RetryPolicy,
}

impl SqliteConnection {
    /// Open (creating if missing) the database file named by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::UnsupportedProvider`] if `config` is not for
    /// `SQLite`, [`DataError::InvalidConnectionString`] when no file is named,
    /// or the driver error.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        if config.provider != DatabaseProvider::Sqlite {
            return Err(DataError::unsupported(config.provider, "SQLite connections"));
        }
        let pool = Self::open_pool(&config.connection_string, &config.pool, &config.retry).await?;
        Ok(Self {
            pool,
            connection_string: config.connection_string.clone(),
            pool_config: config.pool.clone(),
            retry: config.retry.clone(),
        })
    }

    /// Wrap an existing pool.
    #[must_use]
    pub fn from_pool(pool: SqlitePool, connection_string: ConnectionStringBuilder) -> Self {
        Self {
            pool,
            connection_string,
            pool_config: PoolConfig::default(),
            retry: RetryPolicy::default(),
        }
    }

    async fn open_pool(
        connection_string: &ConnectionStringBuilder,
        pool: &PoolConfig,
        retry: &RetryPolicy,
    ) -> Result<SqlitePool> {
        let options: SqliteConnectOptions = connection_string.to_sqlite_options()?;
        // Every connection to :memory: is a separate database.
        let in_memory = connection_string.file_name() == Some(":memory:");
        connect_pool(DatabaseProvider::Sqlite, retry, || {
            let mut pool_options = pool.pool_options::<Sqlite>();
            if in_memory {
                pool_options = pool_options
                    .max_connections(1)
                    .min_connections(1)
                    .idle_timeout(None::<Duration>)
                    .max_lifetime(None::<Duration>);
            }
            pool_options.connect_with(options.clone())
        })
        .await
    }

    /// Underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl DatabaseConnection for SqliteConnection {
    fn provider(&self) -> DatabaseProvider {
        DatabaseProvider::Sqlite
    }

    fn connection_string(&self) -> &ConnectionStringBuilder {
        &self.connection_string
    }

    async fn execute(&self, sql: &str) -> Result<u64> {
        let result = sqlx::query(sql).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn execute_script(&self, sql: &str) -> Result<u64> {
        let result = sqlx::raw_sql(sql).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn database_exists(&self, name: &str) -> Result<bool> {
        let file = sqlite_file_name(require_name(name)?);
        if file == ":memory:" {
            return Ok(true);
        }
        Ok(tokio::fs::try_exists(&file).await.map_err(sqlx::Error::Io)?)
    }

    async fn login_exists(&self, _name: &str) -> Result<bool> {
        Err(DataError::unsupported(DatabaseProvider::Sqlite, "login_exists"))
    }

    async fn change_database(&mut self, name: &str) -> Result<()> {
        let connection_string = self.connection_string.with_database(name)?;
        let pool = Self::open_pool(&connection_string, &self.pool_config, &self.retry).await?;

        let old = std::mem::replace(&mut self.pool, pool);
        self.connection_string = connection_string;
        old.close().await;

        tracing::info!(database = ?self.database(), "Changed database");
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

/// A connection to whichever provider the configuration names.
#[derive(Debug, Clone)]
pub enum WhippetConnection {
    /// `PostgreSQL`
    Postgres(PostgresConnection),
    /// `SQLite`
    Sqlite(SqliteConnection),
}

impl WhippetConnection {
    /// Open a connection for `config.provider`.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::UnsupportedProvider`] for SQL Server, which has
    /// no bundled driver, or the provider's connect error.
    pub async fn open(config: &DatabaseConfig) -> Result<Self> {
        match config.provider {
            DatabaseProvider::PostgreSql => PostgresConnection::connect(config).await.map(Self::Postgres),
            DatabaseProvider::Sqlite => SqliteConnection::connect(config).await.map(Self::Sqlite),
            DatabaseProvider::SqlServer => Err(DataError::unsupported(config.provider, "connect")),
        }
    }

    /// The `PostgreSQL` connection, if that is the provider.
    #[must_use]
    pub const fn as_postgres(&self) -> Option<&PostgresConnection> {
        match self {
            Self::Postgres(connection) => Some(connection),
            Self::Sqlite(_) => None,
        }
    }

    /// The `SQLite` connection, if that is the provider.
    #[must_use]
    pub const fn as_sqlite(&self) -> Option<&SqliteConnection> {
        match self {
            Self::Sqlite(connection) => Some(connection),
            Self::Postgres(_) => None,
        }
    }
}

impl From<PostgresConnection> for WhippetConnection {
    fn from(connection: PostgresConnection) -> Self {
        Self::Postgres(connection)
    }
}

impl From<SqliteConnection> for WhippetConnection {
    fn from(connection: SqliteConnection) -> Self {
        Self::Sqlite(connection)
    }
}

impl DatabaseConnection for WhippetConnection {
    fn provider(&self) -> DatabaseProvider {
        match self {
            Self::Postgres(c) => c.provider(),
            Self::Sqlite(c) => c.provider(),
        }
    }

    fn connection_string(&self) -> &ConnectionStringBuilder {
        match self {
            Self::Postgres(c) => c.connection_string(),
            Self::Sqlite(c) => c.connection_string(),
        }
    }

    async fn execute(&self, sql: &str) -> Result<u64> {
        match self {
            Self::Postgres(c) => c.execute(sql).await,
            Self::Sqlite(c) => c.execute(sql).await,
        }
    }

    async fn execute_script(&self, sql: &str) -> Result<u64> {
        match self {
            Self::Postgres(c) => c.execute_script(sql).await,
            Self::Sqlite(c) => c.execute_script(sql).await,
        }
    }

    async fn database_exists(&self, name: &str) -> Result<bool> {
        match self {
            Self::Postgres(c) => c.database_exists(name).await,
            Self::Sqlite(c) => c.database_exists(name).await,
        }
    }

    async fn login_exists(&self, name: &str) -> Result<bool> {
        match self {
            Self::Postgres(c) => c.login_exists(name).await,
            Self::Sqlite(c) => c.login_exists(name).await,
        }
    }

    async fn change_database(&mut self, name: &str) -> Result<()> {
        match self {
            Self::Postgres(c) => c.change_database(name).await,
            Self::Sqlite(c) => c.change_database(name).await,
        }
    }

    async fn close(&self) {
        match self {
            Self::Postgres(c) => c.close().await,
            Self::Sqlite(c) => c.close().await,
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)] // Test code

    use super::*;

    fn memory_config() -> DatabaseConfig {
        DatabaseConfig::new(DatabaseProvider::Sqlite, "Data Source=:memory:")
            .unwrap()
            .with_retry(RetryPolicy::none())
    }

    #[tokio::test]
    async fn sql_server_has_no_live_driver() {
        let config = DatabaseConfig::new(DatabaseProvider::SqlServer, "Server=.;Database=master").unwrap();
        let result = WhippetConnection::open(&config).await;
        assert!(matches!(
            result,
            Err(DataError::UnsupportedProvider {
                provider: DatabaseProvider::SqlServer,
                operation: "connect"
            })
        ));
    }

    #[tokio::test]
    async fn provider_mismatch_is_rejected() {
        let result = PostgresConnection::connect(&memory_config()).await;
        assert!(matches!(result, Err(DataError::UnsupportedProvider { .. })));
    }

    #[tokio::test]
    async fn sqlite_memory_executes_statements() {
        let connection = WhippetConnection::open(&memory_config()).await.unwrap();

        connection
            .execute_script("CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT); INSERT INTO t (name) VALUES ('a'), ('b');")
            .await
            .unwrap();
        let affected = connection.execute("UPDATE t SET name = 'c'").await.unwrap();

        assert_eq!(affected, 2);
        assert_eq!(connection.provider(), DatabaseProvider::Sqlite);
        assert_eq!(connection.database(), Some(":memory:"));
        assert!(connection.as_sqlite().is_some());
        assert!(connection.as_postgres().is_none());
        connection.close().await;
    }

    #[tokio::test]
    async fn sqlite_has_no_logins() {
        let connection = WhippetConnection::open(&memory_config()).await.unwrap();
        assert!(matches!(
            connection.login_exists("whippet_sa").await,
            Err(DataError::UnsupportedProvider { .. })
        ));
        assert!(matches!(
            connection.database_exists(" ").await,
            Err(DataError::ArgumentNull(_))
        ));
    }

    #[tokio::test]
    async fn sqlite_change_database_opens_another_file() {
        let dir = std::env::temp_dir().join(format!("whippet-{}", uuid::Uuid::new_v4()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let first = dir.join("first.sqlite");
        let second = dir.join("second");

        let config = DatabaseConfig::new(
            DatabaseProvider::Sqlite,
            &format!("Data Source={}", first.display()),
        )
        .unwrap();
        let mut connection = SqliteConnection::connect(&config).await.unwrap();
        assert!(connection.database_exists(&first.display().to_string()).await.unwrap());
        assert!(!connection.database_exists(&second.display().to_string()).await.unwrap());

        connection.change_database(&second.display().to_string()).await.unwrap();

        let expected = format!("{}.sqlite", second.display());
        assert_eq!(connection.database(), Some(expected.as_str()));
        assert!(connection.database_exists(&expected).await.unwrap());

        connection.close().await;
        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[test]
    fn type_descriptor_names() {
        let int4 = PgTypeDescriptor {
            oid: 23,
            namespace: "pg_catalog".to_string(),
            name: "int4".to_string(),
        };
        assert_eq!(int4.display_name(), "int4");
        assert_eq!(int4.full_name(), "pg_catalog.int4");

        let custom = PgTypeDescriptor {
            oid: 90_000,
            namespace: "whippet".to_string(),
            name: "status".to_string(),
        };
        assert_eq!(custom.display_name(), "whippet.status");
    }
}
