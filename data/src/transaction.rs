//! Explicit transactions.
//!
//! A [`WhippetTransaction`] that is dropped without [`WhippetTransaction::commit`]
//! is rolled back.

use crate::connection::{PostgresConnection, SqliteConnection};
use crate::error::Result;
use sqlx::{Postgres, Sqlite, Transaction};
use std::fmt;

/// Transaction isolation level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IsolationLevel {
    /// Read uncommitted (treated as read committed by `PostgreSQL`)
    ReadUncommitted,
    /// Read committed
    #[default]
    ReadCommitted,
    /// Repeatable read
    RepeatableRead,
    /// Serializable
    Serializable,
}

impl IsolationLevel {
    /// SQL spelling, as used in `SET TRANSACTION ISOLATION LEVEL`.
    #[must_use]
    pub const fn as_sql(&self) -> &'static str {
        match self {
            Self::ReadUncommitted => "READ UNCOMMITTED",
            Self::ReadCommitted => "READ COMMITTED",
            Self::RepeatableRead => "REPEATABLE READ",
            Self::Serializable => "SERIALIZABLE",
        }
    }
}

impl fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// An open transaction on a pooled connection.
pub struct WhippetTransaction<DB: sqlx::Database> {
    inner: Transaction<'static, DB>,
}

impl<DB: sqlx::Database> WhippetTransaction<DB> {
    const fn new(inner: Transaction<'static, DB>) -> Self {
        Self { inner }
    }

    /// Commit the transaction.
    ///
    /// # Errors
    ///
    /// Returns [`crate::DataError::Sqlx`] if the commit fails; the transaction
    /// is rolled back by the server then.
    pub async fn commit(self) -> Result<()> {
        self.inner.commit().await?;
        tracing::debug!("Transaction committed");
        Ok(())
    }

    /// Roll back the transaction.
    ///
    /// # Errors
    ///
    /// Returns [`crate::DataError::Sqlx`] if the rollback cannot be sent.
    pub async fn rollback(self) -> Result<()> {
        self.inner.rollback().await?;
        tracing::debug!("Transaction rolled back");
        Ok(())
    }

    /// The `sqlx` transaction, for queries this type does not wrap.
    pub fn inner(&mut self) -> &mut Transaction<'static, DB> {
        &mut self.inner
    }
}

impl<DB: sqlx::Database> fmt::Debug for WhippetTransaction<DB> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WhippetTransaction").finish_non_exhaustive()
    }
}

impl WhippetTransaction<Postgres> {
    /// Run one statement inside the transaction.
    ///
    /// # Errors
    ///
    /// Returns [`crate::DataError::Sqlx`] if the statement fails.
    pub async fn execute(&mut self, sql: &str) -> Result<u64> {
        let result = sqlx::query(sql).execute(&mut *self.inner).await?;
        Ok(result.rows_affected())
    }
}

impl WhippetTransaction<Sqlite> {
    /// Run one statement inside the transaction.
    ///
    /// # Errors
    ///
    /// Returns [`crate::DataError::Sqlx`] if the statement fails.
    pub async fn execute(&mut self, sql: &str) -> Result<u64> {
        let result = sqlx::query(sql).execute(&mut *self.inner).await?;
        Ok(result.rows_affected())
    }
}

impl PostgresConnection {
    /// Begin a transaction at the server's default isolation level.
    ///
    /// # Errors
    ///
    /// Returns [`crate::DataError::Sqlx`] if no connection can be acquired.
    pub async fn begin(&self) -> Result<WhippetTransaction<Postgres>> {
        let inner = self.pool().begin().await?;
        Ok(WhippetTransaction::new(inner))
    }

    /// Begin a transaction at `level`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::DataError::Sqlx`] if no connection can be acquired or
    /// the level cannot be set.
    pub async fn begin_with(&self, level: IsolationLevel) -> Result<WhippetTransaction<Postgres>> {
        let mut transaction = self.begin().await?;
        transaction
            .execute(&format!("SET TRANSACTION ISOLATION LEVEL {}", level.as_sql()))
            .await?;
        Ok(transaction)
    }
}

impl SqliteConnection {
    /// Begin a transaction.
    ///
    /// # Errors
    ///
    /// Returns [`crate::DataError::Sqlx`] if no connection can be acquired.
    pub async fn begin(&self) -> Result<WhippetTransaction<Sqlite>> {
        let inner = self.pool().begin().await?;
        Ok(WhippetTransaction::new(inner))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)] // Test code

    use super::*;
    use crate::config::DatabaseConfig;
    use crate::connection::DatabaseConnection;
    use crate::provider::DatabaseProvider;
    use whippet_runtime::RetryPolicy;

    async fn connection() -> SqliteConnection {
        let config = DatabaseConfig::new(DatabaseProvider::Sqlite, "Data Source=:memory:")
            .unwrap()
            .with_retry(RetryPolicy::none());
        let connection = SqliteConnection::connect(&config).await.unwrap();
        connection
            .execute("CREATE TABLE tenants (name TEXT NOT NULL)")
            .await
            .unwrap();
        connection
    }

    async fn count(connection: &SqliteConnection) -> i64 {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM tenants")
            .fetch_one(connection.pool())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn commit_keeps_changes() {
        let connection = connection().await;

        let mut tx = connection.begin().await.unwrap();
        assert_eq!(tx.execute("INSERT INTO tenants VALUES ('root')").await.unwrap(), 1);
        tx.commit().await.unwrap();

        assert_eq!(count(&connection).await, 1);
    }

    #[tokio::test]
    async fn rollback_discards_changes() {
        let connection = connection().await;

        let mut tx = connection.begin().await.unwrap();
        tx.execute("INSERT INTO tenants VALUES ('root')").await.unwrap();
        tx.rollback().await.unwrap();

        assert_eq!(count(&connection).await, 0);
    }

    #[tokio::test]
    async fn drop_without_commit_rolls_back() {
        let connection = connection().await;

        {
            let mut tx = connection.begin().await.unwrap();
            tx.execute("INSERT INTO tenants VALUES ('root')").await.unwrap();
        }

        assert_eq!(count(&connection).await, 0);
    }

    #[test]
    fn isolation_level_sql() {
        assert_eq!(IsolationLevel::default(), IsolationLevel::ReadCommitted);
        assert_eq!(IsolationLevel::Serializable.to_string(), "SERIALIZABLE");
        assert_eq!(IsolationLevel::RepeatableRead.as_sql(), "REPEATABLE READ");
    }
}
