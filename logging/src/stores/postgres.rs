//! `PostgreSQL` reader for the `whippet.log_entries` table.
//!
//! The table is written by the logging sink with sequential ids, so it is
//! read with dedicated statements rather than the UUID-keyed generic
//! repository. Levels are stored as text; a level no [`LogLevel`] matches
//! reads as `None`.

use crate::entries::{LogEntry, LogEntryRepository, LogLevel};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use whippet_core::repository::QueryRepository;
use whippet_core::result::{WhippetError, WhippetResult};
use whippet_data::{DataError, PostgresConnection};

const SELECT: &str = "SELECT id, message, message_template, level, timestamp, exception, properties \
                      FROM whippet.log_entries";
const CHRONOLOGICAL: &str = "ORDER BY timestamp ASC NULLS LAST, id ASC";

#[derive(sqlx::FromRow)]
struct LogEntryRow {
    id: i64,
    message: Option<String>,
    message_template: Option<String>,
    level: Option<String>,
    timestamp: Option<DateTime<Utc>>,
    exception: Option<String>,
    properties: Option<String>,
}

impl From<LogEntryRow> for LogEntry {
    fn from(row: LogEntryRow) -> Self {
        let level = row.level.as_deref().and_then(|name| match name.parse::<LogLevel>() {
            Ok(level) => Some(level),
            Err(_) => {
                tracing::warn!(id = row.id, level = %name, "Unrecognised log level");
                None
            }
        });
        Self {
            id: row.id,
            message: row.message,
            message_template: row.message_template,
            level,
            timestamp: row.timestamp,
            exception: row.exception,
            properties: row.properties,
        }
    }
}

fn db_error(error: sqlx::Error) -> WhippetError {
    DataError::from(error).into()
}

/// Reads log entries from `whippet.log_entries`.
#[derive(Debug, Clone)]
pub struct PostgresLogEntryRepository {
    pool: PgPool,
}

impl PostgresLogEntryRepository {
    /// Create a repository over `pool`.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a repository over an open connection's pool.
    #[must_use]
    pub fn from_connection(connection: &PostgresConnection) -> Self {
        Self::new(connection.pool().clone())
    }

    async fn first(&self, order: &str) -> WhippetResult<Option<LogEntry>> {
        let sql = format!("{SELECT} {order} LIMIT 1");
        let row = sqlx::query_as::<_, LogEntryRow>(&sql)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(row.map(LogEntry::from))
    }
}

impl QueryRepository<LogEntry> for PostgresLogEntryRepository {
    async fn get(&self, id: &i64) -> WhippetResult<Option<LogEntry>> {
        let sql = format!("{SELECT} WHERE id = $1");
        let row = sqlx::query_as::<_, LogEntryRow>(&sql)
            .bind(*id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(row.map(LogEntry::from))
    }

    async fn get_all(&self) -> WhippetResult<Vec<LogEntry>> {
        let sql = format!("{SELECT} {CHRONOLOGICAL}");
        let rows = sqlx::query_as::<_, LogEntryRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(rows.into_iter().map(LogEntry::from).collect())
    }
}

impl LogEntryRepository for PostgresLogEntryRepository {
    async fn earliest(&self) -> WhippetResult<Option<LogEntry>> {
        self.first(CHRONOLOGICAL).await
    }

    async fn latest(&self) -> WhippetResult<Option<LogEntry>> {
        self.first("ORDER BY timestamp DESC NULLS LAST, id DESC").await
    }

    async fn by_level(&self, level: LogLevel) -> WhippetResult<Vec<LogEntry>> {
        let sql = format!("{SELECT} WHERE lower(level) = lower($1) {CHRONOLOGICAL}");
        let rows = sqlx::query_as::<_, LogEntryRow>(&sql)
            .bind(level.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(rows.into_iter().map(LogEntry::from).collect())
    }

    async fn between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> WhippetResult<Vec<LogEntry>> {
        let sql = format!("{SELECT} WHERE timestamp BETWEEN $1 AND $2 {CHRONOLOGICAL}");
        let rows = sqlx::query_as::<_, LogEntryRow>(&sql)
            .bind(from)
            .bind(to)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(rows.into_iter().map(LogEntry::from).collect())
    }
}
