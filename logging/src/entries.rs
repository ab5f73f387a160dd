//! Log entries written by the structured logging sink, and the queries over
//! them.
//!
//! Entries are read-only from Whippet's side: the sink inserts them, the
//! administration screens only look. Every list is ordered by timestamp,
//! then id, with entries missing a timestamp last.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use whippet_core::cqrs::{Query, QueryHandler, QueryParameter};
use whippet_core::repository::{Entity, QueryRepository};
use whippet_core::result::{ResultContainerExt, WhippetError, WhippetResult};

/// Severity of a log entry, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LogLevel {
    /// Tracing detail
    Verbose,
    /// Diagnostics
    Debug,
    /// Normal operation
    Information,
    /// Unexpected but handled
    Warning,
    /// Failed operation
    Error,
    /// The process cannot continue
    Fatal,
}

impl LogLevel {
    /// Every level, lowest first.
    pub const ALL: [Self; 6] = [
        Self::Verbose,
        Self::Debug,
        Self::Information,
        Self::Warning,
        Self::Error,
        Self::Fatal,
    ];

    /// Name as stored by the sink.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Verbose => "Verbose",
            Self::Debug => "Debug",
            Self::Information => "Information",
            Self::Warning => "Warning",
            Self::Error => "Error",
            Self::Fatal => "Fatal",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = WhippetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        Self::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| WhippetError::validation("level", format!("unknown log level '{name}'")))
    }
}

/// One captured log event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Sequential id assigned by the sink
    pub id: i64,
    /// Rendered message
    pub message: Option<String>,
    /// Template the message was rendered from
    pub message_template: Option<String>,
    /// Severity, when the stored level is recognised
    pub level: Option<LogLevel>,
    /// When the event was captured
    pub timestamp: Option<DateTime<Utc>>,
    /// Rendered exception, if one was attached
    pub exception: Option<String>,
    /// Template properties as the sink serialized them
    pub properties: Option<String>,
}

impl Entity for LogEntry {
    type Id = i64;

    const ENTITY_NAME: &'static str = "LogEntry";

    fn id(&self) -> i64 {
        self.id
    }
}

/// Read access to log entries.
pub trait LogEntryRepository: QueryRepository<LogEntry> {
    /// The entry with the earliest timestamp.
    fn earliest(&self) -> impl Future<Output = WhippetResult<Option<LogEntry>>> + Send;

    /// The entry with the latest timestamp.
    fn latest(&self) -> impl Future<Output = WhippetResult<Option<LogEntry>>> + Send;

    /// Every entry at `level`.
    fn by_level(&self, level: LogLevel) -> impl Future<Output = WhippetResult<Vec<LogEntry>>> + Send;

    /// Every entry captured between `from` and `to`, both inclusive.
    fn between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> impl Future<Output = WhippetResult<Vec<LogEntry>>> + Send;
}

/// The earliest log entry.
#[derive(Debug, Clone, Default)]
pub struct GetEarliestLogEntry;

impl Query for GetEarliestLogEntry {
    type Entity = LogEntry;
}

/// The latest log entry.
#[derive(Debug, Clone, Default)]
pub struct GetLatestLogEntry;

impl Query for GetLatestLogEntry {
    type Entity = LogEntry;
}

/// Every log entry at one level.
#[derive(Debug, Clone)]
pub struct GetLogEntriesByLevel {
    /// Level to match
    pub level: LogLevel,
}

impl GetLogEntriesByLevel {
    /// Create the query.
    #[must_use]
    pub const fn new(level: LogLevel) -> Self {
        Self { level }
    }
}

impl Query for GetLogEntriesByLevel {
    type Entity = LogEntry;

    fn parameters(&self) -> Vec<QueryParameter> {
        vec![("level", Value::String(self.level.to_string()))]
    }
}

/// Every log entry in a time window.
#[derive(Debug, Clone)]
pub struct GetLogEntriesBetween {
    /// Window start, inclusive
    pub from: DateTime<Utc>,
    /// Window end, inclusive
    pub to: DateTime<Utc>,
}

impl GetLogEntriesBetween {
    /// Create the query.
    #[must_use]
    pub const fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self { from, to }
    }
}

impl Query for GetLogEntriesBetween {
    type Entity = LogEntry;

    fn parameters(&self) -> Vec<QueryParameter> {
        vec![
            ("from", Value::String(self.from.to_rfc3339())),
            ("to", Value::String(self.to.to_rfc3339())),
        ]
    }
}

/// Handles every log entry query over one repository.
#[derive(Debug)]
pub struct LogEntryQueryHandler<R> {
    repository: Arc<R>,
}

impl<R> LogEntryQueryHandler<R> {
    /// Create a handler over `repository`.
    #[must_use]
    pub const fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }
}

impl<R> Clone for LogEntryQueryHandler<R> {
    fn clone(&self) -> Self {
        Self::new(Arc::clone(&self.repository))
    }
}

impl<R: LogEntryRepository> QueryHandler<GetEarliestLogEntry> for LogEntryQueryHandler<R> {
    async fn handle(&self, _query: GetEarliestLogEntry) -> WhippetResult<Vec<LogEntry>> {
        self.repository.earliest().await.into_enumerable()
    }
}

impl<R: LogEntryRepository> QueryHandler<GetLatestLogEntry> for LogEntryQueryHandler<R> {
    async fn handle(&self, _query: GetLatestLogEntry) -> WhippetResult<Vec<LogEntry>> {
        self.repository.latest().await.into_enumerable()
    }
}

impl<R: LogEntryRepository> QueryHandler<GetLogEntriesByLevel> for LogEntryQueryHandler<R> {
    async fn handle(&self, query: GetLogEntriesByLevel) -> WhippetResult<Vec<LogEntry>> {
        self.repository.by_level(query.level).await
    }
}

impl<R: LogEntryRepository> QueryHandler<GetLogEntriesBetween> for LogEntryQueryHandler<R> {
    async fn handle(&self, query: GetLogEntriesBetween) -> WhippetResult<Vec<LogEntry>> {
        if query.from > query.to {
            return Err(WhippetError::validation("to", "window ends before it starts"));
        }
        self.repository.between(query.from, query.to).await
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)] // Test code

    use super::*;

    #[test]
    fn levels_parse_ignoring_case() {
        assert_eq!("warning".parse::<LogLevel>().unwrap(), LogLevel::Warning);
        assert_eq!(" FATAL ".parse::<LogLevel>().unwrap(), LogLevel::Fatal);
        assert!("Critical".parse::<LogLevel>().unwrap_err().is_validation());
        assert!(LogLevel::Verbose < LogLevel::Information);
        assert_eq!(LogLevel::Information.to_string(), "Information");
    }

    #[test]
    fn window_query_reports_both_bounds() {
        let from = DateTime::<Utc>::UNIX_EPOCH;
        let parameters = GetLogEntriesBetween::new(from, from).parameters();
        assert_eq!(parameters[0].0, "from");
        assert_eq!(parameters[1], ("to", Value::String(from.to_rfc3339())));
    }
}
