//! In-memory log entries for tests, ordered like the `PostgreSQL` store.

use crate::entries::{LogEntry, LogEntryRepository, LogLevel};
use chrono::{DateTime, Utc};
use whippet_core::result::WhippetResult;
use whippet_testing::InMemoryRepository;

// Missing timestamps sort after every real one.
fn chronological(entry: &LogEntry) -> (bool, Option<DateTime<Utc>>, i64) {
    (entry.timestamp.is_none(), entry.timestamp, entry.id)
}

fn sorted(mut entries: Vec<LogEntry>) -> Vec<LogEntry> {
    entries.sort_by_key(chronological);
    entries
}

impl LogEntryRepository for InMemoryRepository<LogEntry> {
    async fn earliest(&self) -> WhippetResult<Option<LogEntry>> {
        Ok(self.find(|_| true)?.into_iter().min_by_key(chronological))
    }

    async fn latest(&self) -> WhippetResult<Option<LogEntry>> {
        Ok(self
            .find(|_| true)?
            .into_iter()
            .max_by_key(|entry| (entry.timestamp.is_some(), entry.timestamp, entry.id)))
    }

    async fn by_level(&self, level: LogLevel) -> WhippetResult<Vec<LogEntry>> {
        self.find(|entry| entry.level == Some(level)).map(sorted)
    }

    async fn between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> WhippetResult<Vec<LogEntry>> {
        self.find(|entry| entry.timestamp.is_some_and(|at| from <= at && at <= to))
            .map(sorted)
    }
}
