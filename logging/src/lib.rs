//! # Whippet Logging
//!
//! Queries over the log entries the structured logging sink stores in the
//! `whippet` schema: by id, all, earliest, latest, by level, and within a
//! time window. The crate never writes entries.
//!
//! ## Features
//!
//! - `test-utils` (default): in-memory repository ([`mocks`])
//! - `postgres`: reader over `whippet.log_entries` ([`stores::postgres`])

pub mod entries;
pub mod handlers;
pub mod stores;

#[cfg(feature = "test-utils")]
pub mod mocks;

// Re-exports
pub use entries::{
    GetEarliestLogEntry, GetLatestLogEntry, GetLogEntriesBetween, GetLogEntriesByLevel, LogEntry,
    LogEntryRepository, LogLevel,
};
pub use handlers::register_handlers;
