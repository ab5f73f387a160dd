//! Wiring of the log entry queries into a dispatcher.

use crate::entries::{
    GetEarliestLogEntry, GetLatestLogEntry, GetLogEntriesBetween, GetLogEntriesByLevel, LogEntry,
    LogEntryQueryHandler, LogEntryRepository,
};
use std::sync::Arc;
use whippet_core::crud::{GetAll, GetAllHandler, GetById, GetByIdHandler};
use whippet_runtime::{DispatchError, DispatcherBuilder};

/// Register the log entry query handlers backed by `repository`.
///
/// Entries are written by the logging sink, so no commands are registered.
///
/// # Errors
///
/// Returns [`DispatchError::DuplicateHandler`] if `builder` already serves
/// one of the log entry queries.
pub fn register_handlers<R: LogEntryRepository>(
    builder: DispatcherBuilder,
    repository: &Arc<R>,
) -> Result<DispatcherBuilder, DispatchError> {
    let handler = LogEntryQueryHandler::new(Arc::clone(repository));

    let builder = builder
        .query_handler::<GetById<LogEntry>, _>(GetByIdHandler::new(Arc::clone(repository)))?
        .query_handler::<GetAll<LogEntry>, _>(GetAllHandler::new(Arc::clone(repository)))?
        .query_handler::<GetEarliestLogEntry, _>(handler.clone())?
        .query_handler::<GetLatestLogEntry, _>(handler.clone())?
        .query_handler::<GetLogEntriesByLevel, _>(handler.clone())?
        .query_handler::<GetLogEntriesBetween, _>(handler)?;

    tracing::debug!("Log entry handlers registered");
    Ok(builder)
}
