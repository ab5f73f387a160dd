//! Log entry queries routed through a dispatcher over in-memory entries.

#![allow(clippy::unwrap_used)] // Test code

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use whippet_core::crud::{Create, GetAll, GetById};
use whippet_core::result::WhippetError;
use whippet_logging::{
    GetEarliestLogEntry, GetLatestLogEntry, GetLogEntriesBetween, GetLogEntriesByLevel, LogEntry, LogLevel,
    register_handlers,
};
use whippet_runtime::{DispatchError, Dispatcher};
use whippet_testing::InMemoryRepository;

fn at(minutes: i64) -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH + Duration::minutes(minutes)
}

fn entry(id: i64, level: LogLevel, timestamp: Option<DateTime<Utc>>) -> LogEntry {
    LogEntry {
        id,
        message: Some(format!("event {id}")),
        message_template: Some("event {Id}".to_string()),
        level: Some(level),
        timestamp,
        exception: None,
        properties: None,
    }
}

fn dispatcher(entries: Vec<LogEntry>) -> Dispatcher {
    let repository = Arc::new(InMemoryRepository::with_rows(entries));
    register_handlers(Dispatcher::builder(), &repository).unwrap().build()
}

#[tokio::test]
async fn earliest_and_latest_follow_timestamps() {
    let dispatcher = dispatcher(vec![
        entry(1, LogLevel::Information, Some(at(10))),
        entry(2, LogLevel::Warning, Some(at(5))),
        entry(3, LogLevel::Error, None),
        entry(4, LogLevel::Debug, Some(at(20))),
    ]);

    let earliest = dispatcher.query(GetEarliestLogEntry).await.unwrap();
    assert_eq!(earliest.len(), 1);
    assert_eq!(earliest[0].id, 2);

    let latest = dispatcher.query(GetLatestLogEntry).await.unwrap();
    assert_eq!(latest[0].id, 4);

    assert_eq!(dispatcher.query(GetById::<LogEntry>::new(3)).await.unwrap().len(), 1);
    assert_eq!(dispatcher.query(GetAll::<LogEntry>::new()).await.unwrap().len(), 4);
}

#[tokio::test]
async fn empty_log_yields_no_entries() {
    let dispatcher = dispatcher(Vec::new());

    assert!(dispatcher.query(GetEarliestLogEntry).await.unwrap().is_empty());
    assert!(dispatcher.query(GetLatestLogEntry).await.unwrap().is_empty());
}

#[tokio::test]
async fn entries_filter_by_level_and_window() {
    let dispatcher = dispatcher(vec![
        entry(1, LogLevel::Error, Some(at(30))),
        entry(2, LogLevel::Information, Some(at(10))),
        entry(3, LogLevel::Error, Some(at(20))),
        entry(4, LogLevel::Error, None),
    ]);

    let errors = dispatcher.query(GetLogEntriesByLevel::new(LogLevel::Error)).await.unwrap();
    let ids: Vec<_> = errors.iter().map(|entry| entry.id).collect();
    assert_eq!(ids, vec![3, 1, 4]);

    let window = dispatcher
        .query(GetLogEntriesBetween::new(at(10), at(20)))
        .await
        .unwrap();
    let ids: Vec<_> = window.iter().map(|entry| entry.id).collect();
    assert_eq!(ids, vec![2, 3]);

    assert!(matches!(
        dispatcher.query(GetLogEntriesBetween::new(at(20), at(10))).await,
        Err(WhippetError::Validation { field, .. }) if field == "to"
    ));
}

#[tokio::test]
async fn entries_cannot_be_written_through_the_dispatcher() {
    let dispatcher = dispatcher(Vec::new());

    let result = dispatcher.send(Create::new(entry(1, LogLevel::Fatal, None))).await;

    assert!(matches!(result, Err(WhippetError::HandlerNotFound { .. })));
    assert_eq!(dispatcher.len(), 6);
}

#[test]
fn registering_twice_is_rejected() {
    let repository = Arc::new(InMemoryRepository::<LogEntry>::new());
    let builder = register_handlers(Dispatcher::builder(), &repository).unwrap();

    assert!(matches!(
        register_handlers(builder, &repository),
        Err(DispatchError::DuplicateHandler { .. })
    ));
}
