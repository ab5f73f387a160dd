//! Metrics and spans recorded for every dispatched message.

#![allow(clippy::unwrap_used)] // Test code

use metrics_util::debugging::{DebugValue, DebuggingRecorder};
use metrics_util::{CompositeKey, MetricKind};
use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id};
use tracing_subscriber::Registry;
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
use whippet_core::cqrs::{Command, CommandHandler, Query, QueryHandler};
use whippet_core::result::{WhippetError, WhippetResult};
use whippet_runtime::Dispatcher;

#[derive(Debug)]
struct Publish {
    reject: bool,
}

impl Command for Publish {}

struct PublishHandler;

impl CommandHandler<Publish> for PublishHandler {
    async fn handle(&self, command: Publish) -> WhippetResult {
        if command.reject {
            return Err(WhippetError::Repository("storefront unavailable".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug)]
struct ListChannels;

impl Query for ListChannels {
    type Entity = String;
}

struct ListChannelsHandler;

impl QueryHandler<ListChannels> for ListChannelsHandler {
    async fn handle(&self, _query: ListChannels) -> WhippetResult<Vec<String>> {
        Ok(vec!["storefront".to_string()])
    }
}

/// Span name and `message_type` field of every span opened.
#[derive(Clone, Default)]
struct SpanLog(Arc<Mutex<Vec<(String, String)>>>);

struct MessageType(Option<String>);

impl Visit for MessageType {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message_type" {
            self.0 = Some(value.to_string());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message_type" && self.0.is_none() {
            self.0 = Some(format!("{value:?}"));
        }
    }
}

impl<S: tracing::Subscriber> Layer<S> for SpanLog {
    fn on_new_span(&self, attrs: &Attributes<'_>, _id: &Id, _ctx: Context<'_, S>) {
        let mut visitor = MessageType(None);
        attrs.record(&mut visitor);
        if let Some(message_type) = visitor.0 {
            self.0
                .lock()
                .unwrap()
                .push((attrs.metadata().name().to_string(), message_type));
        }
    }
}

fn labels(key: &CompositeKey) -> Vec<(String, String)> {
    let mut labels: Vec<_> = key
        .key()
        .labels()
        .map(|label| (label.key().to_string(), label.value().to_string()))
        .collect();
    labels.sort();
    labels
}

fn label<'a>(labels: &'a [(String, String)], name: &str) -> Option<&'a str> {
    labels
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
}

#[test]
fn dispatch_records_outcome_counters_and_duration() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();

    metrics::with_local_recorder(&recorder, || {
        runtime.block_on(async {
            let dispatcher = Dispatcher::builder()
                .command_handler(PublishHandler)
                .unwrap()
                .build();
            dispatcher.send(Publish { reject: false }).await.unwrap();
            dispatcher.send(Publish { reject: true }).await.unwrap_err();
        });
    });

    let snapshot = snapshotter.snapshot().into_vec();

    let mut outcomes = Vec::new();
    let mut durations = Vec::new();
    for (key, _, _, value) in snapshot {
        let labels = labels(&key);
        match (key.kind(), key.key().name(), value) {
            (MetricKind::Counter, "whippet_dispatch_total", DebugValue::Counter(count)) => {
                assert_eq!(label(&labels, "kind"), Some("command"));
                assert!(label(&labels, "message_type").unwrap().ends_with("Publish"));
                outcomes.push((label(&labels, "outcome").unwrap().to_string(), count));
            }
            (MetricKind::Histogram, "whippet_dispatch_duration_seconds", DebugValue::Histogram(samples)) => {
                assert_eq!(label(&labels, "kind"), Some("command"));
                durations.extend(samples.into_iter().map(|sample| sample.into_inner()));
            }
            _ => {}
        }
    }

    outcomes.sort();
    assert_eq!(
        outcomes,
        vec![("error".to_string(), 1), ("success".to_string(), 1)]
    );
    assert_eq!(durations.len(), 2);
    assert!(durations.iter().all(|seconds| *seconds >= 0.0));
}

#[test]
fn unhandled_message_is_counted() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();

    metrics::with_local_recorder(&recorder, || {
        runtime.block_on(async {
            let dispatcher = Dispatcher::builder().build();
            dispatcher.send(Publish { reject: false }).await.unwrap_err();
        });
    });

    let unhandled = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .filter(|(key, ..)| key.key().name() == "whippet_dispatch_total")
        .map(|(key, ..)| labels(&key))
        .collect::<Vec<_>>();
    assert_eq!(unhandled.len(), 1);
    assert_eq!(label(&unhandled[0], "outcome"), Some("unhandled"));
}

#[test]
fn dispatch_opens_a_span_per_message_type() {
    let spans = SpanLog::default();
    let subscriber = Registry::default().with(spans.clone());
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();

    tracing::subscriber::with_default(subscriber, || {
        runtime.block_on(async {
            let dispatcher = Dispatcher::builder()
                .command_handler(PublishHandler)
                .unwrap()
                .query_handler(ListChannelsHandler)
                .unwrap()
                .build();
            dispatcher.send(Publish { reject: false }).await.unwrap();
            dispatcher.query(ListChannels).await.unwrap();
        });
    });

    let recorded = spans.0.lock().unwrap().clone();
    assert_eq!(recorded.len(), 2);
    assert_eq!(recorded[0].0, "dispatch_command");
    assert!(recorded[0].1.ends_with("Publish"));
    assert_eq!(recorded[1].0, "dispatch_query");
    assert!(recorded[1].1.ends_with("ListChannels"));
}
