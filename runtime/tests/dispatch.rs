//! End-to-end dispatch through generic CRUD handlers.

#![allow(clippy::unwrap_used)] // Tests can unwrap
#![allow(clippy::expect_used)] // Tests can expect

use std::sync::Arc;
use whippet_core::crud::{Create, CreateHandler, Delete, GetAll, GetById, Update};
use whippet_core::repository::Entity;
use whippet_core::result::{require_not_blank, WhippetError, WhippetResult};
use whippet_runtime::{DispatchError, Dispatcher};
use whippet_testing::{InMemoryRepository, init_test_tracing};

#[derive(Debug, Clone, PartialEq)]
struct Channel {
    id: u32,
    name: String,
}

impl Entity for Channel {
    type Id = u32;
    const ENTITY_NAME: &'static str = "Channel";

    fn id(&self) -> u32 {
        self.id
    }

    fn validate(&self) -> WhippetResult {
        require_not_blank(&self.name, "name")
    }
}

fn channel(id: u32, name: &str) -> Channel {
    Channel {
        id,
        name: name.to_string(),
    }
}

fn dispatcher(channels: &Arc<InMemoryRepository<Channel>>) -> Dispatcher {
    Dispatcher::builder()
        .crud_handlers::<Channel, _>(channels)
        .expect("each message type is registered once")
        .build()
}

#[tokio::test]
async fn crud_round_trip_through_dispatcher() {
    init_test_tracing();
    let channels = Arc::new(InMemoryRepository::new());
    let dispatcher = dispatcher(&channels);

    dispatcher.send(Create::new(channel(1, "web"))).await.unwrap();
    dispatcher.send(Create::new(channel(2, "marketplace"))).await.unwrap();
    dispatcher.send(Update::new(channel(2, "amazon"))).await.unwrap();
    dispatcher.send(Delete::<Channel>::new(1)).await.unwrap();

    let all = dispatcher.query(GetAll::<Channel>::new()).await.unwrap();
    assert_eq!(all, vec![channel(2, "amazon")]);

    let one = dispatcher.query(GetById::<Channel>::new(2)).await.unwrap();
    assert_eq!(one, vec![channel(2, "amazon")]);

    let none = dispatcher.query(GetById::<Channel>::new(1)).await.unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn invalid_entity_is_rejected_before_the_repository() {
    let channels = Arc::new(InMemoryRepository::new());
    let dispatcher = dispatcher(&channels);

    let result = dispatcher.send(Create::new(channel(1, ""))).await;

    assert_eq!(result, Err(WhippetError::argument_null("name")));
    assert!(channels.is_empty());
}

#[tokio::test]
async fn repository_failures_are_returned_unchanged() {
    let channels = Arc::new(InMemoryRepository::new());
    let dispatcher = dispatcher(&channels);
    channels.fail_with(WhippetError::Database("server closed the connection".to_string()));

    let result = dispatcher.query(GetAll::<Channel>::new()).await;

    assert_eq!(
        result,
        Err(WhippetError::Database("server closed the connection".to_string()))
    );
}

#[tokio::test]
async fn shared_dispatcher_serves_concurrent_tasks() {
    let channels = Arc::new(InMemoryRepository::new());
    let dispatcher = Arc::new(dispatcher(&channels));

    let tasks: Vec<_> = (0..16)
        .map(|id| {
            let dispatcher = Arc::clone(&dispatcher);
            tokio::spawn(async move {
                dispatcher
                    .send(Create::new(channel(id, &format!("channel-{id}"))))
                    .await
            })
        })
        .collect();

    for task in tasks {
        task.await.expect("task panicked").unwrap();
    }

    assert_eq!(channels.len(), 16);
}

#[tokio::test]
async fn query_without_handler_is_reported() {
    let dispatcher = Dispatcher::builder().build();

    let result = dispatcher.query(GetAll::<Channel>::new()).await;

    assert!(matches!(result, Err(WhippetError::HandlerNotFound { .. })));
}

#[test]
fn crud_handlers_register_five_messages_once() {
    let channels = Arc::new(InMemoryRepository::<Channel>::new());
    assert_eq!(dispatcher(&channels).len(), 5);

    let result = Dispatcher::builder()
        .command_handler::<Create<Channel>, _>(CreateHandler::new(Arc::clone(&channels)))
        .unwrap()
        .crud_handlers::<Channel, _>(&channels);

    assert!(matches!(
        result,
        Err(DispatchError::DuplicateHandler { message_type }) if message_type.contains("Create")
    ));
}
