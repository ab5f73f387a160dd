//! Job handlers routed through a dispatcher over the in-memory store.

#![allow(clippy::unwrap_used)] // Test code

use whippet_core::crud::{Create, Delete, GetAll, GetById, Update};
use whippet_core::result::WhippetError;
use whippet_jobs::mocks::InMemoryJobStore;
use whippet_jobs::{
    GetJobCategoryByName, GetJobParametersByJob, GetJobsByCategory, Job, JobCategory, JobParameter,
    register_handlers,
};
use whippet_runtime::Dispatcher;
use whippet_testing::test_clock;

fn dispatcher(store: &InMemoryJobStore) -> Dispatcher {
    register_handlers(Dispatcher::builder(), store).unwrap().build()
}

#[tokio::test]
async fn parameters_are_managed_per_job() {
    let store = InMemoryJobStore::new();
    let dispatcher = dispatcher(&store);
    let clock = test_clock();

    let category = JobCategory::new("Taxes", &clock);
    let job = Job::new(category.id, "Synchronize", &clock);
    let other = Job::new(category.id, "Report", &clock);
    dispatcher.send(Create::new(category.clone())).await.unwrap();
    dispatcher.send(Create::new(job.clone())).await.unwrap();
    dispatcher.send(Create::new(other.clone())).await.unwrap();

    let server = JobParameter::new(job.id, "SourceServer", Some("erp01".to_string()), &clock);
    dispatcher.send(Create::new(server.clone())).await.unwrap();
    dispatcher
        .send(Create::new(JobParameter::new(other.id, "SourceServer", None, &clock)))
        .await
        .unwrap();

    let moved = JobParameter {
        value: Some("erp02".to_string()),
        ..server.clone()
    };
    dispatcher.send(Update::new(moved.clone())).await.unwrap();

    let parameters = dispatcher.query(GetJobParametersByJob::new(job.id)).await.unwrap();
    assert_eq!(parameters, vec![moved]);

    dispatcher.send(Delete::<JobParameter>::new(server.id)).await.unwrap();
    assert!(dispatcher.query(GetJobParametersByJob::new(job.id)).await.unwrap().is_empty());
    assert_eq!(dispatcher.query(GetAll::<JobParameter>::new()).await.unwrap().len(), 1);

    let jobs = dispatcher.query(GetJobsByCategory::new(category.id)).await.unwrap();
    assert_eq!(jobs.len(), 2);
    assert_eq!(dispatcher.query(GetById::<Job>::new(job.id)).await.unwrap(), vec![job]);
}

#[tokio::test]
async fn categories_are_found_by_name() {
    let store = InMemoryJobStore::new();
    let dispatcher = dispatcher(&store);

    dispatcher
        .send(Create::new(JobCategory::new("Imports", &test_clock())))
        .await
        .unwrap();

    assert_eq!(dispatcher.query(GetJobCategoryByName::new("IMPORTS")).await.unwrap().len(), 1);
    assert!(dispatcher.query(GetJobCategoryByName::new("exports")).await.unwrap().is_empty());
    assert_eq!(
        dispatcher.query(GetJobCategoryByName::new("")).await,
        Err(WhippetError::argument_null("name"))
    );
}

#[tokio::test]
async fn parameter_names_are_unique_per_job() {
    let store = InMemoryJobStore::new();
    let dispatcher = dispatcher(&store);
    let clock = test_clock();
    let job = Job::new(JobCategory::new("Taxes", &clock).id, "Synchronize", &clock);

    dispatcher
        .send(Create::new(JobParameter::new(job.id, "Server", None, &clock)))
        .await
        .unwrap();
    let duplicate = dispatcher
        .send(Create::new(JobParameter::new(job.id, "SERVER", None, &clock)))
        .await;

    assert!(matches!(duplicate, Err(WhippetError::Conflict(message)) if message.contains("job_parameters_job_id_name_key")));
    assert_eq!(store.parameters.len(), 1);
}

#[test]
fn every_message_is_served() {
    let dispatcher = dispatcher(&InMemoryJobStore::new());

    assert!(dispatcher.has_command_handler::<Create<JobParameter>>());
    assert!(dispatcher.has_query_handler::<GetJobsByCategory>());
    // 3 entities x 5 CRUD messages + 3 lookups
    assert_eq!(dispatcher.len(), 18);
}
