//! Wiring of the job handlers into a dispatcher.

use crate::categories::{
    GetJobCategoryByName, GetJobCategoryByNameHandler, JobCategory, JobCategoryRepository,
};
use crate::jobs::{
    GetJobParametersByJob, GetJobParametersByJobHandler, GetJobsByCategory, GetJobsByCategoryHandler, Job,
    JobParameter, JobParameterRepository, JobRepository,
};
use std::sync::Arc;
use whippet_runtime::{DispatchError, DispatcherBuilder};

/// The repositories behind job administration.
pub trait JobStore {
    /// Category storage
    type Categories: JobCategoryRepository;
    /// Job storage
    type Jobs: JobRepository;
    /// Parameter storage
    type Parameters: JobParameterRepository;

    /// Category repository.
    fn categories(&self) -> Arc<Self::Categories>;
    /// Job repository.
    fn jobs(&self) -> Arc<Self::Jobs>;
    /// Parameter repository.
    fn parameters(&self) -> Arc<Self::Parameters>;
}

/// Register every job command and query handler backed by `store`.
///
/// # Errors
///
/// Returns [`DispatchError::DuplicateHandler`] if `builder` already serves
/// one of the job messages.
pub fn register_handlers<S: JobStore>(
    builder: DispatcherBuilder,
    store: &S,
) -> Result<DispatcherBuilder, DispatchError> {
    let categories = store.categories();
    let jobs = store.jobs();
    let parameters = store.parameters();

    let builder = builder
        .crud_handlers::<JobCategory, _>(&categories)?
        .crud_handlers::<Job, _>(&jobs)?
        .crud_handlers::<JobParameter, _>(&parameters)?
        .query_handler::<GetJobCategoryByName, _>(GetJobCategoryByNameHandler::new(categories))?
        .query_handler::<GetJobsByCategory, _>(GetJobsByCategoryHandler::new(jobs))?
        .query_handler::<GetJobParametersByJob, _>(GetJobParametersByJobHandler::new(parameters))?;

    tracing::debug!("Job handlers registered");
    Ok(builder)
}
