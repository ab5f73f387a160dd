//! Jobs and their parameters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use uuid::Uuid;
use whippet_core::cqrs::{Query, QueryHandler, QueryParameter};
use whippet_core::environment::Clock;
use whippet_core::repository::{Entity, Repository};
use whippet_core::result::{WhippetResult, require_not_blank};

/// A unit of scheduled work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct Job {
    /// Job id
    pub id: Uuid,
    /// Owning category
    pub category_id: Uuid,
    /// Name, unique within the category
    pub name: String,
    /// Free-form description
    pub description: Option<String>,
    /// Whether the scheduler may run the job
    pub enabled: bool,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

impl Job {
    /// New enabled job with a random id.
    #[must_use]
    pub fn new(category_id: Uuid, name: impl Into<String>, clock: &impl Clock) -> Self {
        Self {
            id: Uuid::new_v4(),
            category_id,
            name: name.into(),
            description: None,
            enabled: true,
            created_at: clock.now(),
        }
    }
}

impl Entity for Job {
    type Id = Uuid;

    const ENTITY_NAME: &'static str = "Job";

    fn id(&self) -> Uuid {
        self.id
    }

    fn validate(&self) -> WhippetResult {
        require_not_blank(&self.name, "name")
    }
}

/// A named value a job reads when it runs.
///
/// Values are stored as text; the job parses what it needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct JobParameter {
    /// Parameter id
    pub id: Uuid,
    /// Owning job
    pub job_id: Uuid,
    /// Name, unique within the job
    pub name: String,
    /// Value, if set
    pub value: Option<String>,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

impl JobParameter {
    /// New parameter with a random id.
    #[must_use]
    pub fn new(job_id: Uuid, name: impl Into<String>, value: Option<String>, clock: &impl Clock) -> Self {
        Self {
            id: Uuid::new_v4(),
            job_id,
            name: name.into(),
            value,
            created_at: clock.now(),
        }
    }
}

impl Entity for JobParameter {
    type Id = Uuid;

    const ENTITY_NAME: &'static str = "JobParameter";

    fn id(&self) -> Uuid {
        self.id
    }

    fn validate(&self) -> WhippetResult {
        require_not_blank(&self.name, "name")
    }
}

/// Job storage.
pub trait JobRepository: Repository<Job> {
    /// Every job in a category.
    fn get_by_category(&self, category_id: Uuid) -> impl Future<Output = WhippetResult<Vec<Job>>> + Send;
}

/// Job parameter storage.
pub trait JobParameterRepository: Repository<JobParameter> {
    /// Every parameter of a job.
    fn get_by_job(&self, job_id: Uuid) -> impl Future<Output = WhippetResult<Vec<JobParameter>>> + Send;
}

/// Every job in a category.
#[derive(Debug, Clone)]
pub struct GetJobsByCategory {
    /// Category id
    pub category_id: Uuid,
}

impl GetJobsByCategory {
    /// Create the query.
    #[must_use]
    pub const fn new(category_id: Uuid) -> Self {
        Self { category_id }
    }
}

impl Query for GetJobsByCategory {
    type Entity = Job;

    fn parameters(&self) -> Vec<QueryParameter> {
        vec![("category_id", Value::String(self.category_id.to_string()))]
    }
}

/// Handles [`GetJobsByCategory`].
#[derive(Debug)]
pub struct GetJobsByCategoryHandler<R> {
    repository: Arc<R>,
}

impl<R> GetJobsByCategoryHandler<R> {
    /// Create a handler over `repository`.
    #[must_use]
    pub const fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }
}

impl<R: JobRepository> QueryHandler<GetJobsByCategory> for GetJobsByCategoryHandler<R> {
    async fn handle(&self, query: GetJobsByCategory) -> WhippetResult<Vec<Job>> {
        self.repository.get_by_category(query.category_id).await
    }
}

/// Every parameter of a job.
#[derive(Debug, Clone)]
pub struct GetJobParametersByJob {
    /// Job id
    pub job_id: Uuid,
}

impl GetJobParametersByJob {
    /// Create the query.
    #[must_use]
    pub const fn new(job_id: Uuid) -> Self {
        Self { job_id }
    }
}

impl Query for GetJobParametersByJob {
    type Entity = JobParameter;

    fn parameters(&self) -> Vec<QueryParameter> {
        vec![("job_id", Value::String(self.job_id.to_string()))]
    }
}

/// Handles [`GetJobParametersByJob`].
#[derive(Debug)]
pub struct GetJobParametersByJobHandler<R> {
    repository: Arc<R>,
}

impl<R> GetJobParametersByJobHandler<R> {
    /// Create a handler over `repository`.
    #[must_use]
    pub const fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }
}

impl<R: JobParameterRepository> QueryHandler<GetJobParametersByJob> for GetJobParametersByJobHandler<R> {
    async fn handle(&self, query: GetJobParametersByJob) -> WhippetResult<Vec<JobParameter>> {
        self.repository.get_by_job(query.job_id).await
    }
}
