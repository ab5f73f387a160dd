//! Job categories.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use uuid::Uuid;
use whippet_core::cqrs::{Query, QueryHandler, QueryParameter};
use whippet_core::environment::Clock;
use whippet_core::repository::{Entity, Repository};
use whippet_core::result::{ResultContainerExt, WhippetResult, require_not_blank};

/// A named group of jobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct JobCategory {
    /// Category id
    pub id: Uuid,
    /// Unique name
    pub name: String,
    /// Free-form description
    pub description: Option<String>,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

impl JobCategory {
    /// New category with a random id.
    #[must_use]
    pub fn new(name: impl Into<String>, clock: &impl Clock) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: None,
            created_at: clock.now(),
        }
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl Entity for JobCategory {
    type Id = Uuid;

    const ENTITY_NAME: &'static str = "JobCategory";

    fn id(&self) -> Uuid {
        self.id
    }

    fn validate(&self) -> WhippetResult {
        require_not_blank(&self.name, "name")
    }
}

/// Job category storage.
pub trait JobCategoryRepository: Repository<JobCategory> {
    /// Find a category by name, ignoring case.
    fn get_by_name(&self, name: &str) -> impl Future<Output = WhippetResult<Option<JobCategory>>> + Send;
}

/// Look up a job category by name.
#[derive(Debug, Clone)]
pub struct GetJobCategoryByName {
    /// Category name, matched ignoring case
    pub name: String,
}

impl GetJobCategoryByName {
    /// Create the query.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Query for GetJobCategoryByName {
    type Entity = JobCategory;

    fn parameters(&self) -> Vec<QueryParameter> {
        vec![("name", Value::String(self.name.clone()))]
    }
}

/// Handles [`GetJobCategoryByName`].
#[derive(Debug)]
pub struct GetJobCategoryByNameHandler<R> {
    repository: Arc<R>,
}

impl<R> GetJobCategoryByNameHandler<R> {
    /// Create a handler over `repository`.
    #[must_use]
    pub const fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }
}

impl<R: JobCategoryRepository> QueryHandler<GetJobCategoryByName> for GetJobCategoryByNameHandler<R> {
    async fn handle(&self, query: GetJobCategoryByName) -> WhippetResult<Vec<JobCategory>> {
        require_not_blank(&query.name, "name")?;
        self.repository.get_by_name(&query.name).await.into_enumerable()
    }
}
