//! In-memory job store for tests.
//!
//! Names compare ignoring case and are unique within their parent, matching
//! the indexes the installer creates.

use crate::categories::{JobCategory, JobCategoryRepository};
use crate::handlers::JobStore;
use crate::jobs::{Job, JobParameter, JobParameterRepository, JobRepository};
use std::sync::Arc;
use uuid::Uuid;
use whippet_core::result::WhippetResult;
use whippet_testing::InMemoryRepository;

impl JobCategoryRepository for InMemoryRepository<JobCategory> {
    async fn get_by_name(&self, name: &str) -> WhippetResult<Option<JobCategory>> {
        Ok(self
            .find(|category| category.name.eq_ignore_ascii_case(name))?
            .into_iter()
            .next())
    }
}

impl JobRepository for InMemoryRepository<Job> {
    async fn get_by_category(&self, category_id: Uuid) -> WhippetResult<Vec<Job>> {
        self.find(|job| job.category_id == category_id)
    }
}

impl JobParameterRepository for InMemoryRepository<JobParameter> {
    async fn get_by_job(&self, job_id: Uuid) -> WhippetResult<Vec<JobParameter>> {
        self.find(|parameter| parameter.job_id == job_id)
    }
}

/// A [`JobStore`] keeping every entity in memory.
#[derive(Debug, Clone)]
pub struct InMemoryJobStore {
    /// Categories
    pub categories: Arc<InMemoryRepository<JobCategory>>,
    /// Jobs
    pub jobs: Arc<InMemoryRepository<Job>>,
    /// Job parameters
    pub parameters: Arc<InMemoryRepository<JobParameter>>,
}

impl InMemoryJobStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for InMemoryJobStore {
    fn default() -> Self {
        Self {
            categories: Arc::new(InMemoryRepository::new().unique_by(
                "job_categories_name_key",
                |category: &JobCategory| category.name.to_lowercase(),
            )),
            jobs: Arc::new(InMemoryRepository::new().unique_by(
                "jobs_category_id_name_key",
                |job: &Job| format!("{}/{}", job.category_id, job.name.to_lowercase()),
            )),
            parameters: Arc::new(InMemoryRepository::new().unique_by(
                "job_parameters_job_id_name_key",
                |parameter: &JobParameter| format!("{}/{}", parameter.job_id, parameter.name.to_lowercase()),
            )),
        }
    }
}

impl JobStore for InMemoryJobStore {
    type Categories = InMemoryRepository<JobCategory>;
    type Jobs = InMemoryRepository<Job>;
    type Parameters = InMemoryRepository<JobParameter>;

    fn categories(&self) -> Arc<Self::Categories> {
        Arc::clone(&self.categories)
    }

    fn jobs(&self) -> Arc<Self::Jobs> {
        Arc::clone(&self.jobs)
    }

    fn parameters(&self) -> Arc<Self::Parameters> {
        Arc::clone(&self.parameters)
    }
}
