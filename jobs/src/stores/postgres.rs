//! `PostgreSQL` job store over the `whippet` schema.

use crate::categories::{JobCategory, JobCategoryRepository};
use crate::handlers::JobStore;
use crate::jobs::{Job, JobParameter, JobParameterRepository, JobRepository};
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;
use whippet_core::result::WhippetResult;
use whippet_data::PostgresConnection;
use whippet_data::repository::{PgEntity, PgQuery, PostgresRepository};

impl PgEntity for JobCategory {
    const TABLE: &'static str = "whippet.job_categories";
    const COLUMNS: &'static [&'static str] = &["id", "name", "description", "created_at"];

    fn bind<'q>(&'q self, query: PgQuery<'q>) -> PgQuery<'q> {
        query
            .bind(self.id)
            .bind(&self.name)
            .bind(&self.description)
            .bind(self.created_at)
    }
}

impl PgEntity for Job {
    const TABLE: &'static str = "whippet.jobs";
    const COLUMNS: &'static [&'static str] =
        &["id", "category_id", "name", "description", "enabled", "created_at"];

    fn bind<'q>(&'q self, query: PgQuery<'q>) -> PgQuery<'q> {
        query
            .bind(self.id)
            .bind(self.category_id)
            .bind(&self.name)
            .bind(&self.description)
            .bind(self.enabled)
            .bind(self.created_at)
    }
}

impl PgEntity for JobParameter {
    const TABLE: &'static str = "whippet.job_parameters";
    const COLUMNS: &'static [&'static str] = &["id", "job_id", "name", "value", "created_at"];

    fn bind<'q>(&'q self, query: PgQuery<'q>) -> PgQuery<'q> {
        query
            .bind(self.id)
            .bind(self.job_id)
            .bind(&self.name)
            .bind(&self.value)
            .bind(self.created_at)
    }
}

impl JobCategoryRepository for PostgresRepository<JobCategory> {
    async fn get_by_name(&self, name: &str) -> WhippetResult<Option<JobCategory>> {
        Ok(self.find_ignoring_case("name", name).await?.into_iter().next())
    }
}

impl JobRepository for PostgresRepository<Job> {
    async fn get_by_category(&self, category_id: Uuid) -> WhippetResult<Vec<Job>> {
        self.find_by_uuid("category_id", category_id).await
    }
}

impl JobParameterRepository for PostgresRepository<JobParameter> {
    async fn get_by_job(&self, job_id: Uuid) -> WhippetResult<Vec<JobParameter>> {
        self.find_by_uuid("job_id", job_id).await
    }
}

/// A [`JobStore`] over the `whippet` schema.
#[derive(Debug, Clone)]
pub struct PostgresJobStore {
    categories: Arc<PostgresRepository<JobCategory>>,
    jobs: Arc<PostgresRepository<Job>>,
    parameters: Arc<PostgresRepository<JobParameter>>,
}

impl PostgresJobStore {
    /// Create a store whose repositories share `pool`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self {
            categories: Arc::new(PostgresRepository::new(pool.clone())),
            jobs: Arc::new(PostgresRepository::new(pool.clone())),
            parameters: Arc::new(PostgresRepository::new(pool)),
        }
    }

    /// Create a store over an open connection's pool.
    #[must_use]
    pub fn from_connection(connection: &PostgresConnection) -> Self {
        Self::new(connection.pool().clone())
    }
}

impl JobStore for PostgresJobStore {
    type Categories = PostgresRepository<JobCategory>;
    type Jobs = PostgresRepository<Job>;
    type Parameters = PostgresRepository<JobParameter>;

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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_tables_live_in_the_whippet_schema() {
        assert_eq!(JobCategory::TABLE, "whippet.job_categories");
        assert_eq!(Job::COLUMNS.len(), 6);
        assert_eq!(JobParameter::COLUMNS[0], "id");
    }
}
