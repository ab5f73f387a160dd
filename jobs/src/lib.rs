//! # Whippet Jobs
//!
//! Administration of scheduled jobs: job categories, the jobs in them and
//! the named parameters each job reads when it runs.
//!
//! Every entity gets the generic CRUD messages from [`whippet_core::crud`];
//! [`register_handlers`] adds the lookups (category by name, jobs of a
//! category, parameters of a job).
//!
//! ## Features
//!
//! - `test-utils` (default): in-memory repositories ([`mocks`])
//! - `postgres`: repositories over the `whippet` schema ([`stores::postgres`])

pub mod categories;
pub mod handlers;
pub mod jobs;
pub mod stores;

#[cfg(feature = "test-utils")]
pub mod mocks;

// Re-exports
pub use categories::{GetJobCategoryByName, JobCategory, JobCategoryRepository};
pub use handlers::{JobStore, register_handlers};
pub use jobs::{GetJobParametersByJob, GetJobsByCategory, Job, JobParameter, JobParameterRepository, JobRepository};
