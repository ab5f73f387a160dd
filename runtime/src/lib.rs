//! # Whippet Runtime
//!
//! Runtime services for the Whippet framework:
//!
//! - [`dispatcher`]: routes each command or query to its single registered handler
//! - [`retry`]: exponential backoff for transient failures
//! - [`metrics`]: Prometheus export and metric recorders
//! - [`telemetry`]: tracing subscriber setup

pub mod dispatcher;
pub mod metrics;
pub mod retry;
pub mod telemetry;

pub use dispatcher::{DispatchError, Dispatcher, DispatcherBuilder};
pub use retry::{RetryPolicy, RetryPolicyBuilder, retry_with_backoff, retry_with_predicate};
