//! Prometheus metrics for dispatch, database and installer activity.
//!
//! Library code records through the `metrics` facade only. An application
//! opts into export by starting a [`MetricsServer`]; without one every
//! recording is a no-op.
//!
//! # Example
//!
//! ```rust,no_run
//! use whippet_runtime::metrics::MetricsServer;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut server = MetricsServer::new("0.0.0.0:9090".parse()?);
//! server.start()?;
//! // Metrics available at http://localhost:9090/metrics
//! # Ok(())
//! # }
//! ```

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Prometheus scrape endpoint.
#[derive(Debug)]
pub struct MetricsServer {
    addr: SocketAddr,
    started: bool,
}

impl MetricsServer {
    /// Create a metrics server bound to `addr` once started.
    #[must_use]
    pub const fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            started: false,
        }
    }

    /// Address the scrape endpoint listens on.
    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Whether [`MetricsServer::start`] has installed the exporter.
    #[must_use]
    pub const fn is_started(&self) -> bool {
        self.started
    }

    /// Register metric descriptions and install the Prometheus exporter.
    ///
    /// Must be called from within a Tokio runtime. Calling it again after a
    /// successful start is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError::Build`] if the bucket configuration is rejected
    /// and [`MetricsError::Install`] if the listener or global recorder cannot
    /// be installed.
    pub fn start(&mut self) -> Result<(), MetricsError> {
        if self.started {
            return Ok(());
        }

        register_metrics();

        PrometheusBuilder::new()
            .with_http_listener(self.addr)
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[
                    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
                ],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?
            .install()
            .map_err(|e| MetricsError::Install(e.to_string()))?;

        self.started = true;
        tracing::info!(addr = %self.addr, "Metrics endpoint started");
        Ok(())
    }
}

/// Register all metric descriptions.
pub fn register_metrics() {
    describe_counter!(
        "whippet_dispatch_total",
        "Commands and queries dispatched, by kind, message type and outcome"
    );
    describe_histogram!(
        "whippet_dispatch_duration_seconds",
        "Time spent in command and query handlers"
    );

    describe_counter!(
        "whippet_retry_attempts_total",
        "Retries scheduled after a transient failure"
    );
    describe_counter!(
        "whippet_retry_exhausted_total",
        "Operations that failed after exhausting their retries"
    );

    describe_counter!(
        "whippet_db_connections_total",
        "Database connections opened, by provider and outcome"
    );
    describe_histogram!(
        "whippet_db_connect_duration_seconds",
        "Time taken to open a database connection"
    );
    describe_counter!(
        "whippet_db_copy_rows_total",
        "Rows moved through COPY, by direction"
    );

    describe_counter!(
        "whippet_installer_steps_total",
        "Installer actions executed, by action and outcome"
    );
    describe_histogram!(
        "whippet_installer_step_duration_seconds",
        "Time taken by each installer action"
    );
}

/// Database metrics recorder.
pub struct DatabaseMetrics;

impl DatabaseMetrics {
    /// Record a connection attempt.
    pub fn record_connect(provider: &'static str, success: bool, duration: Duration) {
        let outcome = if success { "success" } else { "error" };
        counter!("whippet_db_connections_total", "provider" => provider, "outcome" => outcome)
            .increment(1);
        histogram!("whippet_db_connect_duration_seconds", "provider" => provider)
            .record(duration.as_secs_f64());
    }

    /// Record rows moved by a COPY operation.
    pub fn record_copy(direction: &'static str, rows: u64) {
        counter!("whippet_db_copy_rows_total", "direction" => direction).increment(rows);
    }
}

/// Installer metrics recorder.
pub struct InstallerMetrics;

impl InstallerMetrics {
    /// Record one executed installer action.
    pub fn record_step(action: &str, success: bool, duration: Duration) {
        let outcome = if success { "success" } else { "error" };
        counter!(
            "whippet_installer_steps_total",
            "action" => action.to_string(),
            "outcome" => outcome
        )
        .increment(1);
        histogram!("whippet_installer_step_duration_seconds", "action" => action.to_string())
            .record(duration.as_secs_f64());
    }
}
