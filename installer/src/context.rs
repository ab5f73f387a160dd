//! State shared by the actions of one installation run.

use crate::config::InstallerConfig;
use std::fmt;
use std::sync::Arc;
use whippet_core::result::{WhippetError, WhippetResult};
use whippet_data::{DatabaseProvider, WhippetConnection};

type PercentCallback = Arc<dyn Fn(f64) + Send + Sync>;
type StatusCallback = Arc<dyn Fn(&str, f64) + Send + Sync>;

/// Forwards progress to whichever callbacks the caller registered.
///
/// A report carrying a status goes to the status callback when one is
/// registered; every other report goes to the percent callback. With no
/// callbacks, reports are dropped.
#[derive(Clone, Default)]
pub struct ProgressReporter {
    percent: Option<PercentCallback>,
    status_and_percent: Option<StatusCallback>,
}

impl ProgressReporter {
    /// Reporter without callbacks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the percent-only callback.
    #[must_use]
    pub fn on_percent(mut self, callback: impl Fn(f64) + Send + Sync + 'static) -> Self {
        self.percent = Some(Arc::new(callback));
        self
    }

    /// Register the status and percent callback.
    #[must_use]
    pub fn on_status(mut self, callback: impl Fn(&str, f64) + Send + Sync + 'static) -> Self {
        self.status_and_percent = Some(Arc::new(callback));
        self
    }

    /// Report `percent` complete, with an optional status message.
    pub fn report(&self, percent: f64, status: Option<&str>) {
        let status = status.filter(|status| !status.trim().is_empty());
        match (status, &self.status_and_percent, &self.percent) {
            (Some(status), Some(callback), _) => callback(status, percent),
            (_, _, Some(callback)) => callback(percent),
            _ => {}
        }
    }
}

impl fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("percent", &self.percent.is_some())
            .field("status_and_percent", &self.status_and_percent.is_some())
            .finish()
    }
}

/// Configuration, connection and progress for one run.
#[derive(Debug)]
pub struct InstallContext {
    config: InstallerConfig,
    connection: Option<WhippetConnection>,
    progress: ProgressReporter,
}

impl InstallContext {
    /// Context without a connection.
    #[must_use]
    pub fn new(config: InstallerConfig) -> Self {
        Self {
            config,
            connection: None,
            progress: ProgressReporter::default(),
        }
    }

    /// Attach an open connection.
    #[must_use]
    pub fn with_connection(mut self, connection: impl Into<WhippetConnection>) -> Self {
        self.connection = Some(connection.into());
        self
    }

    /// Attach a progress reporter.
    #[must_use]
    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    /// Installer configuration.
    #[must_use]
    pub const fn config(&self) -> &InstallerConfig {
        &self.config
    }

    /// Provider being installed.
    #[must_use]
    pub const fn provider(&self) -> DatabaseProvider {
        self.config.database.provider
    }

    /// The open connection.
    ///
    /// # Errors
    ///
    /// Returns [`WhippetError::ArgumentNull`] when no connection is attached.
    pub fn connection(&self) -> WhippetResult<&WhippetConnection> {
        self.connection
            .as_ref()
            .ok_or_else(|| WhippetError::argument_null("connection"))
    }

    /// The open connection, mutably.
    ///
    /// # Errors
    ///
    /// Returns [`WhippetError::ArgumentNull`] when no connection is attached.
    pub fn connection_mut(&mut self) -> WhippetResult<&mut WhippetConnection> {
        self.connection
            .as_mut()
            .ok_or_else(|| WhippetError::argument_null("connection"))
    }

    /// Detach and return the connection.
    pub fn take_connection(&mut self) -> Option<WhippetConnection> {
        self.connection.take()
    }

    /// Progress reporter.
    #[must_use]
    pub const fn progress(&self) -> &ProgressReporter {
        &self.progress
    }
}
