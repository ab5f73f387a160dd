//! Ordered execution of installer actions.

use crate::actions::{ActionOutcome, CreateDatabase, CreateLogin, CreateSchema, InstallerAction, Seed};
use crate::context::InstallContext;
use std::fmt;
use std::time::{Duration, Instant};
use whippet_core::result::{WhippetError, WhippetResult};
use whippet_runtime::metrics::InstallerMetrics;

/// Result of one executed action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    /// Action description
    pub description: String,
    /// What the action did
    pub outcome: ActionOutcome,
    /// Wall-clock time spent
    pub duration: Duration,
}

/// Result of an installation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    /// Actions that completed, in execution order
    pub completed: Vec<StepReport>,
    /// Description of the action that failed, with its error
    pub failure: Option<(String, WhippetError)>,
    /// Number of actions in the run
    pub total: usize,
}

impl InstallReport {
    /// Whether every action completed.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.failure.is_none()
    }

    /// Convert into a result, failing with the action's error.
    ///
    /// # Errors
    ///
    /// Returns the error of the action that stopped the run.
    pub fn into_result(self) -> WhippetResult<Self> {
        match self.failure {
            Some((_, error)) => Err(error),
            None => Ok(self),
        }
    }
}

/// A sequence of installer actions.
#[derive(Default)]
pub struct Installer {
    actions: Vec<Box<dyn InstallerAction>>,
}

impl Installer {
    /// Installer without actions.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard sequence: database, login, schema, then `seed`.
    #[must_use]
    pub fn standard(seed: Seed) -> Self {
        Self {
            actions: vec![
                Box::new(CreateDatabase),
                Box::new(CreateLogin),
                Box::new(CreateSchema),
                Box::new(seed),
            ],
        }
    }

    /// Append `action`.
    ///
    /// # Errors
    ///
    /// Returns [`WhippetError::ArgumentNull`] if the action's description is
    /// blank.
    pub fn with_action(mut self, action: impl InstallerAction + 'static) -> WhippetResult<Self> {
        if action.description().trim().is_empty() {
            return Err(WhippetError::argument_null("description"));
        }
        self.actions.push(Box::new(action));
        Ok(self)
    }

    /// Descriptions of the actions, in order.
    #[must_use]
    pub fn descriptions(&self) -> Vec<&str> {
        self.actions.iter().map(|action| action.description()).collect()
    }

    /// Number of actions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Whether there are no actions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Run every action in order, stopping at the first failure.
    ///
    /// Progress is reported before each action with its description and
    /// once more at 100% when the run completes.
    #[tracing::instrument(skip_all, fields(actions = self.actions.len()))]
    pub async fn run(&self, context: &mut InstallContext) -> InstallReport {
        let total = self.actions.len();
        let mut report = InstallReport {
            completed: Vec::with_capacity(total),
            failure: None,
            total,
        };

        for (index, action) in self.actions.iter().enumerate() {
            let description = action.description();
            context.progress().report(percent(index, total), Some(description));
            tracing::info!(step = index + 1, total, action = description, "Running installer action");

            let start = Instant::now();
            let result = action.execute(context).await;
            let duration = start.elapsed();
            InstallerMetrics::record_step(description, result.is_ok(), duration);

            match result {
                Ok(outcome) => {
                    if let ActionOutcome::Skipped { reason } = &outcome {
                        tracing::info!(action = description, reason = %reason, "Installer action skipped");
                    }
                    report.completed.push(StepReport {
                        description: description.to_string(),
                        outcome,
                        duration,
                    });
                }
                Err(error) => {
                    tracing::error!(action = description, error = %error, "Installer action failed");
                    report.failure = Some((description.to_string(), error));
                    return report;
                }
            }
        }

        context.progress().report(100.0, Some("Installation complete"));
        tracing::info!(total, "Installation complete");
        report
    }
}

impl fmt::Debug for Installer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Installer")
            .field("actions", &self.descriptions())
            .finish()
    }
}

#[allow(clippy::cast_precision_loss)] // Step counts are tiny
fn percent(done: usize, total: usize) -> f64 {
    if total == 0 {
        return 100.0;
    }
    done as f64 * 100.0 / total as f64
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)] // Test code

    use super::*;
    use crate::config::InstallerConfig;
    use crate::context::ProgressReporter;
    use futures::future::BoxFuture;
    use std::sync::{Arc, Mutex};
    use whippet_data::{DatabaseConfig, DatabaseProvider};

    struct Step {
        description: &'static str,
        result: WhippetResult<ActionOutcome>,
        runs: Arc<Mutex<Vec<&'static str>>>,
    }

    impl InstallerAction for Step {
        fn description(&self) -> &str {
            self.description
        }

        fn execute<'a>(&'a self, _context: &'a mut InstallContext) -> BoxFuture<'a, WhippetResult<ActionOutcome>> {
            Box::pin(async move {
                self.runs.lock().unwrap().push(self.description);
                self.result.clone()
            })
        }
    }

    fn step(
        description: &'static str,
        result: WhippetResult<ActionOutcome>,
        runs: &Arc<Mutex<Vec<&'static str>>>,
    ) -> Step {
        Step {
            description,
            result,
            runs: Arc::clone(runs),
        }
    }

    fn context(progress: ProgressReporter) -> InstallContext {
        let config = DatabaseConfig::new(DatabaseProvider::Sqlite, "Data Source=:memory:").unwrap();
        InstallContext::new(InstallerConfig::new(config)).with_progress(progress)
    }

    #[test]
    fn standard_sequence_order() {
        assert_eq!(
            Installer::standard(Seed::new()).descriptions(),
            vec![
                "Creating Database",
                "Creating Login",
                "Creating Database Schema",
                "Creating Seed Data"
            ]
        );
    }

    #[test]
    fn blank_description_is_rejected() {
        let runs = Arc::new(Mutex::new(Vec::new()));
        let result = Installer::new().with_action(step(" ", Ok(ActionOutcome::Applied), &runs));
        assert!(matches!(result, Err(WhippetError::ArgumentNull { .. })));
    }

    #[tokio::test]
    async fn runs_in_order_and_reports_progress() {
        let runs = Arc::new(Mutex::new(Vec::new()));
        let progress = Arc::new(Mutex::new(Vec::new()));
        let installer = Installer::new()
            .with_action(step("one", Ok(ActionOutcome::Applied), &runs))
            .unwrap()
            .with_action(step("two", Ok(ActionOutcome::skipped("nothing to do")), &runs))
            .unwrap();
        let reporter = ProgressReporter::new().on_status({
            let progress = Arc::clone(&progress);
            move |status: &str, percent| progress.lock().unwrap().push((status.to_string(), percent))
        });

        let report = installer.run(&mut context(reporter)).await;

        assert!(report.is_success());
        assert_eq!(report.total, 2);
        assert_eq!(report.completed.len(), 2);
        assert_eq!(report.completed[1].outcome, ActionOutcome::skipped("nothing to do"));
        assert_eq!(*runs.lock().unwrap(), vec!["one", "two"]);
        assert_eq!(
            *progress.lock().unwrap(),
            vec![
                ("one".to_string(), 0.0),
                ("two".to_string(), 50.0),
                ("Installation complete".to_string(), 100.0),
            ]
        );
    }

    #[tokio::test]
    async fn stops_at_first_failure() {
        let runs = Arc::new(Mutex::new(Vec::new()));
        let installer = Installer::new()
            .with_action(step("one", Ok(ActionOutcome::Applied), &runs))
            .unwrap()
            .with_action(step("two", Err(WhippetError::Installer("boom".to_string())), &runs))
            .unwrap()
            .with_action(step("three", Ok(ActionOutcome::Applied), &runs))
            .unwrap();

        let report = installer.run(&mut context(ProgressReporter::new())).await;

        assert!(!report.is_success());
        assert_eq!(report.completed.len(), 1);
        assert_eq!(*runs.lock().unwrap(), vec!["one", "two"]);
        assert_eq!(
            report.clone().into_result(),
            Err(WhippetError::Installer("boom".to_string()))
        );
        assert_eq!(report.failure.unwrap().0, "two");
    }

    #[tokio::test]
    async fn empty_installer_completes() {
        let report = Installer::new().run(&mut context(ProgressReporter::new())).await;
        assert!(report.is_success());
        assert_eq!(percent(0, 0), 100.0);
    }
}
