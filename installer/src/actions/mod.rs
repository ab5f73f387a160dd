//! Installer actions.
//!
//! An action is one named step of a provisioning run. The [`Installer`]
//! runs actions in order and stops at the first failure.
//!
//! [`Installer`]: crate::Installer

mod database;
mod seed;

pub use database::{CreateDatabase, CreateLogin, CreateSchema, LOGIN_NAME};
pub use seed::{CountrySeed, RootTenantSeed, Seed, Seeder};

use crate::context::InstallContext;
use futures::future::BoxFuture;
use whippet_core::result::WhippetResult;

/// What an action did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// The action changed the target.
    Applied,
    /// Nothing needed doing.
    Skipped {
        /// Why the action had nothing to do
        reason: String,
    },
}

impl ActionOutcome {
    /// Skipped for `reason`.
    #[must_use]
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped {
            reason: reason.into(),
        }
    }
}

/// One step of an installation.
///
/// # Example
///
/// ```ignore
/// struct Vacuum;
///
/// impl InstallerAction for Vacuum {
///     fn description(&self) -> &str {
///         "Vacuuming"
///     }
///
///     fn execute<'a>(&'a self, context: &'a mut InstallContext) -> BoxFuture<'a, WhippetResult<ActionOutcome>> {
///         Box::pin(async move {
///             context.connection()?.execute("VACUUM").await?;
///             Ok(ActionOutcome::Applied)
///         })
///     }
/// }
/// ```
pub trait InstallerAction: Send + Sync {
    /// Human-readable description shown in progress reports. Never blank.
    fn description(&self) -> &str;

    /// Run the action.
    ///
    /// # Errors
    ///
    /// Returns [`whippet_core::result::WhippetError::ArgumentNull`] when the
    /// context lacks something the action needs, or the failure that stopped
    /// the action.
    fn execute<'a>(&'a self, context: &'a mut InstallContext) -> BoxFuture<'a, WhippetResult<ActionOutcome>>;
}
