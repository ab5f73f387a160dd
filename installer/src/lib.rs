//! # Whippet Installer
//!
//! Provisions a Whippet database: creates the database and the `whippet_sa`
//! login, builds the `whippet` schema and writes seed data.
//!
//! Each step is an [`InstallerAction`]. An [`Installer`] runs its actions in
//! order against one [`InstallContext`], reports progress through a
//! [`ProgressReporter`] and stops at the first failure.
//!
//! ## Example
//!
//! ```ignore
//! use whippet_installer::{InstallContext, Installer, InstallerConfig, RootTenantSeed, Seed};
//! use whippet_data::WhippetConnection;
//!
//! let config = InstallerConfig::from_env()?;
//! let connection = WhippetConnection::open(&config.database).await?;
//! let mut context = InstallContext::new(config).with_connection(connection);
//!
//! let seed = Seed::new().with_seeder(0, RootTenantSeed)?;
//! let report = Installer::standard(seed).run(&mut context).await.into_result()?;
//! ```

pub mod actions;
pub mod config;
pub mod context;
pub mod installer;
pub mod scripts;

// Re-exports
pub use actions::{
    ActionOutcome, CountrySeed, CreateDatabase, CreateLogin, CreateSchema, InstallerAction, RootTenantSeed, Seed,
    Seeder,
};
pub use config::InstallerConfig;
pub use context::{InstallContext, ProgressReporter};
pub use installer::{InstallReport, Installer, StepReport};
