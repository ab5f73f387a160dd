//! Seed data.

use super::{ActionOutcome, InstallerAction};
use crate::context::InstallContext;
use futures::future::BoxFuture;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use whippet_core::environment::SystemClock;
use whippet_core::result::{WhippetError, WhippetResult};
use whippet_data::PostgresConnection;
use whippet_data::repository::PostgresRepository;
use whippet_localization::{Country, CountrySeeder};
use whippet_security::{RootTenantSeeder, Tenant};

/// Writes one set of seed rows.
pub trait Seeder: Send + Sync {
    /// Name used in logs and errors.
    fn name(&self) -> &str;

    /// Write the rows.
    ///
    /// # Errors
    ///
    /// Returns the failure that stopped seeding.
    fn seed<'a>(&'a self, context: &'a InstallContext) -> BoxFuture<'a, WhippetResult>;

    /// Release whatever the seeder holds. Called once after the run,
    /// whether or not seeding succeeded.
    ///
    /// # Errors
    ///
    /// Returns the failure to release resources.
    fn dispose(&self) -> BoxFuture<'_, WhippetResult> {
        Box::pin(async { Ok(()) })
    }
}

/// Runs seeders in ascending order.
///
/// The first failing seeder stops the run. Every seeder is disposed
/// afterwards; the seeding failure and any disposal failures are combined
/// into one error.
#[derive(Default)]
pub struct Seed {
    seeders: BTreeMap<i32, Box<dyn Seeder>>,
}

impl Seed {
    /// Seed action without seeders.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `seeder` at position `order`.
    ///
    /// # Errors
    ///
    /// Returns [`WhippetError::Conflict`] if `order` is already taken.
    pub fn with_seeder(mut self, order: i32, seeder: impl Seeder + 'static) -> WhippetResult<Self> {
        if let Some(existing) = self.seeders.get(&order) {
            return Err(WhippetError::Conflict(format!(
                "seed order {order} is already used by {}",
                existing.name()
            )));
        }
        self.seeders.insert(order, Box::new(seeder));
        Ok(self)
    }

    /// Number of seeders.
    #[must_use]
    pub fn len(&self) -> usize {
        self.seeders.len()
    }

    /// Whether no seeder is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seeders.is_empty()
    }
}

impl fmt::Debug for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.seeders.iter().map(|(order, seeder)| (order, seeder.name())))
            .finish()
    }
}

impl InstallerAction for Seed {
    fn description(&self) -> &str {
        "Creating Seed Data"
    }

    fn execute<'a>(&'a self, context: &'a mut InstallContext) -> BoxFuture<'a, WhippetResult<ActionOutcome>> {
        Box::pin(async move {
            if self.seeders.is_empty() {
                return Ok(ActionOutcome::skipped("no seeders registered"));
            }

            let mut errors = Vec::new();
            for (order, seeder) in &self.seeders {
                tracing::debug!(order, seeder = seeder.name(), "Running seeder");
                if let Err(error) = seeder.seed(context).await {
                    tracing::error!(order, seeder = seeder.name(), error = %error, "Seeder failed");
                    errors.push(error);
                    break;
                }
            }

            for seeder in self.seeders.values() {
                if let Err(error) = seeder.dispose().await {
                    tracing::warn!(seeder = seeder.name(), error = %error, "Seeder disposal failed");
                    errors.push(error);
                }
            }

            match WhippetError::aggregate(errors) {
                Some(error) => Err(error),
                None => Ok(ActionOutcome::Applied),
            }
        })
    }
}

/// Seeds the root tenant into a `PostgreSQL` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct RootTenantSeed;

impl Seeder for RootTenantSeed {
    fn name(&self) -> &str {
        "root tenant"
    }

    fn seed<'a>(&'a self, context: &'a InstallContext) -> BoxFuture<'a, WhippetResult> {
        Box::pin(async move {
            let connection = postgres(context, self.name())?;
            let tenants = Arc::new(PostgresRepository::<Tenant>::new(connection.pool().clone()));
            RootTenantSeeder::new(tenants, SystemClock).seed().await?;
            Ok(())
        })
    }
}

/// Seeds the default countries into a `PostgreSQL` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct CountrySeed;

impl Seeder for CountrySeed {
    fn name(&self) -> &str {
        "countries"
    }

    fn seed<'a>(&'a self, context: &'a InstallContext) -> BoxFuture<'a, WhippetResult> {
        Box::pin(async move {
            let connection = postgres(context, self.name())?;
            let countries = Arc::new(PostgresRepository::<Country>::new(connection.pool().clone()));
            CountrySeeder::new(countries, SystemClock).seed().await?;
            Ok(())
        })
    }
}

fn postgres<'a>(context: &'a InstallContext, seed: &str) -> WhippetResult<&'a PostgresConnection> {
    context.connection()?.as_postgres().ok_or_else(|| {
        WhippetError::Installer(format!(
            "the {seed} seed needs PostgreSQL, not {}",
            context.provider()
        ))
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)] // Test code

    use super::*;
    use crate::config::InstallerConfig;
    use std::sync::Mutex;
    use whippet_data::{DatabaseConfig, DatabaseProvider, SqliteConnection};

    #[derive(Clone, Default)]
    struct Journal(Arc<Mutex<Vec<String>>>);

    impl Journal {
        fn push(&self, entry: String) {
            self.0.lock().unwrap().push(entry);
        }

        fn entries(&self) -> Vec<String> {
            self.0.lock().unwrap().clone()
        }
    }

    struct Recording {
        name: &'static str,
        fail_seed: bool,
        fail_dispose: bool,
        journal: Journal,
    }

    impl Recording {
        fn new(name: &'static str, journal: &Journal) -> Self {
            Self {
                name,
                fail_seed: false,
                fail_dispose: false,
                journal: journal.clone(),
            }
        }
    }

    impl Seeder for Recording {
        fn name(&self) -> &str {
            self.name
        }

        fn seed<'a>(&'a self, _context: &'a InstallContext) -> BoxFuture<'a, WhippetResult> {
            Box::pin(async move {
                self.journal.push(format!("seed {}", self.name));
                if self.fail_seed {
                    return Err(WhippetError::Installer(format!("{} failed", self.name)));
                }
                Ok(())
            })
        }

        fn dispose(&self) -> BoxFuture<'_, WhippetResult> {
            Box::pin(async move {
                self.journal.push(format!("dispose {}", self.name));
                if self.fail_dispose {
                    return Err(WhippetError::Installer(format!("{} dispose failed", self.name)));
                }
                Ok(())
            })
        }
    }

    fn context() -> InstallContext {
        let config = DatabaseConfig::new(DatabaseProvider::Sqlite, "Data Source=:memory:").unwrap();
        InstallContext::new(InstallerConfig::new(config))
    }

    #[tokio::test]
    async fn seeders_run_in_ascending_order() {
        let journal = Journal::default();
        let seed = Seed::new()
            .with_seeder(20, Recording::new("users", &journal))
            .unwrap()
            .with_seeder(-5, Recording::new("tenants", &journal))
            .unwrap();

        let outcome = seed.execute(&mut context()).await.unwrap();

        assert_eq!(outcome, ActionOutcome::Applied);
        assert_eq!(
            journal.entries(),
            vec!["seed tenants", "seed users", "dispose tenants", "dispose users"]
        );
    }

    #[tokio::test]
    async fn first_failure_stops_seeding_but_all_are_disposed() {
        let journal = Journal::default();
        let failing = Recording {
            fail_seed: true,
            ..Recording::new("tenants", &journal)
        };
        let broken_dispose = Recording {
            fail_dispose: true,
            ..Recording::new("users", &journal)
        };
        let seed = Seed::new()
            .with_seeder(1, failing)
            .unwrap()
            .with_seeder(2, broken_dispose)
            .unwrap();

        let error = seed.execute(&mut context()).await.unwrap_err();

        assert_eq!(
            journal.entries(),
            vec!["seed tenants", "dispose tenants", "dispose users"]
        );
        assert_eq!(
            error,
            WhippetError::Aggregate(vec![
                WhippetError::Installer("tenants failed".to_string()),
                WhippetError::Installer("users dispose failed".to_string()),
            ])
        );
    }

    #[test]
    fn duplicate_order_is_rejected() {
        let journal = Journal::default();
        let result = Seed::new()
            .with_seeder(1, Recording::new("a", &journal))
            .unwrap()
            .with_seeder(1, Recording::new("b", &journal));

        assert!(matches!(result, Err(WhippetError::Conflict(_))));
    }

    #[tokio::test]
    async fn empty_seed_is_skipped() {
        let outcome = Seed::new().execute(&mut context()).await.unwrap();
        assert!(matches!(outcome, ActionOutcome::Skipped { .. }));
        assert_eq!(Seed::new().description(), "Creating Seed Data");
    }

    #[tokio::test]
    async fn root_tenant_seed_needs_a_postgres_connection() {
        let result = RootTenantSeed.seed(&context()).await;
        assert_eq!(result, Err(WhippetError::argument_null("connection")));
    }

    #[tokio::test]
    async fn country_seed_rejects_other_providers() {
        let config = DatabaseConfig::new(DatabaseProvider::Sqlite, "Data Source=:memory:").unwrap();
        let connection = SqliteConnection::connect(&config).await.unwrap();
        let context = InstallContext::new(InstallerConfig::new(config)).with_connection(connection);

        let result = CountrySeed.seed(&context).await;

        assert!(matches!(
            result,
            Err(WhippetError::Installer(message)) if message.contains("countries seed needs PostgreSQL")
        ));
    }
}
