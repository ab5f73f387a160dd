//! Database, login and schema provisioning.

use super::{ActionOutcome, InstallerAction};
use crate::context::InstallContext;
use crate::scripts::{self, ScriptKind, ScriptTokens};
use futures::future::BoxFuture;
use whippet_core::result::WhippetResult;
use std::path::Path;
use whippet_data::connection_string::sqlite_file_name;
use whippet_data::{DatabaseConnection, DatabaseProvider};

/// Login the application connects with.
pub const LOGIN_NAME: &str = "whippet_sa";

fn target_database(context: &InstallContext) -> String {
    context
        .provider()
        .normalize_database_name(&context.config().target_database)
}

/// Creates the target database unless it already exists.
#[derive(Debug, Clone, Copy, Default)]
pub struct CreateDatabase;

impl InstallerAction for CreateDatabase {
    fn description(&self) -> &str {
        "Creating Database"
    }

    fn execute<'a>(&'a self, context: &'a mut InstallContext) -> BoxFuture<'a, WhippetResult<ActionOutcome>> {
        Box::pin(async move {
            let provider = context.provider();
            let target = target_database(context);
            let Some(template) = scripts::template(provider, ScriptKind::DbCreate) else {
                return Ok(ActionOutcome::skipped(format!(
                    "{provider} creates databases on first connection"
                )));
            };

            let connection = context.connection()?;
            if connection.database_exists(&target).await? {
                tracing::info!(database = %target, "Database already exists");
                return Ok(ActionOutcome::skipped(format!("database {target} already exists")));
            }

            let script = scripts::render(
                template,
                &ScriptTokens {
                    database: Some(&target),
                    password: None,
                },
            )?;
            connection.execute_script(&script).await?;

            tracing::info!(database = %target, "Database created");
            Ok(ActionOutcome::Applied)
        })
    }
}

/// Creates the `whippet_sa` login and grants it the target database.
#[derive(Debug, Clone, Copy, Default)]
pub struct CreateLogin;

impl InstallerAction for CreateLogin {
    fn description(&self) -> &str {
        "Creating Login"
    }

    fn execute<'a>(&'a self, context: &'a mut InstallContext) -> BoxFuture<'a, WhippetResult<ActionOutcome>> {
        Box::pin(async move {
            let provider = context.provider();
            let template = match scripts::template(provider, ScriptKind::DbLogin) {
                Some(template) if provider.has_logins() => template,
                _ => return Ok(ActionOutcome::skipped(format!("{provider} has no logins"))),
            };

            let connection = context.connection()?;
            if connection.login_exists(LOGIN_NAME).await? {
                tracing::info!(login = LOGIN_NAME, "Login already exists");
                return Ok(ActionOutcome::skipped(format!("login {LOGIN_NAME} already exists")));
            }

            let target = target_database(context);
            let script = scripts::render(
                template,
                &ScriptTokens {
                    database: Some(&target),
                    password: context.config().login_password.as_deref(),
                },
            )?;
            connection.execute_script(&script).await?;

            tracing::info!(login = LOGIN_NAME, database = %target, "Login created");
            Ok(ActionOutcome::Applied)
        })
    }
}

/// Switches to the target database and creates the `whippet` schema.
///
/// The schema script only creates what is missing, so the action can be
/// re-run against an installed database.
#[derive(Debug, Clone, Copy, Default)]
pub struct CreateSchema;

impl InstallerAction for CreateSchema {
    fn description(&self) -> &str {
        "Creating Database Schema"
    }

    fn execute<'a>(&'a self, context: &'a mut InstallContext) -> BoxFuture<'a, WhippetResult<ActionOutcome>> {
        Box::pin(async move {
            let provider = context.provider();
            let target = target_database(context);

            let expected = match provider {
                DatabaseProvider::Sqlite => sqlite_file_name(&target),
                _ => target.clone(),
            };

            let connection = context.connection_mut()?;
            if connection.database() != Some(expected.as_str()) {
                if provider == DatabaseProvider::Sqlite && Path::new(&expected).is_relative() {
                    tracing::warn!(
                        file = %expected,
                        cwd = ?std::env::current_dir().ok(),
                        "SQLite target is relative to the working directory"
                    );
                }
                connection.change_database(&target).await?;
            }

            let Some(template) = scripts::template(provider, ScriptKind::DbSchema) else {
                return Ok(ActionOutcome::skipped(format!("{provider} has no schema script")));
            };
            let script = scripts::render(
                template,
                &ScriptTokens {
                    database: Some(&target),
                    password: None,
                },
            )?;
            context.connection()?.execute_script(&script).await?;

            tracing::info!(database = %target, "Schema created");
            Ok(ActionOutcome::Applied)
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)] // Test code

    use super::*;
    use crate::config::InstallerConfig;
    use whippet_core::result::WhippetError;
    use whippet_data::{DatabaseConfig, DatabaseProvider, SqliteConnection};

    async fn sqlite_context() -> InstallContext {
        let config = DatabaseConfig::new(DatabaseProvider::Sqlite, "Data Source=:memory:").unwrap();
        let connection = SqliteConnection::connect(&config).await.unwrap();
        InstallContext::new(InstallerConfig::new(config).with_target_database(":memory:"))
            .with_connection(connection)
    }

    #[test]
    fn descriptions_are_fixed() {
        assert_eq!(CreateDatabase.description(), "Creating Database");
        assert_eq!(CreateLogin.description(), "Creating Login");
        assert_eq!(CreateSchema.description(), "Creating Database Schema");
    }

    #[tokio::test]
    async fn sqlite_skips_database_and_login() {
        let mut context = sqlite_context().await;

        assert!(matches!(
            CreateDatabase.execute(&mut context).await.unwrap(),
            ActionOutcome::Skipped { .. }
        ));
        assert_eq!(
            CreateLogin.execute(&mut context).await.unwrap(),
            ActionOutcome::skipped("SQLite has no logins")
        );
    }

    #[tokio::test]
    async fn sqlite_schema_is_created_and_rerunnable() {
        let mut context = sqlite_context().await;

        assert_eq!(CreateSchema.execute(&mut context).await.unwrap(), ActionOutcome::Applied);
        assert_eq!(CreateSchema.execute(&mut context).await.unwrap(), ActionOutcome::Applied);

        let pool = context.connection().unwrap().as_sqlite().unwrap().pool().clone();
        let tables: Vec<String> =
            sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
                .fetch_all(&pool)
                .await
                .unwrap();
        assert_eq!(
            tables,
            vec![
                "cities",
                "countries",
                "invariant_addresses",
                "job_categories",
                "job_parameters",
                "jobs",
                "log_entries",
                "password_blacklist",
                "postal_codes",
                "role_user_assignments",
                "roles",
                "setting_groups",
                "settings",
                "state_provinces",
                "tenants",
                "user_tenant_assignments",
                "users",
            ]
        );
    }

    #[tokio::test]
    async fn sqlite_schema_keeps_a_connection_already_on_the_target_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("whippet.sqlite");
        let config = DatabaseConfig::new(
            DatabaseProvider::Sqlite,
            &format!("Data Source={}", file.display()),
        )
        .unwrap();
        let connection = SqliteConnection::connect(&config).await.unwrap();
        let pool = connection.pool().clone();
        let target = dir.path().join("whippet").display().to_string();
        let mut context = InstallContext::new(InstallerConfig::new(config).with_target_database(target))
            .with_connection(connection);

        assert_eq!(CreateSchema.execute(&mut context).await.unwrap(), ActionOutcome::Applied);

        assert!(!pool.is_closed());
        assert_eq!(
            context.connection().unwrap().database(),
            Some(file.display().to_string().as_str())
        );
    }

    #[tokio::test]
    async fn actions_need_a_connection() {
        let config = DatabaseConfig::new(DatabaseProvider::PostgreSql, "Host=localhost").unwrap();
        let mut context = InstallContext::new(InstallerConfig::new(config));

        assert_eq!(
            CreateDatabase.execute(&mut context).await,
            Err(WhippetError::argument_null("connection"))
        );
        assert_eq!(
            CreateSchema.execute(&mut context).await,
            Err(WhippetError::argument_null("connection"))
        );
    }
}
