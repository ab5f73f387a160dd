//! Installer configuration.

use std::fmt;
use whippet_core::result::WhippetResult;
use whippet_data::DatabaseConfig;

/// Target database name variable.
pub const TARGET_DATABASE_VAR: &str = "WHIPPET_INSTALL_DATABASE";

/// Service login password variable.
pub const LOGIN_PASSWORD_VAR: &str = "WHIPPET_INSTALL_LOGIN_PASSWORD";

/// Database created when none is configured.
pub const DEFAULT_TARGET_DATABASE: &str = "whippet";

/// What to install and where.
#[derive(Clone)]
pub struct InstallerConfig {
    /// Server connection used for provisioning (usually an admin login on
    /// the server's maintenance database)
    pub database: DatabaseConfig,
    /// Name of the database to create and populate
    pub target_database: String,
    /// Password for the `whippet_sa` login; required where logins exist
    pub login_password: Option<String>,
}

impl InstallerConfig {
    /// Install into [`DEFAULT_TARGET_DATABASE`] without a login password.
    #[must_use]
    pub fn new(database: DatabaseConfig) -> Self {
        Self {
            database,
            target_database: DEFAULT_TARGET_DATABASE.to_string(),
            login_password: None,
        }
    }

    /// Set the target database name.
    #[must_use]
    pub fn with_target_database(mut self, name: impl Into<String>) -> Self {
        self.target_database = name.into();
        self
    }

    /// Set the service login password.
    #[must_use]
    pub fn with_login_password(mut self, password: impl Into<String>) -> Self {
        self.login_password = Some(password.into());
        self
    }

    /// Read configuration from the process environment.
    ///
    /// # Errors
    ///
    /// See [`InstallerConfig::from_lookup`].
    pub fn from_env() -> WhippetResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup`.
    ///
    /// The connection comes from [`DatabaseConfig::from_lookup`];
    /// `WHIPPET_INSTALL_DATABASE` defaults to `whippet`.
    ///
    /// # Errors
    ///
    /// Returns [`whippet_core::result::WhippetError::Database`] when the
    /// connection settings are missing or invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> WhippetResult<Self> {
        let database = DatabaseConfig::from_lookup(&lookup)?;
        let mut config = Self::new(database);

        if let Some(name) = lookup(TARGET_DATABASE_VAR).filter(|name| !name.trim().is_empty()) {
            config.target_database = name.trim().to_string();
        }
        config.login_password = lookup(LOGIN_PASSWORD_VAR).filter(|password| !password.is_empty());

        Ok(config)
    }
}

impl fmt::Debug for InstallerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstallerConfig")
            .field("database", &self.database)
            .field("target_database", &self.target_database)
            .field("login_password", &self.login_password.as_ref().map(|_| "*****"))
            .finish()
    }
}
