//! Database and pool configuration.
//!
//! Every setting can be read from `WHIPPET_*` environment variables. The
//! `from_lookup` constructors take the variable source as a closure so tests
//! do not touch the process environment.

use crate::connection_string::ConnectionStringBuilder;
use crate::error::{DataError, Result};
use crate::provider::DatabaseProvider;
use sqlx::pool::PoolOptions;
use std::time::Duration;
use whippet_runtime::RetryPolicy;

/// Provider name variable.
pub const PROVIDER_VAR: &str = "WHIPPET_DB_PROVIDER";
/// Connection string variable.
pub const CONNECTION_STRING_VAR: &str = "WHIPPET_CONNECTION_STRING";
/// Maximum pool size variable.
pub const MAX_CONNECTIONS_VAR: &str = "WHIPPET_DB_MAX_CONNECTIONS";

/// Connection pool settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Minimum number of connections to maintain
    pub min_connections: u32,
    /// Connection acquisition timeout
    pub acquire_timeout: Duration,
    /// Idle connection lifetime
    pub idle_timeout: Duration,
    /// Maximum connection lifetime
    pub max_lifetime: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 0,
            acquire_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),  // 10 minutes
            max_lifetime: Duration::from_secs(1800), // 30 minutes
        }
    }
}

impl PoolConfig {
    /// Set the maximum pool size.
    #[must_use]
    pub const fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }

    /// Set the minimum pool size.
    #[must_use]
    pub const fn with_min_connections(mut self, min_connections: u32) -> Self {
        self.min_connections = min_connections;
        self
    }

    /// Set the acquire timeout.
    #[must_use]
    pub const fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    /// Set the idle timeout.
    #[must_use]
    pub const fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Set the maximum connection lifetime.
    #[must_use]
    pub const fn with_max_lifetime(mut self, lifetime: Duration) -> Self {
        self.max_lifetime = lifetime;
        self
    }

    /// Read pool settings from the process environment.
    ///
    /// Unset or unparsable variables keep their defaults.
    ///
    /// # Errors
    ///
    /// See [`PoolConfig::from_lookup`].
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read pool settings through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::Config`] if the resulting settings are rejected by
    /// [`PoolConfig::validate`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let number = |key: &str| lookup(key).and_then(|v| v.trim().parse::<u64>().ok());
        let count = |key: &str, default: u32| {
            number(key)
                .and_then(|v| u32::try_from(v).ok())
                .unwrap_or(default)
        };
        let secs = |key: &str, default: Duration| number(key).map_or(default, Duration::from_secs);

        let config = Self {
            max_connections: count(MAX_CONNECTIONS_VAR, defaults.max_connections),
            min_connections: count("WHIPPET_DB_MIN_CONNECTIONS", defaults.min_connections),
            acquire_timeout: secs("WHIPPET_DB_ACQUIRE_TIMEOUT_SECS", defaults.acquire_timeout),
            idle_timeout: secs("WHIPPET_DB_IDLE_TIMEOUT_SECS", defaults.idle_timeout),
            max_lifetime: secs("WHIPPET_DB_MAX_LIFETIME_SECS", defaults.max_lifetime),
        };
        config.validate()?;
        Ok(config)
    }

    /// Check that a pool can be built from these settings.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::Config`] if `max_connections` is zero.
    pub fn validate(&self) -> Result<()> {
        if self.max_connections == 0 {
            return Err(DataError::Config(format!(
                "{MAX_CONNECTIONS_VAR} must be at least 1"
            )));
        }
        Ok(())
    }

    /// `sqlx` pool options for any driver.
    #[must_use]
    pub fn pool_options<DB: sqlx::Database>(&self) -> PoolOptions<DB> {
        PoolOptions::<DB>::new()
            .max_connections(self.max_connections)
            .min_connections(self.min_connections.min(self.max_connections))
            .acquire_timeout(self.acquire_timeout)
            .idle_timeout(self.idle_timeout)
            .max_lifetime(self.max_lifetime)
    }
}

/// Everything needed to open a [`crate::connection::WhippetConnection`].
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Database engine
    pub provider: DatabaseProvider,
    /// Parsed connection string
    pub connection_string: ConnectionStringBuilder,
    /// Pool settings
    pub pool: PoolConfig,
    /// Retry policy for opening connections
    pub retry: RetryPolicy,
}

impl DatabaseConfig {
    /// Configuration with default pool and retry settings.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::InvalidConnectionString`] if the string cannot be parsed.
    pub fn new(provider: DatabaseProvider, connection_string: &str) -> Result<Self> {
        Ok(Self {
            provider,
            connection_string: ConnectionStringBuilder::parse(provider, connection_string)?,
            pool: PoolConfig::default(),
            retry: RetryPolicy::default(),
        })
    }

    /// Replace the pool settings.
    #[must_use]
    pub fn with_pool(mut self, pool: PoolConfig) -> Self {
        self.pool = pool;
        self
    }

    /// Replace the connect retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Read configuration from the process environment.
    ///
    /// # Errors
    ///
    /// See [`DatabaseConfig::from_lookup`].
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup`.
    ///
    /// `WHIPPET_DB_PROVIDER` defaults to `postgresql`.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::Config`] when `WHIPPET_CONNECTION_STRING` is unset,
    /// [`DataError::UnknownProvider`] for an unrecognised provider, and
    /// [`DataError::InvalidConnectionString`] for a malformed string, and
    /// [`DataError::Config`] for pool settings that cannot build a pool.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let provider = match lookup(PROVIDER_VAR) {
            Some(name) if !name.trim().is_empty() => name.parse()?,
            _ => DatabaseProvider::PostgreSql,
        };
        let connection_string = lookup(CONNECTION_STRING_VAR)
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| DataError::Config(format!("{CONNECTION_STRING_VAR} is not set")))?;

        Ok(Self::new(provider, &connection_string)?.with_pool(PoolConfig::from_lookup(&lookup)?))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)] // Test code

    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn pool_defaults() {
        let config = PoolConfig::default();
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 0);
        assert_eq!(config.acquire_timeout, Duration::from_secs(30));
    }

    #[test]
    fn pool_reads_overrides_and_ignores_garbage() {
        let config = PoolConfig::from_lookup(lookup(&[
            ("WHIPPET_DB_MAX_CONNECTIONS", "25"),
            ("WHIPPET_DB_MIN_CONNECTIONS", "lots"),
            ("WHIPPET_DB_ACQUIRE_TIMEOUT_SECS", "5"),
        ]))
        .unwrap();

        assert_eq!(config.max_connections, 25);
        assert_eq!(config.min_connections, 0);
        assert_eq!(config.acquire_timeout, Duration::from_secs(5));
        assert_eq!(config.idle_timeout, Duration::from_secs(600));
    }

    #[test]
    fn zero_max_connections_is_rejected() {
        let result = PoolConfig::from_lookup(lookup(&[(MAX_CONNECTIONS_VAR, "0")]));
        assert!(matches!(result, Err(DataError::Config(message)) if message.contains(MAX_CONNECTIONS_VAR)));

        let result = DatabaseConfig::from_lookup(lookup(&[
            (CONNECTION_STRING_VAR, "Host=localhost;Database=whippet"),
            (MAX_CONNECTIONS_VAR, "0"),
        ]));
        assert!(matches!(result, Err(DataError::Config(_))));
        assert!(PoolConfig::default().with_max_connections(0).validate().is_err());
    }

    #[test]
    fn database_config_requires_connection_string() {
        let result = DatabaseConfig::from_lookup(lookup(&[(PROVIDER_VAR, "sqlite")]));
        assert!(matches!(result, Err(DataError::Config(_))));
    }

    #[test]
    fn database_config_defaults_to_postgres() {
        let config = DatabaseConfig::from_lookup(lookup(&[(
            CONNECTION_STRING_VAR,
            "Host=localhost;Database=whippet",
        )]))
        .unwrap();

        assert_eq!(config.provider, DatabaseProvider::PostgreSql);
        assert_eq!(config.connection_string.database(), Some("whippet"));
        assert_eq!(config.retry, RetryPolicy::default());
    }

    #[test]
    fn database_config_rejects_unknown_provider() {
        let result = DatabaseConfig::from_lookup(lookup(&[
            (PROVIDER_VAR, "oracle"),
            (CONNECTION_STRING_VAR, "Host=h"),
        ]));
        assert!(matches!(result, Err(DataError::UnknownProvider(_))));
    }
}
