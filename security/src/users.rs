//! Users and the password blacklist.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use uuid::Uuid;
use whippet_core::cqrs::{Query, QueryHandler, QueryParameter};
use whippet_core::environment::Clock;
use whippet_core::repository::{Entity, Repository};
use whippet_core::result::{ResultContainerExt, WhippetResult, require_not_blank};

/// A person or service that signs in.
///
/// `password` holds whatever the credential store writes (normally a hash);
/// it is never printed by `Debug`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct User {
    /// User id
    pub id: Uuid,
    /// Unique sign-in name
    pub username: String,
    /// Stored credential
    pub password: String,
    /// Contact address
    pub email: Option<String>,
    /// Whether the user may sign in
    pub active: bool,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

impl User {
    /// New active user with a random id.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>, clock: &impl Clock) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.into(),
            password: password.into(),
            email: None,
            active: true,
            created_at: clock.now(),
        }
    }

    /// Set the contact address.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("password", &"*****")
            .field("email", &self.email)
            .field("active", &self.active)
            .field("created_at", &self.created_at)
            .finish()
    }
}

impl Entity for User {
    type Id = Uuid;

    const ENTITY_NAME: &'static str = "User";

    fn id(&self) -> Uuid {
        self.id
    }

    fn validate(&self) -> WhippetResult {
        require_not_blank(&self.username, "username")?;
        require_not_blank(&self.password, "password")
    }
}

/// A password users may not choose.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct PasswordBlacklistEntry {
    /// Entry id
    pub id: Uuid,
    /// Forbidden password, compared ignoring case
    pub password: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

impl PasswordBlacklistEntry {
    /// New entry with a random id.
    #[must_use]
    pub fn new(password: impl Into<String>, clock: &impl Clock) -> Self {
        Self {
            id: Uuid::new_v4(),
            password: password.into(),
            created_at: clock.now(),
        }
    }
}

impl Entity for PasswordBlacklistEntry {
    type Id = Uuid;

    const ENTITY_NAME: &'static str = "PasswordBlacklistEntry";

    fn id(&self) -> Uuid {
        self.id
    }

    fn validate(&self) -> WhippetResult {
        require_not_blank(&self.password, "password")
    }
}

/// User storage.
pub trait UserRepository: Repository<User> {
    /// Find a user by name, ignoring case.
    fn get_by_username(&self, username: &str) -> impl Future<Output = WhippetResult<Option<User>>> + Send;
}

/// Password blacklist storage.
pub trait PasswordBlacklistRepository: Repository<PasswordBlacklistEntry> {
    /// Entries matching `password`, ignoring case.
    fn find(&self, password: &str) -> impl Future<Output = WhippetResult<Vec<PasswordBlacklistEntry>>> + Send;

    /// Whether `password` is blacklisted.
    fn contains(&self, password: &str) -> impl Future<Output = WhippetResult<bool>> + Send {
        async move { Ok(!self.find(password).await?.is_empty()) }
    }
}

/// Look up a user by name.
#[derive(Debug, Clone)]
pub struct GetUserByUsername {
    /// Sign-in name, matched ignoring case
    pub username: String,
}

impl GetUserByUsername {
    /// Create the query.
    #[must_use]
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
        }
    }
}

impl Query for GetUserByUsername {
    type Entity = User;

    fn parameters(&self) -> Vec<QueryParameter> {
        vec![("username", Value::String(self.username.clone()))]
    }
}

/// Handles [`GetUserByUsername`].
#[derive(Debug)]
pub struct GetUserByUsernameHandler<R> {
    repository: Arc<R>,
}

impl<R> GetUserByUsernameHandler<R> {
    /// Create a handler over `repository`.
    #[must_use]
    pub const fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }
}

impl<R: UserRepository> QueryHandler<GetUserByUsername> for GetUserByUsernameHandler<R> {
    async fn handle(&self, query: GetUserByUsername) -> WhippetResult<Vec<User>> {
        require_not_blank(&query.username, "username")?;
        self.repository
            .get_by_username(&query.username)
            .await
            .into_enumerable()
    }
}

/// Check a candidate password against the blacklist.
///
/// Answers with the matching entries; an empty list means the password is
/// allowed.
#[derive(Clone)]
pub struct IsPasswordBlacklisted {
    /// Candidate password
    pub password: String,
}

impl IsPasswordBlacklisted {
    /// Create the query.
    #[must_use]
    pub fn new(password: impl Into<String>) -> Self {
        Self {
            password: password.into(),
        }
    }
}

impl fmt::Debug for IsPasswordBlacklisted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IsPasswordBlacklisted").finish_non_exhaustive()
    }
}

impl Query for IsPasswordBlacklisted {
    type Entity = PasswordBlacklistEntry;
}

/// Handles [`IsPasswordBlacklisted`].
#[derive(Debug)]
pub struct IsPasswordBlacklistedHandler<R> {
    repository: Arc<R>,
}

impl<R> IsPasswordBlacklistedHandler<R> {
    /// Create a handler over `repository`.
    #[must_use]
    pub const fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }
}

impl<R: PasswordBlacklistRepository> QueryHandler<IsPasswordBlacklisted> for IsPasswordBlacklistedHandler<R> {
    async fn handle(&self, query: IsPasswordBlacklisted) -> WhippetResult<Vec<PasswordBlacklistEntry>> {
        require_not_blank(&query.password, "password")?;
        self.repository.find(&query.password).await
    }
}
