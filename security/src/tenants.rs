//! Tenants and user-to-tenant assignments.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use uuid::Uuid;
use whippet_core::cqrs::{Query, QueryHandler, QueryParameter};
use whippet_core::environment::Clock;
use whippet_core::repository::{Entity, Repository};
use whippet_core::result::{ResultContainerExt, WhippetResult, require_not_blank};

/// An isolated customer of the system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct Tenant {
    /// Tenant id
    pub id: Uuid,
    /// Unique display name
    pub name: String,
    /// Optional address the tenant is served from
    pub uri: Option<String>,
    /// Whether the tenant may sign in
    pub active: bool,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

impl Tenant {
    /// Id of the tenant every installation starts with.
    pub const ROOT_ID: Uuid = Uuid::from_u128(0x0000_0000_0000_4000_8000_0000_0000_0001);
    /// Name of the root tenant.
    pub const ROOT_NAME: &'static str = "Root";

    /// New active tenant with a random id.
    #[must_use]
    pub fn new(name: impl Into<String>, clock: &impl Clock) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            uri: None,
            active: true,
            created_at: clock.now(),
        }
    }

    /// The root tenant.
    #[must_use]
    pub fn root(clock: &impl Clock) -> Self {
        Self {
            id: Self::ROOT_ID,
            ..Self::new(Self::ROOT_NAME, clock)
        }
    }

    /// Whether this is the root tenant.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.id == Self::ROOT_ID
    }
}

impl Entity for Tenant {
    type Id = Uuid;

    const ENTITY_NAME: &'static str = "Tenant";

    fn id(&self) -> Uuid {
        self.id
    }

    fn validate(&self) -> WhippetResult {
        require_not_blank(&self.name, "name")
    }
}

/// Grants a user access to a tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct UserTenantAssignment {
    /// Assignment id
    pub id: Uuid,
    /// Assigned user
    pub user_id: Uuid,
    /// Tenant the user may access
    pub tenant_id: Uuid,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

impl UserTenantAssignment {
    /// New assignment with a random id.
    #[must_use]
    pub fn new(user_id: Uuid, tenant_id: Uuid, clock: &impl Clock) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            tenant_id,
            created_at: clock.now(),
        }
    }
}

impl Entity for UserTenantAssignment {
    type Id = Uuid;

    const ENTITY_NAME: &'static str = "UserTenantAssignment";

    fn id(&self) -> Uuid {
        self.id
    }
}

/// Tenant storage.
pub trait TenantRepository: Repository<Tenant> {
    /// Find a tenant by name, ignoring case.
    fn get_by_name(&self, name: &str) -> impl Future<Output = WhippetResult<Option<Tenant>>> + Send;
}

/// User-to-tenant assignment storage.
pub trait UserTenantAssignmentRepository: Repository<UserTenantAssignment> {
    /// Every tenant assignment of a user.
    fn get_by_user(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = WhippetResult<Vec<UserTenantAssignment>>> + Send;
}

/// Look up a tenant by name.
#[derive(Debug, Clone)]
pub struct GetTenantByName {
    /// Tenant name, matched ignoring case
    pub name: String,
}

impl GetTenantByName {
    /// Create the query.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Query for GetTenantByName {
    type Entity = Tenant;

    fn parameters(&self) -> Vec<QueryParameter> {
        vec![("name", Value::String(self.name.clone()))]
    }
}

/// Handles [`GetTenantByName`].
#[derive(Debug)]
pub struct GetTenantByNameHandler<R> {
    repository: Arc<R>,
}

impl<R> GetTenantByNameHandler<R> {
    /// Create a handler over `repository`.
    #[must_use]
    pub const fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }
}

impl<R: TenantRepository> QueryHandler<GetTenantByName> for GetTenantByNameHandler<R> {
    async fn handle(&self, query: GetTenantByName) -> WhippetResult<Vec<Tenant>> {
        require_not_blank(&query.name, "name")?;
        self.repository.get_by_name(&query.name).await.into_enumerable()
    }
}

/// Every tenant a user is assigned to.
#[derive(Debug, Clone)]
pub struct GetUserTenantAssignmentsByUser {
    /// User id
    pub user_id: Uuid,
}

impl GetUserTenantAssignmentsByUser {
    /// Create the query.
    #[must_use]
    pub const fn new(user_id: Uuid) -> Self {
        Self { user_id }
    }
}

impl Query for GetUserTenantAssignmentsByUser {
    type Entity = UserTenantAssignment;

    fn parameters(&self) -> Vec<QueryParameter> {
        vec![("user_id", Value::String(self.user_id.to_string()))]
    }
}

/// Handles [`GetUserTenantAssignmentsByUser`].
#[derive(Debug)]
pub struct GetUserTenantAssignmentsByUserHandler<R> {
    repository: Arc<R>,
}

impl<R> GetUserTenantAssignmentsByUserHandler<R> {
    /// Create a handler over `repository`.
    #[must_use]
    pub const fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }
}

impl<R: UserTenantAssignmentRepository> QueryHandler<GetUserTenantAssignmentsByUser>
    for GetUserTenantAssignmentsByUserHandler<R>
{
    async fn handle(&self, query: GetUserTenantAssignmentsByUser) -> WhippetResult<Vec<UserTenantAssignment>> {
        self.repository.get_by_user(query.user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use whippet_core::result::WhippetError;
    use whippet_testing::test_clock;

    #[test]
    fn root_tenant_has_fixed_identity() {
        let root = Tenant::root(&test_clock());
        assert!(root.is_root());
        assert_eq!(root.name, "Root");
        assert!(root.active);
        assert!(!Tenant::new("acme", &test_clock()).is_root());
    }

    #[test]
    fn blank_name_is_rejected() {
        let tenant = Tenant::new("  ", &test_clock());
        assert_eq!(tenant.validate(), Err(WhippetError::argument_null("name")));
    }

    #[test]
    fn query_reports_name_parameter() {
        let query = GetTenantByName::new("acme");
        assert_eq!(query.parameters(), vec![("name", Value::String("acme".to_string()))]);
    }
}
