//! Roles and role membership.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use uuid::Uuid;
use whippet_core::cqrs::{Query, QueryHandler, QueryParameter};
use whippet_core::environment::Clock;
use whippet_core::repository::{Entity, Repository};
use whippet_core::result::{WhippetResult, require_not_blank};

/// A named set of permissions within a tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct Role {
    /// Role id
    pub id: Uuid,
    /// Owning tenant
    pub tenant_id: Uuid,
    /// Role name, unique within the tenant
    pub name: String,
    /// Free-form description
    pub description: Option<String>,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

impl Role {
    /// New role with a random id.
    #[must_use]
    pub fn new(tenant_id: Uuid, name: impl Into<String>, clock: &impl Clock) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            name: name.into(),
            description: None,
            created_at: clock.now(),
        }
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl Entity for Role {
    type Id = Uuid;

    const ENTITY_NAME: &'static str = "Role";

    fn id(&self) -> Uuid {
        self.id
    }

    fn validate(&self) -> WhippetResult {
        require_not_blank(&self.name, "name")
    }
}

/// Membership of a user in a role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct RoleUserAssignment {
    /// Assignment id
    pub id: Uuid,
    /// Granted role
    pub role_id: Uuid,
    /// Member
    pub user_id: Uuid,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

impl RoleUserAssignment {
    /// New assignment with a random id.
    #[must_use]
    pub fn new(role_id: Uuid, user_id: Uuid, clock: &impl Clock) -> Self {
        Self {
            id: Uuid::new_v4(),
            role_id,
            user_id,
            created_at: clock.now(),
        }
    }
}

impl Entity for RoleUserAssignment {
    type Id = Uuid;

    const ENTITY_NAME: &'static str = "RoleUserAssignment";

    fn id(&self) -> Uuid {
        self.id
    }
}

/// Role storage.
pub trait RoleRepository: Repository<Role> {}

/// Role membership storage.
pub trait RoleUserAssignmentRepository: Repository<RoleUserAssignment> {
    /// Every role membership of a user.
    fn get_by_user(&self, user_id: Uuid) -> impl Future<Output = WhippetResult<Vec<RoleUserAssignment>>> + Send;
}

/// Every role a user belongs to.
#[derive(Debug, Clone)]
pub struct GetRoleUserAssignmentsByUser {
    /// User id
    pub user_id: Uuid,
}

impl GetRoleUserAssignmentsByUser {
    /// Create the query.
    #[must_use]
    pub const fn new(user_id: Uuid) -> Self {
        Self { user_id }
    }
}

impl Query for GetRoleUserAssignmentsByUser {
    type Entity = RoleUserAssignment;

    fn parameters(&self) -> Vec<QueryParameter> {
        vec![("user_id", Value::String(self.user_id.to_string()))]
    }
}

/// Handles [`GetRoleUserAssignmentsByUser`].
#[derive(Debug)]
pub struct GetRoleUserAssignmentsByUserHandler<R> {
    repository: Arc<R>,
}

impl<R> GetRoleUserAssignmentsByUserHandler<R> {
    /// Create a handler over `repository`.
    #[must_use]
    pub const fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }
}

impl<R: RoleUserAssignmentRepository> QueryHandler<GetRoleUserAssignmentsByUser>
    for GetRoleUserAssignmentsByUserHandler<R>
{
    async fn handle(&self, query: GetRoleUserAssignmentsByUser) -> WhippetResult<Vec<RoleUserAssignment>> {
        self.repository.get_by_user(query.user_id).await
    }
}
