//! In-memory security store for tests.
//!
//! The lookups compare the way the `PostgreSQL` store does: names ignoring
//! case, passwords in the blacklist ignoring case. The unique indexes of the
//! `whippet` schema are enforced too, so a duplicate fails here with the
//! same [`whippet_core::WhippetError::Conflict`] the database store returns.

use crate::access_control::{Role, RoleRepository, RoleUserAssignment, RoleUserAssignmentRepository};
use crate::handlers::SecurityStore;
use crate::tenants::{Tenant, TenantRepository, UserTenantAssignment, UserTenantAssignmentRepository};
use crate::users::{PasswordBlacklistEntry, PasswordBlacklistRepository, User, UserRepository};
use std::sync::Arc;
use uuid::Uuid;
use whippet_core::result::WhippetResult;
use whippet_testing::InMemoryRepository;

impl TenantRepository for InMemoryRepository<Tenant> {
    async fn get_by_name(&self, name: &str) -> WhippetResult<Option<Tenant>> {
        Ok(self
            .find(|tenant| tenant.name.eq_ignore_ascii_case(name))?
            .into_iter()
            .next())
    }
}

impl UserTenantAssignmentRepository for InMemoryRepository<UserTenantAssignment> {
    async fn get_by_user(&self, user_id: Uuid) -> WhippetResult<Vec<UserTenantAssignment>> {
        self.find(|assignment| assignment.user_id == user_id)
    }
}

impl UserRepository for InMemoryRepository<User> {
    async fn get_by_username(&self, username: &str) -> WhippetResult<Option<User>> {
        Ok(self
            .find(|user| user.username.eq_ignore_ascii_case(username))?
            .into_iter()
            .next())
    }
}

impl PasswordBlacklistRepository for InMemoryRepository<PasswordBlacklistEntry> {
    async fn find(&self, password: &str) -> WhippetResult<Vec<PasswordBlacklistEntry>> {
        let needle = password.to_lowercase();
        InMemoryRepository::find(self, |entry| entry.password.to_lowercase() == needle)
    }
}

impl RoleRepository for InMemoryRepository<Role> {}

impl RoleUserAssignmentRepository for InMemoryRepository<RoleUserAssignment> {
    async fn get_by_user(&self, user_id: Uuid) -> WhippetResult<Vec<RoleUserAssignment>> {
        self.find(|assignment| assignment.user_id == user_id)
    }
}

/// A [`SecurityStore`] keeping every entity in memory.
///
/// Fields are public so tests can seed rows or inject failures directly.
#[derive(Debug, Clone)]
pub struct InMemorySecurityStore {
    /// Tenants
    pub tenants: Arc<InMemoryRepository<Tenant>>,
    /// Users
    pub users: Arc<InMemoryRepository<User>>,
    /// Roles
    pub roles: Arc<InMemoryRepository<Role>>,
    /// Role memberships
    pub role_assignments: Arc<InMemoryRepository<RoleUserAssignment>>,
    /// Tenant memberships
    pub tenant_assignments: Arc<InMemoryRepository<UserTenantAssignment>>,
    /// Password blacklist
    pub password_blacklist: Arc<InMemoryRepository<PasswordBlacklistEntry>>,
}

impl InMemorySecurityStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for InMemorySecurityStore {
    fn default() -> Self {
        Self {
            tenants: Arc::new(
                InMemoryRepository::new()
                    .unique_by("tenants_name_key", |tenant: &Tenant| tenant.name.to_lowercase()),
            ),
            users: Arc::new(
                InMemoryRepository::new()
                    .unique_by("users_username_key", |user: &User| user.username.to_lowercase()),
            ),
            roles: Arc::new(InMemoryRepository::new().unique_by(
                "roles_tenant_name_key",
                |role: &Role| format!("{}/{}", role.tenant_id, role.name.to_lowercase()),
            )),
            role_assignments: Arc::new(InMemoryRepository::new().unique_by(
                "role_user_assignments_role_id_user_id_key",
                |assignment: &RoleUserAssignment| format!("{}/{}", assignment.role_id, assignment.user_id),
            )),
            tenant_assignments: Arc::new(InMemoryRepository::new().unique_by(
                "user_tenant_assignments_user_id_tenant_id_key",
                |assignment: &UserTenantAssignment| {
                    format!("{}/{}", assignment.user_id, assignment.tenant_id)
                },
            )),
            password_blacklist: Arc::new(InMemoryRepository::new().unique_by(
                "password_blacklist_password_key",
                |entry: &PasswordBlacklistEntry| entry.password.to_lowercase(),
            )),
        }
    }
}

impl SecurityStore for InMemorySecurityStore {
    type Tenants = InMemoryRepository<Tenant>;
    type Users = InMemoryRepository<User>;
    type Roles = InMemoryRepository<Role>;
    type RoleAssignments = InMemoryRepository<RoleUserAssignment>;
    type TenantAssignments = InMemoryRepository<UserTenantAssignment>;
    type PasswordBlacklist = InMemoryRepository<PasswordBlacklistEntry>;

    fn tenants(&self) -> Arc<Self::Tenants> {
        Arc::clone(&self.tenants)
    }

    fn users(&self) -> Arc<Self::Users> {
        Arc::clone(&self.users)
    }

    fn roles(&self) -> Arc<Self::Roles> {
        Arc::clone(&self.roles)
    }

    fn role_assignments(&self) -> Arc<Self::RoleAssignments> {
        Arc::clone(&self.role_assignments)
    }

    fn tenant_assignments(&self) -> Arc<Self::TenantAssignments> {
        Arc::clone(&self.tenant_assignments)
    }

    fn password_blacklist(&self) -> Arc<Self::PasswordBlacklist> {
        Arc::clone(&self.password_blacklist)
    }
}
