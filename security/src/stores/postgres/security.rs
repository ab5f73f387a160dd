//! Table mappings and lookups for the security entities.

use super::{PgEntity, PgQuery, PostgresRepository};
use crate::access_control::{Role, RoleRepository, RoleUserAssignment, RoleUserAssignmentRepository};
use crate::handlers::SecurityStore;
use crate::tenants::{Tenant, TenantRepository, UserTenantAssignment, UserTenantAssignmentRepository};
use crate::users::{PasswordBlacklistEntry, PasswordBlacklistRepository, User, UserRepository};
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;
use whippet_core::result::WhippetResult;
use whippet_data::PostgresConnection;

impl PgEntity for Tenant {
    const TABLE: &'static str = "whippet.tenants";
    const COLUMNS: &'static [&'static str] = &["id", "name", "uri", "active", "created_at"];

    fn bind<'q>(&'q self, query: PgQuery<'q>) -> PgQuery<'q> {
        query
            .bind(self.id)
            .bind(&self.name)
            .bind(&self.uri)
            .bind(self.active)
            .bind(self.created_at)
    }
}

impl PgEntity for User {
    const TABLE: &'static str = "whippet.users";
    const COLUMNS: &'static [&'static str] =
        &["id", "username", "password", "email", "active", "created_at"];

    fn bind<'q>(&'q self, query: PgQuery<'q>) -> PgQuery<'q> {
        query
            .bind(self.id)
            .bind(&self.username)
            .bind(&self.password)
            .bind(&self.email)
            .bind(self.active)
            .bind(self.created_at)
    }
}

impl PgEntity for Role {
    const TABLE: &'static str = "whippet.roles";
    const COLUMNS: &'static [&'static str] = &["id", "tenant_id", "name", "description", "created_at"];

    fn bind<'q>(&'q self, query: PgQuery<'q>) -> PgQuery<'q> {
        query
            .bind(self.id)
            .bind(self.tenant_id)
            .bind(&self.name)
            .bind(&self.description)
            .bind(self.created_at)
    }
}

impl PgEntity for RoleUserAssignment {
    const TABLE: &'static str = "whippet.role_user_assignments";
    const COLUMNS: &'static [&'static str] = &["id", "role_id", "user_id", "created_at"];

    fn bind<'q>(&'q self, query: PgQuery<'q>) -> PgQuery<'q> {
        query
            .bind(self.id)
            .bind(self.role_id)
            .bind(self.user_id)
            .bind(self.created_at)
    }
}

impl PgEntity for UserTenantAssignment {
    const TABLE: &'static str = "whippet.user_tenant_assignments";
    const COLUMNS: &'static [&'static str] = &["id", "user_id", "tenant_id", "created_at"];

    fn bind<'q>(&'q self, query: PgQuery<'q>) -> PgQuery<'q> {
        query
            .bind(self.id)
            .bind(self.user_id)
            .bind(self.tenant_id)
            .bind(self.created_at)
    }
}

impl PgEntity for PasswordBlacklistEntry {
    const TABLE: &'static str = "whippet.password_blacklist";
    const COLUMNS: &'static [&'static str] = &["id", "password", "created_at"];

    fn bind<'q>(&'q self, query: PgQuery<'q>) -> PgQuery<'q> {
        query.bind(self.id).bind(&self.password).bind(self.created_at)
    }
}

impl TenantRepository for PostgresRepository<Tenant> {
    async fn get_by_name(&self, name: &str) -> WhippetResult<Option<Tenant>> {
        Ok(self.find_ignoring_case("name", name).await?.into_iter().next())
    }
}

impl UserTenantAssignmentRepository for PostgresRepository<UserTenantAssignment> {
    async fn get_by_user(&self, user_id: Uuid) -> WhippetResult<Vec<UserTenantAssignment>> {
        self.find_by_uuid("user_id", user_id).await
    }
}

impl UserRepository for PostgresRepository<User> {
    async fn get_by_username(&self, username: &str) -> WhippetResult<Option<User>> {
        Ok(self
            .find_ignoring_case("username", username)
            .await?
            .into_iter()
            .next())
    }
}

impl PasswordBlacklistRepository for PostgresRepository<PasswordBlacklistEntry> {
    async fn find(&self, password: &str) -> WhippetResult<Vec<PasswordBlacklistEntry>> {
        self.find_ignoring_case("password", password).await
    }
}

impl RoleRepository for PostgresRepository<Role> {}

impl RoleUserAssignmentRepository for PostgresRepository<RoleUserAssignment> {
    async fn get_by_user(&self, user_id: Uuid) -> WhippetResult<Vec<RoleUserAssignment>> {
        self.find_by_uuid("user_id", user_id).await
    }
}

/// A [`SecurityStore`] over the `whippet` schema.
#[derive(Debug, Clone)]
pub struct PostgresSecurityStore {
    tenants: Arc<PostgresRepository<Tenant>>,
    users: Arc<PostgresRepository<User>>,
    roles: Arc<PostgresRepository<Role>>,
    role_assignments: Arc<PostgresRepository<RoleUserAssignment>>,
    tenant_assignments: Arc<PostgresRepository<UserTenantAssignment>>,
    password_blacklist: Arc<PostgresRepository<PasswordBlacklistEntry>>,
}

impl PostgresSecurityStore {
    /// Create a store whose repositories share `pool`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self {
            tenants: Arc::new(PostgresRepository::new(pool.clone())),
            users: Arc::new(PostgresRepository::new(pool.clone())),
            roles: Arc::new(PostgresRepository::new(pool.clone())),
            role_assignments: Arc::new(PostgresRepository::new(pool.clone())),
            tenant_assignments: Arc::new(PostgresRepository::new(pool.clone())),
            password_blacklist: Arc::new(PostgresRepository::new(pool)),
        }
    }

    /// Create a store over an open connection's pool.
    #[must_use]
    pub fn from_connection(connection: &PostgresConnection) -> Self {
        Self::new(connection.pool().clone())
    }
}

impl SecurityStore for PostgresSecurityStore {
    type Tenants = PostgresRepository<Tenant>;
    type Users = PostgresRepository<User>;
    type Roles = PostgresRepository<Role>;
    type RoleAssignments = PostgresRepository<RoleUserAssignment>;
    type TenantAssignments = PostgresRepository<UserTenantAssignment>;
    type PasswordBlacklist = PostgresRepository<PasswordBlacklistEntry>;

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
