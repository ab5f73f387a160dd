//! Wiring of every security handler into a dispatcher.
//!
//! Each entity gets the five generic CRUD handlers; the lookups specific to
//! security administration are registered alongside them.

use crate::access_control::{
    GetRoleUserAssignmentsByUser, GetRoleUserAssignmentsByUserHandler, Role, RoleRepository,
    RoleUserAssignment, RoleUserAssignmentRepository,
};
use crate::tenants::{
    GetTenantByName, GetTenantByNameHandler, GetUserTenantAssignmentsByUser,
    GetUserTenantAssignmentsByUserHandler, Tenant, TenantRepository, UserTenantAssignment,
    UserTenantAssignmentRepository,
};
use crate::users::{
    GetUserByUsername, GetUserByUsernameHandler, IsPasswordBlacklisted, IsPasswordBlacklistedHandler,
    PasswordBlacklistEntry, PasswordBlacklistRepository, User, UserRepository,
};
use std::sync::Arc;
use whippet_runtime::{DispatchError, DispatcherBuilder};

/// The repositories behind security administration.
pub trait SecurityStore {
    /// Tenant storage
    type Tenants: TenantRepository;
    /// User storage
    type Users: UserRepository;
    /// Role storage
    type Roles: RoleRepository;
    /// Role membership storage
    type RoleAssignments: RoleUserAssignmentRepository;
    /// Tenant membership storage
    type TenantAssignments: UserTenantAssignmentRepository;
    /// Password blacklist storage
    type PasswordBlacklist: PasswordBlacklistRepository;

    /// Tenant repository.
    fn tenants(&self) -> Arc<Self::Tenants>;
    /// User repository.
    fn users(&self) -> Arc<Self::Users>;
    /// Role repository.
    fn roles(&self) -> Arc<Self::Roles>;
    /// Role membership repository.
    fn role_assignments(&self) -> Arc<Self::RoleAssignments>;
    /// Tenant membership repository.
    fn tenant_assignments(&self) -> Arc<Self::TenantAssignments>;
    /// Password blacklist repository.
    fn password_blacklist(&self) -> Arc<Self::PasswordBlacklist>;
}

/// Register every security command and query handler backed by `store`.
///
/// # Errors
///
/// Returns [`DispatchError::DuplicateHandler`] if `builder` already serves
/// one of the security messages.
pub fn register_handlers<S: SecurityStore>(
    builder: DispatcherBuilder,
    store: &S,
) -> Result<DispatcherBuilder, DispatchError> {
    let tenants = store.tenants();
    let users = store.users();
    let role_assignments = store.role_assignments();
    let tenant_assignments = store.tenant_assignments();
    let blacklist = store.password_blacklist();

    let builder = builder
        .crud_handlers::<Tenant, _>(&tenants)?
        .crud_handlers::<User, _>(&users)?
        .crud_handlers::<Role, _>(&store.roles())?
        .crud_handlers::<RoleUserAssignment, _>(&role_assignments)?
        .crud_handlers::<UserTenantAssignment, _>(&tenant_assignments)?
        .crud_handlers::<PasswordBlacklistEntry, _>(&blacklist)?
        .query_handler::<GetTenantByName, _>(GetTenantByNameHandler::new(tenants))?
        .query_handler::<GetUserByUsername, _>(GetUserByUsernameHandler::new(users))?
        .query_handler::<GetRoleUserAssignmentsByUser, _>(GetRoleUserAssignmentsByUserHandler::new(
            role_assignments,
        ))?
        .query_handler::<GetUserTenantAssignmentsByUser, _>(
            GetUserTenantAssignmentsByUserHandler::new(tenant_assignments),
        )?
        .query_handler::<IsPasswordBlacklisted, _>(IsPasswordBlacklistedHandler::new(blacklist))?;

    tracing::debug!("Security handlers registered");
    Ok(builder)
}
