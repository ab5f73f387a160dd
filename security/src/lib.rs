//! # Whippet Security
//!
//! Security administration for Whippet: tenants, users, roles, role and
//! tenant memberships, and the password blacklist.
//!
//! Every entity gets the generic create/update/delete commands and
//! get-by-id/get-all queries from [`whippet_core::crud`]. The lookups the
//! administration screens need (tenant by name, user by name, memberships of
//! a user, blacklist check) have dedicated queries. [`register_handlers`]
//! binds all of them to a [`whippet_runtime::Dispatcher`].
//!
//! ## Features
//!
//! - `test-utils` (default): in-memory repositories ([`mocks`])
//! - `postgres`: repositories over the `whippet` schema ([`stores::postgres`])
//!
//! ## Example
//!
//! ```ignore
//! use whippet_security::{register_handlers, GetTenantByName};
//! use whippet_runtime::Dispatcher;
//!
//! let dispatcher = register_handlers(Dispatcher::builder(), &store)?.build();
//! let tenants = dispatcher.query(GetTenantByName::new("Root")).await?;
//! ```

pub mod access_control;
pub mod handlers;
pub mod seed;
pub mod stores;
pub mod tenants;
pub mod users;

#[cfg(feature = "test-utils")]
pub mod mocks;

// Re-exports
pub use access_control::{
    GetRoleUserAssignmentsByUser, Role, RoleRepository, RoleUserAssignment,
    RoleUserAssignmentRepository,
};
pub use handlers::{SecurityStore, register_handlers};
pub use seed::RootTenantSeeder;
pub use tenants::{
    GetTenantByName, GetUserTenantAssignmentsByUser, Tenant, TenantRepository, UserTenantAssignment,
    UserTenantAssignmentRepository,
};
pub use users::{
    GetUserByUsername, IsPasswordBlacklisted, PasswordBlacklistEntry, PasswordBlacklistRepository,
    User, UserRepository,
};
