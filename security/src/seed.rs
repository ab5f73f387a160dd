//! Seed data every installation starts with.

use crate::tenants::{Tenant, TenantRepository};
use std::sync::Arc;
use whippet_core::environment::Clock;
use whippet_core::repository::QueryRepository;
use whippet_core::result::WhippetResult;

/// Creates the root tenant unless it already exists.
#[derive(Debug)]
pub struct RootTenantSeeder<R, C> {
    tenants: Arc<R>,
    clock: C,
}

impl<R: TenantRepository, C: Clock> RootTenantSeeder<R, C> {
    /// Create a seeder writing to `tenants`.
    #[must_use]
    pub const fn new(tenants: Arc<R>, clock: C) -> Self {
        Self { tenants, clock }
    }

    /// Insert the root tenant if missing.
    ///
    /// Returns `true` when the tenant was created and `false` when it was
    /// already there, so running the seeder twice is harmless.
    ///
    /// # Errors
    ///
    /// Returns the repository failure.
    pub async fn seed(&self) -> WhippetResult<bool> {
        if self.tenants.get(&Tenant::ROOT_ID).await?.is_some() {
            tracing::debug!("Root tenant already present");
            return Ok(false);
        }

        let root = self.tenants.create(Tenant::root(&self.clock)).await?;
        tracing::info!(tenant_id = %root.id, name = %root.name, "Root tenant created");
        Ok(true)
    }
}

#[cfg(all(test, feature = "test-utils"))]
mod tests {
    #![allow(clippy::unwrap_used)] // Test code

    use super::*;
    use whippet_core::result::WhippetError;
    use whippet_testing::{InMemoryRepository, test_clock};

    #[tokio::test]
    async fn seeds_root_tenant_once() {
        let tenants = Arc::new(InMemoryRepository::<Tenant>::new());
        let seeder = RootTenantSeeder::new(Arc::clone(&tenants), test_clock());

        assert!(seeder.seed().await.unwrap());
        assert!(!seeder.seed().await.unwrap());

        let rows = tenants.snapshot();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].is_root());
        assert_eq!(rows[0].created_at, test_clock().now());
    }

    #[tokio::test]
    async fn surfaces_repository_failure() {
        let tenants = Arc::new(InMemoryRepository::<Tenant>::new());
        tenants.fail_with(WhippetError::Database("offline".to_string()));
        let seeder = RootTenantSeeder::new(Arc::clone(&tenants), test_clock());

        assert_eq!(
            seeder.seed().await,
            Err(WhippetError::Database("offline".to_string()))
        );
    }
}
