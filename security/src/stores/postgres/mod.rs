//! `PostgreSQL` storage implementations.
//!
//! Every security entity lives in one table of the `whippet` schema created
//! by the installer. The generic [`PostgresRepository`] serves them all; each
//! entity only describes its table through [`PgEntity`].
//!
//! # Example
//!
//! ```no_run
//! use whippet_security::stores::postgres::PostgresSecurityStore;
//! use sqlx::PgPool;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = PgPool::connect("postgresql://localhost/whippet").await?;
//! let store = PostgresSecurityStore::new(pool);
//! # Ok(())
//! # }
//! ```

mod security;

pub use security::PostgresSecurityStore;
pub use whippet_data::repository::{PgEntity, PgQuery, PostgresRepository};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tenants::Tenant;
    use crate::users::User;

    #[test]
    fn security_tables_live_in_the_whippet_schema() {
        assert_eq!(Tenant::TABLE, "whippet.tenants");
        assert_eq!(Tenant::COLUMNS[0], "id");
        assert_eq!(User::TABLE, "whippet.users");
        assert_eq!(User::COLUMNS.len(), 6);
    }
}
