//! Generic `PostgreSQL` repository for entities keyed by UUID.
//!
//! An entity describes its table through [`PgEntity`]; [`PostgresRepository`]
//! then provides the whole [`Repository`] contract with runtime-built
//! statements. Unique violations surface as
//! [`whippet_core::WhippetError::Conflict`], missing rows on update and delete
//! as [`whippet_core::WhippetError::NotFound`].
//!
//! Rows are returned ordered by `created_at`, then `id`, so every mapped
//! table needs both columns.

use crate::error::DataError;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{Encode, FromRow, PgPool, Postgres, Type};
use std::fmt;
use std::marker::PhantomData;
use uuid::Uuid;
use whippet_core::repository::{Entity, QueryRepository, Repository};
use whippet_core::result::{WhippetError, WhippetResult};

/// Bind query used by [`PgEntity::bind`].
pub type PgQuery<'q> = Query<'q, Postgres, PgArguments>;

/// Table mapping for an entity stored by [`PostgresRepository`].
pub trait PgEntity: Entity<Id = Uuid> + for<'r> FromRow<'r, PgRow> + Unpin {
    /// Schema-qualified table name.
    const TABLE: &'static str;

    /// Column names, `id` first.
    const COLUMNS: &'static [&'static str];

    /// Bind every column value, in [`PgEntity::COLUMNS`] order.
    fn bind<'q>(&'q self, query: PgQuery<'q>) -> PgQuery<'q>;
}

/// Generic `PostgreSQL` repository for any [`PgEntity`].
pub struct PostgresRepository<T> {
    pool: PgPool,
    _entity: PhantomData<fn() -> T>,
}

impl<T: PgEntity> PostgresRepository<T> {
    /// Create a repository over `pool`.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self {
            pool,
            _entity: PhantomData,
        }
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Rows where `column` equals `value`, ignoring case.
    ///
    /// # Errors
    ///
    /// Returns [`WhippetError::Database`] if the query fails.
    pub async fn find_ignoring_case(&self, column: &str, value: &str) -> WhippetResult<Vec<T>> {
        self.fetch_where(&format!("lower({column}) = lower($1)"), value).await
    }

    /// Rows where `column` equals `value`.
    ///
    /// # Errors
    ///
    /// Returns [`WhippetError::Database`] if the query fails.
    pub async fn find_by_uuid(&self, column: &str, value: Uuid) -> WhippetResult<Vec<T>> {
        self.fetch_where(&format!("{column} = $1"), value).await
    }

    /// Rows under `parent` whose `column` equals `value`, ignoring case.
    ///
    /// Serves lookups scoped to a parent row, such as a setting by name
    /// within its group.
    ///
    /// # Errors
    ///
    /// Returns [`WhippetError::Database`] if the query fails.
    pub async fn find_in_parent_ignoring_case(
        &self,
        parent_column: &str,
        parent: Uuid,
        column: &str,
        value: &str,
    ) -> WhippetResult<Vec<T>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE {parent_column} = $1 AND lower({column}) = lower($2) \
             ORDER BY created_at, id",
            column_list::<T>(),
            T::TABLE
        );
        sqlx::query_as::<_, T>(&sql)
            .bind(parent)
            .bind(value)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)
    }

    async fn fetch_where<V>(&self, condition: &str, value: V) -> WhippetResult<Vec<T>>
    where
        V: for<'q> Encode<'q, Postgres> + Type<Postgres> + Send,
    {
        let sql = format!(
            "SELECT {} FROM {} WHERE {condition} ORDER BY created_at, id",
            column_list::<T>(),
            T::TABLE
        );
        sqlx::query_as::<_, T>(&sql)
            .bind(value)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)
    }
}

impl<T> Clone for PostgresRepository<T> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            _entity: PhantomData,
        }
    }
}

impl<T: PgEntity> fmt::Debug for PostgresRepository<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgresRepository")
            .field("table", &T::TABLE)
            .finish_non_exhaustive()
    }
}

impl<T: PgEntity> QueryRepository<T> for PostgresRepository<T> {
    async fn get(&self, id: &Uuid) -> WhippetResult<Option<T>> {
        let sql = format!("SELECT {} FROM {} WHERE id = $1", column_list::<T>(), T::TABLE);
        sqlx::query_as::<_, T>(&sql)
            .bind(*id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)
    }

    async fn get_all(&self) -> WhippetResult<Vec<T>> {
        let sql = format!(
            "SELECT {} FROM {} ORDER BY created_at, id",
            column_list::<T>(),
            T::TABLE
        );
        sqlx::query_as::<_, T>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)
    }
}

impl<T: PgEntity> Repository<T> for PostgresRepository<T> {
    async fn create(&self, entity: T) -> WhippetResult<T> {
        let sql = insert_sql::<T>();
        entity
            .bind(sqlx::query(&sql))
            .execute(&self.pool)
            .await
            .map_err(db_error)?;

        tracing::debug!(entity = T::ENTITY_NAME, id = %entity.id(), "Entity created");
        Ok(entity)
    }

    async fn update(&self, entity: T) -> WhippetResult<T> {
        let sql = update_sql::<T>();
        let result = entity
            .bind(sqlx::query(&sql))
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        if result.rows_affected() == 0 {
            return Err(WhippetError::not_found(T::ENTITY_NAME, entity.id()));
        }

        tracing::debug!(entity = T::ENTITY_NAME, id = %entity.id(), "Entity updated");
        Ok(entity)
    }

    async fn delete(&self, id: &Uuid) -> WhippetResult {
        let sql = format!("DELETE FROM {} WHERE id = $1", T::TABLE);
        let result = sqlx::query(&sql)
            .bind(*id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        if result.rows_affected() == 0 {
            return Err(WhippetError::not_found(T::ENTITY_NAME, id));
        }

        tracing::debug!(entity = T::ENTITY_NAME, %id, "Entity deleted");
        Ok(())
    }
}

fn column_list<T: PgEntity>() -> String {
    T::COLUMNS.join(", ")
}

fn insert_sql<T: PgEntity>() -> String {
    let placeholders = (1..=T::COLUMNS.len())
        .map(|n| format!("${n}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "INSERT INTO {} ({}) VALUES ({placeholders})",
        T::TABLE,
        column_list::<T>()
    )
}

fn update_sql<T: PgEntity>() -> String {
    let assignments = T::COLUMNS
        .iter()
        .enumerate()
        .skip(1)
        .map(|(index, column)| format!("{column} = ${}", index + 1))
        .collect::<Vec<_>>()
        .join(", ");
    format!("UPDATE {} SET {assignments} WHERE id = $1", T::TABLE)
}

fn db_error(error: sqlx::Error) -> WhippetError {
    DataError::from(error).into()
}
