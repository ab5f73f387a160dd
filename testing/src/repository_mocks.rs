//! In-memory repository for handler and installer tests.
//!
//! [`InMemoryRepository`] implements the core repository contracts for any
//! entity, keeping rows in insertion order so `get_all` is deterministic.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Panics only on a poisoned lock

use std::fmt;
use std::sync::{Arc, RwLock};
use whippet_core::repository::{Entity, QueryRepository, Repository};
use whippet_core::result::{WhippetError, WhippetResult};

/// In-memory repository for fast, deterministic testing.
///
/// Clones share the same rows, so a test can keep a handle while handlers
/// own another.
///
/// # Example
///
/// ```ignore
/// let tenants = Arc::new(InMemoryRepository::<Tenant>::new());
/// let handler = CreateHandler::new(Arc::clone(&tenants));
/// handler.execute(Create::new(tenant)).await?;
/// assert_eq!(tenants.len(), 1);
/// ```
pub struct InMemoryRepository<T: Entity> {
    rows: Arc<RwLock<Vec<T>>>,
    failure: Arc<RwLock<Option<WhippetError>>>,
    unique: Vec<UniqueKey<T>>,
}

type KeyFn<T> = Arc<dyn Fn(&T) -> String + Send + Sync>;

/// A unique index enforced on create and update.
struct UniqueKey<T> {
    constraint: &'static str,
    key: KeyFn<T>,
}

impl<T> Clone for UniqueKey<T> {
    fn clone(&self) -> Self {
        Self {
            constraint: self.constraint,
            key: Arc::clone(&self.key),
        }
    }
}

impl<T: Entity> InMemoryRepository<T> {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rows: Arc::new(RwLock::new(Vec::new())),
            failure: Arc::new(RwLock::new(None)),
            unique: Vec::new(),
        }
    }

    /// Reject rows whose `key` equals the key of another row.
    ///
    /// Mirrors a unique index of the database schema; the conflict names
    /// `constraint` the way the database error does. Fold case in `key` for
    /// indexes over `lower(column)`.
    #[must_use]
    pub fn unique_by(
        mut self,
        constraint: &'static str,
        key: impl Fn(&T) -> String + Send + Sync + 'static,
    ) -> Self {
        self.unique.push(UniqueKey {
            constraint,
            key: Arc::new(key),
        });
        self
    }

    /// Create a repository pre-populated with `rows`.
    #[must_use]
    pub fn with_rows(rows: impl IntoIterator<Item = T>) -> Self {
        let repository = Self::new();
        repository.rows.write().unwrap().extend(rows);
        repository
    }

    /// Make every following call fail with `error` until [`Self::recover`].
    pub fn fail_with(&self, error: WhippetError) {
        *self.failure.write().unwrap() = Some(error);
    }

    /// Stop injecting failures.
    pub fn recover(&self) {
        *self.failure.write().unwrap() = None;
    }

    /// Number of stored rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.read().unwrap().len()
    }

    /// Whether the repository is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.read().unwrap().is_empty()
    }

    /// Snapshot of every stored row.
    #[must_use]
    pub fn snapshot(&self) -> Vec<T> {
        self.rows.read().unwrap().clone()
    }

    /// Rows matching `predicate`, in insertion order.
    ///
    /// Building block for entity-specific lookups in mocks.
    ///
    /// # Errors
    ///
    /// Returns the injected failure, if any.
    pub fn find(&self, predicate: impl Fn(&T) -> bool) -> WhippetResult<Vec<T>> {
        self.check()?;
        Ok(self
            .rows
            .read()
            .unwrap()
            .iter()
            .filter(|row| predicate(row))
            .cloned()
            .collect())
    }

    fn check_unique(&self, rows: &[T], entity: &T) -> WhippetResult {
        let id = entity.id();
        for unique in &self.unique {
            let key = (unique.key)(entity);
            if rows
                .iter()
                .any(|row| row.id() != id && (unique.key)(row) == key)
            {
                return Err(WhippetError::Conflict(format!(
                    "duplicate key value violates unique constraint \"{}\"",
                    unique.constraint
                )));
            }
        }
        Ok(())
    }

    fn check(&self) -> WhippetResult {
        match self.failure.read().unwrap().as_ref() {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

impl<T: Entity> Clone for InMemoryRepository<T> {
    fn clone(&self) -> Self {
        Self {
            rows: Arc::clone(&self.rows),
            failure: Arc::clone(&self.failure),
            unique: self.unique.clone(),
        }
    }
}

impl<T: Entity> fmt::Debug for InMemoryRepository<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryRepository")
            .field("entity", &T::ENTITY_NAME)
            .field("rows", &self.len())
            .field(
                "unique",
                &self.unique.iter().map(|unique| unique.constraint).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl<T: Entity> Default for InMemoryRepository<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Entity> QueryRepository<T> for InMemoryRepository<T> {
    async fn get(&self, id: &T::Id) -> WhippetResult<Option<T>> {
        self.check()?;
        Ok(self
            .rows
            .read()
            .unwrap()
            .iter()
            .find(|row| row.id() == *id)
            .cloned())
    }

    async fn get_all(&self) -> WhippetResult<Vec<T>> {
        self.check()?;
        Ok(self.snapshot())
    }
}

impl<T: Entity> Repository<T> for InMemoryRepository<T> {
    async fn create(&self, entity: T) -> WhippetResult<T> {
        self.check()?;
        let mut rows = self.rows.write().unwrap();
        let id = entity.id();
        if rows.iter().any(|row| row.id() == id) {
            return Err(WhippetError::Conflict(format!(
                "{} {id} already exists",
                T::ENTITY_NAME
            )));
        }
        self.check_unique(&rows, &entity)?;
        rows.push(entity.clone());
        Ok(entity)
    }

    async fn update(&self, entity: T) -> WhippetResult<T> {
        self.check()?;
        let mut rows = self.rows.write().unwrap();
        let id = entity.id();
        if rows.iter().any(|row| row.id() == id) {
            self.check_unique(&rows, &entity)?;
        }
        let slot = rows
            .iter_mut()
            .find(|row| row.id() == id)
            .ok_or_else(|| WhippetError::not_found(T::ENTITY_NAME, &id))?;
        *slot = entity.clone();
        Ok(entity)
    }

    async fn delete(&self, id: &T::Id) -> WhippetResult {
        self.check()?;
        let mut rows = self.rows.write().unwrap();
        let before = rows.len();
        rows.retain(|row| row.id() != *id);
        if rows.len() == before {
            return Err(WhippetError::not_found(T::ENTITY_NAME, id));
        }
        Ok(())
    }
}
