//! Persistence contracts.
//!
//! Repositories hide where entities live. Handlers only see these traits, so
//! the same handler runs against an in-memory store in tests and PostgreSQL in
//! production.

use crate::result::WhippetResult;
use std::fmt::{Debug, Display};
use std::future::Future;
use std::hash::Hash;

/// A persisted object with a stable identifier.
pub trait Entity: Clone + Debug + Send + Sync + 'static {
    /// Identifier type.
    type Id: Clone + Eq + Hash + Debug + Display + Send + Sync + 'static;

    /// Entity name used in error messages.
    const ENTITY_NAME: &'static str;

    /// The entity's identifier.
    fn id(&self) -> Self::Id;

    /// Check invariants before the entity is written.
    ///
    /// # Errors
    ///
    /// Returns a validation error for the first invalid field.
    fn validate(&self) -> WhippetResult {
        Ok(())
    }
}

/// Read side of a repository.
pub trait QueryRepository<T: Entity>: Send + Sync + 'static {
    /// Look up an entity by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails. A missing entity is
    /// `Ok(None)`.
    fn get(&self, id: &T::Id) -> impl Future<Output = WhippetResult<Option<T>>> + Send;

    /// Load every entity.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    fn get_all(&self) -> impl Future<Output = WhippetResult<Vec<T>>> + Send;
}

/// Read/write repository.
pub trait Repository<T: Entity>: QueryRepository<T> {
    /// Insert a new entity and return it as stored.
    ///
    /// # Errors
    ///
    /// - [`WhippetError::Conflict`](crate::result::WhippetError::Conflict) if
    ///   the id is already taken
    /// - Backing store failure
    fn create(&self, entity: T) -> impl Future<Output = WhippetResult<T>> + Send;

    /// Replace an existing entity and return it as stored.
    ///
    /// # Errors
    ///
    /// - [`WhippetError::NotFound`](crate::result::WhippetError::NotFound) if
    ///   no entity has this id
    /// - Backing store failure
    fn update(&self, entity: T) -> impl Future<Output = WhippetResult<T>> + Send;

    /// Remove an entity.
    ///
    /// # Errors
    ///
    /// - [`WhippetError::NotFound`](crate::result::WhippetError::NotFound) if
    ///   no entity has this id
    /// - Backing store failure
    fn delete(&self, id: &T::Id) -> impl Future<Output = WhippetResult> + Send;
}
