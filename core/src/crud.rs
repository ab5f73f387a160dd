//! Generic create/update/delete commands and get-by-id/get-all queries.
//!
//! Most entities only need the five standard operations. Rather than one
//! command type and one handler type per entity, these are generic over the
//! entity and over any [`Repository`] that stores it.
//!
//! # Example
//!
//! ```ignore
//! let handler = CreateHandler::new(Arc::clone(&tenants));
//! handler.execute(Create::new(Tenant::new("acme", &clock))).await?;
//! ```

use crate::cqrs::{Command, CommandHandler, Query, QueryHandler, QueryParameter};
use crate::repository::{Entity, QueryRepository, Repository};
use crate::result::{ResultContainerExt, WhippetResult};
use serde_json::Value;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Insert a new entity.
#[derive(Debug, Clone)]
pub struct Create<T: Entity> {
    /// Entity to insert
    pub entity: T,
}

impl<T: Entity> Create<T> {
    /// Wrap an entity in a create command.
    #[must_use]
    pub const fn new(entity: T) -> Self {
        Self { entity }
    }
}

impl<T: Entity> Command for Create<T> {}

/// Replace an existing entity.
#[derive(Debug, Clone)]
pub struct Update<T: Entity> {
    /// Entity carrying the new state
    pub entity: T,
}

impl<T: Entity> Update<T> {
    /// Wrap an entity in an update command.
    #[must_use]
    pub const fn new(entity: T) -> Self {
        Self { entity }
    }
}

impl<T: Entity> Command for Update<T> {}

/// Remove an entity by id.
#[derive(Debug, Clone)]
pub struct Delete<T: Entity> {
    /// Id of the entity to remove
    pub id: T::Id,
}

impl<T: Entity> Delete<T> {
    /// Create a delete command.
    #[must_use]
    pub const fn new(id: T::Id) -> Self {
        Self { id }
    }
}

impl<T: Entity> Command for Delete<T> {}

/// Look up one entity by id.
#[derive(Debug, Clone)]
pub struct GetById<T: Entity> {
    /// Id to look up
    pub id: T::Id,
}

impl<T: Entity> GetById<T> {
    /// Create a get-by-id query.
    #[must_use]
    pub const fn new(id: T::Id) -> Self {
        Self { id }
    }
}

impl<T: Entity> Query for GetById<T> {
    type Entity = T;

    fn parameters(&self) -> Vec<QueryParameter> {
        vec![("id", Value::String(self.id.to_string()))]
    }
}

/// Load every entity of a type.
pub struct GetAll<T: Entity> {
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> GetAll<T> {
    /// Create a get-all query.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _entity: PhantomData,
        }
    }
}

impl<T: Entity> Default for GetAll<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Entity> Clone for GetAll<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T: Entity> fmt::Debug for GetAll<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GetAll<{}>", T::ENTITY_NAME)
    }
}

impl<T: Entity> Query for GetAll<T> {
    type Entity = T;
}

/// Handles [`Create`] for any repository.
#[derive(Debug)]
pub struct CreateHandler<R> {
    repository: Arc<R>,
}

impl<R> CreateHandler<R> {
    /// Create a handler over `repository`.
    #[must_use]
    pub const fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }
}

impl<T, R> CommandHandler<Create<T>> for CreateHandler<R>
where
    T: Entity,
    R: Repository<T>,
{
    fn validate(&self, command: &Create<T>) -> WhippetResult {
        command.entity.validate()
    }

    async fn handle(&self, command: Create<T>) -> WhippetResult {
        self.repository.create(command.entity).await.map(|_| ())
    }
}

/// Handles [`Update`] for any repository.
#[derive(Debug)]
pub struct UpdateHandler<R> {
    repository: Arc<R>,
}

impl<R> UpdateHandler<R> {
    /// Create a handler over `repository`.
    #[must_use]
    pub const fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }
}

impl<T, R> CommandHandler<Update<T>> for UpdateHandler<R>
where
    T: Entity,
    R: Repository<T>,
{
    fn validate(&self, command: &Update<T>) -> WhippetResult {
        command.entity.validate()
    }

    async fn handle(&self, command: Update<T>) -> WhippetResult {
        self.repository.update(command.entity).await.map(|_| ())
    }
}

/// Handles [`Delete`] for any repository.
#[derive(Debug)]
pub struct DeleteHandler<R> {
    repository: Arc<R>,
}

impl<R> DeleteHandler<R> {
    /// Create a handler over `repository`.
    #[must_use]
    pub const fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }
}

impl<T, R> CommandHandler<Delete<T>> for DeleteHandler<R>
where
    T: Entity,
    R: Repository<T>,
{
    async fn handle(&self, command: Delete<T>) -> WhippetResult {
        self.repository.delete(&command.id).await
    }
}

/// Handles [`GetById`] for any repository.
#[derive(Debug)]
pub struct GetByIdHandler<R> {
    repository: Arc<R>,
}

impl<R> GetByIdHandler<R> {
    /// Create a handler over `repository`.
    #[must_use]
    pub const fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }
}

impl<T, R> QueryHandler<GetById<T>> for GetByIdHandler<R>
where
    T: Entity,
    R: QueryRepository<T>,
{
    async fn handle(&self, query: GetById<T>) -> WhippetResult<Vec<T>> {
        self.repository.get(&query.id).await.into_enumerable()
    }
}

/// Handles [`GetAll`] for any repository.
#[derive(Debug)]
pub struct GetAllHandler<R> {
    repository: Arc<R>,
}

impl<R> GetAllHandler<R> {
    /// Create a handler over `repository`.
    #[must_use]
    pub const fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }
}

impl<T, R> QueryHandler<GetAll<T>> for GetAllHandler<R>
where
    T: Entity,
    R: QueryRepository<T>,
{
    async fn handle(&self, _query: GetAll<T>) -> WhippetResult<Vec<T>> {
        self.repository.get_all().await
    }
}
