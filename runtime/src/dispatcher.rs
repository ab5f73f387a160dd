//! Type-keyed handler resolution.
//!
//! Each command or query type is bound to exactly one handler at startup.
//! After [`DispatcherBuilder::build`] the registry is immutable, so a
//! [`Dispatcher`] can be wrapped in an `Arc` and shared across tasks without
//! locking.
//!
//! # Example
//!
//! ```ignore
//! let dispatcher = Dispatcher::builder()
//!     .command_handler(CreateHandler::new(Arc::clone(&tenants)))?
//!     .query_handler(GetAllHandler::new(Arc::clone(&tenants)))?
//!     .build();
//!
//! dispatcher.send(Create::new(tenant)).await?;
//! let tenants: Vec<Tenant> = dispatcher.query(GetAll::new()).await?;
//! ```

use futures::future::BoxFuture;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::Instrument;
use whippet_core::cqrs::{Command, CommandHandler, Query, QueryHandler};
use whippet_core::crud::{
    Create, CreateHandler, Delete, DeleteHandler, GetAll, GetAllHandler, GetById, GetByIdHandler,
    Update, UpdateHandler,
};
use whippet_core::repository::{Entity, Repository};
use whippet_core::result::{WhippetError, WhippetResult};

/// Errors raised while wiring handlers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// A handler is already registered for this message type.
    #[error("A handler is already registered for {message_type}")]
    DuplicateHandler {
        /// Fully qualified type name of the command or query
        message_type: &'static str,
    },
}

impl From<DispatchError> for WhippetError {
    fn from(error: DispatchError) -> Self {
        Self::Conflict(error.to_string())
    }
}

/// Object-safe view of a [`CommandHandler`] for one command type.
trait DynCommandHandler<C: Command>: Send + Sync {
    fn execute_boxed(&self, command: C) -> BoxFuture<'_, WhippetResult>;
}

impl<C, H> DynCommandHandler<C> for H
where
    C: Command,
    H: CommandHandler<C>,
{
    fn execute_boxed(&self, command: C) -> BoxFuture<'_, WhippetResult> {
        Box::pin(self.execute(command))
    }
}

/// Object-safe view of a [`QueryHandler`] for one query type.
trait DynQueryHandler<Q: Query>: Send + Sync {
    fn handle_boxed(&self, query: Q) -> BoxFuture<'_, WhippetResult<Vec<Q::Entity>>>;
}

impl<Q, H> DynQueryHandler<Q> for H
where
    Q: Query,
    H: QueryHandler<Q>,
{
    fn handle_boxed(&self, query: Q) -> BoxFuture<'_, WhippetResult<Vec<Q::Entity>>> {
        Box::pin(self.handle(query))
    }
}

/// A registered handler.
///
/// `handler` holds an `Arc<dyn DynCommandHandler<C>>` or an
/// `Arc<dyn DynQueryHandler<Q>>` for the message type the entry is keyed by.
struct Registration {
    message_type: &'static str,
    handler: Box<dyn Any + Send + Sync>,
}

/// Builder collecting handler registrations.
#[derive(Default)]
pub struct DispatcherBuilder {
    commands: HashMap<TypeId, Registration>,
    queries: HashMap<TypeId, Registration>,
}

impl DispatcherBuilder {
    /// Create an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `handler` to command type `C`.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::DuplicateHandler`] if `C` already has a handler.
    pub fn command_handler<C, H>(mut self, handler: H) -> Result<Self, DispatchError>
    where
        C: Command,
        H: CommandHandler<C>,
    {
        let handler: Arc<dyn DynCommandHandler<C>> = Arc::new(handler);
        register::<C>(&mut self.commands, Box::new(handler))?;
        Ok(self)
    }

    /// Bind `handler` to query type `Q`.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::DuplicateHandler`] if `Q` already has a handler.
    pub fn query_handler<Q, H>(mut self, handler: H) -> Result<Self, DispatchError>
    where
        Q: Query,
        H: QueryHandler<Q>,
    {
        let handler: Arc<dyn DynQueryHandler<Q>> = Arc::new(handler);
        register::<Q>(&mut self.queries, Box::new(handler))?;
        Ok(self)
    }

    /// Bind the five generic CRUD handlers for entity `T` over `repository`.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::DuplicateHandler`] if any of the CRUD
    /// messages for `T` already has a handler.
    pub fn crud_handlers<T, R>(self, repository: &Arc<R>) -> Result<Self, DispatchError>
    where
        T: Entity,
        R: Repository<T>,
    {
        self.command_handler::<Create<T>, _>(CreateHandler::new(Arc::clone(repository)))?
            .command_handler::<Update<T>, _>(UpdateHandler::new(Arc::clone(repository)))?
            .command_handler::<Delete<T>, _>(DeleteHandler::new(Arc::clone(repository)))?
            .query_handler::<GetById<T>, _>(GetByIdHandler::new(Arc::clone(repository)))?
            .query_handler::<GetAll<T>, _>(GetAllHandler::new(Arc::clone(repository)))
    }

    /// Freeze the registry.
    #[must_use]
    pub fn build(self) -> Dispatcher {
        tracing::debug!(
            commands = self.commands.len(),
            queries = self.queries.len(),
            "Dispatcher built"
        );
        Dispatcher {
            commands: self.commands,
            queries: self.queries,
        }
    }
}

fn register<M: 'static>(
    table: &mut HashMap<TypeId, Registration>,
    handler: Box<dyn Any + Send + Sync>,
) -> Result<(), DispatchError> {
    let message_type = std::any::type_name::<M>();
    if table.contains_key(&TypeId::of::<M>()) {
        return Err(DispatchError::DuplicateHandler { message_type });
    }
    table.insert(
        TypeId::of::<M>(),
        Registration {
            message_type,
            handler,
        },
    );
    Ok(())
}

/// Routes commands and queries to their registered handlers.
pub struct Dispatcher {
    commands: HashMap<TypeId, Registration>,
    queries: HashMap<TypeId, Registration>,
}

impl Dispatcher {
    /// Start building a dispatcher.
    #[must_use]
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::new()
    }

    /// Validate and handle a command.
    ///
    /// # Errors
    ///
    /// - [`WhippetError::HandlerNotFound`] if no handler is bound to `C`
    /// - Any validation or repository error reported by the handler
    pub async fn send<C: Command>(&self, command: C) -> WhippetResult {
        let message_type = command.name();
        let Some(handler) = self.command_handler::<C>() else {
            record_outcome("command", message_type, "unhandled", Instant::now());
            tracing::warn!(message_type, "No handler registered for command");
            return Err(WhippetError::HandlerNotFound { message_type });
        };

        let span = tracing::info_span!("dispatch_command", message_type);
        let started = Instant::now();
        let result = handler.execute_boxed(command).instrument(span).await;

        record_outcome("command", message_type, outcome(&result), started);
        if let Err(error) = &result {
            tracing::debug!(message_type, error = %error, "Command failed");
        }
        result
    }

    /// Run a query.
    ///
    /// # Errors
    ///
    /// - [`WhippetError::HandlerNotFound`] if no handler is bound to `Q`
    /// - Any repository error reported by the handler
    pub async fn query<Q: Query>(&self, query: Q) -> WhippetResult<Vec<Q::Entity>> {
        let message_type = query.name();
        let Some(handler) = self.query_handler::<Q>() else {
            record_outcome("query", message_type, "unhandled", Instant::now());
            tracing::warn!(message_type, "No handler registered for query");
            return Err(WhippetError::HandlerNotFound { message_type });
        };

        tracing::trace!(message_type, parameters = ?query.parameters(), "Dispatching query");
        let span = tracing::info_span!("dispatch_query", message_type);
        let started = Instant::now();
        let result = handler.handle_boxed(query).instrument(span).await;

        record_outcome("query", message_type, outcome(&result), started);
        result
    }

    /// Whether a handler is bound to command type `C`.
    #[must_use]
    pub fn has_command_handler<C: Command>(&self) -> bool {
        self.commands.contains_key(&TypeId::of::<C>())
    }

    /// Whether a handler is bound to query type `Q`.
    #[must_use]
    pub fn has_query_handler<Q: Query>(&self) -> bool {
        self.queries.contains_key(&TypeId::of::<Q>())
    }

    /// Number of registered handlers (commands and queries).
    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len() + self.queries.len()
    }

    /// Whether no handler is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty() && self.queries.is_empty()
    }

    fn command_handler<C: Command>(&self) -> Option<Arc<dyn DynCommandHandler<C>>> {
        self.commands
            .get(&TypeId::of::<C>())
            .and_then(|registration| registration.handler.downcast_ref::<Arc<dyn DynCommandHandler<C>>>())
            .cloned()
    }

    fn query_handler<Q: Query>(&self) -> Option<Arc<dyn DynQueryHandler<Q>>> {
        self.queries
            .get(&TypeId::of::<Q>())
            .and_then(|registration| registration.handler.downcast_ref::<Arc<dyn DynQueryHandler<Q>>>())
            .cloned()
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut commands: Vec<_> = self.commands.values().map(|r| r.message_type).collect();
        let mut queries: Vec<_> = self.queries.values().map(|r| r.message_type).collect();
        commands.sort_unstable();
        queries.sort_unstable();
        f.debug_struct("Dispatcher")
            .field("commands", &commands)
            .field("queries", &queries)
            .finish()
    }
}

const fn outcome<T>(result: &WhippetResult<T>) -> &'static str {
    match result {
        Ok(_) => "success",
        Err(WhippetError::ArgumentNull { .. } | WhippetError::Validation { .. }) => "invalid",
        Err(_) => "error",
    }
}

fn record_outcome(kind: &'static str, message_type: &'static str, outcome: &'static str, started: Instant) {
    metrics::counter!(
        "whippet_dispatch_total",
        "kind" => kind,
        "message_type" => message_type,
        "outcome" => outcome
    )
    .increment(1);
    metrics::histogram!("whippet_dispatch_duration_seconds", "kind" => kind)
        .record(started.elapsed().as_secs_f64());
}
