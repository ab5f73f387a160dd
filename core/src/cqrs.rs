//! Commands, queries and the handlers bound to them.
//!
//! A command is an immutable request to change state; a query is an immutable
//! request to read it. Each message type is served by exactly one handler,
//! which validates the input and forwards to a repository.
//!
//! Handlers never panic on bad input: validation failures come back as
//! [`WhippetError`](crate::result::WhippetError) values.

use crate::result::WhippetResult;
use serde_json::Value;
use std::fmt::Debug;
use std::future::Future;

/// A named query parameter and its value, used for logging and diagnostics.
pub type QueryParameter = (&'static str, Value);

/// Immutable write request.
pub trait Command: Debug + Send + Sync + 'static {
    /// Name used in logs and metrics.
    ///
    /// Defaults to the fully qualified type name.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Immutable read request.
///
/// Query handlers always answer with a list of [`Query::Entity`]; lookups by
/// key return zero or one element.
pub trait Query: Debug + Send + Sync + 'static {
    /// Entity type returned by this query.
    type Entity: Send + 'static;

    /// Name used in logs and metrics.
    ///
    /// Defaults to the fully qualified type name.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Named parameters of this query.
    ///
    /// Queries without parameters keep the default empty list.
    fn parameters(&self) -> Vec<QueryParameter> {
        Vec::new()
    }
}

/// Handler bound to a single command type.
///
/// # Example
///
/// ```
/// use whippet_core::cqrs::{Command, CommandHandler};
/// use whippet_core::result::{require_not_blank, WhippetResult};
///
/// #[derive(Debug)]
/// struct RenameTenant {
///     name: String,
/// }
///
/// impl Command for RenameTenant {}
///
/// struct RenameTenantHandler;
///
/// impl CommandHandler<RenameTenant> for RenameTenantHandler {
///     fn validate(&self, command: &RenameTenant) -> WhippetResult {
///         require_not_blank(&command.name, "name")
///     }
///
///     async fn handle(&self, _command: RenameTenant) -> WhippetResult {
///         Ok(())
///     }
/// }
/// ```
pub trait CommandHandler<C: Command>: Send + Sync + 'static {
    /// Check the command before any repository is touched.
    ///
    /// # Errors
    ///
    /// Returns a validation error describing the first invalid field.
    fn validate(&self, command: &C) -> WhippetResult {
        let _ = command;
        Ok(())
    }

    /// Perform the command.
    ///
    /// Callers are expected to go through [`CommandHandler::execute`], which
    /// runs [`CommandHandler::validate`] first.
    ///
    /// # Errors
    ///
    /// Returns the repository failure that prevented the command.
    fn handle(&self, command: C) -> impl Future<Output = WhippetResult> + Send;

    /// Validate then handle.
    ///
    /// # Errors
    ///
    /// Returns the validation error, or the error produced by
    /// [`CommandHandler::handle`].
    fn execute(&self, command: C) -> impl Future<Output = WhippetResult> + Send {
        async move {
            self.validate(&command)?;
            self.handle(command).await
        }
    }
}

/// Handler bound to a single query type.
pub trait QueryHandler<Q: Query>: Send + Sync + 'static {
    /// Run the query.
    ///
    /// # Errors
    ///
    /// Returns the repository failure that prevented the read.
    fn handle(&self, query: Q) -> impl Future<Output = WhippetResult<Vec<Q::Entity>>> + Send;
}
