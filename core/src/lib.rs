//! # Whippet Core
//!
//! Core traits and types for the Whippet integration framework.
//!
//! Business operations are expressed as CQRS messages: immutable commands and
//! queries, each bound to exactly one handler which validates the input and
//! forwards to a repository.
//!
//! ## Core Concepts
//!
//! - **Command / Query**: immutable parameter bags describing what to do
//! - **Handler**: validates one message type and invokes a repository
//! - **Repository**: persistence contract for one entity type
//! - **`WhippetResult`**: success or failure as a value, never a panic
//!
//! ## Example
//!
//! ```ignore
//! use whippet_core::crud::{Create, CreateHandler};
//!
//! let handler = CreateHandler::new(Arc::clone(&tenants));
//! handler.execute(Create::new(tenant)).await?;
//! ```

pub mod cqrs;
pub mod crud;
pub mod environment;
pub mod repository;
pub mod result;

pub use cqrs::{Command, CommandHandler, Query, QueryHandler, QueryParameter};
pub use repository::{Entity, QueryRepository, Repository};
pub use result::{ResultContainerExt, WhippetError, WhippetResult};
