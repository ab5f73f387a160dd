//! Uniform result types for handlers, repositories and installer actions.
//!
//! Expected failures (validation, missing entities, unavailable handlers) are
//! returned as values instead of panicking. Every layer of the framework speaks
//! [`WhippetResult`], so a command handler can forward a repository failure
//! unchanged and an installer step can report it without translation.
//!
//! # Example
//!
//! ```
//! use whippet_core::result::{WhippetError, WhippetResult};
//!
//! fn require_name(name: &str) -> WhippetResult {
//!     if name.trim().is_empty() {
//!         return Err(WhippetError::argument_null("name"));
//!     }
//!     Ok(())
//! }
//!
//! assert!(require_name("root").is_ok());
//! assert!(require_name("  ").unwrap_err().is_validation());
//! ```

use thiserror::Error;

/// Result type used throughout Whippet.
///
/// The payload defaults to `()` for operations that only report success.
pub type WhippetResult<T = ()> = std::result::Result<T, WhippetError>;

/// Errors reported by handlers, repositories and installer actions.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WhippetError {
    /// A required argument was missing or blank.
    #[error("Argument cannot be null or blank: {name}")]
    ArgumentNull {
        /// Name of the missing argument
        name: String,
    },

    /// Input failed validation.
    #[error("Validation failed for {field}: {message}")]
    Validation {
        /// Field that failed validation
        field: String,
        /// Human-readable reason
        message: String,
    },

    /// The requested entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Entity type name
        entity: &'static str,
        /// Identifier that was looked up
        id: String,
    },

    /// The operation conflicts with existing state (duplicate key, etc.).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// No handler is registered for the dispatched message type.
    #[error("No handler registered for {message_type}")]
    HandlerNotFound {
        /// Fully qualified type name of the command or query
        message_type: &'static str,
    },

    /// Repository failure that is not a database error.
    #[error("Repository error: {0}")]
    Repository(String),

    /// Database driver or connection failure.
    #[error("Database error: {0}")]
    Database(String),

    /// Installer step failure.
    #[error("Installer error: {0}")]
    Installer(String),

    /// Several independent failures.
    #[error("{} errors occurred: {}", .0.len(), join_messages(.0))]
    Aggregate(Vec<WhippetError>),
}

fn join_messages(errors: &[WhippetError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl WhippetError {
    /// Create an [`WhippetError::ArgumentNull`] for the named argument.
    #[must_use]
    pub fn argument_null(name: impl Into<String>) -> Self {
        Self::ArgumentNull { name: name.into() }
    }

    /// Create a [`WhippetError::Validation`] error.
    #[must_use]
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a [`WhippetError::NotFound`] error.
    #[must_use]
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Collapse a list of errors into a single error.
    ///
    /// Returns `None` for an empty list, the error itself for a single entry,
    /// and [`WhippetError::Aggregate`] otherwise. Nested aggregates are
    /// flattened so the result never contains an aggregate inside an aggregate.
    #[must_use]
    pub fn aggregate(errors: Vec<WhippetError>) -> Option<Self> {
        let mut flat = Vec::with_capacity(errors.len());
        for error in errors {
            match error {
                Self::Aggregate(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }

        match flat.len() {
            0 => None,
            1 => flat.pop(),
            _ => Some(Self::Aggregate(flat)),
        }
    }

    /// Whether this error is an input problem (blank argument or failed validation).
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::ArgumentNull { .. } | Self::Validation { .. })
    }

    /// Whether this error reports a missing entity.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Reject blank strings with [`WhippetError::ArgumentNull`].
///
/// # Errors
///
/// Returns [`WhippetError::ArgumentNull`] naming `name` when `value` is empty
/// or whitespace.
pub fn require_not_blank(value: &str, name: &str) -> WhippetResult {
    if value.trim().is_empty() {
        Err(WhippetError::argument_null(name))
    } else {
        Ok(())
    }
}

/// Conversions between single-item and enumerable results.
pub trait ResultContainerExt<T> {
    /// Turn a lookup result into a list of zero or one item.
    ///
    /// # Errors
    ///
    /// Propagates the original error unchanged.
    fn into_enumerable(self) -> WhippetResult<Vec<T>>;
}

impl<T> ResultContainerExt<T> for WhippetResult<Option<T>> {
    fn into_enumerable(self) -> WhippetResult<Vec<T>> {
        self.map(|item| item.into_iter().collect())
    }
}
