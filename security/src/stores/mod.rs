//! Persistent storage implementations.
//!
//! In-memory stores for tests live in [`crate::mocks`].

#[cfg(feature = "postgres")]
pub mod postgres;
