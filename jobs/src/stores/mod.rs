//! Persistent storage implementations.

#[cfg(feature = "postgres")]
pub mod postgres;
