//! # Whippet Testing
//!
//! Testing utilities for the Whippet framework.
//!
//! This crate provides:
//! - [`FixedClock`] and [`test_clock`] for deterministic timestamps
//! - [`InMemoryRepository`], a repository for any entity backed by memory
//! - [`init_test_tracing`] so failing tests print their logs
//!
//! ## Example
//!
//! ```ignore
//! use whippet_testing::{InMemoryRepository, test_clock};
//!
//! #[tokio::test]
//! async fn creates_tenant() {
//!     let tenants = Arc::new(InMemoryRepository::<Tenant>::new());
//!     let handler = CreateHandler::new(Arc::clone(&tenants));
//!
//!     handler
//!         .execute(Create::new(Tenant::new("acme", &test_clock())))
//!         .await
//!         .unwrap();
//!
//!     assert_eq!(tenants.len(), 1);
//! }
//! ```

use chrono::{DateTime, Utc};
use whippet_core::environment::Clock;

mod repository_mocks;

pub use repository_mocks::InMemoryRepository;

/// Mock implementations of environment traits.
pub mod mocks {
    use super::{Clock, DateTime, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use whippet_testing::mocks::FixedClock;
    /// use whippet_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(DateTime::<Utc>::UNIX_EPOCH + chrono::Duration::days(20_089))
    }
}

/// Install a test-writer tracing subscriber once per test binary.
///
/// Honours `RUST_LOG`; defaults to `debug` for Whippet crates. Later calls
/// are ignored.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,whippet=debug".into()),
        )
        .with_test_writer()
        .try_init();
}

pub use mocks::{FixedClock, test_clock};
