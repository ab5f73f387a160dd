//! Property tests for backoff delays.

use proptest::prelude::*;
use std::time::Duration;
use whippet_runtime::RetryPolicy;

proptest! {
    #[test]
    fn base_delay_never_exceeds_cap(
        initial_ms in 1u64..5_000,
        cap_ms in 1u64..60_000,
        multiplier in 1.0f64..10.0,
        attempt in 0u32..64,
    ) {
        let policy = RetryPolicy::builder()
            .initial_delay(Duration::from_millis(initial_ms))
            .max_delay(Duration::from_millis(cap_ms))
            .multiplier(multiplier)
            .build();

        prop_assert!(policy.base_delay(attempt) <= Duration::from_millis(cap_ms));
    }

    #[test]
    fn base_delay_is_monotonic(
        initial_ms in 1u64..1_000,
        multiplier in 1.0f64..4.0,
        attempt in 0u32..32,
    ) {
        let policy = RetryPolicy::builder()
            .initial_delay(Duration::from_millis(initial_ms))
            .max_delay(Duration::from_secs(3_600))
            .multiplier(multiplier)
            .build();

        prop_assert!(policy.base_delay(attempt) <= policy.base_delay(attempt + 1));
    }

    #[test]
    fn jittered_delay_is_at_least_half(attempt in 0u32..16) {
        let policy = RetryPolicy::builder()
            .initial_delay(Duration::from_millis(50))
            .max_delay(Duration::from_secs(5))
            .build();

        let base = policy.base_delay(attempt);
        let jittered = policy.delay_for_attempt(attempt);
        prop_assert!(jittered <= base);
        prop_assert!(jittered >= base / 2 - Duration::from_nanos(1));
    }
}
