//! Debug assertion macros for the ring's cursor invariants.
//!
//! Only active in debug builds, so there is zero overhead in release
//! builds. All arithmetic fed into these macros is 32-bit wrapping, which
//! is exactly why the checks live here and not in the hot path proper.

/// Assert that occupancy never exceeds the accessible capacity.
///
/// After a granted reservation, the distance from the opposing tail to the
/// new head must still fit in `mask` slots (one slot always stays free).
macro_rules! debug_assert_occupancy_bounded {
    ($occupied:expr, $mask:expr) => {
        debug_assert!(
            $occupied <= $mask,
            "occupancy {} exceeds accessible capacity {}",
            $occupied,
            $mask
        )
    };
}

/// Assert that a claim never grants more than was available.
macro_rules! debug_assert_claim_within_available {
    ($n:expr, $available:expr) => {
        debug_assert!(
            $n <= $available,
            "claimed {} slots but only {} were available",
            $n,
            $available
        )
    };
}

/// Assert that a single-producer/single-consumer commit happens in turn.
///
/// With only one thread on a side, the tail must already equal the start of
/// that thread's reservation; anything else means a second thread snuck in
/// on a side configured as single.
macro_rules! debug_assert_commit_in_turn {
    ($tail:expr, $expected:expr) => {
        debug_assert!(
            $tail == $expected,
            "tail {} != reservation start {}: concurrent access on a single-mode side",
            $tail,
            $expected
        )
    };
}

pub(crate) use debug_assert_claim_within_available;
pub(crate) use debug_assert_commit_in_turn;
pub(crate) use debug_assert_occupancy_bounded;
