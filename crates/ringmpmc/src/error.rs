use thiserror::Error;

/// Error types for ring operations.
///
/// Every failure is reported through the return value; there is no
/// out-of-band channel. Capacity errors (`InsufficientSpace`,
/// `InsufficientEntries`) are transient and expected under load; the caller
/// decides whether to retry, drop, or back off. `QuotaExceeded` is special:
/// the entries *were* enqueued, and the error is an early warning for
/// upstream admission control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RingError {
    /// Fixed-demand enqueue found fewer free slots than requested.
    /// Nothing was enqueued.
    #[error("not enough free slots in the ring")]
    InsufficientSpace,

    /// The enqueue succeeded, but occupancy crossed the high-water mark.
    /// The entries are in the ring.
    #[error("high-water mark exceeded (entries were still enqueued)")]
    QuotaExceeded,

    /// Fixed-demand dequeue found fewer entries than requested.
    /// Nothing was dequeued.
    #[error("not enough entries in the ring")]
    InsufficientEntries,

    /// The requested capacity is not a supported power of two.
    #[error("capacity {0} is not a power of two in the supported range")]
    InvalidCapacity(u32),

    /// The requested watermark does not fit below the ring capacity.
    #[error("watermark {requested} must be below the ring capacity {capacity}")]
    InvalidWatermark {
        /// The rejected watermark value.
        requested: u32,
        /// The ring's slot count.
        capacity: u32,
    },
}
