/// Configuration for [`Ring`](crate::Ring) construction.
///
/// The defaults give a 1024-slot ring in multi-producer / multi-consumer
/// mode with metrics disabled. The single-producer and single-consumer
/// flags are independent: either side can be restricted to one thread,
/// which replaces that side's CAS reservation with a plain cursor bump.
#[derive(Debug, Clone, Copy)]
pub struct Config {
    /// Number of slots. Must be a power of two >= 2; one slot stays
    /// unused to distinguish a full ring from an empty one.
    pub capacity: u32,
    /// Only one thread will ever enqueue.
    pub single_producer: bool,
    /// Only one thread will ever dequeue.
    pub single_consumer: bool,
    /// Enable atomic operation counters (slight overhead).
    pub enable_metrics: bool,
}

impl Config {
    /// Creates a configuration with the given capacity and all flags off.
    ///
    /// Capacity validation happens in [`Ring::new`](crate::Ring::new), which
    /// rejects values that are not a power of two in the supported range.
    pub const fn new(capacity: u32) -> Self {
        Self {
            capacity,
            single_producer: false,
            single_consumer: false,
            enable_metrics: false,
        }
    }

    /// Restricts the producer side to a single thread.
    pub const fn single_producer(mut self) -> Self {
        self.single_producer = true;
        self
    }

    /// Restricts the consumer side to a single thread.
    pub const fn single_consumer(mut self) -> Self {
        self.single_consumer = true;
        self
    }

    /// Enables the operation counters reported by
    /// [`Ring::metrics`](crate::Ring::metrics).
    pub const fn with_metrics(mut self) -> Self {
        self.enable_metrics = true;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(1024)
    }
}
