use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe operation counters, updated only when
/// [`Config::enable_metrics`](crate::Config::enable_metrics) is set.
#[derive(Debug, Default)]
pub(crate) struct Metrics {
    enqueued: AtomicU64,
    dequeued: AtomicU64,
    enqueue_batches: AtomicU64,
    dequeue_batches: AtomicU64,
    watermark_hits: AtomicU64,
}

impl Metrics {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add_enqueued(&self, n: u64) {
        self.enqueued.fetch_add(n, Ordering::Relaxed);
        self.enqueue_batches.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add_dequeued(&self, n: u64) {
        self.dequeued.fetch_add(n, Ordering::Relaxed);
        self.dequeue_batches.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add_watermark_hit(&self) {
        self.watermark_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            enqueued: self.enqueued.load(Ordering::Relaxed),
            dequeued: self.dequeued.load(Ordering::Relaxed),
            enqueue_batches: self.enqueue_batches.load(Ordering::Relaxed),
            dequeue_batches: self.dequeue_batches.load(Ordering::Relaxed),
            watermark_hits: self.watermark_hits.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of a ring's operation counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Total values enqueued.
    pub enqueued: u64,
    /// Total values dequeued.
    pub dequeued: u64,
    /// Successful enqueue calls.
    pub enqueue_batches: u64,
    /// Successful dequeue calls.
    pub dequeue_batches: u64,
    /// Enqueues that pushed occupancy over the high-water mark.
    pub watermark_hits: u64,
}
