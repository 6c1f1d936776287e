use crate::invariants::{
    debug_assert_claim_within_available, debug_assert_commit_in_turn,
    debug_assert_occupancy_bounded,
};
use crate::{Backoff, Config, Metrics, MetricsSnapshot, RingError};
use crossbeam_utils::CachePadded;
use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::slice;
use std::sync::atomic::{fence, AtomicU32, Ordering};

// =============================================================================
// RESERVATION PROTOCOL & MEMORY ORDERING
// =============================================================================
//
// The ring is a bounded MPMC queue driven by four free-running 32-bit
// cursors: a (head, tail) pair per side. `head` is the reservation cursor,
// `tail` the commit cursor. All cursor arithmetic is wrapping u32: the
// `(x - y) mod 2^32` algebra is the algorithm, not an implementation detail,
// and occupancy stays well-defined across the 2^32 wrap because it never
// exceeds `mask`.
//
// ## Enqueue (multi-producer)
//
// 1. Snapshot `prod.head`, then load `cons.tail` (Acquire, behind an
//    Acquire fence so the snapshot is not observed after the tail).
//    `free = mask + cons_tail - prod_head`.
// 2. CAS `prod.head` forward by `n` (AcqRel). Failure restarts with the
//    observed head. Success grants exclusive ownership of the claimed
//    slots: no producer can re-claim them, no consumer can read them
//    until `prod.tail` passes them.
// 3. Write payloads into the claimed slots, splitting at the wrap point.
// 4. Wait until `prod.tail` equals the claim start (Acquire, so the
//    predecessor's published payload is carried into this thread), then
//    store `prod.tail = start + n` (Release). The Release store is the
//    write-before-advertise barrier: any consumer that observes the new
//    tail also observes the payload.
//
// The tail wait preserves FIFO commit order among producers: a later
// reserver cannot advertise slots an earlier reserver has not finished.
// Single-producer mode replaces step 2 with a plain store and skips the
// wait in step 4, since the tail already equals the claim start.
//
// ## Dequeue
//
// Fully symmetric: claim against `prod.tail` (Acquire), read payloads,
// commit `cons.tail` with a Release store so the slots are not handed back
// to producers before the reads are done (read-before-consume).
//
// ## Advisory queries
//
// `len`/`free_count`/`is_empty`/`is_full` use Relaxed loads of the two
// tails; results may be stale by the time the caller acts on them.
//
// =============================================================================

/// Bit set in a burst-enqueue return value when the enqueue pushed
/// occupancy over the high-water mark. The entries were still accepted.
pub const QUOT_EXCEED_BIT: u32 = 1 << 31;

/// Mask extracting the accepted count from a burst-enqueue return value.
///
/// Counts above this mask would be ambiguous against [`QUOT_EXCEED_BIT`],
/// which caps the supported ring capacity.
pub const SZ_MASK: u32 = 0x0fff_ffff;

/// Demand mode shared by the bulk (all-or-nothing) and burst (best-effort)
/// entry points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Demand {
    Fixed,
    Variable,
}

/// Outcome of the reservation step.
enum Claim {
    /// Slots `[start, start + n)` are exclusively owned by the caller.
    /// `available` is the free-slot (or ready-entry) count observed by the
    /// winning reservation attempt.
    Granted { start: u32, n: u32, available: u32 },
    /// Variable demand found nothing available; zero is a valid result.
    Drained,
    /// Fixed demand could not be satisfied in full.
    Refused,
}

enum EnqueueOutcome {
    Accepted(u32),
    AcceptedOverWatermark(u32),
    Refused,
}

enum DequeueOutcome {
    Delivered(u32),
    Refused,
}

/// Reservation/commit cursor pair for one side of the ring.
#[derive(Debug)]
struct Cursor {
    head: AtomicU32,
    tail: AtomicU32,
}

impl Cursor {
    const fn new() -> Self {
        Self {
            head: AtomicU32::new(0),
            tail: AtomicU32::new(0),
        }
    }
}

/// Bounded lock-free MPMC ring queue for pointer-sized values.
///
/// A fixed-size power-of-two slot array with a two-phase
/// reservation/commit protocol per side. Producers and consumers may each
/// be single- or multi-threaded, selected at construction via [`Config`];
/// the single-threaded paths drop the CAS loop and the commit wait.
///
/// The payload type is meant to be a pointer-sized handle (`usize`, a raw
/// pointer, an index). Bulk operations bound `T: Copy`; slots are copied
/// in and out, never borrowed.
///
/// One slot is always left unused, so a ring of capacity `N` holds at most
/// `N - 1` values.
pub struct Ring<T> {
    // === PRODUCER SIDE === (padded against the consumer's line)
    prod: CachePadded<Cursor>,
    // === CONSUMER SIDE ===
    cons: CachePadded<Cursor>,

    /// High-water mark; `capacity` means disabled. Plain Relaxed
    /// loads/stores; the race with in-flight enqueues is benign.
    watermark: AtomicU32,

    mask: u32,
    capacity: u32,
    single_producer: bool,
    single_consumer: bool,

    enable_metrics: bool,
    metrics: Metrics,

    /// Slot storage. Per-slot `UnsafeCell` because concurrent producers
    /// write disjoint slots at the same time; the reservation protocol is
    /// what makes each slot single-writer at any instant.
    slots: Box<[UnsafeCell<MaybeUninit<T>>]>,
}

// Safety: the reservation protocol hands each slot to exactly one thread
// between reservation and commit, and payloads are published with
// Release/Acquire on the tails.
unsafe impl<T: Send> Send for Ring<T> {}
unsafe impl<T: Send> Sync for Ring<T> {}

impl<T> Ring<T> {
    /// Creates an empty ring from `config`.
    ///
    /// # Errors
    ///
    /// [`RingError::InvalidCapacity`] if the capacity is not a power of two
    /// between 2 and `SZ_MASK` (the burst return encoding reserves the high
    /// bits, so larger rings would make burst counts ambiguous).
    pub fn new(config: Config) -> Result<Self, RingError> {
        let capacity = config.capacity;
        if capacity < 2 || !capacity.is_power_of_two() || capacity > SZ_MASK {
            return Err(RingError::InvalidCapacity(capacity));
        }

        // Fixed-size storage as a boxed slice: the ring never grows, so
        // there is no reason to carry a Vec's spare-capacity field.
        let slots = (0..capacity)
            .map(|_| UnsafeCell::new(MaybeUninit::uninit()))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Ok(Self {
            prod: CachePadded::new(Cursor::new()),
            cons: CachePadded::new(Cursor::new()),
            watermark: AtomicU32::new(capacity),
            mask: capacity - 1,
            capacity,
            single_producer: config.single_producer,
            single_consumer: config.single_consumer,
            enable_metrics: config.enable_metrics,
            metrics: Metrics::new(),
            slots,
        })
    }

    // ---------------------------------------------------------------------
    // CONFIGURATION & STATUS
    // ---------------------------------------------------------------------

    /// Returns the slot count (one more than the ring can hold).
    #[inline]
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Returns the current high-water mark; equal to [`capacity`](Self::capacity)
    /// when disabled.
    #[inline]
    pub fn watermark(&self) -> u32 {
        self.watermark.load(Ordering::Relaxed)
    }

    /// Sets the high-water mark to `count`, or disables it when `count` is 0.
    ///
    /// Enqueues that push occupancy over the mark still succeed but signal
    /// [`RingError::QuotaExceeded`] (bulk) or [`QUOT_EXCEED_BIT`] (burst).
    /// Takes effect for subsequent enqueues without further coordination;
    /// an enqueue racing the change may see either value.
    ///
    /// # Errors
    ///
    /// [`RingError::InvalidWatermark`] if `count` is not below the capacity.
    pub fn set_watermark(&self, count: u32) -> Result<(), RingError> {
        if count >= self.capacity {
            return Err(RingError::InvalidWatermark {
                requested: count,
                capacity: self.capacity,
            });
        }
        let mark = if count == 0 { self.capacity } else { count };
        self.watermark.store(mark, Ordering::Relaxed);
        Ok(())
    }

    /// Returns the number of values in the ring. Advisory: another thread
    /// may have moved a cursor by the time the caller looks at the result.
    #[inline]
    pub fn len(&self) -> u32 {
        let prod_tail = self.prod.tail.load(Ordering::Relaxed);
        let cons_tail = self.cons.tail.load(Ordering::Relaxed);
        prod_tail.wrapping_sub(cons_tail) & self.mask
    }

    /// Returns the number of free slots. Advisory.
    #[inline]
    pub fn free_count(&self) -> u32 {
        let prod_tail = self.prod.tail.load(Ordering::Relaxed);
        let cons_tail = self.cons.tail.load(Ordering::Relaxed);
        cons_tail.wrapping_sub(prod_tail).wrapping_sub(1) & self.mask
    }

    /// Returns true if the ring holds no values. Advisory.
    #[inline]
    pub fn is_empty(&self) -> bool {
        let prod_tail = self.prod.tail.load(Ordering::Relaxed);
        let cons_tail = self.cons.tail.load(Ordering::Relaxed);
        prod_tail == cons_tail
    }

    /// Returns true if no slot is free. Advisory.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.free_count() == 0
    }

    /// Returns a snapshot of the operation counters; all zero unless the
    /// ring was built with [`Config::with_metrics`].
    pub fn metrics(&self) -> MetricsSnapshot {
        if self.enable_metrics {
            self.metrics.snapshot()
        } else {
            MetricsSnapshot::default()
        }
    }

    // ---------------------------------------------------------------------
    // RESERVATION CORE
    // ---------------------------------------------------------------------

    /// Clips a request to what the return encoding and the ring geometry
    /// can express. `None` means a fixed-demand request that can never fit.
    fn clip_request(&self, requested: usize, demand: Demand) -> Option<u32> {
        if requested <= self.mask as usize {
            Some(requested as u32)
        } else {
            match demand {
                // More than mask slots can never be free at once.
                Demand::Fixed => None,
                Demand::Variable => Some(self.mask),
            }
        }
    }

    /// Applies the demand mode to an observed availability.
    ///
    /// `None` routes to [`Claim::Refused`] (fixed) or [`Claim::Drained`]
    /// (variable with nothing available); `Some(n)` is the granted count.
    fn apply_demand(requested: u32, available: u32, demand: Demand) -> Option<u32> {
        if requested <= available {
            return Some(requested);
        }
        match demand {
            Demand::Fixed => None,
            Demand::Variable if available == 0 => None,
            Demand::Variable => Some(available),
        }
    }

    /// Reserves up to `max` slots on the producer side.
    fn claim_prod(&self, max: u32, demand: Demand) -> Claim {
        if self.single_producer {
            let head = self.prod.head.load(Ordering::Relaxed);
            // Acquire pairs with the consumer's cons.tail Release: the
            // slots being handed back must be done being read before a
            // producer overwrites them.
            let cons_tail = self.cons.tail.load(Ordering::Acquire);
            let free = self.mask.wrapping_add(cons_tail).wrapping_sub(head);

            let Some(n) = Self::apply_demand(max, free, demand) else {
                return if demand == Demand::Fixed {
                    Claim::Refused
                } else {
                    Claim::Drained
                };
            };
            debug_assert_claim_within_available!(n, free);
            debug_assert_occupancy_bounded!(
                head.wrapping_add(n).wrapping_sub(cons_tail),
                self.mask
            );

            self.prod.head.store(head.wrapping_add(n), Ordering::Relaxed);
            Claim::Granted {
                start: head,
                n,
                available: free,
            }
        } else {
            let mut head = self.prod.head.load(Ordering::Relaxed);
            loop {
                // The head snapshot must not be observed after cons.tail,
                // or `free` could be computed against a mismatched pair.
                fence(Ordering::Acquire);
                let cons_tail = self.cons.tail.load(Ordering::Acquire);
                let free = self.mask.wrapping_add(cons_tail).wrapping_sub(head);

                let Some(n) = Self::apply_demand(max, free, demand) else {
                    return if demand == Demand::Fixed {
                        Claim::Refused
                    } else {
                        Claim::Drained
                    };
                };
                debug_assert_claim_within_available!(n, free);
                debug_assert_occupancy_bounded!(
                    head.wrapping_add(n).wrapping_sub(cons_tail),
                    self.mask
                );

                match self.prod.head.compare_exchange_weak(
                    head,
                    head.wrapping_add(n),
                    Ordering::AcqRel,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => {
                        return Claim::Granted {
                            start: head,
                            n,
                            available: free,
                        }
                    }
                    Err(current) => head = current,
                }
            }
        }
    }

    /// Reserves up to `max` ready entries on the consumer side.
    fn claim_cons(&self, max: u32, demand: Demand) -> Claim {
        if self.single_consumer {
            let head = self.cons.head.load(Ordering::Relaxed);
            // Acquire pairs with the producer's prod.tail Release: seeing
            // the tail means seeing the payload behind it.
            let prod_tail = self.prod.tail.load(Ordering::Acquire);
            let entries = prod_tail.wrapping_sub(head);

            let Some(n) = Self::apply_demand(max, entries, demand) else {
                return if demand == Demand::Fixed {
                    Claim::Refused
                } else {
                    Claim::Drained
                };
            };
            debug_assert_claim_within_available!(n, entries);

            self.cons.head.store(head.wrapping_add(n), Ordering::Relaxed);
            Claim::Granted {
                start: head,
                n,
                available: entries,
            }
        } else {
            let mut head = self.cons.head.load(Ordering::Relaxed);
            loop {
                fence(Ordering::Acquire);
                let prod_tail = self.prod.tail.load(Ordering::Acquire);
                let entries = prod_tail.wrapping_sub(head);

                let Some(n) = Self::apply_demand(max, entries, demand) else {
                    return if demand == Demand::Fixed {
                        Claim::Refused
                    } else {
                        Claim::Drained
                    };
                };
                debug_assert_claim_within_available!(n, entries);

                match self.cons.head.compare_exchange_weak(
                    head,
                    head.wrapping_add(n),
                    Ordering::AcqRel,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => {
                        return Claim::Granted {
                            start: head,
                            n,
                            available: entries,
                        }
                    }
                    Err(current) => head = current,
                }
            }
        }
    }

    /// Publishes a committed reservation by advancing `cursor.tail` from
    /// `start` to `next`.
    ///
    /// With `ordered` set (multi mode), waits for earlier reservers to
    /// commit first; the Acquire load carries their payload publication so
    /// this thread's Release store re-publishes it transitively.
    fn commit(&self, cursor: &Cursor, start: u32, next: u32, ordered: bool) {
        if ordered {
            let mut backoff = Backoff::new();
            while cursor.tail.load(Ordering::Acquire) != start {
                backoff.pause();
            }
        } else {
            debug_assert_commit_in_turn!(cursor.tail.load(Ordering::Relaxed), start);
        }
        cursor.tail.store(next, Ordering::Release);
    }
}

impl<T: Copy> Ring<T> {
    // ---------------------------------------------------------------------
    // PAYLOAD COPY (wrap-splitting)
    // ---------------------------------------------------------------------

    /// Writes `n` values from `src` into slots starting at logical index
    /// `start`, splitting the copy at the wrap point.
    ///
    /// # Safety
    ///
    /// The caller must hold a granted claim covering `[start, start + n)`
    /// and `src` must be valid for `n` reads.
    unsafe fn copy_in(&self, start: u32, src: *const T, n: usize) {
        let idx = (start & self.mask) as usize;
        let contiguous = n.min(self.slots.len() - idx);
        for i in 0..contiguous {
            self.slots[idx + i]
                .get()
                .write(MaybeUninit::new(src.add(i).read()));
        }
        for i in contiguous..n {
            self.slots[i - contiguous]
                .get()
                .write(MaybeUninit::new(src.add(i).read()));
        }
    }

    /// Reads `n` values from slots starting at logical index `start` into
    /// `dst`, splitting at the wrap point.
    ///
    /// # Safety
    ///
    /// The caller must hold a granted claim covering `[start, start + n)`
    /// (so every slot read was committed by a producer) and `dst` must be
    /// valid for `n` writes.
    unsafe fn copy_out(&self, start: u32, dst: *mut T, n: usize) {
        let idx = (start & self.mask) as usize;
        let contiguous = n.min(self.slots.len() - idx);
        for i in 0..contiguous {
            dst.add(i).write(self.slots[idx + i].get().read().assume_init());
        }
        for i in contiguous..n {
            dst.add(i)
                .write(self.slots[i - contiguous].get().read().assume_init());
        }
    }

    // ---------------------------------------------------------------------
    // ENQUEUE / DEQUEUE CORE
    // ---------------------------------------------------------------------

    fn do_enqueue(&self, objs: &[T], demand: Demand) -> EnqueueOutcome {
        let Some(max) = self.clip_request(objs.len(), demand) else {
            return EnqueueOutcome::Refused;
        };
        if max == 0 {
            return EnqueueOutcome::Accepted(0);
        }

        let (start, n, free) = match self.claim_prod(max, demand) {
            Claim::Granted { start, n, available } => (start, n, available),
            Claim::Drained => return EnqueueOutcome::Accepted(0),
            Claim::Refused => return EnqueueOutcome::Refused,
        };

        // SAFETY: the claim grants exclusive ownership of the n slots and
        // objs holds at least n values (n <= max <= objs.len()).
        unsafe { self.copy_in(start, objs.as_ptr(), n as usize) };

        // Occupancy the commit is about to advertise, measured against the
        // availability the winning reservation saw.
        let filled = self.capacity - free + n;
        let over_mark = filled > self.watermark.load(Ordering::Relaxed);

        self.commit(
            &self.prod,
            start,
            start.wrapping_add(n),
            !self.single_producer,
        );

        if self.enable_metrics {
            self.metrics.add_enqueued(u64::from(n));
            if over_mark {
                self.metrics.add_watermark_hit();
            }
        }

        if over_mark {
            EnqueueOutcome::AcceptedOverWatermark(n)
        } else {
            EnqueueOutcome::Accepted(n)
        }
    }

    /// # Safety
    ///
    /// `dst` must be valid for `requested` writes.
    unsafe fn do_dequeue(&self, dst: *mut T, requested: usize, demand: Demand) -> DequeueOutcome {
        let Some(max) = self.clip_request(requested, demand) else {
            return DequeueOutcome::Refused;
        };
        if max == 0 {
            return DequeueOutcome::Delivered(0);
        }

        let (start, n) = match self.claim_cons(max, demand) {
            Claim::Granted { start, n, .. } => (start, n),
            Claim::Drained => return DequeueOutcome::Delivered(0),
            Claim::Refused => return DequeueOutcome::Refused,
        };

        // SAFETY: the claim covers n committed entries and dst is valid
        // for n writes (n <= max <= requested).
        self.copy_out(start, dst, n as usize);

        // The Release store in commit also keeps the payload reads above
        // from drifting past the hand-back of the slots.
        self.commit(
            &self.cons,
            start,
            start.wrapping_add(n),
            !self.single_consumer,
        );

        if self.enable_metrics {
            self.metrics.add_dequeued(u64::from(n));
        }

        DequeueOutcome::Delivered(n)
    }

    // ---------------------------------------------------------------------
    // PUBLIC API
    // ---------------------------------------------------------------------

    /// Enqueues all of `objs`, or nothing.
    ///
    /// # Errors
    ///
    /// [`RingError::InsufficientSpace`] if fewer than `objs.len()` slots
    /// were free (nothing was enqueued). [`RingError::QuotaExceeded`] if
    /// the values were enqueued but occupancy crossed the high-water mark.
    pub fn enqueue_bulk(&self, objs: &[T]) -> Result<(), RingError> {
        match self.do_enqueue(objs, Demand::Fixed) {
            EnqueueOutcome::Accepted(_) => Ok(()),
            EnqueueOutcome::AcceptedOverWatermark(_) => Err(RingError::QuotaExceeded),
            EnqueueOutcome::Refused => Err(RingError::InsufficientSpace),
        }
    }

    /// Enqueues as many of `objs` as fit, returning the accepted count,
    /// OR-ed with [`QUOT_EXCEED_BIT`] when the enqueue crossed the
    /// high-water mark. Mask with [`SZ_MASK`] to recover the count; zero
    /// (full ring) is a valid outcome.
    pub fn enqueue_burst(&self, objs: &[T]) -> u32 {
        match self.do_enqueue(objs, Demand::Variable) {
            EnqueueOutcome::Accepted(n) => n,
            EnqueueOutcome::AcceptedOverWatermark(n) => n | QUOT_EXCEED_BIT,
            EnqueueOutcome::Refused => unreachable!("variable demand never refuses"),
        }
    }

    /// Fills all of `out` from the ring, or takes nothing.
    ///
    /// # Errors
    ///
    /// [`RingError::InsufficientEntries`] if fewer than `out.len()` values
    /// were available (nothing was dequeued).
    pub fn dequeue_bulk(&self, out: &mut [T]) -> Result<(), RingError> {
        // SAFETY: out is a live slice, valid for out.len() writes.
        match unsafe { self.do_dequeue(out.as_mut_ptr(), out.len(), Demand::Fixed) } {
            DequeueOutcome::Delivered(_) => Ok(()),
            DequeueOutcome::Refused => Err(RingError::InsufficientEntries),
        }
    }

    /// Fills `out` with up to `out.len()` values, returning the delivered
    /// count. Zero (empty ring) is a valid outcome.
    pub fn dequeue_burst(&self, out: &mut [T]) -> u32 {
        // SAFETY: out is a live slice, valid for out.len() writes.
        match unsafe { self.do_dequeue(out.as_mut_ptr(), out.len(), Demand::Variable) } {
            DequeueOutcome::Delivered(n) => n,
            DequeueOutcome::Refused => unreachable!("variable demand never refuses"),
        }
    }

    /// Enqueues a single value; all-or-nothing semantics of
    /// [`enqueue_bulk`](Self::enqueue_bulk) with `n = 1`.
    ///
    /// # Errors
    ///
    /// See [`enqueue_bulk`](Self::enqueue_bulk).
    #[inline]
    pub fn enqueue(&self, obj: T) -> Result<(), RingError> {
        self.enqueue_bulk(slice::from_ref(&obj))
    }

    /// Dequeues a single value.
    ///
    /// # Errors
    ///
    /// [`RingError::InsufficientEntries`] if the ring was empty.
    #[inline]
    pub fn dequeue(&self) -> Result<T, RingError> {
        let mut slot = MaybeUninit::<T>::uninit();
        // SAFETY: slot is valid for one write; on Delivered exactly one
        // value was written into it.
        match unsafe { self.do_dequeue(slot.as_mut_ptr(), 1, Demand::Fixed) } {
            DequeueOutcome::Delivered(_) => Ok(unsafe { slot.assume_init() }),
            DequeueOutcome::Refused => Err(RingError::InsufficientEntries),
        }
    }
}
