//! Loom-based concurrency tests.
//!
//! Run with: `cargo test --features loom --test loom_tests --release`
//!
//! As with most loom suites, the two-index reservation/commit protocol is
//! modeled in isolation with a tiny capacity so loom's exhaustive
//! interleaving search stays tractable. The model mirrors the orderings
//! used by the real ring: Acquire on the opposing tail, AcqRel on the head
//! CAS, Acquire on the commit wait, Release on the tail store.

#![cfg(feature = "loom")]

use loom::sync::atomic::{fence, AtomicU32, Ordering};
use loom::sync::Arc;
use loom::thread;
use std::cell::UnsafeCell;

const CAP: u32 = 4;
const MASK: u32 = CAP - 1;

struct LoomRing {
    prod_head: AtomicU32,
    prod_tail: AtomicU32,
    cons_head: AtomicU32,
    cons_tail: AtomicU32,
    slots: UnsafeCell<[u32; CAP as usize]>,
}

unsafe impl Send for LoomRing {}
unsafe impl Sync for LoomRing {}

impl LoomRing {
    fn new() -> Self {
        Self {
            prod_head: AtomicU32::new(0),
            prod_tail: AtomicU32::new(0),
            cons_head: AtomicU32::new(0),
            cons_tail: AtomicU32::new(0),
            slots: UnsafeCell::new([0; CAP as usize]),
        }
    }

    /// Multi-producer single-element enqueue: CAS reservation, payload
    /// write, ordered tail commit.
    fn mp_enqueue(&self, value: u32) -> bool {
        let mut head = self.prod_head.load(Ordering::Relaxed);
        loop {
            fence(Ordering::Acquire);
            let cons_tail = self.cons_tail.load(Ordering::Acquire);
            let free = MASK.wrapping_add(cons_tail).wrapping_sub(head);
            if free == 0 {
                return false;
            }
            match self.prod_head.compare_exchange_weak(
                head,
                head.wrapping_add(1),
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(current) => head = current,
            }
        }

        // SAFETY: the CAS granted exclusive ownership of this slot.
        unsafe {
            (*self.slots.get())[(head & MASK) as usize] = value;
        }

        while self.prod_tail.load(Ordering::Acquire) != head {
            thread::yield_now();
        }
        self.prod_tail.store(head.wrapping_add(1), Ordering::Release);
        true
    }

    /// Multi-consumer single-element dequeue, mirroring mp_enqueue.
    fn mc_dequeue(&self) -> Option<u32> {
        let mut head = self.cons_head.load(Ordering::Relaxed);
        loop {
            fence(Ordering::Acquire);
            let prod_tail = self.prod_tail.load(Ordering::Acquire);
            if prod_tail.wrapping_sub(head) == 0 {
                return None;
            }
            match self.cons_head.compare_exchange_weak(
                head,
                head.wrapping_add(1),
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(current) => head = current,
            }
        }

        // SAFETY: the CAS granted exclusive ownership of this entry.
        let value = unsafe { (*self.slots.get())[(head & MASK) as usize] };

        while self.cons_tail.load(Ordering::Acquire) != head {
            thread::yield_now();
        }
        self.cons_tail.store(head.wrapping_add(1), Ordering::Release);
        Some(value)
    }

    /// Single-consumer dequeue: no CAS, no commit wait.
    fn sc_dequeue(&self) -> Option<u32> {
        let head = self.cons_head.load(Ordering::Relaxed);
        let prod_tail = self.prod_tail.load(Ordering::Acquire);
        if prod_tail == head {
            return None;
        }
        self.cons_head.store(head.wrapping_add(1), Ordering::Relaxed);

        let value = unsafe { (*self.slots.get())[(head & MASK) as usize] };

        self.cons_tail.store(head.wrapping_add(1), Ordering::Release);
        Some(value)
    }
}

/// Two producers race for slots; the consumer must observe both payloads,
/// never an unwritten slot.
#[test]
fn loom_two_producers_payload_visibility() {
    loom::model(|| {
        let ring = Arc::new(LoomRing::new());

        let p1 = {
            let ring = Arc::clone(&ring);
            thread::spawn(move || assert!(ring.mp_enqueue(1)))
        };
        let p2 = {
            let ring = Arc::clone(&ring);
            thread::spawn(move || assert!(ring.mp_enqueue(2)))
        };

        let mut got = Vec::new();
        while got.len() < 2 {
            match ring.sc_dequeue() {
                Some(value) => got.push(value),
                None => thread::yield_now(),
            }
        }

        p1.join().unwrap();
        p2.join().unwrap();

        got.sort_unstable();
        assert_eq!(got, vec![1, 2], "payload missing or torn");
    });
}

/// The commit wait serializes tail stores: after both producers finish,
/// the tail covers both slots exactly.
#[test]
fn loom_commit_order() {
    loom::model(|| {
        let ring = Arc::new(LoomRing::new());

        let p1 = {
            let ring = Arc::clone(&ring);
            thread::spawn(move || assert!(ring.mp_enqueue(10)))
        };
        let p2 = {
            let ring = Arc::clone(&ring);
            thread::spawn(move || assert!(ring.mp_enqueue(20)))
        };
        p1.join().unwrap();
        p2.join().unwrap();

        assert_eq!(ring.prod_tail.load(Ordering::SeqCst), 2);
        assert_eq!(ring.prod_head.load(Ordering::SeqCst), 2);

        let a = ring.sc_dequeue().unwrap();
        let b = ring.sc_dequeue().unwrap();
        assert_eq!(a + b, 30);
        assert_eq!(ring.sc_dequeue(), None);
    });
}

/// Two consumers race for pre-filled entries; each entry is delivered to
/// exactly one of them.
#[test]
fn loom_two_consumers_exclusive_delivery() {
    loom::model(|| {
        let ring = Arc::new(LoomRing::new());
        assert!(ring.mp_enqueue(10));
        assert!(ring.mp_enqueue(20));

        let c1 = {
            let ring = Arc::clone(&ring);
            thread::spawn(move || loop {
                match ring.mc_dequeue() {
                    Some(value) => return value,
                    None => thread::yield_now(),
                }
            })
        };
        let c2 = {
            let ring = Arc::clone(&ring);
            thread::spawn(move || loop {
                match ring.mc_dequeue() {
                    Some(value) => return value,
                    None => thread::yield_now(),
                }
            })
        };

        let mut got = vec![c1.join().unwrap(), c2.join().unwrap()];
        got.sort_unstable();
        assert_eq!(got, vec![10, 20], "entry duplicated or lost");
    });
}

/// Occupancy never exceeds the accessible capacity: the fourth enqueue on
/// a capacity-4 ring is refused.
#[test]
fn loom_bounded_occupancy() {
    loom::model(|| {
        let ring = LoomRing::new();
        assert!(ring.mp_enqueue(1));
        assert!(ring.mp_enqueue(2));
        assert!(ring.mp_enqueue(3));
        assert!(!ring.mp_enqueue(4));

        assert_eq!(ring.sc_dequeue(), Some(1));
        assert!(ring.mp_enqueue(4));
    });
}
