//! ringmpmc - Lock-Free Bounded MPMC Ring Queue
//!
//! A bounded multi-producer / multi-consumer queue of pointer-sized values
//! built on a two-phase reservation protocol: producers CAS a head cursor
//! to claim slots, write their payload, then commit a tail cursor in
//! reservation order. Consumers mirror the same protocol. Either side can
//! be configured single-threaded at construction, which drops the CAS loop
//! and the commit wait on that side.
//!
//! # Key Features
//!
//! - Bulk (all-or-nothing) and burst (best-effort) enqueue/dequeue
//! - Four concurrency modes (SP/MP x SC/MC), selected per side
//! - High-water mark for producer-side quota signalling
//! - 32-bit free-running cursors with wrapping arithmetic (the 2^32 wrap
//!   is part of the protocol, not an edge case)
//! - Cache-padded cursor pairs, no allocation after construction
//!
//! A small intrusive Treiber stack ([`Stack`]) ships alongside the ring as
//! a secondary primitive.
//!
//! # Example
//!
//! ```
//! use ringmpmc::{Config, Ring};
//!
//! let ring = Ring::new(Config::new(8)).unwrap();
//!
//! ring.enqueue_bulk(&[0x1usize, 0x2, 0x3]).unwrap();
//! assert_eq!(ring.len(), 3);
//!
//! let mut out = [0usize; 2];
//! ring.dequeue_bulk(&mut out).unwrap();
//! assert_eq!(out, [0x1, 0x2]);
//!
//! // Burst takes whatever is there.
//! let mut rest = [0usize; 8];
//! assert_eq!(ring.dequeue_burst(&mut rest), 1);
//! ```

mod backoff;
mod config;
mod error;
mod invariants;
mod metrics;
mod ring;
mod stack;

pub use backoff::Backoff;
pub use config::Config;
pub use error::RingError;
pub use metrics::MetricsSnapshot;
pub(crate) use metrics::Metrics;
pub use ring::{Ring, QUOT_EXCEED_BIT, SZ_MASK};
pub use stack::{Stack, StackNode};
