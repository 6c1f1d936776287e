//! Miri-compatible tests for the unsafe paths.
//!
//! Run with: `cargo +nightly miri test --test miri_tests`
//!
//! Small capacities and short runs keep the interpreter fast while still
//! exercising every unsafe block: the wrap-splitting slot copies, the
//! single-element dequeue through `MaybeUninit`, and the intrusive stack
//! links.

use ringmpmc::{Config, Ring, Stack, StackNode};
use std::ptr::NonNull;
use std::sync::Arc;
use std::thread;

#[test]
fn miri_ring_bulk_roundtrip() {
    let ring = Ring::new(Config::new(4)).unwrap();

    ring.enqueue_bulk(&[100usize, 200]).unwrap();
    let mut out = [0usize; 2];
    ring.dequeue_bulk(&mut out).unwrap();
    assert_eq!(out, [100, 200]);
}

#[test]
fn miri_ring_wrap_around() {
    let ring = Ring::new(Config::new(4)).unwrap();

    // Fill and drain repeatedly so the copies straddle the array boundary.
    for round in 0..5usize {
        assert_eq!(ring.enqueue_burst(&[round, round + 1, round + 2]), 3);
        let mut out = [0usize; 3];
        ring.dequeue_bulk(&mut out).unwrap();
        assert_eq!(out, [round, round + 1, round + 2]);
    }
}

#[test]
fn miri_single_element_paths() {
    let ring = Ring::new(Config::new(4).single_producer().single_consumer()).unwrap();

    ring.enqueue(7usize).unwrap();
    assert_eq!(ring.dequeue().unwrap(), 7);
    assert!(ring.dequeue().is_err());
}

#[test]
fn miri_spsc_two_threads() {
    let ring = Arc::new(Ring::new(Config::new(8).single_producer().single_consumer()).unwrap());

    let producer = {
        let ring = Arc::clone(&ring);
        thread::spawn(move || {
            for i in 0..50usize {
                while ring.enqueue(i).is_err() {
                    thread::yield_now();
                }
            }
        })
    };

    let mut expected = 0usize;
    while expected < 50 {
        if let Ok(value) = ring.dequeue() {
            assert_eq!(value, expected);
            expected += 1;
        } else {
            thread::yield_now();
        }
    }
    producer.join().unwrap();
}

#[test]
fn miri_stack_boxed_nodes() {
    let stack = Stack::new();

    let nodes: Vec<NonNull<StackNode>> = (0..4)
        .map(|_| NonNull::from(Box::leak(Box::new(StackNode::new()))))
        .collect();

    unsafe {
        for &node in &nodes {
            stack.push(node);
        }
        for &node in nodes.iter().rev() {
            let popped = stack.pop().unwrap();
            assert_eq!(popped, node);
            drop(Box::from_raw(popped.as_ptr()));
        }
        assert!(stack.pop().is_none());
    }
}
