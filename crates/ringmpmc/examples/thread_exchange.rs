//! One writer hands tokens to a pool of readers through a shared ring,
//! then the intrusive stack gets a quick tour.

use ringmpmc::{Config, Ring, Stack, StackNode};
use std::ptr::NonNull;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

const READERS: usize = 4;
const TOKENS: usize = 1000;

fn main() {
    let ring = Arc::new(Ring::new(Config::new(64).single_producer()).unwrap());
    let received = Arc::new(AtomicUsize::new(0));

    let mut readers = Vec::new();
    for id in 0..READERS {
        let ring = Arc::clone(&ring);
        let received = Arc::clone(&received);
        readers.push(thread::spawn(move || {
            let mut count = 0usize;
            loop {
                match ring.dequeue() {
                    Ok(_token) => {
                        count += 1;
                        received.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(_) => {
                        if received.load(Ordering::Relaxed) >= TOKENS {
                            break;
                        }
                        thread::yield_now();
                    }
                }
            }
            println!("reader {id} took {count} tokens");
        }));
    }

    for token in 0..TOKENS {
        while ring.enqueue(token).is_err() {
            thread::yield_now();
        }
    }

    for reader in readers {
        reader.join().unwrap();
    }
    println!("ring drained: {}", ring.is_empty());

    // The stack borrows caller-owned nodes; here one lives on this frame.
    let stack = Stack::new();
    let mut node = StackNode::new();
    unsafe {
        stack.push(NonNull::from(&mut node));
        assert!(stack.pop().is_some());
    }
    println!("stack push/pop round trip done");
}
