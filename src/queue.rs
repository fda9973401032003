use crate::error::{PipelineError, Result};
use crate::signal::Signal;
use parking_lot::Mutex;

/// Ring storage and indices, guarded by the queue mutex. Empty slots hold
/// `None`; `count` always equals the number of occupied slots.
#[derive(Debug)]
struct Ring {
    slots: Vec<Option<String>>,
    head: usize,
    tail: usize,
    count: usize,
    closed: bool,
}

/// A bounded blocking FIFO of owned strings.
///
/// Safe for one consumer and any number of producers. Ownership of each
/// string transfers to the queue on `put` (the queue stores its own copy)
/// and out of the queue on `get`. Blocking is built on manual-reset
/// [`Signal`]s rather than a counting primitive, so each blocking side runs
/// a retry loop: reset the gate, re-check the predicate under the mutex,
/// and only then wait. A signal raised after the reset is sticky, which
/// closes the lost-wakeup window; the mutex is never held across a wait.
///
/// The `finished` latch is independent of emptiness: a queue can be empty
/// without being finished, and finished while still holding items.
#[derive(Debug)]
pub struct BoundedQueue {
    capacity: usize,
    ring: Mutex<Ring>,
    not_full: Signal,
    not_empty: Signal,
    finished: Signal,
}

impl BoundedQueue {
    /// Create a queue with a fixed capacity of at least one slot
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(PipelineError::InvalidCapacity);
        }
        let queue = Self {
            capacity,
            ring: Mutex::new(Ring {
                slots: (0..capacity).map(|_| None).collect(),
                head: 0,
                tail: 0,
                count: 0,
                closed: false,
            }),
            not_full: Signal::new(),
            not_empty: Signal::new(),
            finished: Signal::new(),
        };
        // A fresh queue has room, so producers may proceed at once.
        queue.not_full.signal();
        Ok(queue)
    }

    /// Copy `item` into the queue, blocking while full. The caller keeps
    /// ownership of its original; exactly one slot is filled per successful
    /// call. Fails once the queue has been closed.
    pub fn put(&self, item: &str) -> Result<()> {
        loop {
            self.not_full.reset();
            {
                let mut ring = self.ring.lock();
                if ring.closed {
                    return Err(PipelineError::QueueClosed);
                }
                if ring.count < self.capacity {
                    let tail = ring.tail;
                    ring.slots[tail] = Some(item.to_owned());
                    ring.tail = (tail + 1) % self.capacity;
                    ring.count += 1;
                    drop(ring);
                    self.not_empty.signal();
                    return Ok(());
                }
            }
            self.not_full.wait();
        }
    }

    /// Remove the oldest item and transfer ownership to the caller,
    /// blocking while empty. Residual items are still drained after
    /// `close`; `None` means the queue is closed and empty.
    pub fn get(&self) -> Option<String> {
        loop {
            self.not_empty.reset();
            {
                let mut ring = self.ring.lock();
                if ring.count > 0 {
                    let head = ring.head;
                    let item = ring.slots[head].take();
                    ring.head = (head + 1) % self.capacity;
                    ring.count -= 1;
                    drop(ring);
                    self.not_full.signal();
                    return item;
                }
                if ring.closed {
                    return None;
                }
            }
            self.not_empty.wait();
        }
    }

    /// Set the end-of-stream latch. Idempotent.
    pub fn signal_finished(&self) {
        self.finished.signal();
    }

    /// Block until the end-of-stream latch is set
    pub fn wait_finished(&self) {
        self.finished.wait();
    }

    /// Shut the queue down: later `put`s fail, `get` drains what remains
    /// and then yields `None`. Wakes both sides so no thread stays blocked.
    pub fn close(&self) {
        self.ring.lock().closed = true;
        self.not_empty.signal();
        self.not_full.signal();
    }

    /// Number of items currently queued
    pub fn len(&self) -> usize {
        self.ring.lock().count
    }

    /// Check if the queue holds no items
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fixed capacity the queue was created with
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
