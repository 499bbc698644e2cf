use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use tracing::trace;

/// Circular slot storage guarded by the buffer's mutex.
///
/// `write` is the next slot to fill, `read` the next slot to drain, and
/// `count` the number of occupied slots, so all `capacity` slots are usable.
struct Ring<T> {
    slots: Vec<Option<T>>,
    write: usize,
    read: usize,
    count: usize,
    peak: usize,
}

impl<T> Ring<T> {
    fn with_capacity(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        Self {
            slots,
            write: 0,
            read: 0,
            count: 0,
            peak: 0,
        }
    }

    #[inline]
    fn is_full(&self) -> bool {
        self.count == self.slots.len()
    }

    #[inline]
    fn is_empty(&self) -> bool {
        self.count == 0
    }

    fn push(&mut self, item: T) {
        debug_assert!(self.slots[self.write].is_none());
        self.slots[self.write] = Some(item);
        self.write = (self.write + 1) % self.slots.len();
        self.count += 1;
        self.peak = self.peak.max(self.count);
    }

    fn pop(&mut self) -> Option<T> {
        let item = self.slots[self.read].take()?;
        self.read = (self.read + 1) % self.slots.len();
        self.count -= 1;
        Some(item)
    }
}

/// Fixed-capacity FIFO queue with blocking `put` and `get`.
///
/// One mutex guards the ring; `not_full` wakes writers waiting for space and
/// `not_empty` wakes readers waiting for an item. Both waits re-check their
/// predicate in a loop, so spurious wakeups are harmless.
pub struct BoundedBuffer<T> {
    ring: Mutex<Ring<T>>,
    not_full: Condvar,
    not_empty: Condvar,
}

impl<T> BoundedBuffer<T> {
    /// Create a buffer holding at most `capacity` items.
    ///
    /// Panics if `capacity` is zero: such a buffer could never accept a put.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "bounded buffer capacity must be at least 1");
        Self {
            ring: Mutex::new(Ring::with_capacity(capacity)),
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
        }
    }

    // The ring is never left half-updated, so a poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, Ring<T>> {
        self.ring.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert `item`, blocking while the buffer is full.
    pub fn put(&self, item: T) {
        let mut ring = self.lock();
        while ring.is_full() {
            trace!(capacity = ring.slots.len(), "put waiting for space");
            ring = self
                .not_full
                .wait(ring)
                .unwrap_or_else(PoisonError::into_inner);
        }
        ring.push(item);
        drop(ring);
        self.not_empty.notify_one();
    }

    /// Remove the oldest item, blocking while the buffer is empty.
    pub fn get(&self) -> T {
        let mut ring = self.lock();
        loop {
            if let Some(item) = ring.pop() {
                drop(ring);
                self.not_full.notify_one();
                return item;
            }
            trace!("get waiting for an item");
            ring = self
                .not_empty
                .wait(ring)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    pub fn capacity(&self) -> usize {
        self.lock().slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Highest number of items ever held at once.
    pub fn peak(&self) -> usize {
        self.lock().peak
    }
}
