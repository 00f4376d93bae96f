//! Bounded SPSC queue with counting-semaphore signalling.
//!
//! A power-of-two ring with two cache-line-padded indices (head written
//! only by the producer, tail only by the consumer) and two counting
//! semaphores: `free_slots` starts at the capacity, `filled_slots` at zero.
//!
//! Protocol:
//! - producer: `free_slots.acquire()` -> write slot -> publish `head + 1`
//!   with release ordering -> `filled_slots.release()`
//! - consumer: `filled_slots.acquire()` -> read slot -> publish `tail + 1`
//!   -> `free_slots.release()`
//!
//! The semaphore pair serialises visibility without a mutex around the
//! buffer. The single-producer/single-consumer contract is enforced by the
//! type system: [`channel`] returns split [`Producer`]/[`Consumer`] handles
//! that are not `Clone` and whose operations take `&mut self`.

use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_utils::CachePadded;
use parking_lot::{Condvar, Mutex};

/// Counting semaphore built on a parking-lot mutex/condvar pair.
///
/// The mutex guards only the permit counter; the queue buffer itself is
/// accessed lock-free under the head/tail publication protocol.
struct Semaphore {
    permits: Mutex<usize>,
    available: Condvar,
}

impl Semaphore {
    fn new(permits: usize) -> Self {
        Self {
            permits: Mutex::new(permits),
            available: Condvar::new(),
        }
    }

    fn acquire(&self) {
        let mut permits = self.permits.lock();
        while *permits == 0 {
            self.available.wait(&mut permits);
        }
        *permits -= 1;
    }

    fn try_acquire(&self) -> bool {
        let mut permits = self.permits.lock();
        if *permits == 0 {
            return false;
        }
        *permits -= 1;
        true
    }

    fn try_acquire_for(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut permits = self.permits.lock();
        while *permits == 0 {
            if self.available.wait_until(&mut permits, deadline).timed_out() && *permits == 0 {
                return false;
            }
        }
        *permits -= 1;
        true
    }

    fn release(&self) {
        let mut permits = self.permits.lock();
        *permits += 1;
        drop(permits);
        self.available.notify_one();
    }
}

struct Inner<T> {
    buffer: Box<[UnsafeCell<MaybeUninit<T>>]>,
    mask: usize,
    /// Written only by the producer.
    head: CachePadded<AtomicUsize>,
    /// Written only by the consumer.
    tail: CachePadded<AtomicUsize>,
    free_slots: Semaphore,
    filled_slots: Semaphore,
}

// The buffer cells are only ever touched by the unique producer (writes)
// and unique consumer (reads), serialised per-slot by the semaphore pair.
unsafe impl<T: Send> Send for Inner<T> {}
unsafe impl<T: Send> Sync for Inner<T> {}

impl<T> Drop for Inner<T> {
    fn drop(&mut self) {
        // Both handles are gone; drop whatever was published but not popped.
        let head = self.head.load(Ordering::Relaxed);
        let mut tail = self.tail.load(Ordering::Relaxed);
        while tail != head {
            unsafe {
                (*self.buffer[tail & self.mask].get()).assume_init_drop();
            }
            tail = tail.wrapping_add(1);
        }
    }
}

/// Create a bounded SPSC channel with the given capacity.
///
/// # Panics
/// Panics if `capacity` is zero or not a power of two.
pub fn channel<T: Send>(capacity: usize) -> (Producer<T>, Consumer<T>) {
    assert!(
        capacity > 0 && capacity.is_power_of_two(),
        "queue capacity must be a nonzero power of two"
    );

    let buffer: Box<[UnsafeCell<MaybeUninit<T>>]> = (0..capacity)
        .map(|_| UnsafeCell::new(MaybeUninit::uninit()))
        .collect();

    let inner = Arc::new(Inner {
        buffer,
        mask: capacity - 1,
        head: CachePadded::new(AtomicUsize::new(0)),
        tail: CachePadded::new(AtomicUsize::new(0)),
        free_slots: Semaphore::new(capacity),
        filled_slots: Semaphore::new(0),
    });

    (
        Producer {
            inner: Arc::clone(&inner),
        },
        Consumer { inner },
    )
}

/// Producer endpoint. Exactly one thread owns it.
pub struct Producer<T: Send> {
    inner: Arc<Inner<T>>,
}

/// Consumer endpoint. Exactly one thread owns it.
pub struct Consumer<T: Send> {
    inner: Arc<Inner<T>>,
}

impl<T: Send> Producer<T> {
    /// Write the value into the slot at `head` and publish `head + 1`.
    ///
    /// Must only be called after a successful `free_slots` acquire.
    #[inline]
    fn commit(&mut self, value: T) {
        let head = self.inner.head.load(Ordering::Relaxed);
        unsafe {
            (*self.inner.buffer[head & self.inner.mask].get()).write(value);
        }
        self.inner.head.store(head.wrapping_add(1), Ordering::Release);
        self.inner.filled_slots.release();
    }

    /// Push, blocking while the queue is full.
    pub fn push(&mut self, value: T) {
        self.inner.free_slots.acquire();
        self.commit(value);
    }

    /// Non-blocking push. Returns the value back on a full queue, with no
    /// side effects.
    pub fn try_push(&mut self, value: T) -> Result<(), T> {
        if !self.inner.free_slots.try_acquire() {
            return Err(value);
        }
        self.commit(value);
        Ok(())
    }

    /// Push with a bounded wait for a free slot.
    pub fn try_push_for(&mut self, value: T, timeout: Duration) -> Result<(), T> {
        if !self.inner.free_slots.try_acquire_for(timeout) {
            return Err(value);
        }
        self.commit(value);
        Ok(())
    }

    /// Approximate occupancy; exact only in quiescence.
    pub fn size_approx(&self) -> usize {
        size_approx(&self.inner)
    }

    pub fn capacity(&self) -> usize {
        self.inner.mask + 1
    }
}

impl<T: Send> Consumer<T> {
    /// Read the slot at `tail` and publish `tail + 1`.
    ///
    /// Must only be called after a successful `filled_slots` acquire.
    #[inline]
    fn take(&mut self) -> T {
        let tail = self.inner.tail.load(Ordering::Relaxed);
        let value = unsafe {
            (*self.inner.buffer[tail & self.inner.mask].get()).assume_init_read()
        };
        self.inner.tail.store(tail.wrapping_add(1), Ordering::Release);
        self.inner.free_slots.release();
        value
    }

    /// Pop, blocking while the queue is empty.
    pub fn pop(&mut self) -> T {
        self.inner.filled_slots.acquire();
        self.take()
    }

    /// Non-blocking pop.
    pub fn try_pop(&mut self) -> Option<T> {
        if !self.inner.filled_slots.try_acquire() {
            return None;
        }
        Some(self.take())
    }

    /// Pop with a bounded wait for an item. `None` on timeout; the engine
    /// loop uses this to observe its stop signal on an empty queue.
    pub fn try_pop_for(&mut self, timeout: Duration) -> Option<T> {
        if !self.inner.filled_slots.try_acquire_for(timeout) {
            return None;
        }
        Some(self.take())
    }

    /// Approximate occupancy; exact only in quiescence.
    pub fn size_approx(&self) -> usize {
        size_approx(&self.inner)
    }

    pub fn capacity(&self) -> usize {
        self.inner.mask + 1
    }
}

fn size_approx<T>(inner: &Inner<T>) -> usize {
    let head = inner.head.load(Ordering::Acquire);
    let tail = inner.tail.load(Ordering::Acquire);
    head.wrapping_sub(tail)
}
