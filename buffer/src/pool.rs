//! Free-list of reusable byte buffers.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

/// A thread-safe free-list of byte buffers.
///
/// `get` and `put` are usually called from different threads (the producer
/// borrows, the consumer returns), so the free list sits behind a mutex.
///
/// Buffers are handed out in the order they were returned. A recycled
/// buffer comes back empty but keeps the capacity it grew to, so once the
/// working set stabilises no further allocation happens.
///
/// The pool does not track who owns a buffer. Returning a buffer that is
/// still referenced elsewhere is impossible in safe Rust because `put`
/// takes it by value.
#[derive(Debug, Default)]
pub struct BufferPool {
    idle: Mutex<VecDeque<Vec<u8>>>,
    allocations: AtomicUsize,
}

impl BufferPool {
    /// Creates an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes an idle buffer, or allocates one with `size` bytes of capacity.
    ///
    /// A recycled buffer may be smaller than `size`; the caller grows it.
    pub fn get(&self, size: usize) -> Vec<u8> {
        if let Some(mut buf) = self.idle.lock().pop_front() {
            buf.clear();
            return buf;
        }
        self.allocations.fetch_add(1, Ordering::Relaxed);
        Vec::with_capacity(size)
    }

    /// Returns a buffer to the free list.
    pub fn put(&self, buf: Vec<u8>) {
        self.idle.lock().push_back(buf);
    }

    /// Returns the number of idle buffers.
    pub fn idle(&self) -> usize {
        self.idle.lock().len()
    }

    /// Returns how many buffers the pool has allocated so far.
    pub fn allocations(&self) -> usize {
        self.allocations.load(Ordering::Relaxed)
    }

    /// Drops every idle buffer.
    pub fn clear(&self) {
        self.idle.lock().clear();
    }
}
