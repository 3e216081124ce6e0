//! Thread-safe building blocks for streaming PCM chunks between threads.
//!
//! - [`BlockQueue<T>`]: a FIFO queue that blocks producers at a depth bound
//!   and consumers on empty, with explicit close semantics
//! - [`BufferPool`]: a free-list of byte buffers so the steady state of a
//!   producer/consumer pipeline allocates nothing
//!
//! # Example
//!
//! ```
//! use pcmfeed_buffer::{BlockQueue, BufferPool};
//!
//! let pool = BufferPool::new();
//! let queue = BlockQueue::new();
//!
//! let mut chunk = pool.get(4);
//! chunk.extend_from_slice(&[1, 2, 3, 4]);
//! queue.enqueue(chunk, 5).unwrap();
//!
//! let chunk = queue.dequeue().unwrap();
//! assert_eq!(chunk, vec![1, 2, 3, 4]);
//! pool.put(chunk);
//! assert_eq!(pool.idle(), 1);
//! ```
//!
//! # Closing
//!
//! - `close_write()`: Prevents new enqueues but allows draining existing items
//! - `close_with_error()`: Immediately closes and fails every operation
//!
//! A consumer parked on an empty queue is released by either call, so a
//! pipeline can always be torn down without deadlocking.

mod block_queue;
mod error;
mod pool;

pub use block_queue::BlockQueue;
pub use error::{Cause, Done, QueueError};
pub use pool::BufferPool;
