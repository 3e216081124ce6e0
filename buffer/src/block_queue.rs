//! Bounded blocking queue.

use std::collections::VecDeque;
use std::error::Error;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

use crate::error::{Cause, Done, QueueError};

/// A thread-safe FIFO queue that blocks producers at a depth bound and
/// consumers on empty.
///
/// Items are moved through the queue, never copied. The depth bound is
/// passed on every [`enqueue`](Self::enqueue) call rather than fixed at
/// construction; callers are expected to pass the same value each time.
///
/// # Semantics
///
/// - **Enqueue**: Blocks while `len() >= max_depth`, then appends
/// - **Dequeue**: Blocks while empty, then removes the head
/// - **Close**: `close_write()` allows draining, `close_with_error()` immediate
///
/// Producers and consumers wait on separate condition variables, so a
/// single notification always reaches the side that can make progress.
///
/// # Example
///
/// ```
/// use pcmfeed_buffer::BlockQueue;
/// use std::thread;
///
/// let queue = BlockQueue::<Vec<u8>>::new();
/// let producer_queue = queue.clone();
///
/// // Producer thread (blocks while 2 chunks are waiting)
/// let producer = thread::spawn(move || {
///     for i in 0..10u8 {
///         producer_queue.enqueue(vec![i; 4], 2).unwrap();
///     }
///     producer_queue.close_write();
/// });
///
/// let mut chunks = Vec::new();
/// while let Ok(chunk) = queue.dequeue() {
///     chunks.push(chunk);
/// }
///
/// producer.join().unwrap();
/// assert_eq!(chunks.len(), 10);
/// assert_eq!(chunks[9], vec![9; 4]);
/// ```
pub struct BlockQueue<T> {
    inner: Arc<BlockQueueInner<T>>,
}

struct BlockQueueInner<T> {
    state: Mutex<BlockQueueState<T>>,
    not_full: Condvar,
    not_empty: Condvar,
}

struct BlockQueueState<T> {
    items: VecDeque<T>,
    close_write: bool,
    close_err: Option<Cause>,
}

impl<T> BlockQueueState<T> {
    fn write_error(&self) -> Option<QueueError> {
        if let Some(ref err) = self.close_err {
            return Some(QueueError::Aborted(Arc::clone(err)));
        }
        if self.close_write {
            return Some(QueueError::Closed);
        }
        None
    }
}

impl<T> Clone for BlockQueue<T> {
    fn clone(&self) -> Self {
        BlockQueue {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for BlockQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> BlockQueue<T> {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates an empty queue with room for `capacity` items before the
    /// backing storage reallocates.
    pub fn with_capacity(capacity: usize) -> Self {
        BlockQueue {
            inner: Arc::new(BlockQueueInner {
                state: Mutex::new(BlockQueueState {
                    items: VecDeque::with_capacity(capacity),
                    close_write: false,
                    close_err: None,
                }),
                not_full: Condvar::new(),
                not_empty: Condvar::new(),
            }),
        }
    }

    /// Appends an item, blocking while the queue holds `max_depth` or more.
    ///
    /// Fails if the queue is closed, including while the caller is parked.
    /// The item is dropped in that case.
    ///
    /// # Panics
    ///
    /// Panics if `max_depth` is zero.
    pub fn enqueue(&self, item: T, max_depth: usize) -> Result<(), QueueError> {
        assert!(max_depth > 0, "max_depth must be greater than 0");

        let mut state = self.inner.state.lock();
        loop {
            if let Some(err) = state.write_error() {
                return Err(err);
            }
            if state.items.len() < max_depth {
                break;
            }
            self.inner.not_full.wait(&mut state);
        }

        state.items.push_back(item);
        self.inner.not_empty.notify_one();
        Ok(())
    }

    /// Removes the head of the queue, blocking while the queue is empty.
    ///
    /// Returns `Err(Done)` once the queue is closed for writing and drained,
    /// or immediately after `close_with_error()`.
    pub fn dequeue(&self) -> Result<T, Done> {
        let mut state = self.inner.state.lock();
        loop {
            if state.close_err.is_some() {
                return Err(Done);
            }
            if let Some(item) = state.items.pop_front() {
                self.inner.not_full.notify_one();
                return Ok(item);
            }
            if state.close_write {
                return Err(Done);
            }
            self.inner.not_empty.wait(&mut state);
        }
    }

    /// Removes the head of the queue if one is available, without blocking.
    pub fn try_dequeue(&self) -> Option<T> {
        let mut state = self.inner.state.lock();
        if state.close_err.is_some() {
            return None;
        }
        let item = state.items.pop_front()?;
        self.inner.not_full.notify_one();
        Some(item)
    }

    /// Returns the number of items waiting in the queue.
    pub fn len(&self) -> usize {
        self.inner.state.lock().items.len()
    }

    /// Returns true if no item is waiting.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true once either close method has been called.
    pub fn is_closed(&self) -> bool {
        self.inner.state.lock().close_write
    }

    /// Drops every waiting item and wakes blocked producers.
    ///
    /// This does not change the closed state of the queue.
    pub fn reset(&self) {
        let mut state = self.inner.state.lock();
        state.items.clear();
        self.inner.not_full.notify_all();
    }

    /// Returns the error that caused the queue to be closed, if any.
    pub fn error(&self) -> Option<Cause> {
        self.inner.state.lock().close_err.clone()
    }

    /// Closes the write side of the queue.
    ///
    /// Blocked and future producers fail with [`QueueError::Closed`].
    /// Consumers keep receiving the remaining items, then `Done`.
    pub fn close_write(&self) {
        let mut state = self.inner.state.lock();
        if state.close_write {
            return;
        }
        state.close_write = true;
        self.inner.not_empty.notify_all();
        self.inner.not_full.notify_all();
    }

    /// Closes the queue with the specified error.
    ///
    /// Waiting items are dropped and every blocked operation returns at once.
    pub fn close_with_error<E>(&self, err: E)
    where
        E: Error + Send + Sync + 'static,
    {
        let mut state = self.inner.state.lock();
        if state.close_err.is_some() {
            return;
        }
        state.close_err = Some(Arc::new(err));
        state.close_write = true;
        state.items.clear();
        self.inner.not_empty.notify_all();
        self.inner.not_full.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::thread;
    use std::time::{Duration, Instant};

    #[test]
    fn test_enqueue_dequeue_fifo() {
        let queue = BlockQueue::<i32>::new();
        queue.enqueue(1, 5).unwrap();
        queue.enqueue(2, 5).unwrap();
        queue.enqueue(3, 5).unwrap();

        assert_eq!(queue.len(), 3);
        assert_eq!(queue.dequeue().unwrap(), 1);
        assert_eq!(queue.dequeue().unwrap(), 2);
        assert_eq!(queue.dequeue().unwrap(), 3);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_try_dequeue() {
        let queue = BlockQueue::<i32>::new();
        assert_eq!(queue.try_dequeue(), None);
        queue.enqueue(7, 1).unwrap();
        assert_eq!(queue.try_dequeue(), Some(7));
        assert_eq!(queue.try_dequeue(), None);
    }

    #[test]
    fn test_blocking_enqueue_resumes_after_dequeue() {
        let queue = BlockQueue::<i32>::new();
        let producer_queue = queue.clone();
        let second_done = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&second_done);

        let producer = thread::spawn(move || {
            producer_queue.enqueue(1, 1).unwrap();
            // Blocks until the consumer takes the first item.
            producer_queue.enqueue(2, 1).unwrap();
            flag.store(true, Ordering::SeqCst);
        });

        thread::sleep(Duration::from_millis(50));
        assert!(!second_done.load(Ordering::SeqCst));
        assert_eq!(queue.len(), 1);

        assert_eq!(queue.dequeue().unwrap(), 1);
        let start = Instant::now();
        producer.join().unwrap();
        assert!(second_done.load(Ordering::SeqCst));
        assert!(start.elapsed() < Duration::from_secs(1));
        assert_eq!(queue.dequeue().unwrap(), 2);
    }

    #[test]
    fn test_blocking_dequeue_resumes_after_enqueue() {
        let queue = BlockQueue::<i32>::new();
        let consumer_queue = queue.clone();
        let parked = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&parked);

        let consumer = thread::spawn(move || {
            let item = consumer_queue.dequeue().unwrap();
            flag.store(false, Ordering::SeqCst);
            item
        });

        thread::sleep(Duration::from_millis(50));
        assert!(parked.load(Ordering::SeqCst));

        queue.enqueue(42, 5).unwrap();
        let start = Instant::now();
        assert_eq!(consumer.join().unwrap(), 42);
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_depth_never_exceeds_bound() {
        const MAX: usize = 5;
        let queue = BlockQueue::<usize>::new();
        let producer_queue = queue.clone();
        let peak = Arc::new(AtomicUsize::new(0));
        let producer_peak = Arc::clone(&peak);

        let producer = thread::spawn(move || {
            for i in 0..500 {
                producer_queue.enqueue(i, MAX).unwrap();
                producer_peak.fetch_max(producer_queue.len(), Ordering::SeqCst);
            }
            producer_queue.close_write();
        });

        let mut expected = 0;
        while let Ok(item) = queue.dequeue() {
            peak.fetch_max(queue.len(), Ordering::SeqCst);
            assert_eq!(item, expected);
            expected += 1;
            if expected % 50 == 0 {
                thread::sleep(Duration::from_millis(1));
            }
        }

        producer.join().unwrap();
        assert_eq!(expected, 500);
        assert!(peak.load(Ordering::SeqCst) <= MAX);
    }

    #[test]
    fn test_close_write_drains_then_done() {
        let queue = BlockQueue::<i32>::new();
        queue.enqueue(1, 5).unwrap();
        queue.close_write();

        assert!(queue.is_closed());
        assert_eq!(queue.dequeue().unwrap(), 1);
        assert_eq!(queue.dequeue(), Err(Done));
        assert!(matches!(queue.enqueue(2, 5), Err(QueueError::Closed)));
    }

    #[test]
    fn test_close_write_unblocks_consumer() {
        let queue = BlockQueue::<i32>::new();
        let consumer_queue = queue.clone();
        let consumer = thread::spawn(move || consumer_queue.dequeue());

        thread::sleep(Duration::from_millis(50));
        queue.close_write();
        assert_eq!(consumer.join().unwrap(), Err(Done));
    }

    #[test]
    fn test_close_write_unblocks_producer() {
        let queue = BlockQueue::<i32>::new();
        queue.enqueue(1, 1).unwrap();
        let producer_queue = queue.clone();
        let producer = thread::spawn(move || producer_queue.enqueue(2, 1));

        thread::sleep(Duration::from_millis(50));
        queue.close_write();
        assert!(matches!(producer.join().unwrap(), Err(QueueError::Closed)));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_close_with_error() {
        let queue = BlockQueue::<i32>::new();
        queue.enqueue(1, 5).unwrap();

        let err = std::io::Error::new(std::io::ErrorKind::Other, "device lost");
        queue.close_with_error(err);

        assert!(queue.is_empty());
        assert_eq!(queue.dequeue(), Err(Done));
        assert_eq!(queue.try_dequeue(), None);
        assert!(matches!(
            queue.enqueue(2, 5),
            Err(QueueError::Aborted(_))
        ));
        assert!(queue.error().is_some());
    }

    #[test]
    fn test_close_is_idempotent() {
        let queue = BlockQueue::<i32>::new();
        queue.close_write();
        queue.close_write();
        queue.close_with_error(std::io::Error::new(std::io::ErrorKind::Other, "first"));
        queue.close_with_error(std::io::Error::new(std::io::ErrorKind::Other, "second"));
        let err = queue.error().unwrap();
        assert_eq!(err.to_string(), "first");
    }

    #[test]
    fn test_reset_wakes_producer() {
        let queue = BlockQueue::<i32>::new();
        queue.enqueue(1, 1).unwrap();
        let producer_queue = queue.clone();
        let producer = thread::spawn(move || producer_queue.enqueue(2, 1));

        thread::sleep(Duration::from_millis(50));
        queue.reset();
        producer.join().unwrap().unwrap();
        assert_eq!(queue.dequeue().unwrap(), 2);
    }

    #[test]
    #[should_panic(expected = "max_depth must be greater than 0")]
    fn test_zero_depth_panics() {
        let queue = BlockQueue::<i32>::new();
        let _ = queue.enqueue(1, 0);
    }
}
