//! Errors returned by a closed [`BlockQueue`](crate::BlockQueue).

use std::error::Error as StdError;
use std::sync::Arc;

use thiserror::Error;

/// Shared cause attached to an aborted queue.
pub type Cause = Arc<dyn StdError + Send + Sync>;

/// Why an enqueue was refused.
#[derive(Debug, Clone, Error)]
pub enum QueueError {
    /// Closed for writing. Readers still drain what was queued.
    #[error("queue: closed")]
    Closed,

    /// Torn down with a cause. Queued items were discarded.
    #[error("queue: aborted: {0}")]
    Aborted(#[source] Cause),
}

impl QueueError {
    /// Returns the abort cause, if any.
    pub fn cause(&self) -> Option<&Cause> {
        match self {
            QueueError::Closed => None,
            QueueError::Aborted(cause) => Some(cause),
        }
    }

    /// Returns true if the queue was torn down rather than closed for writing.
    pub fn is_aborted(&self) -> bool {
        matches!(self, QueueError::Aborted(_))
    }
}

/// Returned by [`BlockQueue::dequeue`](crate::BlockQueue::dequeue) once the
/// queue is closed and nothing is left to hand out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("queue: done")]
pub struct Done;
