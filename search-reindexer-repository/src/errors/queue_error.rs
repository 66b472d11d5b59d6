//! Errors raised by job queues.

use thiserror::Error;

/// Failure of a queue operation.
#[derive(Debug, Clone, Error)]
pub enum QueueError {
    /// The job could not be enqueued.
    #[error("Enqueue to '{queue}' failed: {message}")]
    EnqueueFailed { queue: String, message: String },

    /// The next job could not be fetched.
    #[error("Dequeue from '{queue}' failed: {message}")]
    DequeueFailed { queue: String, message: String },

    /// The job ID is not known to the queue (already completed or never leased).
    #[error("Unknown job '{0}'")]
    UnknownJob(String),

    /// The queue has been closed and accepts no more jobs.
    #[error("Queue '{0}' is closed")]
    Closed(String),
}

impl QueueError {
    /// Create an enqueue failure.
    pub fn enqueue(queue: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::EnqueueFailed {
            queue: queue.into(),
            message: msg.into(),
        }
    }

    /// Create a dequeue failure.
    pub fn dequeue(queue: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::DequeueFailed {
            queue: queue.into(),
            message: msg.into(),
        }
    }
}
