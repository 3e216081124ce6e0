//! Error types for playback.

use pcmfeed_buffer::QueueError;
use thiserror::Error;

/// Failure to configure or realize an audio sink.
///
/// Setup errors are not retried; the player stays unbound.
#[derive(Debug, Error)]
pub enum SetupError {
    /// The sink cannot play the requested format.
    #[error("pcmfeed: unsupported format: {0}")]
    UnsupportedFormat(String),

    /// The underlying device or platform resource is not available.
    #[error("pcmfeed: sink unavailable: {0}")]
    Unavailable(String),

    /// The pull callback could not be registered.
    #[error("pcmfeed: callback registration failed: {0}")]
    Callback(String),
}

/// Failure to hand a chunk to a sink.
#[derive(Debug, Error)]
pub enum SinkError {
    /// Every device slot already holds a chunk.
    #[error("pcmfeed: sink queue full")]
    QueueFull,

    /// The sink handle has been destroyed.
    #[error("pcmfeed: sink destroyed")]
    Destroyed,

    /// The device output failed.
    #[error("pcmfeed: sink output: {0}")]
    Io(#[from] std::io::Error),
}

/// Error type for player operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Sink setup failed during `init`.
    #[error(transparent)]
    Setup(#[from] SetupError),

    /// A sink operation failed.
    #[error(transparent)]
    Sink(#[from] SinkError),

    /// The player has no bound sink.
    #[error("pcmfeed: player not initialized")]
    NotInitialized,

    /// `init` was called on a bound player.
    #[error("pcmfeed: player already initialized")]
    AlreadyInitialized,

    /// The chunk queue was closed by `release` or a stop request.
    #[error("pcmfeed: {0}")]
    Closed(#[from] QueueError),

    /// Reading the PCM source failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for player operations.
pub type Result<T> = std::result::Result<T, Error>;
