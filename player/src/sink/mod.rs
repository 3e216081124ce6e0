//! Abstract pull-based audio sink.
//!
//! A sink models a platform output API that asks for audio instead of
//! accepting it: once the handle holds a chunk and is playing, the device
//! plays it and then invokes the registered [`PullCallback`] on its own
//! thread to obtain the next one. Nothing is pulled until the first chunk
//! has been handed over, which is why [`PcmPlayer`](crate::PcmPlayer)
//! delivers the first chunk itself.
//!
//! Bundled implementations:
//!
//! - [`ThreadSink`]: a device emulated by a dedicated thread that writes
//!   played chunks to a [`ChunkWriter`], optionally at real-time pace
//! - [`ManualSink`]: a device whose clock is driven by the caller

mod manual;
mod thread;
mod writer;

use std::sync::Arc;

use crate::error::{SetupError, SinkError};
use crate::format::Format;

pub use manual::{ManualHandle, ManualSink};
pub use thread::{DEFAULT_SLOTS, ThreadSink};
pub use writer::{ChunkWriter, IoWriter, Recorder};

/// Callback invoked by the device whenever it needs the next chunk.
///
/// The callback hands its chunk to the supplied queue before returning.
pub type PullCallback = Arc<dyn Fn(&dyn SinkQueue) + Send + Sync>;

/// Play state of a sink handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayState {
    #[default]
    Stopped,
    Playing,
}

/// The device-side chunk queue a pull callback feeds.
pub trait SinkQueue {
    /// Hands a chunk to the device.
    ///
    /// The sink copies `data` before returning, so the caller may reuse
    /// its buffer immediately.
    fn enqueue(&self, data: &[u8]) -> Result<(), SinkError>;
}

/// A configured and realized output, created by [`AudioSink::open`].
pub trait SinkHandle: Send + Sync {
    /// Registers the callback the device invokes after each consumed chunk.
    fn register_pull_callback(&self, callback: PullCallback) -> Result<(), SetupError>;

    /// Sets the play state.
    fn set_play_state(&self, state: PlayState);

    /// Returns the current play state.
    fn play_state(&self) -> PlayState;

    /// Returns the device queue, for delivering a chunk outside the callback.
    fn queue(&self) -> &dyn SinkQueue;

    /// Returns the number of chunks the device holds and has not finished
    /// playing.
    fn pending(&self) -> usize;

    /// Releases the output. Safe to call more than once.
    fn destroy(&self);
}

/// Factory for sink handles.
pub trait AudioSink: Send + Sync {
    /// Configures and realizes an output for `format`.
    fn open(&self, format: Format) -> Result<Arc<dyn SinkHandle>, SetupError>;
}

impl<S: AudioSink + ?Sized> AudioSink for Arc<S> {
    fn open(&self, format: Format) -> Result<Arc<dyn SinkHandle>, SetupError> {
        (**self).open(format)
    }
}
