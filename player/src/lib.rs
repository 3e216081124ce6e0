//! Real-time PCM playback through pull-based audio sinks.
//!
//! A reader thread produces fixed-size chunks of raw PCM; an output device
//! consumes them from its own callback at its own pace. This crate bridges
//! the two without gaps or unbounded buffering:
//!
//! - [`PcmPlayer`]: binds an [`AudioSink`], queues chunks with a depth
//!   bound (backpressure), feeds the device from its pull callback and
//!   performs the cold-start delivery of the first chunk
//! - [`Feeder`]: the producer loop reading any `io::Read` into a player
//! - [`sink`]: the sink capability plus [`ThreadSink`] and [`ManualSink`]
//! - [`Format`]: channel count, sample rate and bit depth of the stream
//!
//! # Example
//!
//! ```rust
//! use pcmfeed::{Feeder, FeedOutcome, Format, PcmPlayer, PlayerOptions, Recorder, ThreadSink};
//! use std::io::Cursor;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let recorder = Recorder::new();
//! let sink = ThreadSink::new(recorder.clone()).with_realtime(false);
//! let player = Arc::new(PcmPlayer::new(sink, PlayerOptions::default()));
//! player.init(Format::STEREO_44K_16).unwrap();
//!
//! let pcm = vec![0u8; 20_000];
//! let summary = Feeder::new(Arc::clone(&player), 8192).run(Cursor::new(&pcm)).unwrap();
//! assert_eq!(summary.outcome, FeedOutcome::Exhausted);
//!
//! assert!(player.drain(Duration::from_secs(5)));
//! player.stop();
//! player.release();
//! assert_eq!(recorder.bytes().len(), pcm.len());
//! ```

mod error;
mod feeder;
mod format;
mod options;
mod player;
pub mod sink;

pub use error::{Error, Result, SetupError, SinkError};
pub use feeder::{DEFAULT_CHUNK_SIZE, FeedOutcome, FeedSummary, Feeder, StopHandle};
pub use format::Format;
pub use options::{DEFAULT_QUEUE_DEPTH, PlayerOptions};
pub use player::{PcmPlayer, PlayerStats};
pub use sink::{
    AudioSink, ChunkWriter, IoWriter, ManualHandle, ManualSink, PlayState, PullCallback,
    Recorder, SinkHandle, SinkQueue, ThreadSink,
};

#[cfg(test)]
mod tests;
