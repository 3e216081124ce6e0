//! Producer loop reading a PCM source into a player.

use std::io::{self, Read};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::debug;

use crate::error::{Error, Result};
use crate::player::PcmPlayer;

/// Default chunk size in bytes.
pub const DEFAULT_CHUNK_SIZE: usize = 8 * 1024;

/// Why a feed loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedOutcome {
    /// The source reached end of stream.
    Exhausted,
    /// A [`StopHandle`] asked the loop to end.
    Stopped,
}

/// Result of [`Feeder::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedSummary {
    pub outcome: FeedOutcome,
    /// Chunks handed to the player.
    pub chunks: u64,
    /// Bytes handed to the player.
    pub bytes: u64,
}

/// Requests a running [`Feeder`] to stop.
///
/// Stopping also closes the player's input, so a feeder blocked on a full
/// queue returns promptly instead of waiting for the device.
#[derive(Clone)]
pub struct StopHandle {
    running: Arc<AtomicBool>,
    player: Arc<PcmPlayer>,
}

impl StopHandle {
    /// Stops the feeder. Chunks already queued keep playing.
    pub fn stop(&self) {
        if self.running.swap(false, Ordering::AcqRel) {
            debug!("pcmfeed: feeder stop requested");
            self.player.close_input();
        }
    }

    /// Returns true until `stop` has been called.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

/// Reads fixed-size chunks from a byte source and feeds them to a player.
///
/// The player's queue bound throttles the loop to the playback rate.
pub struct Feeder {
    player: Arc<PcmPlayer>,
    chunk_size: usize,
    running: Arc<AtomicBool>,
}

impl Feeder {
    /// Creates a feeder that reads `chunk_size` bytes per chunk.
    ///
    /// # Panics
    ///
    /// Panics if `chunk_size` is zero.
    pub fn new(player: Arc<PcmPlayer>, chunk_size: usize) -> Self {
        assert!(chunk_size > 0, "chunk_size must be greater than 0");
        Self {
            player,
            chunk_size,
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Returns a handle that stops this feeder from another thread.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            running: Arc::clone(&self.running),
            player: Arc::clone(&self.player),
        }
    }

    /// Feeds `reader` to the player until end of stream or a stop request.
    ///
    /// A short final chunk is fed with its actual length.
    pub fn run<R: Read>(&self, mut reader: R) -> Result<FeedSummary> {
        let mut chunk = vec![0u8; self.chunk_size];
        let mut summary = FeedSummary {
            outcome: FeedOutcome::Stopped,
            chunks: 0,
            bytes: 0,
        };

        while self.running.load(Ordering::Acquire) {
            let n = read_full(&mut reader, &mut chunk)?;
            if n == 0 {
                summary.outcome = FeedOutcome::Exhausted;
                break;
            }

            match self.player.feed_pcm_data(&chunk[..n]) {
                Ok(()) => {}
                Err(Error::Closed(_)) if !self.running.load(Ordering::Acquire) => break,
                Err(err) => return Err(err),
            }
            summary.chunks += 1;
            summary.bytes += n as u64;

            if n < self.chunk_size {
                summary.outcome = FeedOutcome::Exhausted;
                break;
            }
        }

        debug!(
            outcome = ?summary.outcome,
            chunks = summary.chunks,
            bytes = summary.bytes,
            "pcmfeed: feeder finished"
        );
        Ok(summary)
    }
}

/// Reads until `buf` is full or the source ends. Returns the bytes read.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
