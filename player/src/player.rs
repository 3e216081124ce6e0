//! Playback coordinator.
//!
//! [`PcmPlayer`] sits between a producer thread that calls
//! [`feed_pcm_data`](PcmPlayer::feed_pcm_data) and a device that pulls
//! chunks through a callback on its own thread:
//!
//! ```text
//! producer ── pool.get ─ copy ─ queue.enqueue ──┐
//!                                               │  (blocks at max depth)
//! device ── callback ─ queue.dequeue ─ scratch ─┴─ sink.enqueue ─ pool.put
//!                      (blocks on empty)
//! ```
//!
//! The device only calls back after it has played a chunk, so the first
//! chunk is delivered by the producer itself ("cold start").

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use pcmfeed_buffer::{BlockQueue, BufferPool, Done};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::format::Format;
use crate::options::PlayerOptions;
use crate::sink::{AudioSink, PlayState, SinkHandle, SinkQueue};

/// Granularity of the progress wait in [`PcmPlayer::drain`].
const DRAIN_POLL: Duration = Duration::from_millis(10);

/// Reason attached to the chunk queue when the player is released.
#[derive(Debug, thiserror::Error)]
#[error("player released")]
struct Released;

/// Snapshot of playback counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlayerStats {
    /// Chunks accepted by `feed_pcm_data`.
    pub chunks_fed: u64,
    /// Chunks handed to the sink.
    pub chunks_played: u64,
    /// Chunks the sink refused; they are not replayed.
    pub chunks_dropped: u64,
    /// Pulls after the first that found the queue empty and then received
    /// a chunk late. A pull still waiting at end of stream is not counted.
    pub underruns: u64,
    /// Chunks delivered by the producer because the device had not pulled yet.
    pub cold_starts: u64,
    /// Chunks currently waiting in the queue.
    pub queued: usize,
    /// Chunk buffers the session's pool has allocated.
    pub buffers_allocated: usize,
}

#[derive(Default)]
struct Counters {
    chunks_fed: AtomicU64,
    chunks_played: AtomicU64,
    chunks_dropped: AtomicU64,
    underruns: AtomicU64,
    cold_starts: AtomicU64,
}

impl Counters {
    fn reset(&self) {
        self.chunks_fed.store(0, Ordering::Relaxed);
        self.chunks_played.store(0, Ordering::Relaxed);
        self.chunks_dropped.store(0, Ordering::Relaxed);
        self.underruns.store(0, Ordering::Relaxed);
        self.cold_starts.store(0, Ordering::Relaxed);
    }
}

/// Consumer side of a session: everything the pull callback touches.
struct Consumer {
    pool: BufferPool,
    queue: BlockQueue<Vec<u8>>,
    /// Staging copy handed to the sink; only the pulling thread touches it.
    scratch: Mutex<Vec<u8>>,
    call_backed: AtomicBool,
    counters: Arc<Counters>,
    progress: Mutex<()>,
    progressed: Condvar,
}

impl Consumer {
    fn new(opts: &PlayerOptions, counters: Arc<Counters>) -> Self {
        Self {
            pool: BufferPool::new(),
            queue: BlockQueue::with_capacity(opts.queue_depth()),
            scratch: Mutex::new(Vec::with_capacity(opts.scratch_capacity)),
            call_backed: AtomicBool::new(false),
            counters,
            progress: Mutex::new(()),
            progressed: Condvar::new(),
        }
    }

    /// Moves the next queued chunk to the sink.
    ///
    /// Blocks while the queue is empty. Returns without feeding the sink
    /// once the queue is closed.
    fn pull(&self, sink: &dyn SinkQueue) {
        let chunk = match self.queue.try_dequeue() {
            Some(chunk) => chunk,
            None => {
                let starved = self.call_backed.load(Ordering::Acquire);
                match self.queue.dequeue() {
                    Ok(chunk) => {
                        if starved {
                            self.counters.underruns.fetch_add(1, Ordering::Relaxed);
                            debug!(
                                len = chunk.len(),
                                "pcmfeed: underrun, device waited for producer"
                            );
                        }
                        chunk
                    }
                    Err(Done) => {
                        debug!("pcmfeed: queue closed, pull abandoned");
                        return;
                    }
                }
            }
        };

        let delivered = {
            let mut scratch = self.scratch.lock();
            scratch.clear();
            scratch.extend_from_slice(&chunk);
            match sink.enqueue(&scratch) {
                Ok(()) => true,
                Err(err) => {
                    warn!(%err, len = chunk.len(), "pcmfeed: sink rejected chunk");
                    false
                }
            }
        };
        self.pool.put(chunk);

        if delivered {
            self.counters.chunks_played.fetch_add(1, Ordering::Relaxed);
        } else {
            self.counters.chunks_dropped.fetch_add(1, Ordering::Relaxed);
        }
        self.call_backed.store(true, Ordering::Release);

        let _guard = self.progress.lock();
        self.progressed.notify_all();
    }
}

/// A bound sink and the buffers feeding it.
struct Session {
    format: Format,
    handle: Arc<dyn SinkHandle>,
    consumer: Arc<Consumer>,
}

/// Feeds raw PCM chunks to a pull-based [`AudioSink`].
///
/// All methods take `&self`; share the player through an `Arc` between the
/// reading thread and whichever thread controls playback. A `release` from
/// another thread unblocks a producer parked in `feed_pcm_data` and a
/// device parked in its pull callback.
///
/// # Example
///
/// ```
/// use pcmfeed::{Format, ManualSink, PcmPlayer, PlayerOptions};
/// use std::sync::Arc;
///
/// let sink = Arc::new(ManualSink::new());
/// let player = PcmPlayer::new(Arc::clone(&sink), PlayerOptions::default());
/// player.init(Format::STEREO_44K_16).unwrap();
///
/// // The first chunk goes straight to the device.
/// player.feed_pcm_data(&[1u8; 16]).unwrap();
/// let device = sink.handle().unwrap();
/// assert_eq!(device.queued(), vec![vec![1u8; 16]]);
///
/// player.release();
/// assert!(device.is_destroyed());
/// ```
pub struct PcmPlayer {
    sink: Box<dyn AudioSink>,
    options: PlayerOptions,
    session: Mutex<Option<Arc<Session>>>,
    counters: Arc<Counters>,
}

impl PcmPlayer {
    /// Creates an unbound player. Call [`init`](Self::init) before feeding.
    pub fn new(sink: impl AudioSink + 'static, options: PlayerOptions) -> Self {
        Self {
            sink: Box::new(sink),
            options,
            session: Mutex::new(None),
            counters: Arc::new(Counters::default()),
        }
    }

    /// Returns the player options.
    pub fn options(&self) -> &PlayerOptions {
        &self.options
    }

    /// Opens the sink for `format`, registers the pull callback and
    /// allocates a fresh pool and queue.
    ///
    /// On failure the opened handle, if any, is destroyed and the player
    /// stays unbound.
    pub fn init(&self, format: Format) -> Result<()> {
        let mut slot = self.session.lock();
        if slot.is_some() {
            return Err(Error::AlreadyInitialized);
        }

        let handle = self.sink.open(format)?;
        self.counters.reset();
        let consumer = Arc::new(Consumer::new(&self.options, Arc::clone(&self.counters)));

        let puller = Arc::clone(&consumer);
        if let Err(err) =
            handle.register_pull_callback(Arc::new(move |queue: &dyn SinkQueue| puller.pull(queue)))
        {
            handle.destroy();
            return Err(err.into());
        }

        debug!(%format, depth = self.options.queue_depth(), "pcmfeed: player initialized");
        *slot = Some(Arc::new(Session {
            format,
            handle,
            consumer,
        }));
        Ok(())
    }

    /// Returns true while a sink is bound.
    pub fn is_initialized(&self) -> bool {
        self.session.lock().is_some()
    }

    /// Returns the format of the bound sink.
    pub fn format(&self) -> Option<Format> {
        self.session.lock().as_ref().map(|s| s.format)
    }

    /// Sets the sink playing. No-op when unbound.
    pub fn start(&self) {
        if let Some(session) = self.current() {
            session.handle.set_play_state(PlayState::Playing);
        }
    }

    /// Stops the sink. No-op when unbound.
    pub fn stop(&self) {
        if let Some(session) = self.current() {
            session.handle.set_play_state(PlayState::Stopped);
        }
    }

    /// Queues one chunk of PCM data, blocking while the queue is full.
    ///
    /// Until the device has pulled once, the chunk at the head of the queue
    /// is delivered to the device from this call, after starting it.
    pub fn feed_pcm_data(&self, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            return Ok(());
        }
        let session = self.current().ok_or(Error::NotInitialized)?;
        let consumer = &session.consumer;

        let mut chunk = consumer.pool.get(data.len());
        chunk.extend_from_slice(data);
        consumer.queue.enqueue(chunk, self.options.queue_depth())?;
        self.counters.chunks_fed.fetch_add(1, Ordering::Relaxed);

        if !consumer.call_backed.load(Ordering::Acquire) {
            if session.handle.play_state() != PlayState::Playing {
                session.handle.set_play_state(PlayState::Playing);
            }
            self.counters.cold_starts.fetch_add(1, Ordering::Relaxed);
            debug!(len = data.len(), "pcmfeed: cold start");
            consumer.pull(session.handle.queue());
        }
        Ok(())
    }

    /// Closes the queue for writing.
    ///
    /// A producer blocked in `feed_pcm_data` returns [`Error::Closed`], and
    /// so does every later call. Chunks already queued keep playing.
    pub fn close_input(&self) {
        if let Some(session) = self.current() {
            session.consumer.queue.close_write();
        }
    }

    /// Waits until every fed chunk has reached the sink (or been refused by
    /// it) and the sink has finished playing, or `timeout` elapses.
    ///
    /// Returns true if playback caught up. An unbound player is trivially
    /// drained.
    pub fn drain(&self, timeout: Duration) -> bool {
        let Some(session) = self.current() else {
            return true;
        };
        let consumer = &session.consumer;
        // An unrepresentable deadline waits without limit.
        let deadline = Instant::now().checked_add(timeout);

        let mut guard = consumer.progress.lock();
        loop {
            let fed = self.counters.chunks_fed.load(Ordering::Relaxed);
            let handled = self.counters.chunks_played.load(Ordering::Relaxed)
                + self.counters.chunks_dropped.load(Ordering::Relaxed);
            if consumer.queue.is_empty() && handled >= fed && session.handle.pending() == 0 {
                return true;
            }
            let wait = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return false;
                    }
                    DRAIN_POLL.min(deadline - now)
                }
                None => DRAIN_POLL,
            };
            // Device completion is not signalled, so poll as well.
            consumer.progressed.wait_for(&mut guard, wait);
        }
    }

    /// Returns the playback counters of the current or last session.
    pub fn stats(&self) -> PlayerStats {
        let (queued, buffers_allocated) = self
            .current()
            .map(|s| (s.consumer.queue.len(), s.consumer.pool.allocations()))
            .unwrap_or((0, 0));
        PlayerStats {
            chunks_fed: self.counters.chunks_fed.load(Ordering::Relaxed),
            chunks_played: self.counters.chunks_played.load(Ordering::Relaxed),
            chunks_dropped: self.counters.chunks_dropped.load(Ordering::Relaxed),
            underruns: self.counters.underruns.load(Ordering::Relaxed),
            cold_starts: self.counters.cold_starts.load(Ordering::Relaxed),
            queued,
            buffers_allocated,
        }
    }

    /// Tears the session down: discards queued chunks, stops and destroys
    /// the sink handle, and drops the pool.
    ///
    /// Safe to call any number of times and from any thread other than the
    /// device's callback.
    pub fn release(&self) {
        let Some(session) = self.session.lock().take() else {
            return;
        };
        let consumer = &session.consumer;

        // Wakes a device parked in its pull callback before it is joined.
        consumer.queue.close_with_error(Released);
        session.handle.set_play_state(PlayState::Stopped);
        session.handle.destroy();
        consumer.pool.clear();
        consumer.call_backed.store(false, Ordering::Release);

        debug!(
            fed = self.counters.chunks_fed.load(Ordering::Relaxed),
            played = self.counters.chunks_played.load(Ordering::Relaxed),
            "pcmfeed: player released"
        );
    }

    fn current(&self) -> Option<Arc<Session>> {
        self.session.lock().clone()
    }
}

impl Drop for PcmPlayer {
    fn drop(&mut self) {
        self.release();
    }
}
