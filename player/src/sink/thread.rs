//! Output device emulated by a dedicated thread.

use std::collections::VecDeque;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, warn};

use super::{AudioSink, ChunkWriter, PlayState, PullCallback, SinkHandle, SinkQueue};
use crate::error::{SetupError, SinkError};
use crate::format::Format;

/// Number of chunks a device holds by default (double buffering).
pub const DEFAULT_SLOTS: usize = 2;

/// A sink whose device runs on its own thread.
///
/// Each opened handle spawns one device thread. While playing, the thread
/// takes the oldest queued chunk, writes it to the [`ChunkWriter`], waits
/// for the chunk's play time if real-time pacing is enabled, and then
/// invokes the pull callback. Stopping pauses the thread between chunks.
///
/// # Example
///
/// ```
/// use pcmfeed::{Format, PcmPlayer, PlayerOptions, Recorder, ThreadSink};
/// use std::time::Duration;
///
/// let recorder = Recorder::new();
/// let sink = ThreadSink::new(recorder.clone()).with_realtime(false);
/// let player = PcmPlayer::new(sink, PlayerOptions::default());
///
/// player.init(Format::STEREO_44K_16).unwrap();
/// player.feed_pcm_data(&[1u8; 64]).unwrap();
/// player.feed_pcm_data(&[2u8; 64]).unwrap();
/// assert!(player.drain(Duration::from_secs(5)));
/// player.release();
///
/// assert_eq!(recorder.chunks(), vec![vec![1u8; 64], vec![2u8; 64]]);
/// ```
pub struct ThreadSink<W> {
    writer: W,
    realtime: bool,
    slots: usize,
}

impl<W: ChunkWriter + Clone> ThreadSink<W> {
    /// Creates a real-time sink that writes played chunks to `writer`.
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            realtime: true,
            slots: DEFAULT_SLOTS,
        }
    }

    /// Enables or disables real-time pacing.
    ///
    /// Without pacing the device plays as fast as chunks arrive.
    pub fn with_realtime(mut self, realtime: bool) -> Self {
        self.realtime = realtime;
        self
    }

    /// Sets how many chunks the device can hold at once.
    pub fn with_slots(mut self, slots: usize) -> Self {
        self.slots = slots.max(1);
        self
    }
}

impl<W: ChunkWriter + Clone> AudioSink for ThreadSink<W> {
    fn open(&self, format: Format) -> Result<Arc<dyn SinkHandle>, SetupError> {
        format.validate()?;

        let device = Arc::new(Device {
            format,
            slots: self.slots,
            state: Mutex::new(DeviceState {
                pending: VecDeque::with_capacity(self.slots),
                spare: Vec::with_capacity(self.slots),
                in_flight: false,
                play_state: PlayState::Stopped,
                callback: None,
                destroyed: false,
            }),
            wake: Condvar::new(),
        });

        let worker = Arc::clone(&device);
        let writer = self.writer.clone();
        let realtime = self.realtime;
        let join = thread::Builder::new()
            .name("pcmfeed-device".into())
            .spawn(move || worker.run(writer, realtime))
            .map_err(|e| SetupError::Unavailable(e.to_string()))?;

        debug!(%format, realtime, slots = self.slots, "pcmfeed: device opened");
        Ok(Arc::new(ThreadSinkHandle {
            device,
            thread: Mutex::new(Some(join)),
        }))
    }
}

struct Device {
    format: Format,
    slots: usize,
    state: Mutex<DeviceState>,
    wake: Condvar,
}

struct DeviceState {
    pending: VecDeque<Vec<u8>>,
    /// Storage of played chunks, reused by `enqueue`.
    spare: Vec<Vec<u8>>,
    in_flight: bool,
    play_state: PlayState,
    callback: Option<PullCallback>,
    destroyed: bool,
}

impl Device {
    fn run<W: ChunkWriter>(self: Arc<Self>, mut writer: W, realtime: bool) {
        while let Some(chunk) = self.next_chunk() {
            if let Err(err) = writer.write_chunk(&chunk) {
                warn!(%err, "pcmfeed: device output failed");
            }
            if realtime {
                thread::sleep(self.format.duration(chunk.len() as u64));
            }

            let callback = {
                let mut state = self.state.lock();
                state.in_flight = false;
                state.spare.push(chunk);
                if state.destroyed {
                    break;
                }
                state.callback.clone()
            };
            if let Some(callback) = callback {
                callback(&*self);
            }
        }

        if let Err(err) = writer.flush() {
            warn!(%err, "pcmfeed: device flush failed");
        }
        debug!("pcmfeed: device thread exited");
    }

    /// Waits for a chunk to play. Returns `None` once destroyed.
    fn next_chunk(&self) -> Option<Vec<u8>> {
        let mut state = self.state.lock();
        loop {
            if state.destroyed {
                return None;
            }
            if state.play_state == PlayState::Playing {
                if let Some(chunk) = state.pending.pop_front() {
                    state.in_flight = true;
                    return Some(chunk);
                }
            }
            self.wake.wait(&mut state);
        }
    }
}

impl SinkQueue for Device {
    fn enqueue(&self, data: &[u8]) -> Result<(), SinkError> {
        let mut state = self.state.lock();
        if state.destroyed {
            return Err(SinkError::Destroyed);
        }
        if state.pending.len() >= self.slots {
            return Err(SinkError::QueueFull);
        }
        let mut chunk = state.spare.pop().unwrap_or_default();
        chunk.clear();
        chunk.extend_from_slice(data);
        state.pending.push_back(chunk);
        self.wake.notify_one();
        Ok(())
    }
}

struct ThreadSinkHandle {
    device: Arc<Device>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl SinkHandle for ThreadSinkHandle {
    fn register_pull_callback(&self, callback: PullCallback) -> Result<(), SetupError> {
        let mut state = self.device.state.lock();
        if state.destroyed {
            return Err(SetupError::Callback("device destroyed".into()));
        }
        state.callback = Some(callback);
        Ok(())
    }

    fn set_play_state(&self, play_state: PlayState) {
        let mut state = self.device.state.lock();
        if state.play_state != play_state {
            debug!(?play_state, "pcmfeed: device play state");
            state.play_state = play_state;
            self.device.wake.notify_all();
        }
    }

    fn play_state(&self) -> PlayState {
        self.device.state.lock().play_state
    }

    fn queue(&self) -> &dyn SinkQueue {
        &*self.device
    }

    fn pending(&self) -> usize {
        let state = self.device.state.lock();
        state.pending.len() + usize::from(state.in_flight)
    }

    fn destroy(&self) {
        {
            let mut state = self.device.state.lock();
            if !state.destroyed {
                state.destroyed = true;
                state.callback = None;
                state.pending.clear();
                state.spare.clear();
                self.device.wake.notify_all();
            }
        }

        let Some(worker) = self.thread.lock().take() else {
            return;
        };
        // The device thread may tear itself down from inside its callback.
        if worker.thread().id() != thread::current().id() && worker.join().is_err() {
            warn!("pcmfeed: device thread panicked");
        }
    }
}

impl Drop for ThreadSinkHandle {
    fn drop(&mut self) {
        self.destroy();
    }
}
