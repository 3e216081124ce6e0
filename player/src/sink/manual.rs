//! Sink driven by an external clock.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use super::{AudioSink, PlayState, PullCallback, SinkHandle, SinkQueue};
use crate::error::{SetupError, SinkError};
use crate::format::Format;
use crate::sink::DEFAULT_SLOTS;

/// A sink whose device only advances when [`ManualHandle::fire`] is called.
///
/// This bridges callback APIs owned by the host (the host calls `fire`
/// from its own audio callback) and makes the pull protocol observable
/// step by step.
#[derive(Default)]
pub struct ManualSink {
    handles: Mutex<Vec<Arc<ManualHandle>>>,
    slots: Option<usize>,
    open_error: Option<String>,
    register_error: Option<String>,
}

impl ManualSink {
    /// Creates a sink with the default number of device slots.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets how many chunks a handle can hold at once.
    pub fn with_slots(mut self, slots: usize) -> Self {
        self.slots = Some(slots.max(1));
        self
    }

    /// Makes every `open` fail with [`SetupError::Unavailable`].
    pub fn failing_open(mut self, reason: impl Into<String>) -> Self {
        self.open_error = Some(reason.into());
        self
    }

    /// Makes callback registration fail on every opened handle.
    pub fn failing_register(mut self, reason: impl Into<String>) -> Self {
        self.register_error = Some(reason.into());
        self
    }

    /// Returns the most recently opened handle.
    pub fn handle(&self) -> Option<Arc<ManualHandle>> {
        self.handles.lock().last().cloned()
    }

    /// Returns how many handles have been opened.
    pub fn opened(&self) -> usize {
        self.handles.lock().len()
    }
}

impl AudioSink for ManualSink {
    fn open(&self, format: Format) -> Result<Arc<dyn SinkHandle>, SetupError> {
        if let Some(ref reason) = self.open_error {
            return Err(SetupError::Unavailable(reason.clone()));
        }
        format.validate()?;

        let handle = Arc::new(ManualHandle {
            format,
            slots: self.slots.unwrap_or(DEFAULT_SLOTS),
            register_error: self.register_error.clone(),
            state: Mutex::new(ManualState::default()),
        });
        self.handles.lock().push(Arc::clone(&handle));
        Ok(handle)
    }
}

/// A handle opened by [`ManualSink`].
pub struct ManualHandle {
    format: Format,
    slots: usize,
    register_error: Option<String>,
    state: Mutex<ManualState>,
}

#[derive(Default)]
struct ManualState {
    pending: VecDeque<Vec<u8>>,
    played: Vec<Vec<u8>>,
    play_state: PlayState,
    callback: Option<PullCallback>,
    submissions: usize,
    destroy_calls: usize,
    destroyed: bool,
}

impl ManualHandle {
    /// Plays the oldest queued chunk and invokes the pull callback, as a
    /// device does when it finishes a buffer.
    ///
    /// Returns false, doing nothing, when the handle is stopped, destroyed
    /// or holds no chunk. Blocks for as long as the callback does.
    pub fn fire(&self) -> bool {
        let callback = {
            let mut state = self.state.lock();
            if state.destroyed || state.play_state != PlayState::Playing {
                return false;
            }
            let Some(chunk) = state.pending.pop_front() else {
                return false;
            };
            state.played.push(chunk);
            state.callback.clone()
        };
        if let Some(callback) = callback {
            callback(self);
        }
        true
    }

    /// Returns the format the handle was opened with.
    pub fn format(&self) -> Format {
        self.format
    }

    /// Returns the chunks played by `fire`, in order.
    pub fn played(&self) -> Vec<Vec<u8>> {
        self.state.lock().played.clone()
    }

    /// Returns the chunks handed over but not yet played.
    pub fn queued(&self) -> Vec<Vec<u8>> {
        self.state.lock().pending.iter().cloned().collect()
    }

    /// Returns how many chunks have been handed to the device in total.
    pub fn submissions(&self) -> usize {
        self.state.lock().submissions
    }

    /// Returns true if a pull callback is registered.
    pub fn has_callback(&self) -> bool {
        self.state.lock().callback.is_some()
    }

    /// Returns true once `destroy` has been called.
    pub fn is_destroyed(&self) -> bool {
        self.state.lock().destroyed
    }

    /// Returns how many times `destroy` has been called.
    pub fn destroy_calls(&self) -> usize {
        self.state.lock().destroy_calls
    }
}

impl SinkQueue for ManualHandle {
    fn enqueue(&self, data: &[u8]) -> Result<(), SinkError> {
        let mut state = self.state.lock();
        if state.destroyed {
            return Err(SinkError::Destroyed);
        }
        if state.pending.len() >= self.slots {
            return Err(SinkError::QueueFull);
        }
        state.pending.push_back(data.to_vec());
        state.submissions += 1;
        Ok(())
    }
}

impl SinkHandle for ManualHandle {
    fn register_pull_callback(&self, callback: PullCallback) -> Result<(), SetupError> {
        if let Some(ref reason) = self.register_error {
            return Err(SetupError::Callback(reason.clone()));
        }
        let mut state = self.state.lock();
        if state.destroyed {
            return Err(SetupError::Callback("handle destroyed".into()));
        }
        state.callback = Some(callback);
        Ok(())
    }

    fn set_play_state(&self, play_state: PlayState) {
        self.state.lock().play_state = play_state;
    }

    fn play_state(&self) -> PlayState {
        self.state.lock().play_state
    }

    fn queue(&self) -> &dyn SinkQueue {
        self
    }

    fn pending(&self) -> usize {
        self.state.lock().pending.len()
    }

    fn destroy(&self) {
        let mut state = self.state.lock();
        state.destroy_calls += 1;
        state.destroyed = true;
        state.callback = None;
        state.pending.clear();
    }
}
