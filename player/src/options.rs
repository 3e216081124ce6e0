//! Player configuration.

use serde::{Deserialize, Serialize};

/// Default bound on chunks waiting between the producer and the device.
pub const DEFAULT_QUEUE_DEPTH: usize = 5;

/// Options for configuring a [`PcmPlayer`](crate::PcmPlayer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerOptions {
    /// Maximum number of chunks queued ahead of the device. The producer
    /// blocks while this many are waiting.
    pub max_queue_depth: usize,
    /// Initial capacity of the staging buffer the pull callback copies
    /// chunks into. It grows to the largest chunk seen.
    pub scratch_capacity: usize,
}

impl Default for PlayerOptions {
    fn default() -> Self {
        Self {
            max_queue_depth: DEFAULT_QUEUE_DEPTH,
            scratch_capacity: 0,
        }
    }
}

impl PlayerOptions {
    /// Sets the queue depth bound. Zero is treated as one.
    pub fn with_max_queue_depth(mut self, depth: usize) -> Self {
        self.max_queue_depth = depth;
        self
    }

    /// Sets the initial staging buffer capacity.
    pub fn with_scratch_capacity(mut self, capacity: usize) -> Self {
        self.scratch_capacity = capacity;
        self
    }

    pub(crate) fn queue_depth(&self) -> usize {
        self.max_queue_depth.max(1)
    }
}
