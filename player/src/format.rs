//! Raw PCM format description.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::SetupError;

/// Layout of interleaved little-endian PCM samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Format {
    /// Number of interleaved channels (1 or 2).
    pub channels: u32,
    /// Sample rate in Hz (e.g., 44100, 48000).
    pub sample_rate: u32,
    /// Bits per sample (8, 16, 24 or 32).
    pub bits_per_sample: u32,
}

impl Format {
    /// Creates a format.
    pub const fn new(channels: u32, sample_rate: u32, bits_per_sample: u32) -> Self {
        Self {
            channels,
            sample_rate,
            bits_per_sample,
        }
    }

    /// Returns the number of bytes in one sample frame (all channels).
    pub fn frame_bytes(&self) -> u64 {
        u64::from(self.channels) * u64::from(self.bits_per_sample / 8)
    }

    /// Returns the number of bytes played per second.
    pub fn bytes_rate(&self) -> u64 {
        self.frame_bytes() * u64::from(self.sample_rate)
    }

    /// Returns the play time of `bytes` bytes of audio.
    pub fn duration(&self, bytes: u64) -> Duration {
        let rate = self.bytes_rate();
        if rate == 0 {
            return Duration::ZERO;
        }
        let nanos = u128::from(bytes % rate) * 1_000_000_000 / u128::from(rate);
        Duration::new(bytes / rate, nanos as u32)
    }

    /// Returns the number of bytes needed for `duration` of audio, rounded
    /// down to a whole frame.
    pub fn bytes_in_duration(&self, duration: Duration) -> u64 {
        let frame = self.frame_bytes();
        if frame == 0 {
            return 0;
        }
        let bytes = duration.as_nanos() * u128::from(self.bytes_rate()) / 1_000_000_000;
        let bytes = bytes as u64;
        bytes - bytes % frame
    }

    /// Checks that the format describes playable interleaved PCM.
    pub fn validate(&self) -> Result<(), SetupError> {
        if !(1..=2).contains(&self.channels) {
            return Err(SetupError::UnsupportedFormat(format!(
                "{} channels",
                self.channels
            )));
        }
        if !matches!(self.bits_per_sample, 8 | 16 | 24 | 32) {
            return Err(SetupError::UnsupportedFormat(format!(
                "{} bits per sample",
                self.bits_per_sample
            )));
        }
        if !(8_000..=192_000).contains(&self.sample_rate) {
            return Err(SetupError::UnsupportedFormat(format!(
                "sample rate {} Hz",
                self.sample_rate
            )));
        }
        Ok(())
    }
}

// Common format presets
impl Format {
    /// 16kHz mono, 16-bit
    pub const MONO_16K_16: Format = Format::new(1, 16000, 16);
    /// 44.1kHz stereo, 16-bit (CD quality)
    pub const STEREO_44K_16: Format = Format::new(2, 44100, 16);
    /// 48kHz stereo, 16-bit
    pub const STEREO_48K_16: Format = Format::new(2, 48000, 16);
}

impl Default for Format {
    fn default() -> Self {
        Self::STEREO_44K_16
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}ch/{}Hz/{}bit",
            self.channels, self.sample_rate, self.bits_per_sample
        )
    }
}
