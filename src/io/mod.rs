// Purpose - the audio device boundary: fixed-block callback contract

#[cfg(feature = "cpal")]
pub mod client;

#[cfg(feature = "cpal")]
pub use client::{run_input, run_monitor};

/// Fixed-block stream parameters, negotiated once at initialization.
///
/// The device invokes its callbacks every `block_frames / sample_rate`
/// seconds with exactly `block_frames` frames of `channels` channels.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StreamConfig {
    pub sample_rate: f32,
    pub channels: usize,
    pub block_frames: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100.0,
            channels: 1,
            block_frames: 32,
        }
    }
}

impl StreamConfig {
    /// The callback period in seconds (about 0.7 ms at the defaults).
    pub fn block_period(&self) -> f32 {
        self.block_frames as f32 / self.sample_rate
    }
}
