//! Strided views over interleaved audio.
//!
//! An `Area` is a by-value view of one channel inside an interleaved buffer:
//! a base slice plus a stride. It replaces raw pointer stepping over
//! `samples[frame * channels + channel]` with something that can be handed
//! around and iterated safely.

/// Read-only strided view of one channel of an interleaved buffer.
#[derive(Clone, Copy)]
pub struct Area<'a> {
    samples: &'a [f32],
    stride: usize,
}

impl<'a> Area<'a> {
    /// View a whole mono buffer (stride 1).
    pub fn mono(samples: &'a [f32]) -> Self {
        Self { samples, stride: 1 }
    }

    /// View channel `channel` of a buffer interleaved over `channels`.
    pub fn channel(interleaved: &'a [f32], channel: usize, channels: usize) -> Self {
        assert!(channel < channels, "channel out of range");
        assert!(interleaved.len() % channels == 0, "ragged interleaved buffer");
        Self {
            samples: &interleaved[channel..],
            stride: channels,
        }
    }

    /// Number of frames covered by this view.
    pub fn num_samples(&self) -> usize {
        if self.samples.is_empty() {
            0
        } else {
            (self.samples.len() - 1) / self.stride + 1
        }
    }

    pub fn get(&self, frame: usize) -> f32 {
        self.samples[frame * self.stride]
    }

    pub fn iter(&self) -> impl Iterator<Item = f32> + 'a {
        self.samples.iter().step_by(self.stride).copied()
    }

    /// Copy the channel out into a contiguous buffer.
    pub fn copy_to(&self, dst: &mut [f32]) {
        for (out, sample) in dst.iter_mut().zip(self.iter()) {
            *out = sample;
        }
    }
}

/// Mutable strided view, used by the device boundary to fill one output
/// channel of an interleaved block.
pub struct AreaMut<'a> {
    samples: &'a mut [f32],
    stride: usize,
}

impl<'a> AreaMut<'a> {
    pub fn mono(samples: &'a mut [f32]) -> Self {
        Self { samples, stride: 1 }
    }

    pub fn channel(interleaved: &'a mut [f32], channel: usize, channels: usize) -> Self {
        assert!(channel < channels, "channel out of range");
        assert!(interleaved.len() % channels == 0, "ragged interleaved buffer");
        Self {
            samples: &mut interleaved[channel..],
            stride: channels,
        }
    }

    pub fn num_samples(&self) -> usize {
        if self.samples.is_empty() {
            0
        } else {
            (self.samples.len() - 1) / self.stride + 1
        }
    }

    pub fn set(&mut self, frame: usize, value: f32) {
        self.samples[frame * self.stride] = value;
    }

    pub fn fill_from(&mut self, src: impl IntoIterator<Item = f32>) {
        for (slot, sample) in self.samples.iter_mut().step_by(self.stride).zip(src) {
            *slot = sample;
        }
    }
}
