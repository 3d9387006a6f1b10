//! Peak-hold envelope follower with linear decay.
//!
//! Instantaneous attack, linear release: the level jumps to any input
//! magnitude that exceeds it and otherwise falls by a fixed amount per
//! sample. The output is a smoothed amplitude signal with one sample per
//! input sample, suitable for thresholding in the onset detector.

use crate::MIN_TIME;

pub struct LevelTracker {
    level: f32,
    decay_per_sample: f32,
}

impl LevelTracker {
    /// `decay_time` is the time in seconds for the level to fall from 1.0
    /// to 0.0 with no input.
    pub fn new(sample_rate: f32, decay_time: f32) -> Self {
        Self {
            level: 0.0,
            decay_per_sample: 1.0 / (sample_rate * decay_time.max(MIN_TIME)),
        }
    }

    /// Current envelope level. Persists across windows.
    pub fn level(&self) -> f32 {
        self.level
    }

    /// Advance the envelope by one input sample.
    pub fn advance(&mut self, input: f32) -> f32 {
        self.level -= self.decay_per_sample;
        let magnitude = input.abs();
        if self.level < magnitude {
            self.level = magnitude;
        }
        if self.level < 0.0 {
            self.level = 0.0;
        }
        self.level
    }

    /// Process a window, writing one envelope sample per input sample.
    pub fn process(&mut self, window: &[f32], out: &mut [f32]) {
        assert_eq!(window.len(), out.len());
        for (out, &input) in out.iter_mut().zip(window) {
            *out = self.advance(input);
        }
    }

    pub fn reset(&mut self) {
        self.level = 0.0;
    }
}
