//! Event capture with pre-roll backfill.
//!
//! When the onset detector fires, the interesting audio started before the
//! trigger: the reported onset frame already has the attack lookahead
//! subtracted, so it usually lies in the recent past, inside the ring's
//! retained history. The filling protocol is:
//!
//!   1. `begin(onset_frame)` on the onset event,
//!   2. `backfill(ring, channel, window_start)` once, a bounded catch-up
//!      copy of everything from the onset up to the current window,
//!   3. `append(samples)` with each subsequent window while active,
//!   4. `finish(release_frame)` on the offset event, which trims the tail
//!      to the reported release frame.
//!
//! Capacity is fixed at construction and sized to the longest expected
//! event; anything beyond it is dropped off the end.

use crate::buffer::CircularAudioBuffer;

pub struct CaptureBuffer {
    samples: Vec<f32>,
    len: usize,
    start_frame: i64,
    active: bool,
}

impl CaptureBuffer {
    pub fn new(max_frames: usize) -> Self {
        Self {
            samples: vec![0.0; max_frames],
            len: 0,
            start_frame: 0,
            active: false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Absolute frame index of the first captured sample.
    pub fn start_frame(&self) -> i64 {
        self.start_frame
    }

    /// The captured samples so far.
    pub fn samples(&self) -> &[f32] {
        &self.samples[..self.len]
    }

    /// Start a new capture at the (possibly retroactive) onset frame.
    pub fn begin(&mut self, onset_frame: i64) {
        self.len = 0;
        self.start_frame = onset_frame;
        self.active = true;
    }

    /// Copy history from the ring, from the onset frame up to (not
    /// including) `up_to_frame`. Clamped to the ring's retained history
    /// and to this buffer's capacity.
    pub fn backfill(&mut self, ring: &CircularAudioBuffer, channel: usize, up_to_frame: u64) {
        if !self.active {
            return;
        }
        let from = self.start_frame.max(0) as u64;
        if from >= up_to_frame {
            return;
        }
        let wanted = ((up_to_frame - from) as usize).min(self.samples.len() - self.len);
        let start = self.len;
        let copied = ring.copy_range(from, channel, &mut self.samples[start..start + wanted]);
        self.len += copied;
    }

    /// Append live samples while active. Excess past capacity is dropped.
    pub fn append(&mut self, samples: &[f32]) {
        if !self.active {
            return;
        }
        let room = self.samples.len() - self.len;
        let count = samples.len().min(room);
        self.samples[self.len..self.len + count].copy_from_slice(&samples[..count]);
        self.len += count;
    }

    /// End the capture at the offset event, trimming anything past the
    /// reported release frame.
    pub fn finish(&mut self, release_frame: i64) {
        self.active = false;
        let span = (release_frame - self.start_frame).max(0) as usize;
        self.len = self.len.min(span);
    }
}
