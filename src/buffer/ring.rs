use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/*
Lock-Free Circular Audio Buffer
===============================

This is the hand-off point between the hard-realtime audio callback and the
analysis thread. The callback must never block, lock, or allocate, so the
buffer is a fixed array of atomics with a single monotonic write cursor.

Vocabulary
----------

  frame        One sample per channel. A stereo frame is two f32 values,
               stored interleaved.

  write count  Total frames ever written (W). Never wrapped; the physical
               slot is `W & (capacity - 1)` because capacity is rounded up
               to a power of two at construction.

  cursor       A reader's own monotonic read count (R). Each reader owns
               exactly one and nothing else ever advances it.

Single writer, many readers. The writer stores samples with relaxed atomics
and then publishes them with one release store of the write count. A reader
acquires the write count before copying, so every frame below W is fully
initialized from its point of view.

Overwrite policy: the writer never waits for readers. A reader that falls
more than `capacity` frames behind has lost the oldest data; rather than
returning garbage, the cursor skips forward to the oldest retained frame
and records how many frames were dropped.

Blocking reads poll-and-sleep rather than using a condition variable. The
sleep is sized from the sample rate and the remaining deficit, so the wake
latency is bounded by roughly one block period. Only the analysis thread
does this; the audio callback never enters a wait of any kind.
*/

/// Fixed-capacity interleaved sample store written by the audio callback.
///
/// Samples are stored as `AtomicU32` bit patterns so lagging readers race
/// the writer on individual words, never on torn values.
pub struct CircularAudioBuffer {
    samples: Box<[AtomicU32]>,
    capacity: u64, // frames, power of two
    channels: usize,
    sample_rate: f32,
    write_count: AtomicU64,
}

impl CircularAudioBuffer {
    /// Allocate a buffer holding at least `min_frames` frames.
    ///
    /// Capacity is rounded up to the next power of two so physical indexing
    /// reduces to a bit mask.
    pub fn new(min_frames: usize, channels: usize, sample_rate: f32) -> Self {
        assert!(min_frames > 0 && channels > 0);
        assert!(sample_rate > 0.0);
        let capacity = min_frames.next_power_of_two();
        let samples = (0..capacity * channels)
            .map(|_| AtomicU32::new(0.0f32.to_bits()))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self {
            samples,
            capacity: capacity as u64,
            channels,
            sample_rate,
            write_count: AtomicU64::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity as usize
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Total frames written so far.
    pub fn write_count(&self) -> u64 {
        self.write_count.load(Ordering::Acquire)
    }

    /// Append interleaved frames, overwriting the oldest data as the buffer
    /// wraps.
    ///
    /// Realtime-safe: no locks, no allocation, no waiting. Must only ever
    /// be called from one thread; that thread is the sole owner of the
    /// write cursor.
    pub fn write(&self, interleaved: &[f32]) {
        debug_assert!(interleaved.len() % self.channels == 0);
        let frames = (interleaved.len() / self.channels) as u64;
        debug_assert!(frames <= self.capacity);

        let start = self.write_count.load(Ordering::Relaxed);
        let mask = self.capacity - 1;
        for (i, frame) in interleaved.chunks_exact(self.channels).enumerate() {
            let base = ((start + i as u64) & mask) as usize * self.channels;
            for (ch, &sample) in frame.iter().enumerate() {
                self.samples[base + ch].store(sample.to_bits(), Ordering::Relaxed);
            }
        }
        // Publish: readers acquire the count before touching the samples.
        self.write_count.store(start + frames, Ordering::Release);
    }

    /// Copy one channel of an absolute frame range into `dst`, clamped to
    /// the history the buffer still retains. Returns the number of samples
    /// copied. Used for capture backfill and read-only visualization.
    pub fn copy_range(&self, start_frame: u64, channel: usize, dst: &mut [f32]) -> usize {
        assert!(channel < self.channels);
        let write = self.write_count.load(Ordering::Acquire);
        let oldest = write.saturating_sub(self.capacity);
        let start = start_frame.max(oldest);
        if start >= write {
            return 0;
        }
        let count = dst.len().min((write - start) as usize);
        let mask = self.capacity - 1;
        for (i, out) in dst[..count].iter_mut().enumerate() {
            let base = ((start + i as u64) & mask) as usize * self.channels;
            *out = f32::from_bits(self.samples[base + channel].load(Ordering::Relaxed));
        }
        count
    }

    fn load_frame(&self, frame: u64, dst: &mut [f32]) {
        let base = (frame & (self.capacity - 1)) as usize * self.channels;
        for (ch, out) in dst.iter_mut().enumerate() {
            *out = f32::from_bits(self.samples[base + ch].load(Ordering::Relaxed));
        }
    }
}

/// An independent monotonic read position into a [`CircularAudioBuffer`].
///
/// Starts at the write count current at construction, so a fresh cursor
/// only ever observes frames written after it was created.
pub struct BufferCursor {
    buffer: Arc<CircularAudioBuffer>,
    read_count: u64, // frames consumed by this reader
    dropped: u64,
}

impl BufferCursor {
    pub fn new(buffer: Arc<CircularAudioBuffer>) -> Self {
        let read_count = buffer.write_count();
        Self {
            buffer,
            read_count,
            dropped: 0,
        }
    }

    /// Absolute frame index of the next frame this cursor will return.
    pub fn position(&self) -> u64 {
        self.read_count
    }

    /// Frames lost to writer overruns, accumulated over the cursor's life.
    pub fn dropped_frames(&self) -> u64 {
        self.dropped
    }

    pub fn buffer(&self) -> &Arc<CircularAudioBuffer> {
        &self.buffer
    }

    /// Frames currently available without blocking.
    pub fn available(&self) -> u64 {
        self.buffer.write_count() - self.read_count
    }

    /// Non-blocking check that `frames` can be read right now.
    pub fn can_read(&self, frames: usize) -> bool {
        self.available() >= frames as u64
    }

    /// Blocking read of interleaved frames into `dst`.
    ///
    /// Sleeps in deficit-sized increments until `dst.len() / channels`
    /// frames are available, then copies at most up to the physical wrap
    /// boundary and advances the cursor by what was copied. Returns the
    /// number of frames delivered; callers doing fixed-size reads loop
    /// until their destination is full.
    ///
    /// There is no timeout: the call retries for as long as the writer is
    /// quiet, so it only terminates once the buffer is fed again.
    pub fn read_into(&mut self, dst: &mut [f32]) -> usize {
        let channels = self.buffer.channels;
        assert!(dst.len() % channels == 0, "destination not frame aligned");
        let requested = (dst.len() / channels) as u64;
        assert!(requested <= self.buffer.capacity, "read exceeds capacity");
        if requested == 0 {
            return 0;
        }

        // Poll-sleep until the writer is far enough ahead.
        let write = loop {
            let write = self.buffer.write_count.load(Ordering::Acquire);
            let available = write - self.read_count;
            if available >= requested {
                break write;
            }
            let deficit = requested - available;
            let seconds = deficit as f32 / self.buffer.sample_rate;
            thread::sleep(Duration::from_secs_f32(seconds));
        };

        // Writer lapped us: skip to the oldest frame still retained and
        // account for the gap instead of handing out overwritten data.
        if write - self.read_count > self.buffer.capacity {
            let skip = write - self.buffer.capacity - self.read_count;
            self.dropped += skip;
            self.read_count += skip;
        }

        // Clamp to the contiguous span up to the physical end of storage.
        let until_wrap = self.buffer.capacity - (self.read_count & (self.buffer.capacity - 1));
        let frames = requested.min(until_wrap) as usize;
        for i in 0..frames {
            let frame = self.read_count + i as u64;
            let dst_base = i * channels;
            self.buffer
                .load_frame(frame, &mut dst[dst_base..dst_base + channels]);
        }
        self.read_count += frames as u64;
        frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mono_buffer(frames: usize) -> Arc<CircularAudioBuffer> {
        Arc::new(CircularAudioBuffer::new(frames, 1, 1_000.0))
    }

    #[test]
    fn capacity_rounds_up_to_power_of_two() {
        let rb = CircularAudioBuffer::new(100, 2, 44_100.0);
        assert_eq!(rb.capacity(), 128);
        assert_eq!(rb.channels(), 2);
    }

    #[test]
    fn round_trip_preserves_order() {
        let rb = mono_buffer(8);
        let mut cursor = BufferCursor::new(rb.clone());

        let written: Vec<f32> = (0..6).map(|i| i as f32).collect();
        rb.write(&written);

        assert!(cursor.can_read(6));
        let mut out = [0.0f32; 6];
        let got = cursor.read_into(&mut out);
        assert_eq!(got, 6);
        assert_eq!(out.to_vec(), written);
    }

    #[test]
    fn read_is_short_at_wrap_boundary() {
        let rb = mono_buffer(8);
        let mut cursor = BufferCursor::new(rb.clone());

        rb.write(&[0.0; 4]);
        let mut skip = [0.0f32; 4];
        assert_eq!(cursor.read_into(&mut skip), 4);

        // Physical positions 4..8 then 0..2.
        let written: Vec<f32> = (0..6).map(|i| 10.0 + i as f32).collect();
        rb.write(&written);

        let mut out = [0.0f32; 6];
        let first = cursor.read_into(&mut out);
        assert_eq!(first, 4, "read should stop at the physical end");
        let second = cursor.read_into(&mut out[4..]);
        assert_eq!(second, 2);
        assert_eq!(out.to_vec(), written);
    }

    #[test]
    fn lapped_cursor_skips_and_counts_dropped_frames() {
        let rb = mono_buffer(4);
        let mut cursor = BufferCursor::new(rb.clone());

        let written: Vec<f32> = (0..10).map(|i| i as f32).collect();
        for chunk in written.chunks(2) {
            rb.write(chunk);
        }

        let mut out = [0.0f32; 4];
        // Cursor is 10 frames behind a 4 frame buffer: 6 frames are gone.
        let got = cursor.read_into(&mut out);
        assert_eq!(cursor.dropped_frames(), 6);
        assert!(got > 0);
        // The oldest retained frame is 6.
        for (i, &sample) in out[..got].iter().enumerate() {
            assert_eq!(sample, written[6 + i]);
        }
    }

    #[test]
    fn interleaved_channels_survive_round_trip() {
        let rb = Arc::new(CircularAudioBuffer::new(8, 2, 1_000.0));
        let mut cursor = BufferCursor::new(rb.clone());

        // L = 1, 3, 5  R = 2, 4, 6
        rb.write(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let mut out = [0.0f32; 6];
        assert_eq!(cursor.read_into(&mut out), 3);
        assert_eq!(out, [1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn blocking_read_waits_for_concurrent_writer() {
        let rb = mono_buffer(64);
        let mut cursor = BufferCursor::new(rb.clone());
        assert!(!cursor.can_read(32));

        let writer = {
            let rb = rb.clone();
            thread::spawn(move || {
                for chunk_start in (0..32).step_by(8) {
                    thread::sleep(Duration::from_millis(2));
                    let chunk: Vec<f32> = (chunk_start..chunk_start + 8)
                        .map(|i| i as f32)
                        .collect();
                    rb.write(&chunk);
                }
            })
        };

        let mut out = [0.0f32; 32];
        let mut filled = 0;
        while filled < out.len() {
            filled += cursor.read_into(&mut out[filled..]);
        }
        writer.join().unwrap();

        for (i, &sample) in out.iter().enumerate() {
            assert_eq!(sample, i as f32, "reader must not run ahead of the writer");
        }
        assert_eq!(cursor.dropped_frames(), 0);
    }

    #[test]
    fn copy_range_clamps_to_retained_history() {
        let rb = mono_buffer(4);
        let written: Vec<f32> = (0..10).map(|i| i as f32).collect();
        rb.write(&written[..4]);
        rb.write(&written[4..8]);
        rb.write(&written[8..]);

        // Only frames 6..10 remain; asking from 0 yields those.
        let mut out = [0.0f32; 8];
        let got = rb.copy_range(0, 0, &mut out);
        assert_eq!(got, 4);
        assert_eq!(&out[..4], &[6.0, 7.0, 8.0, 9.0]);

        // A range entirely in the future yields nothing.
        assert_eq!(rb.copy_range(10, 0, &mut out), 0);
    }
}
