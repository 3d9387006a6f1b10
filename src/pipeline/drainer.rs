//! Background thread that drains a cursor into fixed-length windows.
//!
//! Each iteration fills one non-overlapping window of interleaved frames
//! by looping over blocking cursor reads (a read comes back short at the
//! ring's physical wrap boundary), then hands the window and its absolute
//! starting frame index to the processing callback. Windows arrive at the
//! callback strictly in stream order.
//!
//! If the writer laps the cursor, the cursor skips ahead and the next
//! window's start index jumps accordingly; the gap is visible both there
//! and in the cursor's dropped-frame counter.

use crate::buffer::{BufferCursor, CircularAudioBuffer};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

pub struct WindowDrainer {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl WindowDrainer {
    /// Spawn the drainer thread with a fresh cursor into `buffer`.
    ///
    /// The callback receives `(window, start_frame)` where `window` holds
    /// `window_frames * channels` interleaved samples and `start_frame` is
    /// the absolute frame index of the window's first frame.
    pub fn spawn<F>(buffer: Arc<CircularAudioBuffer>, window_frames: usize, mut callback: F) -> Self
    where
        F: FnMut(&[f32], u64) + Send + 'static,
    {
        assert!(window_frames > 0);
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);
        let handle = thread::Builder::new()
            .name("window-drainer".into())
            .spawn(move || {
                let channels = buffer.channels();
                let mut cursor = BufferCursor::new(buffer);
                let mut window = vec![0.0f32; window_frames * channels];
                // Stop is checked once per window; an in-flight blocking
                // read is never interrupted.
                while flag.load(Ordering::Acquire) {
                    let mut filled = 0;
                    while filled < window.len() {
                        let frames = cursor.read_into(&mut window[filled..]);
                        filled += frames * channels;
                    }
                    let start = cursor.position() - window_frames as u64;
                    callback(&window, start);
                }
            })
            .expect("failed to spawn window drainer thread");
        Self {
            running,
            handle: Some(handle),
        }
    }

    /// Ask the thread to exit after its current window. Non-blocking.
    pub fn request_stop(&self) {
        self.running.store(false, Ordering::Release);
    }

    /// Signal stop and join.
    ///
    /// The thread only notices the flag between windows, so if the buffer
    /// has gone quiet mid-window this blocks until it is fed again. Stop
    /// while the stream is still running, or feed a window of silence
    /// after `request_stop`.
    pub fn stop(&mut self) {
        self.request_stop();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for WindowDrainer {
    fn drop(&mut self) {
        self.stop();
    }
}
