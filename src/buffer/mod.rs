//! Sample storage shared between the audio callback and analysis readers.
//!
//! The ring is the only structure touched by the realtime audio thread, so
//! everything in here is allocation-free and lock-free on the write path.

/// Strided read/write views over interleaved sample buffers.
pub mod area;
/// Single-writer, multi-reader circular buffer with monotonic cursors.
pub mod ring;

pub use area::{Area, AreaMut};
pub use ring::{BufferCursor, CircularAudioBuffer};
