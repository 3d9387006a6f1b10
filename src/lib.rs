pub mod analysis; // Per-window DSP: autocorrelation, pitch, level, onset
pub mod buffer; // Lock-free circular audio buffer and strided views
pub mod io;
pub mod pipeline; // Drainer thread, result publication, event capture

pub use analysis::pitch::{PitchClass, PitchResult};
pub use pipeline::engine::{Pipeline, PipelineConfig, PitchSnapshot};

/// Largest block the audio callback is expected to deliver in one call.
pub const MAX_BLOCK_SIZE: usize = 2048;
pub(crate) const MIN_TIME: f32 = 1.0 / 48_000.0;
