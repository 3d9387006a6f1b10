//! The threads and hand-offs around the per-window analysis.
//!
//! Three clock domains meet here: the audio callback writes the ring, the
//! drainer thread assembles and analyzes windows, and a presentation
//! thread reads published snapshots. Only the drainer ever blocks.

/// Event capture buffer with ring backfill.
pub mod capture;
/// Window assembly thread.
pub mod drainer;
/// Pipeline assembly: analyzer, configuration, consumer handles.
pub mod engine;
/// Lock-free latest-value publication.
pub mod publish;

pub use capture::CaptureBuffer;
pub use drainer::WindowDrainer;
pub use engine::{Pipeline, PipelineConfig, PitchSnapshot};
pub use publish::Published;
