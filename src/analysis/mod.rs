//! Per-window analysis components.
//!
//! Everything here runs on the single analysis thread, one window at a
//! time, in arrival order. The components keep their own state across
//! windows (envelope level, onset state machine) but never touch another
//! thread's data; the pipeline layer owns the hand-off.

/// FFT-based autocorrelation of a fixed-length window.
pub mod autocorrelation;
/// Peak-hold amplitude envelope follower.
pub mod level;
/// Hysteresis onset/offset detection over the level envelope.
pub mod onset;
/// Fundamental frequency estimation from the autocorrelation peak.
pub mod pitch;

pub use autocorrelation::SpectralAutocorrelator;
pub use level::LevelTracker;
pub use onset::{OnsetConfig, OnsetDetector, OnsetEvent, OnsetState};
pub use pitch::{Note, PitchEstimator, PitchResult};
