//! Pipeline assembly: ring in, published results out.
//!
//! `Pipeline::start` wires the full chain: audio callback writes the ring,
//! the drainer thread assembles windows and runs the [`Analyzer`] on each,
//! and results come out through three read-only consumer surfaces:
//!
//!   - `latest()`: lock-free snapshot of the newest pitch/level/onset
//!     state, for a UI thread polling at its own rate,
//!   - `latest_scope()`: the newest window and autocorrelation buffers,
//!     copied out under a small mutex, for visualization,
//!   - the onset event queue (`rtrb` feature): every transition, in order,
//!     for a recorder driving a [`crate::pipeline::CaptureBuffer`].

use crate::analysis::{
    LevelTracker, OnsetConfig, OnsetDetector, OnsetEvent, OnsetState, PitchEstimator, PitchResult,
};
use crate::buffer::{Area, CircularAudioBuffer};
use crate::pipeline::drainer::WindowDrainer;
use crate::pipeline::publish::Published;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PipelineConfig {
    pub sample_rate: f32,
    pub channels: usize,
    /// Analysis window length in seconds. Windows are fixed-length and
    /// tumbling; this is not adjustable after start.
    pub window_time: f64,
    /// Minimum ring capacity in frames; rounded up to a power of two.
    pub ring_frames: usize,
    /// Level envelope decay time in seconds.
    pub decay_time: f32,
    pub onset: OnsetConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100.0,
            channels: 1,
            window_time: 0.05,
            ring_frames: 1 << 15,
            decay_time: 0.1,
            onset: OnsetConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn window_frames(&self) -> usize {
        (self.window_time * self.sample_rate as f64) as usize
    }
}

/// Everything a presentation thread wants per frame, small and `Copy` so
/// it can travel through the lock-free publication slots.
#[derive(Debug, Clone, Copy, Default)]
pub struct PitchSnapshot {
    pub result: PitchResult,
    /// Envelope level at the end of the window.
    pub level: f32,
    pub onset: OnsetState,
    /// Absolute frame index of the analyzed window's first frame.
    pub window_start: u64,
}

/// Bulky visualization buffers, shared under a mutex (they are too big for
/// the slot publication path).
#[derive(Default)]
pub struct ScopeBuffers {
    /// Channel 0 of the last analyzed window.
    pub window: Vec<f32>,
    pub autocorrelation: Vec<f32>,
    pub window_start: u64,
}

/// Per-window analysis driver. Runs on the drainer thread; owns all of
/// the per-window state and scratch.
pub struct Analyzer {
    channels: usize,
    mono: Vec<f32>,
    levels: Vec<f32>,
    estimator: PitchEstimator,
    tracker: LevelTracker,
    detector: OnsetDetector,
    events: Vec<OnsetEvent>,
    published: Arc<Published<PitchSnapshot>>,
    scope: Arc<Mutex<ScopeBuffers>>,
    #[cfg(feature = "rtrb")]
    event_tx: Option<rtrb::Producer<OnsetEvent>>,
}

impl Analyzer {
    pub fn new(
        config: &PipelineConfig,
        published: Arc<Published<PitchSnapshot>>,
        scope: Arc<Mutex<ScopeBuffers>>,
    ) -> Self {
        let estimator = PitchEstimator::new(config.window_time, config.sample_rate);
        let window_frames = estimator.window_length();
        Self {
            channels: config.channels,
            mono: vec![0.0; window_frames],
            levels: vec![0.0; window_frames],
            estimator,
            tracker: LevelTracker::new(config.sample_rate, config.decay_time),
            detector: OnsetDetector::new(config.onset, config.sample_rate),
            events: Vec::new(),
            published,
            scope,
            #[cfg(feature = "rtrb")]
            event_tx: None,
        }
    }

    #[cfg(feature = "rtrb")]
    pub fn with_event_queue(mut self, event_tx: rtrb::Producer<OnsetEvent>) -> Self {
        self.event_tx = Some(event_tx);
        self
    }

    /// Analyze one interleaved window starting at absolute frame `start`.
    pub fn process_window(&mut self, window: &[f32], start: u64) {
        // Analysis runs on channel 0; other channels ride along for
        // capture and visualization only.
        Area::channel(window, 0, self.channels).copy_to(&mut self.mono);

        let result = self.estimator.estimate(&self.mono);
        self.tracker.process(&self.mono, &mut self.levels);

        self.events.clear();
        self.detector
            .process(start, &self.levels, result.confidence, &mut self.events);

        #[cfg(feature = "rtrb")]
        if let Some(event_tx) = &mut self.event_tx {
            for &event in &self.events {
                // A full queue means the consumer stalled; dropping the
                // event is the documented policy, same as the ring.
                let _ = event_tx.push(event);
            }
        }

        self.published.publish(PitchSnapshot {
            result,
            level: self.tracker.level(),
            onset: self.detector.state(),
            window_start: start,
        });

        if let Ok(mut scope) = self.scope.lock() {
            scope.window.clone_from(&self.mono);
            scope.autocorrelation.clear();
            scope
                .autocorrelation
                .extend_from_slice(self.estimator.autocorrelation());
            scope.window_start = start;
        }
    }

    pub fn window_frames(&self) -> usize {
        self.estimator.window_length()
    }

    /// Transitions found in the most recent window.
    pub fn last_events(&self) -> &[OnsetEvent] {
        &self.events
    }
}

/// The running pipeline: ring, drainer thread, and consumer handles.
pub struct Pipeline {
    config: PipelineConfig,
    ring: Arc<CircularAudioBuffer>,
    published: Arc<Published<PitchSnapshot>>,
    scope: Arc<Mutex<ScopeBuffers>>,
    drainer: WindowDrainer,
    #[cfg(feature = "rtrb")]
    events: Option<rtrb::Consumer<OnsetEvent>>,
    stopped: bool,
}

impl Pipeline {
    /// Build the chain and start the analysis thread.
    pub fn start(config: PipelineConfig) -> Self {
        let ring = Arc::new(CircularAudioBuffer::new(
            config.ring_frames,
            config.channels,
            config.sample_rate,
        ));
        let published = Arc::new(Published::new(2));
        let scope = Arc::new(Mutex::new(ScopeBuffers::default()));

        #[cfg(feature = "rtrb")]
        let (event_tx, event_rx) = rtrb::RingBuffer::new(256);

        let analyzer = Analyzer::new(&config, Arc::clone(&published), Arc::clone(&scope));
        #[cfg(feature = "rtrb")]
        let analyzer = analyzer.with_event_queue(event_tx);
        let mut analyzer = analyzer;

        let window_frames = config.window_frames();
        let drainer = WindowDrainer::spawn(Arc::clone(&ring), window_frames, move |window, start| {
            analyzer.process_window(window, start);
        });

        Self {
            config,
            ring,
            published,
            scope,
            drainer,
            #[cfg(feature = "rtrb")]
            events: Some(event_rx),
            stopped: false,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// The shared ring. The audio callback writes it; everyone else only
    /// reads (cursors, capture backfill, raw visualization).
    pub fn ring(&self) -> &Arc<CircularAudioBuffer> {
        &self.ring
    }

    /// Latest analysis snapshot, or `None` before the first window.
    pub fn latest(&self) -> Option<PitchSnapshot> {
        self.published.latest()
    }

    /// Number of windows analyzed so far.
    pub fn windows_analyzed(&self) -> u64 {
        self.published.published_count()
    }

    /// Copy the newest window and autocorrelation into caller buffers.
    /// Returns the window's starting frame.
    pub fn latest_scope(&self, window: &mut Vec<f32>, autocorrelation: &mut Vec<f32>) -> u64 {
        let scope = self.scope.lock().expect("scope mutex poisoned");
        window.clone_from(&scope.window);
        autocorrelation.clone_from(&scope.autocorrelation);
        scope.window_start
    }

    /// Take the onset event consumer. Yields each detector transition in
    /// order; intended for the thread driving capture.
    #[cfg(feature = "rtrb")]
    pub fn take_events(&mut self) -> Option<rtrb::Consumer<OnsetEvent>> {
        self.events.take()
    }

    /// Stop the analysis thread and join it.
    ///
    /// Call after the audio input stream has stopped: this writes silence
    /// into the ring to flush the drainer's in-flight window read, which
    /// requires being the only writer at that point.
    pub fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        self.drainer.request_stop();
        let flush = vec![0.0; 2 * self.config.window_frames() * self.config.channels];
        self.ring.write(&flush[..flush.len().min(self.ring.capacity() * self.config.channels)]);
        self.drainer.stop();
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> PipelineConfig {
        PipelineConfig {
            sample_rate: 8_000.0,
            channels: 1,
            window_time: 0.032, // 256 frames
            ring_frames: 1 << 12,
            ..PipelineConfig::default()
        }
    }

    fn sine(frames: usize, frequency: f32, sample_rate: f32, amplitude: f32) -> Vec<f32> {
        (0..frames)
            .map(|i| {
                amplitude * (2.0 * std::f32::consts::PI * frequency * i as f32 / sample_rate).sin()
            })
            .collect()
    }

    #[test]
    fn analyzer_publishes_snapshot_and_onset() {
        let config = test_config();
        let published = Arc::new(Published::new(2));
        let scope = Arc::new(Mutex::new(ScopeBuffers::default()));
        let mut analyzer = Analyzer::new(&config, Arc::clone(&published), Arc::clone(&scope));

        let window = sine(analyzer.window_frames(), 500.0, config.sample_rate, 0.6);
        analyzer.process_window(&window, 0);

        let snapshot = published.latest().expect("snapshot published");
        assert_eq!(snapshot.window_start, 0);
        assert!(snapshot.result.confidence > 0.5);
        assert!((snapshot.result.frequency - 500.0).abs() < 35.0);
        assert!(snapshot.onset.active, "a loud window should trigger onset");
        assert_eq!(analyzer.last_events().len(), 1);

        let scope = scope.lock().unwrap();
        assert_eq!(scope.window.len(), window.len());
        assert_eq!(scope.autocorrelation.len(), window.len());
        assert!((scope.autocorrelation[0] - 1.0).abs() < 1e-4);
    }

    #[test]
    fn pipeline_runs_and_stops_cleanly() {
        let config = test_config();
        let window_frames = config.window_frames();
        let mut pipeline = Pipeline::start(config);

        let tone = sine(window_frames * 4, 500.0, 8_000.0, 0.6);
        for block in tone.chunks(128) {
            pipeline.ring().write(block);
        }

        while pipeline.windows_analyzed() < 4 {
            std::thread::sleep(std::time::Duration::from_millis(1));
        }

        let snapshot = pipeline.latest().unwrap();
        assert!(snapshot.result.confidence > 0.5);
        assert!(snapshot.window_start >= 3 * window_frames as u64);

        pipeline.stop();
        // Stop is idempotent and Drop tolerates an already stopped pipeline.
        pipeline.stop();
    }
}
