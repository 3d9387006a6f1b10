//! Benchmarks for the per-window analysis path.
//!
//! Run with: cargo bench
//!
//! The analysis thread must keep up with the stream: one 50 ms window of
//! audio arrives every 50 ms, so the whole estimate + level + onset pass
//! has a 50 ms deadline with plenty of headroom expected.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use pitchline::analysis::{LevelTracker, OnsetConfig, OnsetDetector, PitchEstimator};
use pitchline::buffer::{BufferCursor, CircularAudioBuffer};
use std::sync::Arc;

const SAMPLE_RATE: f32 = 44_100.0;

/// Window durations in seconds commonly used for pitch tracking.
const WINDOW_TIMES: &[f64] = &[0.025, 0.05, 0.1];

fn sine_window(frames: usize, frequency: f32) -> Vec<f32> {
    (0..frames)
        .map(|i| 0.5 * (2.0 * std::f32::consts::PI * frequency * i as f32 / SAMPLE_RATE).sin())
        .collect()
}

fn bench_pitch_estimation(c: &mut Criterion) {
    let mut group = c.benchmark_group("analysis/pitch");
    for &window_time in WINDOW_TIMES {
        let mut estimator = PitchEstimator::new(window_time, SAMPLE_RATE);
        let window = sine_window(estimator.window_length(), 220.0);
        group.bench_with_input(
            BenchmarkId::new("estimate", estimator.window_length()),
            &window_time,
            |b, _| b.iter(|| estimator.estimate(black_box(&window))),
        );
    }
    group.finish();
}

fn bench_level_and_onset(c: &mut Criterion) {
    let mut group = c.benchmark_group("analysis/envelope");
    let window = sine_window(2205, 220.0);
    let mut levels = vec![0.0f32; window.len()];

    let mut tracker = LevelTracker::new(SAMPLE_RATE, 0.1);
    group.bench_function("level_tracker", |b| {
        b.iter(|| tracker.process(black_box(&window), black_box(&mut levels)))
    });

    let mut detector = OnsetDetector::new(OnsetConfig::default(), SAMPLE_RATE);
    let mut events = Vec::new();
    group.bench_function("onset_detector", |b| {
        b.iter(|| {
            events.clear();
            detector.process(0, black_box(&levels), 0.0, &mut events);
        })
    });
    group.finish();
}

fn bench_ring_round_trip(c: &mut Criterion) {
    let mut group = c.benchmark_group("buffer/ring");
    let ring = Arc::new(CircularAudioBuffer::new(1 << 15, 1, SAMPLE_RATE));
    let block = sine_window(32, 220.0);
    let mut out = vec![0.0f32; 32];
    let mut cursor = BufferCursor::new(Arc::clone(&ring));

    // One audio callback block written and drained per iteration.
    group.bench_function("write_read_block_32", |b| {
        b.iter(|| {
            ring.write(black_box(&block));
            let mut filled = 0;
            while filled < out.len() {
                filled += cursor.read_into(&mut out[filled..]);
            }
        })
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_pitch_estimation,
    bench_level_and_onset,
    bench_ring_round_trip
);
criterion_main!(benches);
