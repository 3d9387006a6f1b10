//! Live tuner: microphone in, detected note out.
//!
//! Run with: cargo run --example live_tuner --features cpal

use color_eyre::eyre::Result;
use pitchline::io::{run_input, StreamConfig};
use pitchline::{Pipeline, PipelineConfig};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const RUN_SECONDS: u64 = 30;

fn main() -> Result<()> {
    color_eyre::install()?;

    let stream_config = StreamConfig::default();
    let pipeline_config = PipelineConfig {
        sample_rate: stream_config.sample_rate,
        channels: stream_config.channels,
        ..PipelineConfig::default()
    };

    let mut pipeline = Pipeline::start(pipeline_config);
    let stream = run_input(Arc::clone(pipeline.ring()), &stream_config)?;

    println!("listening for {RUN_SECONDS}s (50 ms windows, autocorrelation pitch)...");
    for _ in 0..RUN_SECONDS * 10 {
        thread::sleep(Duration::from_millis(100));
        let Some(snapshot) = pipeline.latest() else {
            continue;
        };
        let result = snapshot.result;
        match result.note {
            Some(note) if result.confidence > 0.5 => println!(
                "{:>7.1} Hz  {:<8} conf {:.2}  level {:.3}  {}",
                result.frequency,
                note.to_string(),
                result.confidence,
                snapshot.level,
                if snapshot.onset.active { "active" } else { "" },
            ),
            _ => println!("     --     no pitch      level {:.3}", snapshot.level),
        }
    }

    drop(stream); // stop feeding before stopping the pipeline
    pipeline.stop();
    Ok(())
}
