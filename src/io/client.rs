//! cpal-backed audio client.
//!
//! The input callback does exactly one thing: write the interleaved block
//! into the ring. No locks, no allocation, no waiting; everything else
//! happens on the analysis thread.

use crate::buffer::{BufferCursor, CircularAudioBuffer};
use crate::io::StreamConfig;
use color_eyre::eyre::{eyre, Result, WrapErr};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::Arc;

fn stream_config(config: &StreamConfig) -> cpal::StreamConfig {
    cpal::StreamConfig {
        channels: config.channels as u16,
        sample_rate: cpal::SampleRate(config.sample_rate as u32),
        buffer_size: cpal::BufferSize::Fixed(config.block_frames as u32),
    }
}

/// Open the default input device and feed `ring` from its callback.
///
/// The returned stream stops when dropped; drop it before stopping the
/// pipeline so the ring's single-writer contract holds during shutdown.
pub fn run_input(ring: Arc<CircularAudioBuffer>, config: &StreamConfig) -> Result<cpal::Stream> {
    assert_eq!(ring.channels(), config.channels);

    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| eyre!("no default input device available"))?;

    let stream = device
        .build_input_stream(
            &stream_config(config),
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                ring.write(data);
            },
            |err| eprintln!("input stream error: {err}"),
            None,
        )
        .wrap_err("failed to build input stream")?;
    stream.play().wrap_err("failed to start input stream")?;
    Ok(stream)
}

/// Open the default output device and play back what a cursor reads,
/// for monitoring. Falls back to silence whenever the cursor has less
/// than a full block available, so the callback never waits.
pub fn run_monitor(mut cursor: BufferCursor, config: &StreamConfig) -> Result<cpal::Stream> {
    let channels = config.channels;

    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| eyre!("no default output device available"))?;

    let stream = device
        .build_output_stream(
            &stream_config(config),
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                let frames = data.len() / channels;
                if cursor.can_read(frames) {
                    // Guaranteed non-blocking: availability was checked,
                    // so each read returns immediately (short only at the
                    // wrap boundary).
                    let mut filled = 0;
                    while filled < data.len() {
                        let got = cursor.read_into(&mut data[filled..]);
                        filled += got * channels;
                    }
                } else {
                    data.fill(0.0);
                }
            },
            |err| eprintln!("output stream error: {err}"),
            None,
        )
        .wrap_err("failed to build output stream")?;
    stream.play().wrap_err("failed to start output stream")?;
    Ok(stream)
}
