//! # Audio Capture Module
//!
//! Real-time microphone capture through CPAL (Cross-Platform Audio Library).
//! Callback data is re-chunked into fixed-size frames of 16-bit
//! little-endian PCM and pushed into the detection frame queue.
//!
//! Only built with the `capture` feature.

use anyhow::{Result, anyhow};
use cpal::SupportedStreamConfigRange;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use crate::config::Settings;
use crate::pipeline::FrameSender;

/// Starts capture from the default input device.
///
/// The device is opened mono, 16-bit, at `settings.sample_rate`; every
/// `settings.buffer_size` samples become one frame on `sender`. The
/// returned stream stops when dropped.
///
/// # Errors
/// No input device, no mono 16-bit format at the requested rate, or any
/// CPAL failure while building or starting the stream.
pub fn start_audio_capture(sender: FrameSender, settings: &Settings) -> Result<cpal::Stream> {
    settings.validate()?;
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| anyhow!("No input device available"))?;

    tracing::info!(device = %device.name()?, "using audio input device");

    let target_rate = settings.sample_rate.round() as u32;
    let configs = device.supported_input_configs()?.collect::<Vec<_>>();
    let supported_config = find_supported_config(configs, target_rate).ok_or_else(|| {
        anyhow!("No mono 16-bit input format supports {target_rate} Hz")
    })?;

    let config: cpal::StreamConfig = supported_config
        .with_sample_rate(cpal::SampleRate(target_rate))
        .into();
    tracing::info!(sample_rate = target_rate, buffer_size = settings.buffer_size, "capture configured");

    let err_fn = |err| tracing::error!(%err, "audio stream error");

    let frame_bytes = settings.buffer_size * 2;
    let mut pending: Vec<u8> = Vec::with_capacity(frame_bytes * 2);

    let stream = device.build_input_stream(
        &config,
        move |data: &[i16], _: &cpal::InputCallbackInfo| {
            pending.extend(data.iter().flat_map(|sample| sample.to_le_bytes()));
            while pending.len() >= frame_bytes {
                let frame: Vec<u8> = pending.drain(..frame_bytes).collect();
                sender.push(frame);
            }
        },
        err_fn,
        None,
    )?;

    stream.play()?;
    Ok(stream)
}

/// Picks a mono 16-bit configuration whose rate range contains
/// `target_rate`, preferring the narrowest range.
fn find_supported_config(
    configs: Vec<SupportedStreamConfigRange>,
    target_rate: u32,
) -> Option<SupportedStreamConfigRange> {
    configs
        .into_iter()
        .filter(|c| c.channels() == 1 && c.sample_format() == cpal::SampleFormat::I16)
        .filter(|c| (c.min_sample_rate().0..=c.max_sample_rate().0).contains(&target_rate))
        .min_by_key(|c| c.max_sample_rate().0 - c.min_sample_rate().0)
}
