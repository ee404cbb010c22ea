//! System audio capture via CPAL.
//!
//! Handles device enumeration, the selection prompt, and opening the input
//! stream. The stream callback only mixes, normalizes, and enqueues; all
//! heavier work happens on the processing side of the block channel.

use super::mixer::BlockMixer;
use super::queue::BlockSender;
use crate::config::CaptionConfig;
use anyhow::{anyhow, bail, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, SampleFormat, SampleRate, StreamConfig, SupportedStreamConfig};
use std::io::{self, Write};
use tracing::debug;

/// One row of the device selection prompt.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub index: usize,
    pub name: String,
    pub channels: u16,
}

/// List audio input devices with their channel counts so the CLI can expose
/// a human-friendly selector.
pub fn list_devices() -> Result<Vec<DeviceInfo>> {
    let host = cpal::default_host();
    let devices = host.input_devices().context("no input devices available")?;
    let mut infos = Vec::new();
    for (index, device) in devices.enumerate() {
        let name = device
            .name()
            .unwrap_or_else(|_| "unknown device".to_string());
        let channels = device
            .default_input_config()
            .map(|cfg| cfg.channels())
            .unwrap_or(0);
        infos.push(DeviceInfo {
            index,
            name,
            channels,
        });
    }
    Ok(infos)
}

/// Print the device table and read an index from standard input.
pub fn prompt_device(devices: &[DeviceInfo]) -> Result<usize> {
    if devices.is_empty() {
        bail!("no audio input devices detected");
    }
    println!("Available audio input devices:");
    for dev in devices {
        println!("{:>3}: {} ({} input channels)", dev.index, dev.name, dev.channels);
    }
    print!("Enter device ID: ");
    io::stdout().flush().context("failed to flush prompt")?;

    let mut line = String::new();
    io::stdin()
        .read_line(&mut line)
        .context("failed to read device selection")?;
    let index: usize = line
        .trim()
        .parse()
        .context("device ID must be an integer")?;
    if index >= devices.len() {
        bail!(
            "device ID {index} out of range (0..={})",
            devices.len() - 1
        );
    }
    Ok(index)
}

/// Minimal contract the shutdown path needs from a capture stream. Lets the
/// session logic run against a test double with no audio hardware.
pub trait AudioStream {
    /// Stop delivering blocks. Must be safe to call more than once.
    fn stop(&mut self);
}

/// An open CPAL input stream feeding the block channel.
pub struct CaptureStream {
    stream: cpal::Stream,
    device_name: String,
    stopped: bool,
}

impl CaptureStream {
    /// Open the selected device, preferring the target sample rate and block
    /// size, and start streaming into `sender`.
    pub fn open(device_index: usize, cfg: &CaptionConfig, sender: BlockSender) -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .input_devices()
            .context("no input devices available")?
            .nth(device_index)
            .ok_or_else(|| anyhow!("input device {device_index} not found"))?;
        let device_name = device
            .name()
            .unwrap_or_else(|_| "unknown device".to_string());

        let selected = select_input_config(&device, cfg.sample_rate)?;
        let format = selected.sample_format();
        if !matches!(
            format,
            SampleFormat::F32 | SampleFormat::I16 | SampleFormat::U16
        ) {
            bail!("unsupported sample format: {format:?}");
        }

        let mut stream_config: StreamConfig = selected.into();
        stream_config.buffer_size = BufferSize::Fixed(cfg.block_size);
        let device_rate = stream_config.sample_rate.0;
        let channels = usize::from(stream_config.channels.max(1));

        debug!(
            device = %device_name,
            ?format,
            device_rate,
            channels,
            "opening capture stream"
        );

        let mixer = || {
            BlockMixer::new(
                channels,
                cfg.clip_guard,
                device_rate,
                cfg.sample_rate,
                sender.clone(),
            )
        };

        // Some hosts refuse a fixed block size; fall back to the driver's
        // default sizing rather than failing startup.
        let stream = match build_input_stream(&device, &stream_config, format, mixer()) {
            Ok(stream) => stream,
            Err(err) => {
                debug!(error = %err, "fixed block size rejected, retrying with driver default");
                stream_config.buffer_size = BufferSize::Default;
                build_input_stream(&device, &stream_config, format, mixer())
                    .context("failed to open audio input stream")?
            }
        };

        stream
            .play()
            .context("failed to start audio input stream")?;

        Ok(Self {
            stream,
            device_name,
            stopped: false,
        })
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }
}

impl AudioStream for CaptureStream {
    fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        if let Err(err) = self.stream.pause() {
            debug!(error = %err, "failed to pause audio stream");
        }
    }
}

fn stream_error(err: cpal::StreamError) {
    debug!(error = %err, "audio stream error");
}

fn build_input_stream(
    device: &cpal::Device,
    config: &StreamConfig,
    format: SampleFormat,
    mut mixer: BlockMixer,
) -> Result<cpal::Stream> {
    // Convert every supported sample type to f32 up front so the rest of the
    // pipeline stays format-agnostic. The mixer moves into the callback and
    // never leaves the audio thread.
    let stream = match format {
        SampleFormat::F32 => device.build_input_stream(
            config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                mixer.push(data, |sample| sample);
            },
            stream_error,
            None,
        )?,
        SampleFormat::I16 => device.build_input_stream(
            config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                mixer.push(data, |sample| sample as f32 / 32_768.0_f32);
            },
            stream_error,
            None,
        )?,
        SampleFormat::U16 => device.build_input_stream(
            config,
            move |data: &[u16], _: &cpal::InputCallbackInfo| {
                mixer.push(data, |sample| (sample as f32 - 32_768.0_f32) / 32_768.0_f32);
            },
            stream_error,
            None,
        )?,
        other => bail!("unsupported sample format: {other:?}"),
    };
    Ok(stream)
}

/// Prefer a supported config at the target rate; otherwise take the device
/// default and let the mixer resample per block.
fn select_input_config(device: &cpal::Device, target_rate: u32) -> Result<SupportedStreamConfig> {
    if let Ok(ranges) = device.supported_input_configs() {
        for range in ranges {
            if let Some(cfg) = range.try_with_sample_rate(SampleRate(target_rate)) {
                return Ok(cfg);
            }
        }
    }
    device
        .default_input_config()
        .context("failed to query device input config")
}
