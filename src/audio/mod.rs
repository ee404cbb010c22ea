//! Audio capture and block conditioning.
//!
//! Samples arrive from CPAL on the driver's callback thread, are downmixed to
//! mono and peak-normalized there, and cross into the processing loop through
//! a non-blocking channel. All downstream consumers see 16 kHz mono f32 PCM.

/// Target sample rate for Whisper STT.
pub const TARGET_RATE: u32 = 16_000;

/// Target channel count for Whisper STT.
pub const TARGET_CHANNELS: u32 = 1;

mod mixer;
mod queue;
mod stream;

pub use mixer::{downmix_to_mono, peak_normalize, BlockMixer};
pub use queue::{block_channel, BlockReceiver, BlockSender};
pub use stream::{list_devices, prompt_device, AudioStream, CaptureStream, DeviceInfo};
