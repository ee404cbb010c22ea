use chrono::Local;
use std::path::PathBuf;

pub const DEFAULT_BUFFER_SEC: u64 = 4;
pub const DEFAULT_SLIDE_SEC: u64 = 2;
pub const DEFAULT_SAMPLE_RATE: u32 = 16_000;
pub const DEFAULT_BLOCK_SIZE: u32 = 2_048;
pub const DEFAULT_SILENCE_THRESHOLD: f32 = 0.01;
pub const DEFAULT_CLIP_GUARD: f32 = 0.02;
pub const DEFAULT_TICK_MS: u64 = 100;

pub(crate) const MAX_BUFFER_SEC: u64 = 60;
pub(crate) const MIN_SAMPLE_RATE: u32 = 8_000;
pub(crate) const MAX_SAMPLE_RATE: u32 = 96_000;
pub(crate) const MIN_BLOCK_SIZE: u32 = 256;
pub(crate) const MAX_BLOCK_SIZE: u32 = 16_384;
pub(crate) const MIN_TICK_MS: u64 = 10;
pub(crate) const MAX_TICK_MS: u64 = 2_000;

/// Timestamped transcript name used when --save is given without --output.
pub(crate) fn default_output_path() -> PathBuf {
    PathBuf::from(format!(
        "transcript_{}.txt",
        Local::now().format("%Y%m%d_%H%M%S")
    ))
}
