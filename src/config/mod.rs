//! Command-line parsing and validation helpers.

mod defaults;
mod validation;

use crate::pipeline::TaskMode;
use clap::Parser;
use std::path::PathBuf;

pub use defaults::{
    DEFAULT_BLOCK_SIZE, DEFAULT_BUFFER_SEC, DEFAULT_CLIP_GUARD, DEFAULT_SAMPLE_RATE,
    DEFAULT_SILENCE_THRESHOLD, DEFAULT_SLIDE_SEC, DEFAULT_TICK_MS,
};

/// CLI options for the live captioner. Validated values keep the pipeline and
/// the audio layer free of range checks.
#[derive(Debug, Parser, Clone)]
#[command(name = "livecap", about = "Live system audio captions via Whisper", author, version)]
pub struct AppConfig {
    /// Translate captions to English instead of transcribing natively
    #[arg(long)]
    pub translate: bool,

    /// Append emitted captions to a transcript file
    #[arg(long)]
    pub save: bool,

    /// Transcript file path (defaults to a timestamped name with --save)
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Rolling window length in seconds
    #[arg(long = "buffer", default_value_t = DEFAULT_BUFFER_SEC)]
    pub buffer_sec: u64,

    /// Sliding step in seconds
    #[arg(long = "slide", default_value_t = DEFAULT_SLIDE_SEC)]
    pub slide_sec: u64,

    /// Disable the caption overlay window
    #[arg(long = "no-overlay", default_value_t = false)]
    pub no_overlay: bool,

    /// Audio input device index (skips the selection prompt)
    #[arg(long)]
    pub device: Option<usize>,

    /// Print detected audio input devices and exit
    #[arg(long = "list-devices", default_value_t = false)]
    pub list_devices: bool,

    /// Whisper ggml model path (auto-discovered under models/ when omitted)
    #[arg(long = "model-path", env = "LIVECAP_MODEL")]
    pub model_path: Option<PathBuf>,

    /// Mean amplitude below which a full window skips inference
    #[arg(long = "silence-threshold", default_value_t = DEFAULT_SILENCE_THRESHOLD)]
    pub silence_threshold: f32,

    /// Peak level a block must exceed before peak normalization applies
    #[arg(long = "clip-guard", default_value_t = DEFAULT_CLIP_GUARD)]
    pub clip_guard: f32,

    /// Capture sample rate in Hz
    #[arg(long = "sample-rate", default_value_t = DEFAULT_SAMPLE_RATE)]
    pub sample_rate: u32,

    /// Requested capture block size in frames
    #[arg(long = "block-size", default_value_t = DEFAULT_BLOCK_SIZE)]
    pub block_size: u32,

    /// Processing cycle period in overlay mode (milliseconds)
    #[arg(long = "tick-ms", default_value_t = DEFAULT_TICK_MS)]
    pub tick_ms: u64,

    /// Write diagnostic traces to the trace log file
    #[arg(long)]
    pub logs: bool,
}

impl AppConfig {
    /// Snapshot the pipeline-facing settings so the core never sees clap.
    pub fn caption_config(&self) -> CaptionConfig {
        CaptionConfig {
            sample_rate: self.sample_rate,
            block_size: self.block_size,
            buffer_sec: self.buffer_sec,
            slide_sec: self.slide_sec,
            silence_threshold: self.silence_threshold,
            clip_guard: self.clip_guard,
            translate: self.translate,
            tick_ms: self.tick_ms,
        }
    }
}

/// Tunable parameters for the capture + caption pipeline.
#[derive(Debug, Clone)]
pub struct CaptionConfig {
    pub sample_rate: u32,
    pub block_size: u32,
    pub buffer_sec: u64,
    pub slide_sec: u64,
    pub silence_threshold: f32,
    pub clip_guard: f32,
    pub translate: bool,
    pub tick_ms: u64,
}

impl CaptionConfig {
    /// Window length, in samples, at which a cycle attempts inference.
    pub fn trigger_samples(&self) -> usize {
        (u64::from(self.sample_rate) * self.buffer_sec) as usize
    }

    /// Samples removed from the window front after each triggered cycle.
    pub fn slide_samples(&self) -> usize {
        (u64::from(self.sample_rate) * self.slide_sec) as usize
    }

    pub fn task(&self) -> TaskMode {
        if self.translate {
            TaskMode::Translate
        } else {
            TaskMode::Transcribe
        }
    }
}
