use super::defaults::{
    default_output_path, MAX_BLOCK_SIZE, MAX_BUFFER_SEC, MAX_SAMPLE_RATE, MAX_TICK_MS,
    MIN_BLOCK_SIZE, MIN_SAMPLE_RATE, MIN_TICK_MS,
};
use super::AppConfig;
use anyhow::{bail, Result};
use std::path::{Path, PathBuf};

impl AppConfig {
    /// Check CLI values and resolve the transcript path.
    pub fn validate(&mut self) -> Result<()> {
        if self.buffer_sec == 0 || self.buffer_sec > MAX_BUFFER_SEC {
            bail!(
                "--buffer must be between 1 and {MAX_BUFFER_SEC} seconds, got {}",
                self.buffer_sec
            );
        }
        if self.slide_sec == 0 {
            bail!("--slide must be at least 1 second");
        }
        if self.slide_sec > self.buffer_sec {
            bail!(
                "--slide ({}) cannot exceed --buffer ({}); consecutive windows must overlap or abut",
                self.slide_sec,
                self.buffer_sec
            );
        }
        if !(MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&self.sample_rate) {
            bail!(
                "--sample-rate must be between {MIN_SAMPLE_RATE} and {MAX_SAMPLE_RATE} Hz, got {}",
                self.sample_rate
            );
        }
        if !(MIN_BLOCK_SIZE..=MAX_BLOCK_SIZE).contains(&self.block_size) {
            bail!(
                "--block-size must be between {MIN_BLOCK_SIZE} and {MAX_BLOCK_SIZE} frames, got {}",
                self.block_size
            );
        }
        if !(0.0..=1.0).contains(&self.silence_threshold) {
            bail!(
                "--silence-threshold must be between 0.0 and 1.0, got {}",
                self.silence_threshold
            );
        }
        if !(0.0..=1.0).contains(&self.clip_guard) {
            bail!(
                "--clip-guard must be between 0.0 and 1.0, got {}",
                self.clip_guard
            );
        }
        if !(MIN_TICK_MS..=MAX_TICK_MS).contains(&self.tick_ms) {
            bail!(
                "--tick-ms must be between {MIN_TICK_MS} and {MAX_TICK_MS}, got {}",
                self.tick_ms
            );
        }

        if self.output.is_some() && !self.save {
            bail!("--output requires --save");
        }
        if self.save && self.output.is_none() {
            self.output = Some(default_output_path());
        }

        if let Some(model) = &self.model_path {
            if !model.exists() {
                bail!("whisper model path '{}' does not exist", model.display());
            }
        }

        Ok(())
    }

    /// Resolve the whisper model: the explicit flag, or a ggml file from the
    /// local models/ directory.
    pub fn resolved_model_path(&self) -> Result<PathBuf> {
        if let Some(model) = &self.model_path {
            return Ok(model.clone());
        }
        if let Some(found) = discover_default_model(Path::new("models")) {
            return Ok(found);
        }
        bail!(
            "no whisper model found; pass --model-path or place a ggml model under models/ \
             (e.g. models/ggml-base.bin)"
        );
    }
}

/// Look for a ggml model under `models_dir` so the captioner works
/// out-of-the-box when users haven't provided --model-path.
fn discover_default_model(models_dir: &Path) -> Option<PathBuf> {
    if !models_dir.exists() {
        return None;
    }

    let candidates = [
        models_dir.join("ggml-base.en.bin"),
        models_dir.join("ggml-base.bin"),
        models_dir.join("ggml-small.en.bin"),
        models_dir.join("ggml-small.bin"),
    ];
    for candidate in candidates {
        if candidate.exists() {
            return Some(candidate);
        }
    }

    None
}
