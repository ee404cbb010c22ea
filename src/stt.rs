//! Lightweight wrapper around whisper_rs that hides initialization noise and
//! gives the pipeline a simple "transcribe this window" API.

use crate::pipeline::{SpeechEngine, TaskMode, Transcription};
use anyhow::Result;

#[cfg(unix)]
mod platform {
    use crate::pipeline::{Segment, TaskMode, Transcription};
    use anyhow::{anyhow, Context, Result};
    use std::io;
    use std::os::raw::{c_char, c_uint, c_void};
    use std::os::unix::io::AsRawFd;
    use std::sync::Once;
    use tracing::debug;
    use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

    /// Owns a single Whisper context so every window reuses the same
    /// memory-mapped model.
    pub struct Transcriber {
        ctx: WhisperContext,
    }

    impl Transcriber {
        /// Load the Whisper model, temporarily silencing stderr because
        /// whisper.cpp is chatty.
        pub fn new(model_path: &str) -> Result<Self> {
            install_whisper_log_silencer();

            let null = std::fs::OpenOptions::new()
                .write(true)
                .open("/dev/null")
                .context("failed to open /dev/null")?;
            let null_fd = null.as_raw_fd();

            // Save original stderr
            let orig_stderr = unsafe { libc::dup(2) };
            if orig_stderr < 0 {
                return Err(anyhow!(
                    "failed to dup stderr: {}",
                    io::Error::last_os_error()
                ));
            }

            // Redirect stderr to /dev/null temporarily
            let dup_result = unsafe { libc::dup2(null_fd, 2) };
            if dup_result < 0 {
                unsafe {
                    libc::close(orig_stderr);
                }
                return Err(anyhow!(
                    "failed to redirect stderr: {}",
                    io::Error::last_os_error()
                ));
            }

            // Load model (output will be suppressed)
            let ctx_result =
                WhisperContext::new_with_params(model_path, WhisperContextParameters::default());

            // Restore original stderr
            let restore_result = unsafe { libc::dup2(orig_stderr, 2) };
            unsafe {
                libc::close(orig_stderr);
            }
            if restore_result < 0 {
                return Err(anyhow!(
                    "failed to restore stderr: {}",
                    io::Error::last_os_error()
                ));
            }

            let ctx = ctx_result.context("failed to load whisper model")?;
            Ok(Self { ctx })
        }

        /// Transcribe (or translate) one audio window. Language is
        /// auto-detected; decoding is greedy with beam size 1 and word-level
        /// timestamps disabled, trading accuracy for latency.
        pub fn transcribe_window(&self, samples: &[f32], task: TaskMode) -> Result<Transcription> {
            let mut state = self
                .ctx
                .create_state()
                .context("failed to create whisper state")?;
            let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
            params.set_language(None);
            params.set_detect_language(true);
            params.set_translate(matches!(task, TaskMode::Translate));
            // Limit CPU usage so laptops don't max out all cores.
            params.set_n_threads(num_cpus::get().min(8) as i32);
            params.set_print_progress(false);
            params.set_print_timestamps(false);
            params.set_print_special(false);
            params.set_print_realtime(false);
            params.set_token_timestamps(false);
            state.full(params, samples)?;

            let language = state
                .full_lang_id_from_state()
                .ok()
                .and_then(whisper_rs::get_lang_str)
                .unwrap_or("??")
                .to_string();

            let num_segments = match state.full_n_segments() {
                Ok(count) => count,
                Err(err) => {
                    debug!(error = %err, "whisper failed to report segment count");
                    return Ok(Transcription {
                        language,
                        segments: Vec::new(),
                    });
                }
            };

            let mut segments = Vec::new();
            for i in 0..num_segments {
                let text = match state.full_get_segment_text_lossy(i) {
                    Ok(text) => text,
                    Err(err) => {
                        debug!(segment = i, error = %err, "failed to read whisper segment");
                        continue;
                    }
                };
                // Whisper marks empty windows with a sentinel token.
                let text = text.replace("[BLANK_AUDIO]", "");
                // Segment offsets arrive in 10 ms units.
                let start_ms = state
                    .full_get_segment_t0(i)
                    .map(|t| t.max(0) as u64 * 10)
                    .unwrap_or(0);
                let end_ms = state
                    .full_get_segment_t1(i)
                    .map(|t| t.max(0) as u64 * 10)
                    .unwrap_or(start_ms);
                segments.push(Segment {
                    text,
                    start_ms,
                    end_ms,
                });
            }

            Ok(Transcription { language, segments })
        }
    }

    fn install_whisper_log_silencer() {
        static INSTALL_LOG_CALLBACK: Once = Once::new();
        INSTALL_LOG_CALLBACK.call_once(|| unsafe {
            whisper_rs::set_log_callback(Some(whisper_log_callback), std::ptr::null_mut());
        });
    }

    #[allow(unused_variables)]
    unsafe extern "C" fn whisper_log_callback(
        _level: c_uint,
        _text: *const c_char,
        _user_data: *mut c_void,
    ) {
        // Silence the default whisper.cpp logger so it does not corrupt the
        // caption stream.
    }
}

#[cfg(unix)]
pub use platform::Transcriber;

#[cfg(not(unix))]
mod platform {
    use crate::pipeline::{TaskMode, Transcription};
    use anyhow::{anyhow, Result};

    /// Stub implementation for unsupported targets.
    pub struct Transcriber;

    impl Transcriber {
        pub fn new(_: &str) -> Result<Self> {
            Err(anyhow!(
                "Whisper transcription is currently supported only on Unix-like platforms"
            ))
        }

        pub fn transcribe_window(&self, _: &[f32], _: TaskMode) -> Result<Transcription> {
            Err(anyhow!(
                "Whisper transcription is currently supported only on Unix-like platforms"
            ))
        }
    }
}

#[cfg(not(unix))]
pub use platform::Transcriber;

impl SpeechEngine for Transcriber {
    fn transcribe(&mut self, window: &[f32], task: TaskMode) -> Result<Transcription> {
        self.transcribe_window(window, task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn transcriber_rejects_missing_model() {
        let result = Transcriber::new("/no/such/model.bin");
        assert!(result.is_err());
    }
}
