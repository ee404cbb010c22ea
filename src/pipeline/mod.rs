//! The caption pipeline: sliding-window buffering, silence gating, duplicate
//! suppression, and sink fan-out.
//!
//! The whole pipeline advances through a single `tick` so the same logic runs
//! whether a busy loop or the overlay's repaint timer is driving it. Engine
//! and sink failures are logged and absorbed here; only the caller decides
//! when to stop ticking.

mod dedup;
mod gate;
mod window;

pub use dedup::RepeatFilter;
pub use gate::SilenceGate;
pub use window::SlideWindow;

use crate::audio::BlockReceiver;
use crate::config::CaptionConfig;
use anyhow::Result;
use tracing::{trace, warn};

/// What the inference engine should produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskMode {
    /// Native-language transcription.
    Transcribe,
    /// Force English output.
    Translate,
}

/// One unit of text with offsets inside the transcribed window.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub text: String,
    pub start_ms: u64,
    pub end_ms: u64,
}

/// Engine output for one window: detected language plus timed segments.
#[derive(Debug, Clone, PartialEq)]
pub struct Transcription {
    pub language: String,
    pub segments: Vec<Segment>,
}

/// Speech-to-text collaborator. The pipeline hands it a full window of mono
/// 16 kHz samples and consumes whatever segments come back.
pub trait SpeechEngine {
    fn transcribe(&mut self, window: &[f32], task: TaskMode) -> Result<Transcription>;
}

/// A deduplicated caption on its way out of the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct Caption {
    pub text: String,
    pub language: String,
}

/// Receives emitted captions. Console, transcript file, and overlay all
/// implement this.
pub trait CaptionSink {
    fn emit(&mut self, caption: &Caption) -> Result<()>;

    /// Flush and release any held resources. Called once at shutdown.
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Summary of one processing cycle, for tests and trace logs.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub drained_blocks: usize,
    pub window_len: usize,
    pub triggered: bool,
    pub inference_ran: bool,
    pub emitted: usize,
}

/// Owns the window, the gate, the repeat filter, and the sinks. Single
/// writer: only the processing context calls `tick`.
pub struct CaptionPipeline<E> {
    receiver: BlockReceiver,
    engine: E,
    sinks: Vec<Box<dyn CaptionSink>>,
    window: SlideWindow,
    gate: SilenceGate,
    filter: RepeatFilter,
    task: TaskMode,
    trigger_samples: usize,
    slide_samples: usize,
}

impl<E: SpeechEngine> CaptionPipeline<E> {
    pub fn new(
        cfg: &CaptionConfig,
        receiver: BlockReceiver,
        engine: E,
        sinks: Vec<Box<dyn CaptionSink>>,
    ) -> Self {
        Self {
            receiver,
            engine,
            sinks,
            window: SlideWindow::new(),
            gate: SilenceGate::new(cfg.silence_threshold),
            filter: RepeatFilter::new(),
            task: cfg.task(),
            trigger_samples: cfg.trigger_samples(),
            slide_samples: cfg.slide_samples(),
        }
    }

    /// Run one processing cycle: drain the queue, and when the window has
    /// reached the trigger length, gate, infer, emit, and slide.
    ///
    /// The slide happens on every triggered cycle, whether inference ran,
    /// was gated, or failed — that is what keeps latency bounded when the
    /// engine misbehaves.
    pub fn tick(&mut self) -> CycleReport {
        let mut report = CycleReport::default();

        for block in self.receiver.try_iter() {
            self.window.push_block(&block);
            report.drained_blocks += 1;
        }

        report.triggered = self.window.len() >= self.trigger_samples;
        if report.triggered {
            if self.gate.is_silent(self.window.mean_abs()) {
                trace!(window_len = self.window.len(), "window below silence threshold, skipping inference");
            } else {
                report.inference_ran = true;
                match self.engine.transcribe(self.window.samples(), self.task) {
                    Ok(result) => report.emitted = self.emit_segments(&result),
                    Err(err) => {
                        warn!(error = %err, "transcription failed, window slides on");
                    }
                }
            }
            self.window.slide(self.slide_samples);
        }

        report.window_len = self.window.len();
        report
    }

    fn emit_segments(&mut self, result: &Transcription) -> usize {
        let mut emitted = 0;
        for segment in &result.segments {
            let text = segment.text.trim();
            if !self.filter.accept(text) {
                continue;
            }
            let caption = Caption {
                text: text.to_string(),
                language: result.language.clone(),
            };
            for sink in &mut self.sinks {
                if let Err(err) = sink.emit(&caption) {
                    warn!(error = %err, "caption sink failed");
                }
            }
            emitted += 1;
        }
        emitted
    }

    /// Close every sink, best-effort: a failing sink does not stop the rest
    /// from being released.
    pub fn finish(&mut self) {
        for sink in &mut self.sinks {
            if let Err(err) = sink.close() {
                warn!(error = %err, "failed to close caption sink");
            }
        }
    }

    pub fn window_len(&self) -> usize {
        self.window.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{block_channel, BlockSender};
    use anyhow::anyhow;
    use std::sync::{Arc, Mutex};

    const RATE: u32 = 16_000;

    fn test_config() -> CaptionConfig {
        CaptionConfig {
            sample_rate: RATE,
            block_size: 2_048,
            buffer_sec: 4,
            slide_sec: 2,
            silence_threshold: 0.01,
            clip_guard: 0.02,
            translate: false,
            tick_ms: 100,
        }
    }

    /// Engine double that records every window length it sees.
    struct MockEngine {
        calls: Arc<Mutex<Vec<usize>>>,
        response: Result<Transcription, String>,
    }

    impl MockEngine {
        fn returning(text: &str) -> (Self, Arc<Mutex<Vec<usize>>>) {
            let calls = Arc::new(Mutex::new(Vec::new()));
            let engine = Self {
                calls: calls.clone(),
                response: Ok(Transcription {
                    language: "en".to_string(),
                    segments: vec![Segment {
                        text: text.to_string(),
                        start_ms: 0,
                        end_ms: 1_000,
                    }],
                }),
            };
            (engine, calls)
        }

        fn failing() -> (Self, Arc<Mutex<Vec<usize>>>) {
            let calls = Arc::new(Mutex::new(Vec::new()));
            let engine = Self {
                calls: calls.clone(),
                response: Err("model exploded".to_string()),
            };
            (engine, calls)
        }
    }

    impl SpeechEngine for MockEngine {
        fn transcribe(&mut self, window: &[f32], _task: TaskMode) -> Result<Transcription> {
            self.calls.lock().unwrap().push(window.len());
            match &self.response {
                Ok(result) => Ok(result.clone()),
                Err(msg) => Err(anyhow!("{msg}")),
            }
        }
    }

    /// Sink double that collects emitted texts.
    #[derive(Clone, Default)]
    struct MemorySink {
        lines: Arc<Mutex<Vec<String>>>,
    }

    impl CaptionSink for MemorySink {
        fn emit(&mut self, caption: &Caption) -> Result<()> {
            self.lines.lock().unwrap().push(caption.text.clone());
            Ok(())
        }
    }

    fn feed_seconds(sender: &BlockSender, seconds: u64, amplitude: f32) {
        // One-second blocks keep the tests readable; arrival order matters,
        // block sizing does not.
        for _ in 0..seconds {
            sender.push(vec![amplitude; RATE as usize]);
        }
    }

    fn tone_window(seconds: u64) -> Vec<f32> {
        let total = (RATE as u64 * seconds) as usize;
        (0..total)
            .map(|n| (n as f32 * 0.05).sin() * 0.5)
            .collect()
    }

    #[test]
    fn silent_window_skips_inference_but_still_slides() {
        let (sender, receiver) = block_channel();
        let (engine, calls) = MockEngine::returning("never");
        let sink = MemorySink::default();
        let mut pipeline =
            CaptionPipeline::new(&test_config(), receiver, engine, vec![Box::new(sink.clone())]);

        feed_seconds(&sender, 4, 0.0);
        let report = pipeline.tick();

        assert!(report.triggered);
        assert!(!report.inference_ran);
        assert_eq!(calls.lock().unwrap().len(), 0);
        // 4 s accumulated, 2 s slid away.
        assert_eq!(report.window_len, (RATE * 2) as usize);
        assert!(sink.lines.lock().unwrap().is_empty());
    }

    #[test]
    fn loud_window_triggers_inference_and_emits() {
        let (sender, receiver) = block_channel();
        let (engine, calls) = MockEngine::returning("hello");
        let sink = MemorySink::default();
        let mut pipeline =
            CaptionPipeline::new(&test_config(), receiver, engine, vec![Box::new(sink.clone())]);

        feed_seconds(&sender, 4, 0.5);
        let report = pipeline.tick();

        assert!(report.inference_ran);
        assert_eq!(report.emitted, 1);
        assert_eq!(calls.lock().unwrap().as_slice(), &[(RATE * 4) as usize]);
        assert_eq!(sink.lines.lock().unwrap().as_slice(), &["hello".to_string()]);
    }

    #[test]
    fn below_trigger_window_does_nothing() {
        let (sender, receiver) = block_channel();
        let (engine, calls) = MockEngine::returning("early");
        let mut pipeline = CaptionPipeline::new(&test_config(), receiver, engine, Vec::new());

        feed_seconds(&sender, 3, 0.5);
        let report = pipeline.tick();

        assert!(!report.triggered);
        assert_eq!(report.window_len, (RATE * 3) as usize);
        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn window_stays_bounded_when_ticked_per_block() {
        let (sender, receiver) = block_channel();
        let (engine, _calls) = MockEngine::returning("text");
        let mut pipeline = CaptionPipeline::new(&test_config(), receiver, engine, Vec::new());

        let trigger = (RATE * 4) as usize;
        let block = (RATE / 2) as usize;
        for _ in 0..64 {
            sender.push(vec![0.5; block]);
            let report = pipeline.tick();
            // Never more than the trigger length plus the one block that
            // arrived since the last cycle.
            assert!(report.window_len <= trigger + block);
        }
    }

    #[test]
    fn identical_windows_transcribed_twice_emit_once() {
        let (sender, receiver) = block_channel();
        let (engine, calls) = MockEngine::returning("same words");
        let sink = MemorySink::default();
        let mut pipeline =
            CaptionPipeline::new(&test_config(), receiver, engine, vec![Box::new(sink.clone())]);

        let tone = tone_window(4);
        sender.push(tone.clone());
        pipeline.tick();
        // Top the window back up to the trigger with the same audio again.
        sender.push(tone);
        pipeline.tick();

        assert_eq!(calls.lock().unwrap().len(), 2);
        assert_eq!(
            sink.lines.lock().unwrap().as_slice(),
            &["same words".to_string()]
        );
    }

    #[test]
    fn engine_error_is_absorbed_and_window_slides() {
        let (sender, receiver) = block_channel();
        let (engine, calls) = MockEngine::failing();
        let sink = MemorySink::default();
        let mut pipeline =
            CaptionPipeline::new(&test_config(), receiver, engine, vec![Box::new(sink.clone())]);

        feed_seconds(&sender, 4, 0.5);
        let report = pipeline.tick();

        assert!(report.inference_ran);
        assert_eq!(report.emitted, 0);
        assert_eq!(calls.lock().unwrap().len(), 1);
        assert_eq!(report.window_len, (RATE * 2) as usize);
        assert!(sink.lines.lock().unwrap().is_empty());
    }

    #[test]
    fn whitespace_only_segments_never_reach_sinks() {
        let (sender, receiver) = block_channel();
        let (engine, _calls) = MockEngine::returning("   ");
        let sink = MemorySink::default();
        let mut pipeline =
            CaptionPipeline::new(&test_config(), receiver, engine, vec![Box::new(sink.clone())]);

        feed_seconds(&sender, 4, 0.5);
        let report = pipeline.tick();

        assert!(report.inference_ran);
        assert_eq!(report.emitted, 0);
        assert!(sink.lines.lock().unwrap().is_empty());
    }
}
