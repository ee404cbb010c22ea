//! Ties a capture stream to a caption pipeline and owns the shutdown path.

use crate::audio::AudioStream;
use crate::pipeline::{CaptionPipeline, CycleReport, SpeechEngine};

/// A running capture + caption session.
///
/// Both drive modes tick it the same way; the only difference between them is
/// who calls `tick` and when. `close` releases resources in a fixed order —
/// audio stream first, then sinks — and is safe to call more than once, so
/// the interrupt path, the overlay exit path, and `Drop` can all reach it
/// without double-releasing anything.
pub struct Session<E: SpeechEngine, S: AudioStream> {
    stream: S,
    pipeline: CaptionPipeline<E>,
    closed: bool,
}

impl<E: SpeechEngine, S: AudioStream> Session<E, S> {
    pub fn new(stream: S, pipeline: CaptionPipeline<E>) -> Self {
        Self {
            stream,
            pipeline,
            closed: false,
        }
    }

    /// Run one processing cycle.
    pub fn tick(&mut self) -> CycleReport {
        self.pipeline.tick()
    }

    /// Stop the audio stream, then close every sink. Each step runs even if
    /// an earlier one failed; repeat calls are no-ops.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.stream.stop();
        self.pipeline.finish();
        println!("Stream closed.");
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl<E: SpeechEngine, S: AudioStream> Drop for Session<E, S> {
    fn drop(&mut self) {
        // Error paths can drop a live session before any close path runs.
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::block_channel;
    use crate::config::CaptionConfig;
    use crate::pipeline::{Caption, CaptionSink, TaskMode, Transcription};
    use anyhow::Result;
    use std::sync::{Arc, Mutex};

    type EventLog = Arc<Mutex<Vec<&'static str>>>;

    struct MockStream {
        log: EventLog,
    }

    impl AudioStream for MockStream {
        fn stop(&mut self) {
            self.log.lock().unwrap().push("stream_stopped");
        }
    }

    struct MockEngine;

    impl SpeechEngine for MockEngine {
        fn transcribe(&mut self, _window: &[f32], _task: TaskMode) -> Result<Transcription> {
            Ok(Transcription {
                language: "en".to_string(),
                segments: Vec::new(),
            })
        }
    }

    struct LoggingSink {
        log: EventLog,
    }

    impl CaptionSink for LoggingSink {
        fn emit(&mut self, _caption: &Caption) -> Result<()> {
            Ok(())
        }

        fn close(&mut self) -> Result<()> {
            self.log.lock().unwrap().push("sink_closed");
            Ok(())
        }
    }

    fn test_session(log: &EventLog) -> Session<MockEngine, MockStream> {
        let (_sender, receiver) = block_channel();
        let cfg = CaptionConfig {
            sample_rate: 16_000,
            block_size: 2_048,
            buffer_sec: 4,
            slide_sec: 2,
            silence_threshold: 0.01,
            clip_guard: 0.02,
            translate: false,
            tick_ms: 100,
        };
        let pipeline = CaptionPipeline::new(
            &cfg,
            receiver,
            MockEngine,
            vec![Box::new(LoggingSink { log: log.clone() })],
        );
        Session::new(MockStream { log: log.clone() }, pipeline)
    }

    #[test]
    fn close_stops_stream_before_closing_sinks() {
        let log: EventLog = Arc::new(Mutex::new(Vec::new()));
        let mut session = test_session(&log);
        session.close();
        assert_eq!(
            log.lock().unwrap().as_slice(),
            &["stream_stopped", "sink_closed"]
        );
    }

    #[test]
    fn close_is_idempotent() {
        let log: EventLog = Arc::new(Mutex::new(Vec::new()));
        let mut session = test_session(&log);
        session.close();
        session.close();
        session.close();
        assert_eq!(log.lock().unwrap().len(), 2);
        assert!(session.is_closed());
    }
}
