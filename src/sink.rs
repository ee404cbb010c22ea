//! Caption sinks: console printer, transcript file writer, overlay slot.

use crate::pipeline::{Caption, CaptionSink};
use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Prints one line per caption, prefixed with the detected language and the
/// output mode, e.g. `[de→EN] hello` when translating.
pub struct ConsolePrinter {
    translate: bool,
}

impl ConsolePrinter {
    pub fn new(translate: bool) -> Self {
        Self { translate }
    }
}

impl CaptionSink for ConsolePrinter {
    fn emit(&mut self, caption: &Caption) -> Result<()> {
        println!("{}", format_caption_line(self.translate, caption));
        Ok(())
    }
}

pub(crate) fn format_caption_line(translate: bool, caption: &Caption) -> String {
    if translate {
        format!("[{}→EN] {}", caption.language, caption.text)
    } else {
        format!(
            "[{}→{}] {}",
            caption.language,
            caption.language.to_uppercase(),
            caption.text
        )
    }
}

/// Appends each emitted caption to a UTF-8 text file, one per line, flushed
/// after every write so a crash loses at most the caption in flight.
pub struct TranscriptWriter {
    file: File,
    path: PathBuf,
}

impl TranscriptWriter {
    pub fn create(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("failed to open transcript file '{}'", path.display()))?;
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CaptionSink for TranscriptWriter {
    fn emit(&mut self, caption: &Caption) -> Result<()> {
        writeln!(self.file, "{}", caption.text)
            .with_context(|| format!("failed to write transcript '{}'", self.path.display()))?;
        self.file
            .flush()
            .with_context(|| format!("failed to flush transcript '{}'", self.path.display()))
    }

    fn close(&mut self) -> Result<()> {
        self.file
            .flush()
            .with_context(|| format!("failed to flush transcript '{}'", self.path.display()))
    }
}

/// Shared slot holding the latest caption for the overlay to paint. The
/// pipeline writes through an [`OverlaySink`]; the overlay reads via a clone
/// of this handle.
#[derive(Clone, Default)]
pub struct OverlayHandle {
    latest: Arc<Mutex<String>>,
}

impl OverlayHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, text: &str) {
        if let Ok(mut guard) = self.latest.lock() {
            guard.clear();
            guard.push_str(text);
        }
    }

    pub fn latest(&self) -> String {
        self.latest
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

/// Pipeline-side writer for the overlay slot.
pub struct OverlaySink {
    handle: OverlayHandle,
}

impl OverlaySink {
    pub fn new(handle: OverlayHandle) -> Self {
        Self { handle }
    }
}

impl CaptionSink for OverlaySink {
    fn emit(&mut self, caption: &Caption) -> Result<()> {
        self.handle.set(&caption.text);
        Ok(())
    }
}
