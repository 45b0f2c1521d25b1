//! Plain-text run log
//!
//! User-facing run lines (skipped inputs, collector failures, consent detections, progress,
//! final tallies) go through a [`LogSink`]. This channel is separate from `tracing`
//! diagnostics; the binary forwards it to `tracing` and optionally to a log file.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Destination for run log lines
pub trait LogSink: Send + Sync {
    /// Writes one line; never fails from the caller's point of view
    fn line(&self, text: &str);
}

impl<T: LogSink + ?Sized> LogSink for Arc<T> {
    fn line(&self, text: &str) {
        (**self).line(text)
    }
}

/// Forwards run lines to `tracing` at info level
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn line(&self, text: &str) {
        tracing::info!(target: "crawl_conductor::run", "{}", text);
    }
}

/// Writes run lines to a file
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl FileSink {
    /// Creates or truncates `path`, creating its parent directories
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LogSink for FileSink {
    fn line(&self, text: &str) {
        let mut file = match self.file.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Err(e) = writeln!(file, "{}", text) {
            tracing::warn!("Failed to write to log file {}: {}", self.path.display(), e);
        }
    }
}

/// Writes every line to each of its sinks
#[derive(Default)]
pub struct Tee {
    sinks: Vec<Box<dyn LogSink>>,
}

impl Tee {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: impl LogSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }
}

impl LogSink for Tee {
    fn line(&self, text: &str) {
        for sink in &self.sinks {
            sink.line(text);
        }
    }
}

/// Keeps run lines in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<String>>,
}

impl MemorySink {
    /// Lines written so far, oldest first
    pub fn lines(&self) -> Vec<String> {
        match self.lines.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl LogSink for MemorySink {
    fn line(&self, text: &str) {
        match self.lines.lock() {
            Ok(mut guard) => guard.push(text.to_string()),
            Err(poisoned) => poisoned.into_inner().push(text.to_string()),
        }
    }
}

/// Discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl LogSink for NullSink {
    fn line(&self, _text: &str) {}
}
