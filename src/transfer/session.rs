//! Open source/sink pair and its counters

use super::sink::Sink;
use super::source::SourceStream;
use chrono::{DateTime, Utc};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// A source whose advertised length has been checked
pub struct SourceHandle {
    pub(crate) url: String,
    pub(crate) stream: Box<dyn SourceStream>,
    pub(crate) content_length: u64,
}

impl SourceHandle {
    /// URL the source was opened from
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Advertised body length, always non-zero
    pub fn content_length(&self) -> u64 {
        self.content_length
    }

    /// Release the connection without transferring
    pub async fn close(mut self) {
        self.stream.close().await;
    }
}

/// One transfer in progress
///
/// Holds the open source and sink until [`TransferPipeline::run`] closes
/// both. `bytes_written` never exceeds `bytes_read`.
///
/// [`TransferPipeline::run`]: super::TransferPipeline::run
pub struct TransferSession {
    pub(crate) url: String,
    pub(crate) path: PathBuf,
    pub(crate) source: Option<Box<dyn SourceStream>>,
    pub(crate) sink: Option<Box<dyn Sink>>,
    pub(crate) expected_length: u64,
    pub(crate) bytes_read: u64,
    pub(crate) bytes_written: u64,
    pub(crate) download_time: Duration,
    pub(crate) write_time: Duration,
    pub(crate) started_at: DateTime<Utc>,
    opened_at: Instant,
    closed_at: Option<Instant>,
}

impl TransferSession {
    pub(crate) fn new(source: SourceHandle, sink: Box<dyn Sink>, path: &Path) -> Self {
        Self {
            url: source.url,
            path: path.to_path_buf(),
            source: Some(source.stream),
            sink: Some(sink),
            expected_length: source.content_length,
            bytes_read: 0,
            bytes_written: 0,
            download_time: Duration::ZERO,
            write_time: Duration::ZERO,
            started_at: Utc::now(),
            opened_at: Instant::now(),
            closed_at: None,
        }
    }

    /// Close the source, then the sink
    ///
    /// Idempotent. Returns the sink's close error, if any.
    pub(crate) async fn close(&mut self) -> io::Result<()> {
        if let Some(mut source) = self.source.take() {
            source.close().await;
        }
        let result = match self.sink.take() {
            Some(mut sink) => {
                // Flushing buffered data is part of the write phase
                let started = Instant::now();
                let result = sink.close().await;
                self.write_time += started.elapsed();
                result
            }
            None => Ok(()),
        };
        self.closed_at.get_or_insert_with(Instant::now);
        result
    }

    /// Whether the source or sink is still held
    pub fn is_open(&self) -> bool {
        self.source.is_some() || self.sink.is_some()
    }

    /// Resource URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Sink path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Advertised body length
    pub fn expected_length(&self) -> u64 {
        self.expected_length
    }

    /// Bytes read so far
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Bytes written so far
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Time spent in reads so far
    pub fn download_time(&self) -> Duration {
        self.download_time
    }

    /// Time spent in writes so far
    pub fn write_time(&self) -> Duration {
        self.write_time
    }

    /// Time from open to close, or to now while still open
    pub fn elapsed(&self) -> Duration {
        self.closed_at
            .unwrap_or_else(Instant::now)
            .duration_since(self.opened_at)
    }
}
