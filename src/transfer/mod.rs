//! Streaming transfer pipeline.
//!
//! Pulls a response body from a [`SourceStream`] in fixed-size chunks and
//! pushes each chunk into a [`Sink`], timing reads and writes separately:
//!
//! ```text
//! open_source --> open_sink --> run --> summarize
//!     |              |           |
//!     |              |           +-- source and sink closed on every exit
//!     |              +-- source closed before SinkOpen is returned
//!     +-- source closed before InvalidContentLength is returned
//! ```
//!
//! Nothing is retried. A read or write failure ends the transfer; if the link
//! readiness is cleared at that moment the failure is reported as
//! [`TransferError::LinkDropped`].

mod report;
mod session;
mod sink;
mod source;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

pub use report::{MIN_PHASE_SECONDS, TransferReport, throughput_kbps};
pub use session::{SourceHandle, TransferSession};
pub use sink::{FileSink, FileSinkOpener, Sink, SinkOpener};
pub use source::{HttpsSource, OpenedSource, SourceOpener, SourceStream};

use crate::config::{ShortWritePolicy, TransferConfig};
use crate::error::{Result, TransferError};
use crate::readiness::Readiness;
use crate::types::Event;
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::broadcast;

/// Runs single transfers from a [`SourceOpener`] into a [`SinkOpener`]
pub struct TransferPipeline {
    sources: Arc<dyn SourceOpener>,
    sinks: Arc<dyn SinkOpener>,
    chunk_size: usize,
    short_write: ShortWritePolicy,
    require_full_length: bool,
    readiness: Option<Readiness>,
    event_tx: Option<broadcast::Sender<Event>>,
}

impl TransferPipeline {
    /// Create a pipeline using the chunking and checking rules in `config`
    pub fn new(
        config: &TransferConfig,
        sources: Arc<dyn SourceOpener>,
        sinks: Arc<dyn SinkOpener>,
    ) -> Self {
        Self {
            sources,
            sinks,
            chunk_size: config.chunk_size.max(1),
            short_write: config.short_write,
            require_full_length: config.require_full_length,
            readiness: None,
            event_tx: None,
        }
    }

    /// Classify I/O failures against this link readiness
    pub fn with_readiness(mut self, readiness: Readiness) -> Self {
        self.readiness = Some(readiness);
        self
    }

    /// Broadcast transfer events on `event_tx`
    pub fn with_events(mut self, event_tx: broadcast::Sender<Event>) -> Self {
        self.event_tx = Some(event_tx);
        self
    }

    /// Open the remote resource and check its advertised length
    ///
    /// # Errors
    ///
    /// Errors from the opener are passed through. A missing or zero length
    /// closes the stream and returns [`TransferError::InvalidContentLength`].
    pub async fn open_source(&self, url: &str) -> Result<SourceHandle> {
        let OpenedSource {
            mut stream,
            content_length,
        } = self.sources.open(url).await?;

        match content_length {
            Some(length) if length > 0 => {
                tracing::debug!(url, content_length = length, "Source opened");
                Ok(SourceHandle {
                    url: url.to_string(),
                    stream,
                    content_length: length,
                })
            }
            length => {
                stream.close().await;
                Err(TransferError::InvalidContentLength { length }.into())
            }
        }
    }

    /// Open the sink at `path` for `source`
    ///
    /// On failure the source is closed before the error is returned.
    pub async fn open_sink(&self, path: &Path, source: SourceHandle) -> Result<TransferSession> {
        match self.sinks.open(path).await {
            Ok(sink) => Ok(TransferSession::new(source, sink, path)),
            Err(e) => {
                source.close().await;
                Err(TransferError::SinkOpen {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                }
                .into())
            }
        }
    }

    /// Stream the whole body into the sink
    ///
    /// Reads until the source reports end of body. Source and sink are both
    /// closed before this returns, whatever the outcome.
    pub async fn run(&self, session: &mut TransferSession) -> Result<()> {
        let outcome = self.stream(session).await;
        let closed = session.close().await;

        match (outcome, closed) {
            (Ok(()), Ok(())) => Ok(()),
            (Ok(()), Err(e)) => Err(self
                .write_failure(session, io::Error::new(e.kind(), format!("closing sink: {}", e)))
                .into()),
            (Err(e), closed) => {
                if let Err(close_err) = closed {
                    tracing::warn!(error = %close_err, "Failed to close sink after transfer error");
                }
                Err(e)
            }
        }
    }

    /// Report for a session, finished or not
    pub fn summarize(&self, session: &TransferSession) -> TransferReport {
        TransferReport::new(
            session.started_at,
            session.bytes_read,
            session.bytes_written,
            session.expected_length,
            session.download_time,
            session.write_time,
            session.elapsed(),
        )
    }

    /// Download `url` into `path` and report on it
    ///
    /// Emits [`Event::TransferStarted`] once both ends are open, then exactly
    /// one of [`Event::TransferComplete`] or [`Event::TransferFailed`]. A
    /// transfer rejected by the length check only gets `TransferFailed`.
    ///
    /// # Errors
    ///
    /// Any open or streaming error, or [`TransferError::Incomplete`] when full
    /// length is required and either counter misses the advertised length.
    pub async fn fetch(&self, url: &str, path: &Path) -> Result<TransferReport> {
        let result = self.fetch_inner(url, path).await;
        if let Err(e) = &result {
            tracing::error!(url, path = %path.display(), error = %e, "Download failed");
            self.emit(Event::TransferFailed {
                url: url.to_string(),
                error: e.to_string(),
            });
        }
        result
    }

    async fn fetch_inner(&self, url: &str, path: &Path) -> Result<TransferReport> {
        let source = self.open_source(url).await?;
        let mut session = self.open_sink(path, source).await?;

        tracing::info!(
            url,
            path = %path.display(),
            content_length = session.expected_length,
            chunk_size = self.chunk_size,
            "Starting download"
        );
        self.emit(Event::TransferStarted {
            url: url.to_string(),
            content_length: session.expected_length,
        });

        self.run(&mut session).await?;

        let report = self.summarize(&session);
        tracing::info!(
            bytes_read = report.bytes_read,
            bytes_written = report.bytes_written,
            download_seconds = report.download_seconds,
            write_seconds = report.write_seconds,
            download_kbps = report.download_kbps,
            write_kbps = report.write_kbps,
            "Download finished"
        );

        if self.require_full_length && !report.is_complete() {
            return Err(TransferError::Incomplete {
                expected: report.expected_length,
                read: report.bytes_read,
                written: report.bytes_written,
            }
            .into());
        }

        self.emit(Event::TransferComplete {
            report: report.clone(),
        });
        Ok(report)
    }

    async fn stream(&self, session: &mut TransferSession) -> Result<()> {
        let mut buf = vec![0u8; self.chunk_size];

        loop {
            let Some(source) = session.source.as_mut() else {
                return Err(TransferError::Read {
                    bytes_read: session.bytes_read,
                    reason: "source already closed".into(),
                }
                .into());
            };

            let started = Instant::now();
            let read = source.read_chunk(&mut buf).await;
            let elapsed = started.elapsed();

            // Only reads that delivered data count toward download time
            let n = match read {
                Ok(0) => return Ok(()),
                Ok(n) => n.min(buf.len()),
                Err(e) => return Err(self.read_failure(session, e).into()),
            };
            session.download_time += elapsed;
            session.bytes_read += n as u64;
            tracing::trace!(bytes = n, total = session.bytes_read, "Chunk read");

            self.write_chunk(session, &buf[..n]).await?;
        }
    }

    async fn write_chunk(&self, session: &mut TransferSession, chunk: &[u8]) -> Result<()> {
        let mut remaining = chunk;

        while !remaining.is_empty() {
            let offset = session.bytes_written;
            let Some(sink) = session.sink.as_mut() else {
                return Err(TransferError::Write {
                    bytes_written: offset,
                    reason: "sink already closed".into(),
                }
                .into());
            };

            let started = Instant::now();
            let result = sink.write_chunk(remaining).await;
            session.write_time += started.elapsed();

            let written = match result {
                Ok(written) => written.min(remaining.len()),
                Err(e) => return Err(self.write_failure(session, e).into()),
            };
            session.bytes_written += written as u64;

            if written < remaining.len() {
                let short = TransferError::ShortWrite {
                    offset,
                    requested: remaining.len(),
                    written,
                };
                match self.short_write {
                    ShortWritePolicy::RetryRemainder if written > 0 => {
                        tracing::debug!(offset, written, requested = remaining.len(), "Short write, writing remainder");
                    }
                    _ => return Err(short.into()),
                }
            }
            remaining = &remaining[written..];
        }
        Ok(())
    }

    fn link_lost(&self) -> bool {
        self.readiness.as_ref().is_some_and(|r| !r.is_ready())
    }

    fn read_failure(&self, session: &TransferSession, e: io::Error) -> TransferError {
        if self.link_lost() {
            TransferError::LinkDropped {
                bytes_read: session.bytes_read,
                reason: e.to_string(),
            }
        } else {
            TransferError::Read {
                bytes_read: session.bytes_read,
                reason: e.to_string(),
            }
        }
    }

    fn write_failure(&self, session: &TransferSession, e: io::Error) -> TransferError {
        if self.link_lost() {
            TransferError::LinkDropped {
                bytes_read: session.bytes_read,
                reason: e.to_string(),
            }
        } else {
            TransferError::Write {
                bytes_written: session.bytes_written,
                reason: e.to_string(),
            }
        }
    }

    fn emit(&self, event: Event) {
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(event);
        }
    }
}
