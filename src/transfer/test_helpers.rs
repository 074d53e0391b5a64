//! Scripted sources and in-memory sinks for pipeline tests.

use super::{OpenedSource, Sink, SinkOpener, SourceOpener, SourceStream};
use crate::error::TransferError;
use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One scripted response to `read_chunk`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Step {
    /// Deliver this many body bytes, split across reads if the buffer is smaller
    Bytes(usize),
    /// End of body
    End,
    /// End of body, reported only after waiting this long
    EndAfter(Duration),
    /// Fail the read
    Fail,
}

/// Byte at absolute body offset `i`
pub(crate) fn body_byte(i: usize) -> u8 {
    (i % 251) as u8
}

pub(crate) fn expected_body(len: usize) -> Vec<u8> {
    (0..len).map(body_byte).collect()
}

/// What happened to the streams an opener handed out
#[derive(Default)]
pub(crate) struct SourceProbe {
    pub(crate) opens: AtomicUsize,
    pub(crate) reads: AtomicUsize,
    pub(crate) closed: AtomicBool,
    pub(crate) read_after_close: AtomicBool,
}

impl SourceProbe {
    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub(crate) fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

pub(crate) struct ScriptedSource {
    steps: Vec<Step>,
    content_length: Option<u64>,
    fail_open: bool,
    pub(crate) probe: Arc<SourceProbe>,
}

impl ScriptedSource {
    pub(crate) fn new(steps: Vec<Step>, content_length: Option<u64>) -> Self {
        Self {
            steps,
            content_length,
            fail_open: false,
            probe: Arc::new(SourceProbe::default()),
        }
    }

    /// A body of `len` bytes delivered in reads of `piece` bytes
    pub(crate) fn body(len: usize, piece: usize) -> Self {
        let mut steps = Vec::new();
        let mut left = len;
        while left > 0 {
            let n = piece.min(left);
            steps.push(Step::Bytes(n));
            left -= n;
        }
        steps.push(Step::End);
        Self::new(steps, Some(len as u64))
    }

    pub(crate) fn unreachable() -> Self {
        Self {
            fail_open: true,
            ..Self::new(Vec::new(), None)
        }
    }
}

#[async_trait]
impl SourceOpener for ScriptedSource {
    async fn open(&self, url: &str) -> crate::Result<OpenedSource> {
        if self.fail_open {
            return Err(TransferError::Connection {
                url: url.to_string(),
                reason: "handshake failed".into(),
            }
            .into());
        }
        self.probe.opens.fetch_add(1, Ordering::SeqCst);
        Ok(OpenedSource {
            stream: Box::new(ScriptedStream {
                steps: self.steps.iter().rev().copied().collect(),
                offset: 0,
                probe: Arc::clone(&self.probe),
            }),
            content_length: self.content_length,
        })
    }
}

struct ScriptedStream {
    /// Remaining steps, next one last
    steps: Vec<Step>,
    offset: usize,
    probe: Arc<SourceProbe>,
}

#[async_trait]
impl SourceStream for ScriptedStream {
    async fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.probe.is_closed() {
            self.probe.read_after_close.store(true, Ordering::SeqCst);
        }
        self.probe.reads.fetch_add(1, Ordering::SeqCst);

        match self.steps.pop().unwrap_or(Step::End) {
            Step::End => Ok(0),
            Step::EndAfter(delay) => {
                tokio::time::sleep(delay).await;
                Ok(0)
            }
            Step::Fail => Err(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "connection reset by peer",
            )),
            Step::Bytes(n) => {
                let take = n.min(buf.len());
                if take < n {
                    self.steps.push(Step::Bytes(n - take));
                }
                for (i, byte) in buf[..take].iter_mut().enumerate() {
                    *byte = body_byte(self.offset + i);
                }
                self.offset += take;
                Ok(take)
            }
        }
    }

    async fn close(&mut self) {
        self.probe.closed.store(true, Ordering::SeqCst);
    }
}

/// What happened to the sinks an opener handed out
#[derive(Default)]
pub(crate) struct SinkProbe {
    pub(crate) data: Mutex<Vec<u8>>,
    pub(crate) writes: AtomicUsize,
    pub(crate) closed: AtomicBool,
}

impl SinkProbe {
    pub(crate) fn data(&self) -> Vec<u8> {
        self.data.lock().unwrap().clone()
    }

    pub(crate) fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// How a [`MemorySink`] misbehaves
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct SinkFaults {
    /// Accept at most this many bytes per write
    pub(crate) max_write: Option<usize>,
    /// Accept nothing once this many bytes are stored
    pub(crate) full_at: Option<usize>,
    /// Fail the write call with this number (1-based)
    pub(crate) fail_write: Option<usize>,
    pub(crate) fail_open: bool,
    pub(crate) fail_close: bool,
    /// Take this long to close
    pub(crate) close_delay: Option<Duration>,
}

#[derive(Default)]
pub(crate) struct MemorySinkOpener {
    faults: SinkFaults,
    pub(crate) probe: Arc<SinkProbe>,
    pub(crate) opened_paths: Mutex<Vec<PathBuf>>,
}

impl MemorySinkOpener {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_faults(faults: SinkFaults) -> Self {
        Self {
            faults,
            ..Self::default()
        }
    }
}

#[async_trait]
impl SinkOpener for MemorySinkOpener {
    async fn open(&self, path: &Path) -> io::Result<Box<dyn Sink>> {
        if self.faults.fail_open {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                "filesystem not mounted",
            ));
        }
        self.opened_paths.lock().unwrap().push(path.to_path_buf());
        self.probe.data.lock().unwrap().clear();
        Ok(Box::new(MemorySink {
            faults: self.faults,
            probe: Arc::clone(&self.probe),
        }))
    }
}

struct MemorySink {
    faults: SinkFaults,
    probe: Arc<SinkProbe>,
}

#[async_trait]
impl Sink for MemorySink {
    async fn write_chunk(&mut self, data: &[u8]) -> io::Result<usize> {
        let call = self.probe.writes.fetch_add(1, Ordering::SeqCst) + 1;
        if self.faults.fail_write == Some(call) {
            return Err(io::Error::other("flash write error"));
        }

        let mut stored = self.probe.data.lock().unwrap();
        let room = self
            .faults
            .full_at
            .map_or(usize::MAX, |cap| cap.saturating_sub(stored.len()));
        let n = data
            .len()
            .min(self.faults.max_write.unwrap_or(usize::MAX))
            .min(room);
        stored.extend_from_slice(&data[..n]);
        Ok(n)
    }

    async fn close(&mut self) -> io::Result<()> {
        if let Some(delay) = self.faults.close_delay {
            tokio::time::sleep(delay).await;
        }
        self.probe.closed.store(true, Ordering::SeqCst);
        if self.faults.fail_close {
            return Err(io::Error::other("sync failed"));
        }
        Ok(())
    }
}
