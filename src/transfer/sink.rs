//! Local storage sinks

use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;

/// Writable destination for transferred bytes
#[async_trait]
pub trait Sink: Send {
    /// Write as much of `data` as the sink accepts and return that count
    ///
    /// A count below `data.len()` is a short write, not an error.
    async fn write_chunk(&mut self, data: &[u8]) -> io::Result<usize>;

    /// Flush and release the sink
    ///
    /// Time spent here is counted as write time, so sinks may buffer in
    /// `write_chunk` and persist on close.
    async fn close(&mut self) -> io::Result<()>;
}

/// Opens sinks for writing, truncating any previous content
#[async_trait]
pub trait SinkOpener: Send + Sync {
    /// Open `path` for writing from offset zero
    async fn open(&self, path: &Path) -> io::Result<Box<dyn Sink>>;
}

/// Opens [`FileSink`]s on an already mounted filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct FileSinkOpener;

#[async_trait]
impl SinkOpener for FileSinkOpener {
    async fn open(&self, path: &Path) -> io::Result<Box<dyn Sink>> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .await?;
        tracing::debug!(path = %path.display(), "Sink opened");
        Ok(Box::new(FileSink {
            file,
            path: path.to_path_buf(),
        }))
    }
}

/// File on local storage
#[derive(Debug)]
pub struct FileSink {
    file: File,
    path: PathBuf,
}

#[async_trait]
impl Sink for FileSink {
    async fn write_chunk(&mut self, data: &[u8]) -> io::Result<usize> {
        self.file.write(data).await
    }

    async fn close(&mut self) -> io::Result<()> {
        self.file.flush().await?;
        self.file.sync_all().await?;
        tracing::debug!(path = %self.path.display(), "Sink closed");
        Ok(())
    }
}
