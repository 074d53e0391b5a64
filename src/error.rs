//! Error types for wifi-dl
//!
//! Errors are split by component:
//! - [`LinkError`] for the wireless link (interface bring-up, supervisor lifetime)
//! - [`TransferError`] for the streaming pipeline (source, sink, length checks)
//!
//! Both fold into the top-level [`Error`] so callers can use a single
//! [`Result`] alias.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for wifi-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for wifi-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "network_name")
        key: Option<String>,
    },

    /// Wireless link error
    #[error("link error: {0}")]
    Link(#[from] LinkError),

    /// Transfer pipeline error
    #[error("transfer error: {0}")]
    Transfer(#[from] TransferError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a configuration error for a specific key
    pub fn config(key: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }

    /// Whether the process cannot meaningfully continue after this error
    ///
    /// Networking is a hard prerequisite, so a failed interface bring-up is the
    /// only process-fatal condition. Transfer failures end the current attempt only.
    pub fn is_fatal_to_process(&self) -> bool {
        matches!(self, Error::Link(LinkError::InterfaceInit { .. }))
    }
}

/// Wireless link errors
#[derive(Debug, Error)]
pub enum LinkError {
    /// The network interface could not be configured or started
    #[error("failed to initialize interface {interface}: {reason}")]
    InterfaceInit {
        /// Name of the interface implementation
        interface: String,
        /// The reason initialization failed
        reason: String,
    },

    /// The link supervisor is gone and the link can never become ready
    #[error("link supervisor stopped before the link became ready")]
    Stopped,
}

/// Transfer pipeline errors
#[derive(Debug, Error)]
pub enum TransferError {
    /// The secure transport could not be opened
    #[error("failed to open connection to {url}: {reason}")]
    Connection {
        /// The resource URL
        url: String,
        /// The reason the connection failed
        reason: String,
    },

    /// The server answered with a non-success status
    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus {
        /// The resource URL
        url: String,
        /// HTTP status code
        status: u16,
    },

    /// The advertised body length is missing or zero
    #[error("invalid content length: {length:?}")]
    InvalidContentLength {
        /// The advertised length, if any
        length: Option<u64>,
    },

    /// The sink could not be opened for writing
    #[error("failed to open sink {path}: {reason}")]
    SinkOpen {
        /// The sink path
        path: PathBuf,
        /// The reason the sink could not be opened
        reason: String,
    },

    /// A single write call accepted fewer bytes than requested
    #[error("short write at offset {offset}: wrote {written} of {requested} bytes")]
    ShortWrite {
        /// Sink offset at which the write started
        offset: u64,
        /// Bytes handed to the sink
        requested: usize,
        /// Bytes the sink reported as written
        written: usize,
    },

    /// The wireless link went down while the transfer was in flight
    #[error("link dropped after {bytes_read} bytes: {reason}")]
    LinkDropped {
        /// Bytes read before the failure
        bytes_read: u64,
        /// The I/O failure observed by the pipeline
        reason: String,
    },

    /// Reading from the source failed
    #[error("read failed after {bytes_read} bytes: {reason}")]
    Read {
        /// Bytes read before the failure
        bytes_read: u64,
        /// The reason the read failed
        reason: String,
    },

    /// Writing to the sink failed
    #[error("write failed after {bytes_written} bytes: {reason}")]
    Write {
        /// Bytes written before the failure
        bytes_written: u64,
        /// The reason the write failed
        reason: String,
    },

    /// The body ended before the advertised length was read and written
    #[error("incomplete transfer: expected {expected} bytes, read {read}, wrote {written}")]
    Incomplete {
        /// Advertised content length
        expected: u64,
        /// Bytes read from the source
        read: u64,
        /// Bytes written to the sink
        written: u64,
    },
}
