//! Remote resource streams
//!
//! A [`SourceOpener`] turns a URL into an [`OpenedSource`]: a body stream plus
//! the length the server advertised. [`HttpsSource`] is the reqwest-backed
//! implementation used outside of tests.

use crate::config::TransferConfig;
use crate::error::{Error, Result, TransferError};
use async_trait::async_trait;
use std::io;
use std::time::Duration;

/// Readable response body
///
/// `read_chunk` fills at most `buf.len()` bytes and returns how many were
/// filled; `0` means the body is exhausted. Reads after [`close`](Self::close)
/// are a caller bug.
#[async_trait]
pub trait SourceStream: Send {
    /// Read the next chunk of the body
    async fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Release the connection
    async fn close(&mut self);
}

/// A freshly opened source before its length has been checked
pub struct OpenedSource {
    /// The body stream
    pub stream: Box<dyn SourceStream>,
    /// Length advertised by the server, if any
    pub content_length: Option<u64>,
}

/// Opens streams to remote resources
#[async_trait]
pub trait SourceOpener: Send + Sync {
    /// Open a stream to `url`
    ///
    /// # Errors
    ///
    /// [`TransferError::Connection`] if the transport cannot be established,
    /// [`TransferError::UnexpectedStatus`] if the server refuses the request.
    async fn open(&self, url: &str) -> Result<OpenedSource>;
}

/// HTTPS source backed by a shared reqwest client
///
/// When `skip_hostname_check` is set the server certificate chain is still
/// verified, but the certificate does not have to name the host. Devices
/// fetching from fixed endpoints by IP rely on this.
#[derive(Debug, Clone)]
pub struct HttpsSource {
    client: reqwest::Client,
    response_timeout: Duration,
    read_timeout: Duration,
}

impl HttpsSource {
    /// Build a client from the transfer settings
    pub fn new(config: &TransferConfig) -> Result<Self> {
        let redirect = if config.follow_redirects {
            reqwest::redirect::Policy::limited(config.max_redirects)
        } else {
            reqwest::redirect::Policy::none()
        };

        if config.skip_hostname_check {
            tracing::warn!("TLS hostname verification is disabled for this source");
        }

        let client = reqwest::Client::builder()
            .danger_accept_invalid_hostnames(config.skip_hostname_check)
            .redirect(redirect)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| Error::Other(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            response_timeout: config.connect_timeout + config.read_timeout,
            read_timeout: config.read_timeout,
        })
    }
}

#[async_trait]
impl SourceOpener for HttpsSource {
    async fn open(&self, url: &str) -> Result<OpenedSource> {
        let connection_error = |reason: String| TransferError::Connection {
            url: url.to_string(),
            reason,
        };

        let response = tokio::time::timeout(self.response_timeout, self.client.get(url).send())
            .await
            .map_err(|_| {
                connection_error(format!(
                    "no response within {} seconds",
                    self.response_timeout.as_secs()
                ))
            })?
            .map_err(|e| {
                let reason = if e.is_connect() {
                    format!("connect failed: {}", e)
                } else if e.is_redirect() {
                    format!("too many redirects: {}", e)
                } else {
                    e.to_string()
                };
                connection_error(reason)
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransferError::UnexpectedStatus {
                url: url.to_string(),
                status: status.as_u16(),
            }
            .into());
        }

        let content_length = response.content_length();
        tracing::debug!(url, status = status.as_u16(), ?content_length, "Response received");

        Ok(OpenedSource {
            stream: Box::new(HttpsBody {
                response: Some(response),
                pending: Vec::new(),
                consumed: 0,
                read_timeout: self.read_timeout,
            }),
            content_length,
        })
    }
}

/// Response body re-chunked into caller-sized reads
struct HttpsBody {
    response: Option<reqwest::Response>,
    /// Last network chunk; bytes before `consumed` were handed out already
    pending: Vec<u8>,
    consumed: usize,
    read_timeout: Duration,
}

#[async_trait]
impl SourceStream for HttpsBody {
    async fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while self.consumed == self.pending.len() {
            let Some(response) = self.response.as_mut() else {
                return Ok(0);
            };
            match tokio::time::timeout(self.read_timeout, response.chunk()).await {
                Err(_) => {
                    return Err(io::Error::new(
                        io::ErrorKind::TimedOut,
                        format!("no data within {} seconds", self.read_timeout.as_secs()),
                    ));
                }
                Ok(Err(e)) => return Err(io::Error::other(e)),
                Ok(Ok(None)) => {
                    self.response = None;
                    return Ok(0);
                }
                Ok(Ok(Some(bytes))) => {
                    self.pending.clear();
                    self.pending.extend_from_slice(&bytes);
                    self.consumed = 0;
                }
            }
        }

        let available = &self.pending[self.consumed..];
        let n = buf.len().min(available.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.consumed += n;
        Ok(n)
    }

    async fn close(&mut self) {
        self.response = None;
        self.pending.clear();
        self.consumed = 0;
    }
}
