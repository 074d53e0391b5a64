//! Configuration types for wifi-dl

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{fmt, path::Path, path::PathBuf, time::Duration};

/// Shortest WPA2 passphrase accepted by access points
pub const MIN_SECRET_LEN: usize = 8;
/// Longest WPA2 passphrase accepted by access points
pub const MAX_SECRET_LEN: usize = 63;
/// Longest SSID permitted by 802.11
pub const MAX_NETWORK_NAME_LEN: usize = 32;

/// Main configuration for [`WifiDownloader`](crate::WifiDownloader)
///
/// Fields are organized into logical sub-configs:
/// - [`link`](LinkConfig): network identity and reconnect behavior
/// - [`transfer`](TransferConfig): remote resource, sink path, streaming options
///
/// Both sub-configs are flattened, so the JSON form is a single flat object:
///
/// ```json
/// {
///   "network_name": "office",
///   "network_secret": "correct horse",
///   "resource_url": "https://example.com/firmware.bin",
///   "sink_path": "/flash/firmware.bin"
/// }
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Network identity and reconnect behavior
    #[serde(flatten)]
    pub link: LinkConfig,

    /// Remote resource and sink settings
    #[serde(flatten)]
    pub transfer: TransferConfig,
}

impl Config {
    /// Parse a configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&content)
    }

    /// Check that the configuration can drive a download
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the first offending key.
    pub fn validate(&self) -> Result<()> {
        let link = &self.link;
        if link.network_name.is_empty() {
            return Err(Error::config("network_name", "network name is required"));
        }
        if link.network_name.len() > MAX_NETWORK_NAME_LEN {
            return Err(Error::config(
                "network_name",
                format!(
                    "network name is {} bytes, maximum is {}",
                    link.network_name.len(),
                    MAX_NETWORK_NAME_LEN
                ),
            ));
        }
        let secret_len = link.network_secret.expose().len();
        // Empty secret means an open network
        if secret_len != 0 && !(MIN_SECRET_LEN..=MAX_SECRET_LEN).contains(&secret_len) {
            return Err(Error::config(
                "network_secret",
                format!(
                    "secret must be empty or {}..={} characters, got {}",
                    MIN_SECRET_LEN, MAX_SECRET_LEN, secret_len
                ),
            ));
        }
        if link.reconnect.max_attempts == Some(0) {
            return Err(Error::config(
                "reconnect.max_attempts",
                "max_attempts must be at least 1 (omit it for unlimited)",
            ));
        }
        if link.reconnect.backoff_multiplier < 1.0 {
            return Err(Error::config(
                "reconnect.backoff_multiplier",
                "backoff multiplier must be >= 1.0",
            ));
        }

        let transfer = &self.transfer;
        let url = url::Url::parse(&transfer.resource_url).map_err(|e| {
            Error::config(
                "resource_url",
                format!("invalid URL '{}': {}", transfer.resource_url, e),
            )
        })?;
        match url.scheme() {
            "https" => {}
            "http" => {
                tracing::warn!(url = %url, "resource URL is not using a secure transport");
            }
            other => {
                return Err(Error::config(
                    "resource_url",
                    format!("unsupported URL scheme '{}'", other),
                ));
            }
        }
        if transfer.sink_path.as_os_str().is_empty() {
            return Err(Error::config("sink_path", "sink path is required"));
        }
        if transfer.chunk_size == 0 {
            return Err(Error::config("chunk_size", "chunk size must be greater than zero"));
        }
        if transfer.follow_redirects && transfer.max_redirects == 0 {
            return Err(Error::config(
                "max_redirects",
                "max_redirects must be at least 1 when follow_redirects is enabled",
            ));
        }
        Ok(())
    }
}

/// Network identity and link supervision settings
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LinkConfig {
    /// Network name (SSID)
    #[serde(default)]
    pub network_name: String,

    /// Network passphrase (empty for open networks)
    #[serde(default)]
    pub network_secret: NetworkSecret,

    /// Reconnect behavior after the link drops
    #[serde(default)]
    pub reconnect: ReconnectConfig,
}

impl LinkConfig {
    /// Station credentials handed to the interface
    pub fn credentials(&self) -> Credentials {
        Credentials {
            network_name: self.network_name.clone(),
            network_secret: self.network_secret.clone(),
        }
    }
}

/// Credentials used to join a network in station mode
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Credentials {
    /// Network name (SSID)
    pub network_name: String,
    /// Network passphrase
    pub network_secret: NetworkSecret,
}

/// Network passphrase, redacted in `Debug` output
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NetworkSecret(String);

impl NetworkSecret {
    /// Wrap a passphrase
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// The plaintext passphrase, for handing to the interface driver
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Whether this is an open network
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for NetworkSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("NetworkSecret(<open>)")
        } else {
            f.write_str("NetworkSecret(***)")
        }
    }
}

impl From<&str> for NetworkSecret {
    fn from(secret: &str) -> Self {
        Self::new(secret)
    }
}

/// Reconnect strategy after a link-dropped notification
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconnectStrategy {
    /// Reconnect as soon as the drop is observed (default)
    #[default]
    Immediate,
    /// Wait an exponentially growing delay before reconnecting
    ExponentialBackoff,
}

/// Reconnect configuration
///
/// Each drop notification produces at most one reconnect attempt; the strategy
/// only decides how long to wait before issuing it and when to give up.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReconnectConfig {
    /// Delay strategy (default: immediate)
    #[serde(default)]
    pub strategy: ReconnectStrategy,

    /// Consecutive drops after which reconnection is abandoned (None = unlimited)
    #[serde(default)]
    pub max_attempts: Option<u32>,

    /// Delay before the first backoff reconnect (default: 500 ms)
    #[serde(default = "default_initial_delay", with = "duration_ms_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between backoff reconnects (default: 30 seconds)
    #[serde(default = "default_max_delay", with = "duration_ms_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to backoff delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            strategy: ReconnectStrategy::default(),
            max_attempts: None,
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: true,
        }
    }
}

/// What to do when the sink accepts fewer bytes than it was given
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShortWritePolicy {
    /// Fail the transfer with a short-write error (default)
    #[default]
    Abort,
    /// Keep writing the remainder; fail only if a write makes no progress
    RetryRemainder,
}

/// Remote resource, sink and streaming settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransferConfig {
    /// URL of the resource to download
    #[serde(default)]
    pub resource_url: String,

    /// Destination path inside mounted flash storage
    #[serde(default)]
    pub sink_path: PathBuf,

    /// Read buffer size in bytes (default: 1024)
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Accept certificates whose name does not match the host (default: true)
    ///
    /// This is a deliberate trust relaxation for devices that reach the resource
    /// through addresses not covered by the certificate. Chain validation still applies.
    #[serde(default = "default_true")]
    pub skip_hostname_check: bool,

    /// Follow HTTP redirects (default: true)
    #[serde(default = "default_true")]
    pub follow_redirects: bool,

    /// Maximum number of redirects to follow (default: 10)
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    /// Timeout for establishing the connection (default: 10 seconds)
    #[serde(default = "default_connect_timeout", with = "duration_serde")]
    pub connect_timeout: Duration,

    /// Timeout for a single chunk read (default: 30 seconds)
    #[serde(default = "default_read_timeout", with = "duration_serde")]
    pub read_timeout: Duration,

    /// Short-write handling (default: abort)
    #[serde(default)]
    pub short_write: ShortWritePolicy,

    /// Fail when fewer bytes than advertised were read or written (default: true)
    #[serde(default = "default_true")]
    pub require_full_length: bool,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            resource_url: String::new(),
            sink_path: PathBuf::new(),
            chunk_size: default_chunk_size(),
            skip_hostname_check: true,
            follow_redirects: true,
            max_redirects: default_max_redirects(),
            connect_timeout: default_connect_timeout(),
            read_timeout: default_read_timeout(),
            short_write: ShortWritePolicy::default(),
            require_full_length: true,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_chunk_size() -> usize {
    1024
}

fn default_max_redirects() -> usize {
    10
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_read_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_initial_delay() -> Duration {
    Duration::from_millis(500)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(30)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

// Duration serialization helper (whole seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// Duration serialization helper (milliseconds)
mod duration_ms_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
