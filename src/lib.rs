//! # wifi-dl
//!
//! Wireless link supervision and streaming HTTPS-to-flash downloads.
//!
//! ## Design Philosophy
//!
//! wifi-dl is designed to be:
//! - **Wait-based** - Callers block on a single readiness condition, never on driver callbacks
//! - **Collaborator-driven** - Radio, transport and storage sit behind traits
//! - **Measured** - Reads and writes are timed separately and reported per phase
//! - **Event-driven** - Consumers subscribe to events, no polling required
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use wifi_dl::{Config, HostInterface, WifiDownloader};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_json(
//!         r#"{
//!             "network_name": "office",
//!             "network_secret": "correct horse",
//!             "resource_url": "https://example.com/firmware.bin",
//!             "sink_path": "/flash/firmware.bin"
//!         }"#,
//!     )?;
//!
//!     let downloader = WifiDownloader::new(config, Arc::new(HostInterface::new())).await?;
//!
//!     // Subscribe to events
//!     let mut events = downloader.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let report = downloader.run().await?;
//!     println!("{:.2} KB/s", report.download_kbps);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Top-level downloader
pub mod downloader;
/// Error types
pub mod error;
/// Wireless link supervision
pub mod link;
/// Single-writer readiness condition
pub mod readiness;
/// Reconnect policies with exponential backoff
pub mod retry;
/// Streaming transfer pipeline
pub mod transfer;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use config::{Config, LinkConfig, ReconnectConfig, ShortWritePolicy, TransferConfig};
pub use downloader::WifiDownloader;
pub use error::{Error, LinkError, Result, TransferError};
pub use link::{ConnectivityManager, HostInterface, LinkEvent, LinkNotifier, LinkState, WifiInterface};
pub use readiness::Readiness;
pub use transfer::{TransferPipeline, TransferReport};
pub use types::Event;
