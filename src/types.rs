//! Core types and events for wifi-dl

use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

pub use crate::link::LinkState;
pub use crate::transfer::TransferReport;

/// Event emitted during the link and transfer lifecycle
///
/// Delivered on a broadcast channel; see
/// [`WifiDownloader::subscribe`](crate::WifiDownloader::subscribe).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// The link state machine moved
    LinkStateChanged {
        /// Previous state
        from: LinkState,
        /// New state
        to: LinkState,
    },

    /// An address was acquired and the link is usable
    LinkUp {
        /// Assigned IPv4 address
        address: Ipv4Addr,
    },

    /// The link dropped; readiness has been cleared
    LinkDown {
        /// Driver-provided reason, if any
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },

    /// A reconnect attempt was scheduled for the latest drop
    ReconnectScheduled {
        /// Consecutive drops since the link was last usable
        attempt: u32,
        /// Delay before the attempt is issued
        delay_ms: u64,
    },

    /// The reconnect policy gave up; the link stays down
    ReconnectAbandoned {
        /// Consecutive drops at which reconnection stopped
        attempts: u32,
    },

    /// The source was opened and streaming is about to start
    TransferStarted {
        /// Resource URL
        url: String,
        /// Advertised body length in bytes
        content_length: u64,
    },

    /// Streaming finished and the sink was closed
    TransferComplete {
        /// Byte counts, phase durations and throughput
        report: TransferReport,
    },

    /// The transfer failed; it is not retried
    TransferFailed {
        /// Resource URL
        url: String,
        /// Error message
        error: String,
    },
}
