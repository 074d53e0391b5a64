//! Transfer summary

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Smallest phase duration used as a throughput divisor, in seconds
pub const MIN_PHASE_SECONDS: f64 = 0.001;

/// Byte counts, phase durations and throughput of one transfer
///
/// Serialized as the machine-readable result of a download.
#[must_use]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransferReport {
    /// When the session was opened
    pub started_at: DateTime<Utc>,
    /// Bytes pulled from the source
    pub bytes_read: u64,
    /// Bytes accepted by the sink
    pub bytes_written: u64,
    /// Body length advertised by the server
    pub expected_length: u64,
    /// Time spent in reads
    pub download_seconds: f64,
    /// Time spent in writes
    pub write_seconds: f64,
    /// Wall-clock time from session open to close
    pub total_seconds: f64,
    /// Read throughput in KiB/s
    pub download_kbps: f64,
    /// Write throughput in KiB/s
    pub write_kbps: f64,
}

impl TransferReport {
    pub(crate) fn new(
        started_at: DateTime<Utc>,
        bytes_read: u64,
        bytes_written: u64,
        expected_length: u64,
        download_time: Duration,
        write_time: Duration,
        total_time: Duration,
    ) -> Self {
        let download_seconds = download_time.as_secs_f64();
        let write_seconds = write_time.as_secs_f64();
        Self {
            started_at,
            bytes_read,
            bytes_written,
            expected_length,
            download_seconds,
            write_seconds,
            total_seconds: total_time.as_secs_f64(),
            download_kbps: throughput_kbps(bytes_read, download_seconds),
            write_kbps: throughput_kbps(bytes_written, write_seconds),
        }
    }

    /// Whether both counters match the advertised length
    pub fn is_complete(&self) -> bool {
        self.bytes_read == self.expected_length && self.bytes_written == self.expected_length
    }
}

/// KiB per second, with the duration floored at [`MIN_PHASE_SECONDS`]
///
/// ```
/// use wifi_dl::transfer::throughput_kbps;
///
/// assert_eq!(throughput_kbps(2048, 2.0), 1.0);
/// assert!(throughput_kbps(1024, 0.0).is_finite());
/// ```
pub fn throughput_kbps(bytes: u64, seconds: f64) -> f64 {
    bytes as f64 / 1024.0 / seconds.max(MIN_PHASE_SECONDS)
}
