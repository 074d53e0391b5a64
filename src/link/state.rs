//! Link state machine

use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

/// Wireless link state
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkState {
    /// Interface not started, or reconnection abandoned
    #[default]
    Disconnected,
    /// Association or address acquisition in progress
    Connecting,
    /// Address assigned; the link is usable
    Connected,
}

impl LinkState {
    /// Stable lowercase name for logs
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        }
    }

    /// Whether the link can carry traffic
    pub const fn is_usable(self) -> bool {
        matches!(self, Self::Connected)
    }

    /// State after a notification, assuming reconnection continues
    ///
    /// A drop leads to `Connecting` here; the supervisor moves to
    /// `Disconnected` instead when the reconnect policy gives up.
    pub fn on_event(self, event: &LinkEvent) -> LinkState {
        match event {
            LinkEvent::InterfaceStarted => match self {
                Self::Connected => Self::Connected,
                Self::Disconnected | Self::Connecting => Self::Connecting,
            },
            LinkEvent::AddressAcquired { .. } => Self::Connected,
            LinkEvent::LinkDropped { .. } => Self::Connecting,
        }
    }
}

impl std::fmt::Display for LinkState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Notification delivered by a [`WifiInterface`](super::WifiInterface)
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LinkEvent {
    /// The interface finished starting in station mode
    InterfaceStarted,
    /// DHCP (or static configuration) assigned an address
    AddressAcquired {
        /// Assigned IPv4 address
        address: Ipv4Addr,
    },
    /// The association was lost or a connection attempt failed
    LinkDropped {
        /// Driver-provided reason, if any
        reason: Option<String>,
    },
}

impl LinkEvent {
    /// Short name for logs
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::InterfaceStarted => "interface_started",
            Self::AddressAcquired { .. } => "address_acquired",
            Self::LinkDropped { .. } => "link_dropped",
        }
    }
}
