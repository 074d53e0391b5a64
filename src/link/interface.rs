//! Network interface seam
//!
//! The [`WifiInterface`] trait is the boundary between the link supervisor and
//! whatever owns the radio: a vendor Wi-Fi driver on a device, or the host
//! operating system via [`HostInterface`]. Interfaces report asynchronous
//! notifications through a [`LinkNotifier`], which never blocks the caller.

use super::state::LinkEvent;
use crate::config::Credentials;
use async_trait::async_trait;
use std::net::{Ipv4Addr, SocketAddr, UdpSocket};
use std::sync::Mutex;
use tokio::sync::mpsc;

/// Sending half of the notification channel into the link supervisor
///
/// Cheap to clone; safe to call from driver callbacks on any thread.
#[derive(Debug, Clone)]
pub struct LinkNotifier {
    tx: mpsc::UnboundedSender<LinkEvent>,
}

impl LinkNotifier {
    pub(crate) fn channel() -> (Self, mpsc::UnboundedReceiver<LinkEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Deliver a notification; returns false once the supervisor has stopped
    pub fn notify(&self, event: LinkEvent) -> bool {
        match self.tx.send(event) {
            Ok(()) => true,
            Err(mpsc::error::SendError(event)) => {
                tracing::debug!(event = event.as_str(), "link supervisor stopped, notification dropped");
                false
            }
        }
    }
}

/// A network interface that can join a wireless network in station mode
///
/// # Contract
///
/// - [`configure`](Self::configure) is called once, before `start`.
/// - [`start`](Self::start) registers the notifier and starts the interface.
///   It must eventually report [`LinkEvent::InterfaceStarted`].
/// - [`connect`](Self::connect) only triggers an attempt and returns at once;
///   the outcome arrives later as `AddressAcquired` or `LinkDropped`.
#[async_trait]
pub trait WifiInterface: Send + Sync {
    /// Configure station mode with the given network identity
    async fn configure(&self, credentials: &Credentials) -> crate::Result<()>;

    /// Register for notifications and start the interface
    async fn start(&self, notifier: LinkNotifier) -> crate::Result<()>;

    /// Trigger a connection attempt (fire-and-forget)
    fn connect(&self) -> crate::Result<()>;

    /// Human-readable name for logging
    fn name(&self) -> &str {
        "wifi"
    }
}

/// Interface for hosts whose operating system already manages the network
///
/// `start` reports the interface as started and `connect` reports the
/// host's primary IPv4 address as acquired. Link drops are never reported.
#[derive(Debug, Default)]
pub struct HostInterface {
    notifier: Mutex<Option<LinkNotifier>>,
}

impl HostInterface {
    /// Create a host interface
    pub fn new() -> Self {
        Self::default()
    }

    fn notifier(&self) -> Option<LinkNotifier> {
        self.notifier
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl WifiInterface for HostInterface {
    async fn configure(&self, credentials: &Credentials) -> crate::Result<()> {
        tracing::debug!(
            network = %credentials.network_name,
            "host network is managed by the operating system, credentials unused"
        );
        Ok(())
    }

    async fn start(&self, notifier: LinkNotifier) -> crate::Result<()> {
        *self
            .notifier
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(notifier.clone());
        notifier.notify(LinkEvent::InterfaceStarted);
        Ok(())
    }

    fn connect(&self) -> crate::Result<()> {
        let notifier = self
            .notifier()
            .ok_or_else(|| crate::Error::Other("host interface not started".into()))?;
        let address = primary_ipv4().unwrap_or(Ipv4Addr::LOCALHOST);
        notifier.notify(LinkEvent::AddressAcquired { address });
        Ok(())
    }

    fn name(&self) -> &str {
        "host"
    }
}

/// Address of the interface the host would route public traffic through
///
/// Connecting a UDP socket only selects a route; no packet is sent.
fn primary_ipv4() -> Option<Ipv4Addr> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).ok()?;
    socket.connect((Ipv4Addr::new(192, 0, 2, 1), 9)).ok()?;
    match socket.local_addr().ok()? {
        SocketAddr::V4(addr) if !addr.ip().is_unspecified() => Some(*addr.ip()),
        _ => None,
    }
}
