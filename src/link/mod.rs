//! Wireless link supervision.
//!
//! The [`ConnectivityManager`] drives a [`WifiInterface`] from unconfigured to
//! address-assigned and keeps it there. Interface notifications are passed as
//! messages to a single supervisor task, which owns the [`LinkState`] and is
//! the only writer of the readiness signal. Callers only ever wait:
//!
//! ```text
//! Disconnected --started--> Connecting --address--> Connected
//!                               ^                       |
//!                               +-------dropped---------+
//! ```

mod interface;
mod state;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

pub use interface::{HostInterface, LinkNotifier, WifiInterface};
pub use state::{LinkEvent, LinkState};

use crate::config::{Credentials, LinkConfig};
use crate::error::{Error, LinkError, Result};
use crate::readiness::{self, Readiness, ReadinessSignal};
use crate::retry::{ReconnectPolicy, policy_from_config};
use crate::types::Event;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Owner of the wireless link lifecycle
///
/// Dropping the manager stops the supervisor; outstanding waits then fail
/// with [`LinkError::Stopped`] unless the link was already up.
pub struct ConnectivityManager {
    interface_name: String,
    readiness: Readiness,
    supervisor: JoinHandle<()>,
}

impl ConnectivityManager {
    /// Configure the interface, start supervising it and begin connecting
    ///
    /// Returns as soon as the first connection attempt is under way; use
    /// [`wait_until_ready`](Self::wait_until_ready) to wait for an address.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::InterfaceInit`] if the interface cannot be configured
    /// or started. Networking is a hard prerequisite, so callers should treat this
    /// as fatal.
    pub async fn initialize(
        credentials: &Credentials,
        interface: Arc<dyn WifiInterface>,
        policy: Box<dyn ReconnectPolicy>,
        event_tx: broadcast::Sender<Event>,
    ) -> Result<Self> {
        let interface_name = interface.name().to_string();
        let init_error = |e: Error| LinkError::InterfaceInit {
            interface: interface_name.clone(),
            reason: e.to_string(),
        };

        interface.configure(credentials).await.map_err(init_error)?;
        tracing::info!(
            interface = %interface_name,
            network = %credentials.network_name,
            open_network = credentials.network_secret.is_empty(),
            "Station mode configured"
        );

        let (signal, readiness) = readiness::channel();
        let (notifier, events) = LinkNotifier::channel();
        tracing::debug!(policy = policy.name(), "Starting link supervisor");
        let supervisor = LinkSupervisor::new(Arc::clone(&interface), signal, policy, event_tx);
        let supervisor = tokio::spawn(supervisor.run(events));

        if let Err(e) = interface.start(notifier).await {
            supervisor.abort();
            return Err(init_error(e).into());
        }
        tracing::info!(interface = %interface_name, "Connecting to Wi-Fi...");

        Ok(Self {
            interface_name,
            readiness,
            supervisor,
        })
    }

    /// [`initialize`](Self::initialize) with the reconnect policy named in `config`
    pub async fn from_config(
        config: &LinkConfig,
        interface: Arc<dyn WifiInterface>,
        event_tx: broadcast::Sender<Event>,
    ) -> Result<Self> {
        let policy = policy_from_config(&config.reconnect);
        Self::initialize(&config.credentials(), interface, policy, event_tx).await
    }

    /// Wait, without timeout, until the link has an address
    pub async fn wait_until_ready(&self) -> Result<()> {
        if !self.readiness.is_ready() {
            tracing::info!(interface = %self.interface_name, "Waiting for link");
        }
        self.readiness.wait().await
    }

    /// Blocking variant of [`wait_until_ready`](Self::wait_until_ready) for non-async threads
    pub fn wait_until_ready_blocking(&self) -> Result<()> {
        self.readiness.wait_blocking()
    }

    /// Whether the link is usable right now
    pub fn is_ready(&self) -> bool {
        self.readiness.is_ready()
    }

    /// A reader handle on the readiness signal
    pub fn readiness(&self) -> Readiness {
        self.readiness.clone()
    }

    /// Name of the supervised interface
    pub fn interface_name(&self) -> &str {
        &self.interface_name
    }
}

impl Drop for ConnectivityManager {
    fn drop(&mut self) {
        self.supervisor.abort();
    }
}

/// What the supervisor loop should do after a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reconnect {
    /// Arm the delayed reconnect
    After(Duration),
    /// Disarm any pending delayed reconnect
    Cancel,
    /// Leave the pending reconnect as it is
    Keep,
}

/// Single writer of link state and readiness
struct LinkSupervisor {
    interface: Arc<dyn WifiInterface>,
    signal: ReadinessSignal,
    policy: Box<dyn ReconnectPolicy>,
    event_tx: broadcast::Sender<Event>,
    state: LinkState,
    attempt: u32,
}

impl LinkSupervisor {
    fn new(
        interface: Arc<dyn WifiInterface>,
        signal: ReadinessSignal,
        policy: Box<dyn ReconnectPolicy>,
        event_tx: broadcast::Sender<Event>,
    ) -> Self {
        Self {
            interface,
            signal,
            policy,
            event_tx,
            state: LinkState::Disconnected,
            attempt: 0,
        }
    }

    async fn run(mut self, mut events: mpsc::UnboundedReceiver<LinkEvent>) {
        let backoff = tokio::time::sleep(Duration::ZERO);
        tokio::pin!(backoff);
        let mut armed = false;

        loop {
            tokio::select! {
                event = events.recv() => {
                    let Some(event) = event else { break };
                    match self.handle(event) {
                        Reconnect::After(delay) => match Instant::now().checked_add(delay) {
                            Some(deadline) => {
                                backoff.as_mut().reset(deadline);
                                armed = true;
                            }
                            // Unrepresentable deadline: the reconnect never fires
                            None => armed = false,
                        },
                        Reconnect::Cancel => armed = false,
                        Reconnect::Keep => {}
                    }
                }
                () = &mut backoff, if armed => {
                    armed = false;
                    tracing::debug!(attempt = self.attempt, "Reconnect delay elapsed");
                    self.issue_connect();
                }
            }
        }
        tracing::debug!("Link supervisor stopped: all notifiers dropped");
    }

    fn handle(&mut self, event: LinkEvent) -> Reconnect {
        tracing::trace!(event = event.as_str(), state = %self.state, "Link notification");
        match event {
            LinkEvent::InterfaceStarted => self.on_interface_started(),
            LinkEvent::AddressAcquired { address } => self.on_address_acquired(address),
            LinkEvent::LinkDropped { reason } => self.on_link_dropped(reason),
        }
    }

    fn on_interface_started(&mut self) -> Reconnect {
        self.transition(self.state.on_event(&LinkEvent::InterfaceStarted));
        self.issue_connect();
        Reconnect::Keep
    }

    fn on_address_acquired(&mut self, address: Ipv4Addr) -> Reconnect {
        self.signal.set();
        self.attempt = 0;
        self.transition(LinkState::Connected);
        tracing::info!(%address, "Got IP");
        let _ = self.event_tx.send(Event::LinkUp { address });
        Reconnect::Cancel
    }

    fn on_link_dropped(&mut self, reason: Option<String>) -> Reconnect {
        self.signal.clear();
        let _ = self.event_tx.send(Event::LinkDown {
            reason: reason.clone(),
        });
        self.attempt = self.attempt.saturating_add(1);

        match self.policy.next_delay(self.attempt) {
            Some(delay) => {
                let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
                tracing::info!(
                    reason = reason.as_deref().unwrap_or("unknown"),
                    attempt = self.attempt,
                    delay_ms,
                    "Disconnected. Reconnecting..."
                );
                self.transition(LinkState::Connecting);
                let _ = self.event_tx.send(Event::ReconnectScheduled {
                    attempt: self.attempt,
                    delay_ms,
                });
                if delay.is_zero() {
                    self.issue_connect();
                    Reconnect::Cancel
                } else {
                    Reconnect::After(delay)
                }
            }
            None => {
                tracing::error!(
                    reason = reason.as_deref().unwrap_or("unknown"),
                    attempts = self.attempt,
                    policy = self.policy.name(),
                    "Disconnected. Reconnect policy exhausted, link stays down"
                );
                self.transition(LinkState::Disconnected);
                let _ = self.event_tx.send(Event::ReconnectAbandoned {
                    attempts: self.attempt,
                });
                Reconnect::Cancel
            }
        }
    }

    fn issue_connect(&self) {
        match self.interface.connect() {
            Ok(()) => tracing::debug!(interface = self.interface.name(), "Connection attempt issued"),
            // The driver reports failed associations as drops; wait for that
            Err(e) => tracing::warn!(
                interface = self.interface.name(),
                error = %e,
                "Connection trigger failed"
            ),
        }
    }

    fn transition(&mut self, to: LinkState) {
        if self.state == to {
            return;
        }
        let from = std::mem::replace(&mut self.state, to);
        tracing::debug!(%from, %to, "Link state changed");
        let _ = self.event_tx.send(Event::LinkStateChanged { from, to });
    }
}
