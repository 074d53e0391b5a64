//! Scriptable interface for link supervisor tests.

use super::{LinkEvent, LinkNotifier, WifiInterface};
use crate::config::{Credentials, NetworkSecret};
use crate::types::Event;
use async_trait::async_trait;
use std::net::Ipv4Addr;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::broadcast;

pub(crate) const TEST_ADDRESS: Ipv4Addr = Ipv4Addr::new(192, 168, 4, 2);

/// Interface whose notifications are emitted by the test
#[derive(Default)]
pub(crate) struct MockInterface {
    notifier: Mutex<Option<LinkNotifier>>,
    configured: Mutex<Option<Credentials>>,
    connects: AtomicUsize,
    /// Report an address on every connect
    auto_address: Option<Ipv4Addr>,
    fail_configure: bool,
    fail_start: bool,
    fail_connect: bool,
}

impl MockInterface {
    /// Reports `InterfaceStarted` on start; everything else is emitted by the test
    pub(crate) fn manual() -> Self {
        Self::default()
    }

    /// Acquires [`TEST_ADDRESS`] as soon as a connection is attempted
    pub(crate) fn auto_connecting() -> Self {
        Self {
            auto_address: Some(TEST_ADDRESS),
            ..Self::default()
        }
    }

    pub(crate) fn failing_configure() -> Self {
        Self {
            fail_configure: true,
            ..Self::default()
        }
    }

    pub(crate) fn failing_start() -> Self {
        Self {
            fail_start: true,
            ..Self::default()
        }
    }

    pub(crate) fn failing_connect() -> Self {
        Self {
            fail_connect: true,
            ..Self::default()
        }
    }

    pub(crate) fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub(crate) fn configured_credentials(&self) -> Option<Credentials> {
        self.configured.lock().unwrap().clone()
    }

    /// Emit a notification as the driver would
    pub(crate) fn emit(&self, event: LinkEvent) {
        let notifier = self.notifier.lock().unwrap().clone();
        assert!(
            notifier.expect("interface not started").notify(event),
            "supervisor stopped"
        );
    }

    /// Poll until at least `count` connection attempts were issued
    pub(crate) async fn wait_for_connects(&self, count: usize) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while self.connect_count() < count {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap_or_else(|_| {
            panic!(
                "expected {} connects, saw {}",
                count,
                self.connect_count()
            )
        });
    }
}

#[async_trait]
impl WifiInterface for MockInterface {
    async fn configure(&self, credentials: &Credentials) -> crate::Result<()> {
        if self.fail_configure {
            return Err(crate::Error::Other("radio calibration failed".into()));
        }
        *self.configured.lock().unwrap() = Some(credentials.clone());
        Ok(())
    }

    async fn start(&self, notifier: LinkNotifier) -> crate::Result<()> {
        if self.fail_start {
            return Err(crate::Error::Other("station start rejected".into()));
        }
        *self.notifier.lock().unwrap() = Some(notifier.clone());
        notifier.notify(LinkEvent::InterfaceStarted);
        Ok(())
    }

    fn connect(&self) -> crate::Result<()> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if self.fail_connect {
            return Err(crate::Error::Other("driver busy".into()));
        }
        if let Some(address) = self.auto_address {
            if let Some(notifier) = self.notifier.lock().unwrap().as_ref() {
                notifier.notify(LinkEvent::AddressAcquired { address });
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "mock"
    }
}

pub(crate) fn test_credentials() -> Credentials {
    Credentials {
        network_name: "test-net".into(),
        network_secret: NetworkSecret::new("test-secret"),
    }
}

/// Receive events until one matches, failing after a second
pub(crate) async fn next_event_matching(
    rx: &mut broadcast::Receiver<Event>,
    mut predicate: impl FnMut(&Event) -> bool,
) -> Event {
    tokio::time::timeout(Duration::from_secs(1), async {
        loop {
            let event = rx.recv().await.unwrap();
            if predicate(&event) {
                return event;
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}
