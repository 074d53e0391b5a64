//! Common test utilities for wifi-dl integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::net::Ipv4Addr;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use wifi_dl::config::{Credentials, NetworkSecret};
use wifi_dl::{Config, LinkConfig, LinkEvent, LinkNotifier, TransferConfig, WifiInterface};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const DEVICE_ADDRESS: Ipv4Addr = Ipv4Addr::new(192, 168, 4, 20);

/// Interface that joins the network on every connect unless told otherwise
#[derive(Default)]
pub struct ScriptedInterface {
    notifier: Mutex<Option<LinkNotifier>>,
    credentials: Mutex<Option<Credentials>>,
    connects: AtomicUsize,
    hold_address: bool,
}

impl ScriptedInterface {
    /// Acquires [`DEVICE_ADDRESS`] on every connection attempt
    pub fn joining() -> Self {
        Self::default()
    }

    /// Never acquires an address by itself
    pub fn silent() -> Self {
        Self {
            hold_address: true,
            ..Self::default()
        }
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn credentials(&self) -> Option<Credentials> {
        self.credentials.lock().unwrap().clone()
    }

    pub fn notify(&self, event: LinkEvent) {
        if let Some(notifier) = self.notifier.lock().unwrap().as_ref() {
            notifier.notify(event);
        }
    }
}

#[async_trait]
impl WifiInterface for ScriptedInterface {
    async fn configure(&self, credentials: &Credentials) -> wifi_dl::Result<()> {
        *self.credentials.lock().unwrap() = Some(credentials.clone());
        Ok(())
    }

    async fn start(&self, notifier: LinkNotifier) -> wifi_dl::Result<()> {
        *self.notifier.lock().unwrap() = Some(notifier.clone());
        notifier.notify(LinkEvent::InterfaceStarted);
        Ok(())
    }

    fn connect(&self) -> wifi_dl::Result<()> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if !self.hold_address {
            self.notify(LinkEvent::AddressAcquired {
                address: DEVICE_ADDRESS,
            });
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Deterministic body of `len` bytes
pub fn blob(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 % 256) as u8).collect()
}

/// Serve `body` at `route` with a 200 status
pub async fn serve_blob(server: &MockServer, route: &str, body: Vec<u8>) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
        .mount(server)
        .await;
}

/// Configuration for downloading `url` into `sink`
pub fn test_config(url: String, sink: &Path) -> Config {
    Config {
        link: LinkConfig {
            network_name: "integration-net".into(),
            network_secret: NetworkSecret::new("integration-secret"),
            ..Default::default()
        },
        transfer: TransferConfig {
            resource_url: url,
            sink_path: sink.to_path_buf(),
            ..Default::default()
        },
    }
}
