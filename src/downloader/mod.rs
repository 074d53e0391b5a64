//! Top-level downloader.
//!
//! [`WifiDownloader`] runs the single foreground sequence: bring the link up,
//! wait until it has an address, then stream the configured resource to the
//! configured sink once.


use crate::config::Config;
use crate::error::Result;
use crate::link::{ConnectivityManager, WifiInterface};
use crate::transfer::{
    FileSinkOpener, HttpsSource, SinkOpener, SourceOpener, TransferPipeline, TransferReport,
};
use crate::types::Event;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Capacity of the event broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Connects a device to Wi-Fi and downloads one resource into local storage
pub struct WifiDownloader {
    config: Config,
    link: ConnectivityManager,
    pipeline: TransferPipeline,
    event_tx: broadcast::Sender<Event>,
}

impl WifiDownloader {
    /// Validate `config`, bring up `interface` and prepare an HTTPS-to-file transfer
    ///
    /// This performs the following initialization:
    /// - Validates the configuration
    /// - Builds the HTTPS client from the transfer settings
    /// - Configures and starts the interface, beginning the first connection attempt
    ///
    /// Returns without waiting for the link; [`run`](Self::run) waits.
    ///
    /// # Errors
    ///
    /// Configuration errors, and [`LinkError::InterfaceInit`] when the interface
    /// cannot be brought up.
    ///
    /// [`LinkError::InterfaceInit`]: crate::error::LinkError::InterfaceInit
    pub async fn new(config: Config, interface: Arc<dyn WifiInterface>) -> Result<Self> {
        config.validate()?;
        let sources = Arc::new(HttpsSource::new(&config.transfer)?);
        Self::with_collaborators(config, interface, sources, Arc::new(FileSinkOpener)).await
    }

    /// Like [`new`](Self::new), with caller-provided source and sink openers
    pub async fn with_collaborators(
        config: Config,
        interface: Arc<dyn WifiInterface>,
        sources: Arc<dyn SourceOpener>,
        sinks: Arc<dyn SinkOpener>,
    ) -> Result<Self> {
        config.validate()?;

        let (event_tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        let link = ConnectivityManager::from_config(&config.link, interface, event_tx.clone())
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to initialize network interface"))?;

        let pipeline = TransferPipeline::new(&config.transfer, sources, sinks)
            .with_readiness(link.readiness())
            .with_events(event_tx.clone());

        Ok(Self {
            config,
            link,
            pipeline,
            event_tx,
        })
    }

    /// Subscribe to link and transfer events
    ///
    /// Each subscriber receives every event published after it subscribed.
    /// A subscriber that falls more than 1000 events behind receives
    /// `RecvError::Lagged`.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// The connectivity manager supervising the link
    pub fn link(&self) -> &ConnectivityManager {
        &self.link
    }

    /// The validated configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Wait for the link, then download the configured resource once
    ///
    /// Blocks for as long as the link stays down. The transfer is not
    /// retried; its error is returned as is.
    pub async fn run(&self) -> Result<TransferReport> {
        self.link.wait_until_ready().await?;
        self.pipeline
            .fetch(&self.config.transfer.resource_url, &self.config.transfer.sink_path)
            .await
    }
}
