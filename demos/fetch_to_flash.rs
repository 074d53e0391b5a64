//! Fetch-to-flash example
//!
//! Waits for the network, downloads one file into local storage and prints
//! the transfer report as JSON.
//!
//! Configuration comes from a JSON file given as the first argument, or from
//! environment variables (a `.env` file is loaded if present):
//!
//! ```bash
//! WIFI_SSID=office WIFI_PASSWORD='correct horse' \
//! WIFI_DL_URL=https://example.com/firmware.bin WIFI_DL_SINK=/tmp/firmware.bin \
//! RUST_LOG=wifi_dl=debug cargo run --example fetch_to_flash
//! ```

use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};
use wifi_dl::config::NetworkSecret;
use wifi_dl::{Config, Event, HostInterface, WifiDownloader};

fn config_from_env() -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = Config::default();
    config.link.network_name = std::env::var("WIFI_SSID")?;
    config.link.network_secret = NetworkSecret::new(std::env::var("WIFI_PASSWORD").unwrap_or_default());
    config.transfer.resource_url = std::env::var("WIFI_DL_URL")?;
    config.transfer.sink_path = std::env::var("WIFI_DL_SINK")?.into();
    if let Ok(chunk_size) = std::env::var("WIFI_DL_CHUNK_SIZE") {
        config.transfer.chunk_size = chunk_size.parse()?;
    }
    Ok(config)
}

async fn fetch(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let downloader = WifiDownloader::new(config, Arc::new(HostInterface::new())).await?;

    let mut events = downloader.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                Event::LinkUp { address } => println!("✓ Link up: {}", address),
                Event::LinkDown { reason } => {
                    println!("✗ Link down: {}", reason.as_deref().unwrap_or("unknown"))
                }
                Event::TransferStarted {
                    url,
                    content_length,
                } => println!("⬇ Downloading {} ({} bytes)", url, content_length),
                _ => {}
            }
        }
    });

    let report = downloader.run().await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("wifi_dl=info")))
        .with(fmt::layer())
        .init();

    let config: Result<Config, Box<dyn std::error::Error>> = match std::env::args().nth(1) {
        Some(path) => Config::from_file(path).map_err(Into::into),
        None => config_from_env(),
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match fetch(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Download failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
