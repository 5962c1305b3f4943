//! Image upload relay.
//!
//! Accepts one uploaded image per request, stages it on disk, forwards it
//! to a downstream processor and returns the processor's JSON.
//!
//! # Architecture Overview
//!
//! ```text
//!                          ┌───────────────────────────────────────────────┐
//!                          │                  IMAGE RELAY                   │
//!   POST                   │  ┌─────────┐   ┌──────────┐   ┌────────────┐  │
//!   /api/process-image ────┼─▶│  http   │──▶│  upload  │──▶│ transient  │  │
//!                          │  │ server  │   │ extract  │   │   file     │  │
//!                          │  └─────────┘   └──────────┘   └─────┬──────┘  │
//!                          │                                      │         │
//!                          │                                      ▼         │      Downstream
//!   JSON / {"error"} ◀─────┼──────────────── handler ◀──── downstream ─────┼────▶ /process
//!                          │                                  client        │
//!                          │  ┌──────────────────────────────────────────┐ │
//!                          │  │ config │ observability │ lifecycle        │ │
//!                          │  └──────────────────────────────────────────┘ │
//!                          └───────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use image_relay::config::{load_config, RelayConfig};
use image_relay::http::HttpServer;
use image_relay::lifecycle::{prepare_upload_dir, signals, Shutdown};
use image_relay::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "image-relay", version)]
#[command(about = "Relays uploaded images to a downstream processor", long_about = None)]
struct Args {
    /// Path to a TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => RelayConfig::default(),
    };

    logging::init(&config.observability)?;
    tracing::info!("image-relay v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        route = %config.upload.route,
        upload_dir = %config.upload.directory.display(),
        downstream = %config.downstream.url,
        downstream_timeout_secs = config.downstream.timeout_secs,
        "Configuration loaded"
    );

    prepare_upload_dir(&config.upload.directory).await?;

    if config.observability.metrics_enabled {
        metrics::init_metrics(config.observability.metrics_address.parse()?)?;
    }

    let server = HttpServer::new(config)?;
    let listener = TcpListener::bind(&server.config().listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let mut server_task = tokio::spawn(server.run(listener, shutdown.subscribe()));

    tokio::select! {
        result = &mut server_task => {
            result??;
            return Ok(());
        }
        _ = signals::wait_for_shutdown() => {}
    }

    shutdown.trigger();
    server_task.await??;

    tracing::info!("Shutdown complete");
    Ok(())
}
