// Cerabridge MQTT - Bridge daemon for the shift accumulator engine
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! # Cerabridge MQTT
//!
//! Bridge daemon: subscribes to the gateway topics, runs every data
//! sample through the shift accumulator engine and republishes the
//! derived ISA-95 documents.
//!
//! ## Usage
//!
//! ```bash
//! # Environment configuration
//! MQTT_BROKER=tcp://broker:1883 cerabridge-mqtt
//!
//! # Positional arguments win over the environment
//! cerabridge-mqtt tcp://broker:1883 plant-bridge celima/planta/linea
//! ```
//!
//! Exits 0 on clean shutdown (SIGINT/SIGTERM), 1 when the initial broker
//! connection fails.

mod app;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use app::Bridge;
use cerabridge::Router;

/// Cerabridge MQTT bridge daemon
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Broker URI
    #[arg(env = "MQTT_BROKER", default_value = "tcp://localhost:1883")]
    broker: String,

    /// Client identifier for the persistent broker session
    #[arg(env = "MQTT_CLIENT_ID", default_value = "celima-integration")]
    client_id: String,

    /// ISA-95 topic root prepended to every derived topic
    #[arg(env = "ISA95_PREFIX", default_value = "celima/punta_hermosa/planta/linea")]
    isa95_prefix: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Cerabridge MQTT v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Connecting to {} as {} (prefix: {})",
        args.broker, args.client_id, args.isa95_prefix
    );

    let router = Router::new(args.isa95_prefix);
    let mut bridge = Bridge::new(&args.broker, &args.client_id, router)?;

    // Fatal if the broker rejects the first connection attempt
    bridge.connect().await?;

    bridge.run(shutdown_signal()).await?;
    info!("clean shutdown");
    Ok(())
}

async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate()).expect("SIGTERM handler");
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }
}
