//! Dispatch Hub - Main entry point
//!
//! Ride-dispatch reconciliation service: subscribes to the vehicle bus,
//! maintains fleet state, and serves the operator dashboard API.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tokio::sync::{mpsc, RwLock};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dispatch_common::config::DispatchConfig;
use dispatch_common::events::EventBus;
use dispatch_common::model::FleetState;
use dispatch_hub::bus::BusClient;
use dispatch_hub::reconciler::Reconciler;
use dispatch_hub::services::{DriversClient, GeocodeClient};
use dispatch_hub::{build_router, AppState};

/// Command-line arguments for dispatch-hub
#[derive(Parser, Debug)]
#[command(name = "dispatch-hub")]
#[command(about = "Ride-dispatch reconciliation service")]
#[command(version)]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long, env = "DISPATCH_CONFIG")]
    config: Option<PathBuf>,

    /// HTTP port to listen on (overrides the config file)
    #[arg(short, long, env = "DISPATCH_HTTP_PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dispatch_hub=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Log build identification immediately after tracing init
    info!(
        "Starting Dispatch Hub v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let args = Args::parse();
    let config = DispatchConfig::load(args.config.as_deref());
    let http_port = args.port.unwrap_or(config.http.port);

    // Shared state and channels
    let events = Arc::new(EventBus::new(1000));
    let fleet = Arc::new(RwLock::new(FleetState::new()));
    let (inbound_tx, inbound_rx) = mpsc::channel(256);
    let (outbound_tx, outbound_rx) = mpsc::channel(64);

    // Bus client: subscribes to vehicle topics and drains outbound publishes
    info!(
        "Connecting to broker at {}:{}",
        config.broker.host, config.broker.port
    );
    let bus = BusClient::connect(&config.broker);
    tokio::spawn(bus.run(inbound_tx, outbound_rx, Arc::clone(&events)));

    // Reconciler: single consumer of inbound messages
    let reconciler = Reconciler::new(Arc::clone(&fleet), Arc::clone(&events), outbound_tx.clone());
    tokio::spawn(reconciler.run(inbound_rx));

    // External service clients
    let geocode = Arc::new(
        GeocodeClient::new(&config.geocode).context("Failed to build geocoding client")?,
    );
    let drivers = match &config.drivers.url {
        Some(url) => Some(Arc::new(
            DriversClient::new(url).context("Failed to build driver-list client")?,
        )),
        None => None,
    };

    let state = AppState {
        fleet,
        events,
        publisher: outbound_tx,
        drivers,
        geocode,
    };
    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], http_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("dispatch-hub listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
