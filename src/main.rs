//! ipecho: tells callers who they look like from the outside.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ request id ─▶ trace ─▶ timeout ─▶ rate limit ─▶ CORS ─▶ handler
//!                                                          │                     │
//!                                                   429 when the         identity::resolve
//!                                                   bucket is empty      (geo ∥ reverse DNS)
//!                                                                               │
//!     Client Response ◀──────────── json / yaml / xml / html / text ◀───────────┘
//!
//!     Background: visitor sweeper (admission registry), signal handler
//! ```

use clap::Parser;
use tokio::net::TcpListener;

use ipecho::config::Cli;
use ipecho::http::HttpServer;
use ipecho::lifecycle::{signals, Shutdown};
use ipecho::observability::{logging, metrics};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Cli::parse().into_config()?;

    logging::init_logging(&config.observability);

    tracing::info!("ipecho v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        tls = config.listener.tls.is_some(),
        static_dir = %config.paths.static_dir,
        geoip_dir = %config.paths.geoip_dir,
        requests_per_second = config.rate_limit.requests_per_second,
        burst_size = config.rate_limit.burst_size,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let shutdown = Shutdown::new();
    tokio::spawn(signals::trigger_on_signal(shutdown.clone()));

    let tls = config.listener.tls.clone();
    let bind_address = config.listener.bind_address.clone();
    let server = HttpServer::new(config);

    match tls {
        Some(tls) => {
            let addr = bind_address.parse()?;
            server.run_tls(addr, &tls, shutdown).await?;
        }
        None => {
            let listener = TcpListener::bind(&bind_address).await?;
            tracing::info!(address = %listener.local_addr()?, "Listening for connections");
            server.run(listener, shutdown).await?;
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
