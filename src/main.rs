//! traffic-manager daemon.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌──────────────────────────────────────────────┐
//!                    │                traffic-manager               │
//!                    │                                              │
//!   gRPC (h2c)  ─────┼─▶ ┌────────┐   ┌──────────┐   ┌───────────┐  │
//!   plain HTTP  ─────┼─▶ │  net   │──▶│   http   │──▶│ rpc /     │  │
//!                    │   │listener│   │ dispatch │   │ fallback  │  │
//!                    │   └────────┘   └──────────┘   └───────────┘  │
//!                    │                                              │
//!                    │   ┌────────────┐  watch   ┌───────────────┐  │
//!                    │   │ intercept  │─────────▶│    reaper     │──┼──▶ System A
//!                    │   │   store    │          │ (systema-gc)  │  │
//!                    │   └────────────┘          └───────────────┘  │
//!                    │         ▲ expire()                           │
//!                    │   ┌─────┴──────┐                             │
//!                    │   │intercept-gc│    lifecycle: TaskGroup     │
//!                    │   └────────────┘    signals, hard deadline   │
//!                    └──────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use traffic_manager::config::load_config;
use traffic_manager::observability::{logging, metrics};
use traffic_manager::systema::LoggingConnector;
use traffic_manager::{Manager, RpcServices};

#[derive(Debug, Parser)]
#[command(name = "traffic-manager", version, about = "Traffic manager daemon")]
struct Cli {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref()).context("loading configuration")?;
    logging::init_logging(&config.observability).context("installing log subscriber")?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        pid = std::process::id(),
        "traffic-manager starting"
    );
    tracing::info!(
        address = %config.server.bind_address(),
        max_connections = config.server.max_connections,
        expiration_interval = ?config.expiration.interval(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr = config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .context("parsing metrics address")?;
        metrics::init_metrics(addr).context("starting metrics exporter")?;
    }

    let manager = Manager::new(config, LoggingConnector::default());
    manager.run(RpcServices::new()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
