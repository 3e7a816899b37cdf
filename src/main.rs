//! cache-proxy
//!
//! A man-in-the-middle proxy between a game client and its origin servers.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌──────────────────────────────────────────────────┐
//!                         │                   CACHE PROXY                     │
//!   Client                │  ┌──────────┐    ┌────────────┐                  │
//!   ──────────────────────┼─▶│ listener │───▶│ classifier │                  │
//!                         │  └──────────┘    └─────┬──────┘                  │
//!                         │          CONNECT ┌─────┼──────┐ other            │
//!                         │                  ▼     │ API  ▼                  │
//!                         │            ┌────────┐  │  ┌─────────┐            │
//!                         │            │ tunnel │  │  │ forward │──────────▶ │ Origin
//!                         │            └────────┘  ▼  └─────────┘            │
//!                         │        ┌──────────┐ ┌─────────────┐ ┌────────┐   │
//!                         │        │ identity │▶│ coordinator │▶│ origin │─▶ │ API origin
//!                         │        └──────────┘ └──────┬──────┘ └────────┘   │
//!                         │                            ▼                      │
//!                         │                     ┌────────────┐  ◀── admin API│
//!                         │                     │  KV store  │               │
//!                         │                     └────────────┘               │
//!                         └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use cache_proxy::config::loader::load_config;
use cache_proxy::observability::logging;
use cache_proxy::ProxyConfig;

#[derive(Parser)]
#[command(name = "cache-proxy")]
#[command(about = "Caching MITM proxy for game API traffic", long_about = None)]
struct Args {
    /// Path to a TOML config file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => ProxyConfig::default(),
    };

    logging::init(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "cache-proxy starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_connections = config.listener.max_connections,
        api_prefix = %config.api.path_prefix,
        admin_enabled = config.admin.enabled,
        "Configuration loaded"
    );

    cache_proxy::lifecycle::run(config).await?;
    Ok(())
}
