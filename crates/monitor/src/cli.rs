//! CLI for the registry monitor.

use crate::{
    metrics::{MetricServer, Metrics},
    service::{MonitorConfig, RegistryMonitor},
};
use alloy::{eips::BlockNumberOrTag, primitives::Address};
use clap::Parser;
use keeper_clients::registry::RegistryVersion;
use prometheus::Registry;
use std::sync::Arc;
use tracing::info;

/// Errors from the monitor CLI
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// invalid prometheus address
    #[error("invalid prometheus address")]
    InvalidPromAddress,
    /// error running the monitor service
    #[error(transparent)]
    Monitor(#[from] crate::service::Error),
}

/// Registry event monitor.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Opts {
    /// Keeper registry contract address
    #[arg(long, required = true)]
    registry_address: Address,

    /// Keeper registry version
    #[arg(long, default_value = "v1.3")]
    registry_version: RegistryVersion,

    /// WS Ethereum RPC address. Defaults to a local anvil node address.
    #[arg(long, default_value = "ws://127.0.0.1:8545")]
    ws_eth_rpc: String,

    /// Block to start following events from. Defaults to the latest block.
    #[arg(long)]
    from_block: Option<u64>,

    /// prometheus metrics address
    #[arg(long, default_value = "127.0.0.1:3001")]
    prom_address: String,

    /// WS RPC retry backoff duration limit in milliseconds.
    #[arg(long, default_value_t = 5 * 60 * 1_000)]
    ws_backoff_limit_ms: u64,

    /// WS RPC retry backoff multiplier. The sleep duration will be `num_retries *
    /// backoff_multiplier_ms`.
    #[arg(long, default_value_t = 10)]
    ws_backoff_multiplier_ms: u64,
}

/// Command line interface for running the monitor.
#[derive(Debug)]
pub struct Cli;

impl Cli {
    /// Parse CLI options and run the monitor until shutdown.
    pub async fn run() -> Result<(), Error> {
        let opts = Opts::parse();

        if opts.prom_address.parse::<std::net::SocketAddr>().is_err() {
            return Err(Error::InvalidPromAddress);
        }

        let registry = Registry::new();
        let metrics = Arc::new(Metrics::new(&registry));

        let metric_server = MetricServer::new(Arc::new(registry));
        let prom_address = opts.prom_address.clone();
        tokio::spawn(async move { metric_server.serve(&prom_address).await });
        info!("prometheus metrics listening on {}", opts.prom_address);

        let from_block =
            opts.from_block.map_or(BlockNumberOrTag::Latest, BlockNumberOrTag::Number);

        let config = MonitorConfig {
            registry: opts.registry_address,
            version: opts.registry_version,
            ws_rpc_url: opts.ws_eth_rpc,
            from_block,
            ws_backoff_limit_ms: opts.ws_backoff_limit_ms,
            ws_backoff_multiplier_ms: opts.ws_backoff_multiplier_ms,
        };

        RegistryMonitor::new(config, metrics).start().await.map_err(Into::into)
    }
}
