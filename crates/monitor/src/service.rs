//! The registry event follower.

use crate::metrics::Metrics;
use alloy::{
    eips::BlockNumberOrTag,
    primitives::Address,
    providers::{Provider, ProviderBuilder, WsConnect},
    rpc::types::{Filter, Log},
    sol_types::SolEvent,
};
use futures_util::StreamExt;
use keeper_clients::registry::RegistryVersion;
use keeper_contracts::keeper_registry_1_3::KeeperRegistry1_3;
use std::sync::Arc;
use tokio::time::{sleep, Duration};
use tracing::{info, warn};

/// Monitor service errors
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// rpc transport error
    #[error(transparent)]
    Rpc(#[from] alloy::transports::RpcError<alloy::transports::TransportErrorKind>),
}

/// Monitor configuration.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Registry contract to follow.
    pub registry: Address,
    /// Version of the registry contract.
    pub version: RegistryVersion,
    /// WS RPC url to subscribe through.
    pub ws_rpc_url: String,
    /// Block to start following events from.
    pub from_block: BlockNumberOrTag,
    /// Retry backoff duration limit in milliseconds.
    pub ws_backoff_limit_ms: u64,
    /// Retry backoff multiplier. The sleep duration will be `num_retries *
    /// backoff_multiplier_ms`.
    pub ws_backoff_multiplier_ms: u64,
}

/// Follows one registry's event stream and keeps counters up to date.
///
/// All events of interest share their signatures across both registry
/// versions, so the v1.3 binding decodes the stream for either; v1.3-only
/// events simply never appear on a v1.2 registry.
#[derive(Debug)]
pub struct RegistryMonitor {
    config: MonitorConfig,
    metrics: Arc<Metrics>,
}

impl RegistryMonitor {
    /// Create a new instance of [Self].
    pub const fn new(config: MonitorConfig, metrics: Arc<Metrics>) -> Self {
        Self { config, metrics }
    }

    /// Follow the registry's logs until shutdown. The subscription is
    /// recreated on any stream error, resuming from the last seen block.
    pub async fn start(self) -> Result<(), Error> {
        let mut last_seen_block = self.config.from_block;

        info!(
            registry = %self.config.registry,
            version = %self.config.version,
            "starting registry monitor"
        );

        let mut retries: u64 = 0;
        let provider = loop {
            let ws = WsConnect::new(self.config.ws_rpc_url.clone());
            match ProviderBuilder::new().on_ws(ws).await {
                Ok(provider) => break provider,
                Err(error) => {
                    let backoff = (retries * self.config.ws_backoff_multiplier_ms)
                        .min(self.config.ws_backoff_limit_ms);
                    warn!(?error, backoff, "retrying ws connection");
                    sleep(Duration::from_millis(backoff)).await;
                    retries += 1;
                }
            }
        };

        let mut retries: u64 = 0;
        loop {
            let filter =
                Filter::new().address(self.config.registry).from_block(last_seen_block);
            let sub = match provider.subscribe_logs(&filter).await {
                Ok(sub) => sub,
                Err(error) => {
                    let backoff = (retries * self.config.ws_backoff_multiplier_ms)
                        .min(self.config.ws_backoff_limit_ms);
                    warn!(?error, backoff, "retrying log subscription");
                    sleep(Duration::from_millis(backoff)).await;
                    retries += 1;
                    continue;
                }
            };
            let mut stream = sub.into_stream();

            while let Some(log) = stream.next().await {
                self.record(&log);

                if let Some(block) = log.block_number {
                    last_seen_block = BlockNumberOrTag::Number(block);
                    self.metrics.set_last_seen_block(block);
                }
            }

            let backoff =
                (retries * self.config.ws_backoff_multiplier_ms).min(self.config.ws_backoff_limit_ms);
            sleep(Duration::from_millis(backoff)).await;
            warn!(?last_seen_block, "event stream ended, recreating subscription");
            retries += 1;
        }
    }

    fn record(&self, log: &Log) {
        let Some(topic0) = log.topic0() else {
            return;
        };
        let topic0 = *topic0;

        if topic0 == KeeperRegistry1_3::UpkeepPerformed::SIGNATURE_HASH {
            match log.log_decode::<KeeperRegistry1_3::UpkeepPerformed>() {
                Ok(decoded) => {
                    let event = decoded.data();
                    self.metrics.incr_upkeep_performed(event.success);
                    info!(
                        id = %event.id,
                        success = event.success,
                        from = %event.from,
                        payment = %event.payment,
                        "upkeep performed"
                    );
                }
                Err(error) => warn!(?error, "failed to decode UpkeepPerformed log"),
            }
        } else if topic0 == KeeperRegistry1_3::UpkeepRegistered::SIGNATURE_HASH {
            self.metrics.incr_event("upkeep_registered");
        } else if topic0 == KeeperRegistry1_3::UpkeepCanceled::SIGNATURE_HASH {
            self.metrics.incr_event("upkeep_canceled");
        } else if topic0 == KeeperRegistry1_3::UpkeepPaused::SIGNATURE_HASH {
            self.metrics.incr_event("upkeep_paused");
        } else if topic0 == KeeperRegistry1_3::UpkeepUnpaused::SIGNATURE_HASH {
            self.metrics.incr_event("upkeep_unpaused");
        } else if topic0 == KeeperRegistry1_3::FundsAdded::SIGNATURE_HASH {
            self.metrics.incr_event("funds_added");
        } else if topic0 == KeeperRegistry1_3::FundsWithdrawn::SIGNATURE_HASH {
            self.metrics.incr_event("funds_withdrawn");
        } else if topic0 == KeeperRegistry1_3::ConfigSet::SIGNATURE_HASH {
            self.metrics.incr_event("config_set");
        } else if topic0 == KeeperRegistry1_3::KeepersUpdated::SIGNATURE_HASH {
            self.metrics.incr_event("keepers_updated");
        } else {
            self.metrics.incr_event("other");
        }
    }
}
