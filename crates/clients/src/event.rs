//! Upkeep event listener.

use crate::Error;
use alloy::{
    eips::BlockNumberOrTag,
    primitives::{aliases::U96, Address, U256},
    providers::{Provider, ProviderBuilder, WsConnect},
    rpc::types::Filter,
    sol_types::SolEvent,
};
use futures_util::StreamExt;
use keeper_contracts::keeper_registry_1_3::KeeperRegistry1_3;
use tokio::{
    sync::mpsc::Sender,
    time::{sleep, Duration},
};
use tracing::{debug, error, warn};

const FIVE_MINUTES_MILLIS: u64 = 300_000;

/// An `UpkeepPerformed` event pulled off the registry's log stream.
///
/// Both registry versions emit this event with the same signature, so one
/// listener serves either.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpkeepPerformedEvent {
    /// Upkeep that was performed.
    pub id: U256,
    /// Whether the target's `performUpkeep` call succeeded.
    pub success: bool,
    /// Keeper that performed the upkeep.
    pub from: Address,
    /// LINK paid to the keeper, in juels.
    pub payment: U96,
    /// Block the event landed in.
    pub block_number: Option<u64>,
}

/// Listen for `UpkeepPerformed` events on the given registry and push each
/// one onto `events_tx`.
///
/// The subscription is recreated on any stream error, resuming from the last
/// seen block, with a backoff that grows per retry.
pub async fn start_upkeep_performed_listener(
    ws_rpc_url: String,
    registry: Address,
    events_tx: Sender<UpkeepPerformedEvent>,
    from_block: BlockNumberOrTag,
) -> Result<(), Error> {
    let mut last_seen_block = from_block;

    let mut provider_retry = 1;
    let provider = loop {
        let ws = WsConnect::new(ws_rpc_url.clone());
        match ProviderBuilder::new().on_ws(ws).await {
            Ok(p) => break p,
            Err(_) => {
                let sleep_millis = provider_retry * 3;
                sleep(Duration::from_millis(sleep_millis)).await;
                if sleep_millis < FIVE_MINUTES_MILLIS {
                    provider_retry += 1;
                }
                debug!(?sleep_millis, "retrying creating ws connection");
                continue;
            }
        }
    };

    let mut event_stream_retry = 1;
    loop {
        // We have this loop so we can recreate a subscription stream in case
        // any issue is encountered
        let filter = Filter::new()
            .address(registry)
            .event(KeeperRegistry1_3::UpkeepPerformed::SIGNATURE)
            .from_block(last_seen_block);
        let sub = match provider.subscribe_logs(&filter).await {
            Ok(sub) => sub,
            Err(error) => {
                warn!(?error, "upkeep event listener error");
                continue;
            }
        };
        let mut stream = sub.into_stream();

        while let Some(log) = stream.next().await {
            let decoded = match log.log_decode::<KeeperRegistry1_3::UpkeepPerformed>() {
                Ok(decoded) => decoded,
                Err(error) => {
                    error!(?error, "event listener");
                    break;
                }
            };
            let event = decoded.data();

            events_tx
                .send(UpkeepPerformedEvent {
                    id: event.id,
                    success: event.success,
                    from: event.from,
                    payment: event.payment,
                    block_number: log.block_number,
                })
                .await
                .map_err(|_| Error::EventRxDropped)?;

            if let Some(n) = log.block_number {
                last_seen_block = BlockNumberOrTag::Number(n);
            }
        }

        let sleep_millis = event_stream_retry * 10;
        sleep(Duration::from_millis(sleep_millis)).await;
        warn!(?event_stream_retry, ?last_seen_block, "retrying event stream creation");
        if sleep_millis < FIVE_MINUTES_MILLIS {
            event_stream_retry += 1;
        }
    }
}
