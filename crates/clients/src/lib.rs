//! Typed clients for the keeper registry, keeper registrar, LINK token, and
//! VRF coordinator contracts.
//!
//! Each client wraps the generated binding for one contract behind methods
//! that take and return plain Rust types, normalize version differences, and
//! pull typed events back out of transaction receipts.

use alloy::{
    contract::{CallBuilder, CallDecoder},
    network::{Ethereum, EthereumWallet},
    providers::ProviderBuilder,
    rpc::types::TransactionReceipt,
    signers::local::PrivateKeySigner,
    transports::http::{reqwest, Client, Http},
};

pub mod event;
pub mod link;
pub mod registrar;
pub mod registry;
pub mod settings;
pub mod vrf;

pub use registry::{KeeperRegistry, RegistryVersion};
pub use settings::{KeeperInfo, MigrationPermission, RegistrySettings, UpkeepInfo};

type RecommendedFiller = alloy::providers::fillers::JoinFill<
    alloy::providers::Identity,
    alloy::providers::fillers::JoinFill<
        alloy::providers::fillers::GasFiller,
        alloy::providers::fillers::JoinFill<
            alloy::providers::fillers::BlobGasFiller,
            alloy::providers::fillers::JoinFill<
                alloy::providers::fillers::NonceFiller,
                alloy::providers::fillers::ChainIdFiller,
            >,
        >,
    >,
>;

/// The HTTP transport used by every client in this crate.
pub type HttpTransport = Http<Client>;

/// A filled HTTP provider with a local wallet attached.
pub type HttpProvider = alloy::providers::fillers::FillProvider<
    alloy::providers::fillers::JoinFill<
        RecommendedFiller,
        alloy::providers::fillers::WalletFiller<EthereumWallet>,
    >,
    alloy::providers::RootProvider<HttpTransport>,
    HttpTransport,
    Ethereum,
>;

/// Client errors.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// failed to parse the given http rpc url
    #[error("failed to parse http_rpc_url")]
    HttpRpcUrlParse,
    /// rpc transport error
    #[error(transparent)]
    Rpc(#[from] alloy::transports::RpcError<alloy::transports::TransportErrorKind>),
    /// error while broadcasting tx
    #[error("error while broadcasting tx: {0}")]
    TxBroadcast(alloy::contract::Error),
    /// error from a read-only contract call
    #[error("contract call failed: {0}")]
    Call(alloy::contract::Error),
    /// error while waiting for tx inclusion
    #[error("error while waiting for tx inclusion: {0}")]
    TxInclusion(#[from] alloy::providers::PendingTransactionError),
    /// the operation is not part of the wrapped registry version's interface
    #[error("{0} is not supported by registry {1}")]
    UnsupportedVersion(&'static str, registry::RegistryVersion),
    /// an expected log was not found in the transaction receipt
    #[error("expected {0} log missing from receipt")]
    MissingLog(&'static str),
    /// log decoding error
    #[error("failed to decode log: {0}")]
    LogDecode(#[from] alloy::sol_types::Error),
    /// migration permission value outside the contract's enum range
    #[error("invalid migration permission value: {0}")]
    InvalidMigrationPermission(u8),
    /// event channel receiver dropped
    #[error("event receiver unexpectedly dropped")]
    EventRxDropped,
}

/// Build a filled HTTP provider with `signer`'s wallet attached.
pub fn http_provider(http_rpc_url: &str, signer: PrivateKeySigner) -> Result<HttpProvider, Error> {
    let url: reqwest::Url = http_rpc_url.parse().map_err(|_| Error::HttpRpcUrlParse)?;
    let wallet = EthereumWallet::new(signer);
    Ok(ProviderBuilder::new().with_recommended_fillers().wallet(wallet).on_http(url))
}

/// Broadcast `call` and wait for its receipt.
pub(crate) async fn send_tx<D>(
    call: CallBuilder<HttpTransport, &HttpProvider, D>,
) -> Result<TransactionReceipt, Error>
where
    D: CallDecoder + Send + Sync,
{
    let pending = call.send().await.map_err(Error::TxBroadcast)?;
    let receipt = pending.get_receipt().await?;
    Ok(receipt)
}
