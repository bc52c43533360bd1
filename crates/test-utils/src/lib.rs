//! Utilities for setting up tests.

use std::net::TcpListener;

use alloy::{
    network::EthereumWallet,
    node_bindings::{Anvil, AnvilInstance},
    primitives::{Address, I256, U256},
    providers::ProviderBuilder,
    signers::local::PrivateKeySigner,
};
use keeper_clients::{
    link::LinkToken,
    registry::{KeeperRegistry, RegistryDeployOpts},
    settings::RegistrySettings,
    vrf::VrfCoordinator,
};
use keeper_contracts::{
    mock_v3_aggregator::MockV3Aggregator, upkeep_perform_counter::UpkeepPerformCounter, DeployInfo,
};
use rand::Rng;
use tracing_subscriber::{filter::LevelFilter, EnvFilter};

/// Localhost IP address
pub const LOCALHOST: &str = "127.0.0.1";

/// LINK/ETH feed answer: 2e18 wei per LINK.
const LINK_ETH_FEED_ANSWER: u64 = 2_000_000_000_000_000_000;
/// Fast gas feed answer: 2 gwei.
const FAST_GAS_FEED_ANSWER: u64 = 2_000_000_000;

/// Initialize a tracing subscriber for tests. Use `RUST_LOG` to set the filter level.
///
/// If the tracing subscriber has already been initialized in a previous test, this
/// function will silently fail due to `try_init()`, which does not reinitialize
/// the subscriber if one is already set.
pub fn test_tracing() {
    let filter =
        EnvFilter::builder().with_default_directive(LevelFilter::INFO.into()).from_env_lossy();
    let _ =
        tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();
}

/// Find a free port on localhost.
pub fn get_localhost_port() -> u16 {
    let mut rng = rand::thread_rng();

    for _ in 0..64 {
        let port = rng.gen_range(49152..65535);
        if TcpListener::bind((LOCALHOST, port)).is_ok() {
            return port;
        }
    }

    panic!("no port found after 64 attempts");
}

/// Output from [`anvil_with_keeper_registry`]
#[derive(Debug)]
pub struct AnvilKeeperStack {
    /// Anvil instance
    pub anvil: AnvilInstance,
    /// Address of the registry contract
    pub registry: Address,
    /// Address of the LINK token contract
    pub link_token: Address,
    /// Address of the LINK/ETH feed
    pub link_eth_feed: Address,
    /// Address of the fast gas feed
    pub fast_gas_feed: Address,
    /// Registry owner private key. Holds the entire LINK supply.
    pub owner: PrivateKeySigner,
    /// Keeper private keys
    pub keepers: Vec<PrivateKeySigner>,
    /// Payee private keys, pairwise with `keepers`
    pub payees: Vec<PrivateKeySigner>,
}

/// Spin up an anvil instance with the LINK token, both mock feeds, and a
/// v1.2 keeper registry deployed.
pub async fn anvil_with_keeper_registry(port: u16) -> AnvilKeeperStack {
    // Ensure the anvil instance will not collide with anything already running on the OS
    let anvil = Anvil::new().block_time_f64(0.01).port(port).try_spawn().unwrap();

    let owner: PrivateKeySigner = anvil.keys()[0].clone().into();
    let keepers: Vec<PrivateKeySigner> =
        anvil.keys()[1..4].iter().map(|key| key.clone().into()).collect();
    let payees: Vec<PrivateKeySigner> =
        anvil.keys()[4..7].iter().map(|key| key.clone().into()).collect();

    let endpoint = anvil.endpoint();

    let owner_wallet = EthereumWallet::from(owner.clone());
    let provider = ProviderBuilder::new()
        .with_recommended_fillers()
        .wallet(owner_wallet)
        .on_http(endpoint.parse().unwrap());

    let link_eth_feed = MockV3Aggregator::deploy(
        &provider,
        18,
        I256::from_raw(U256::from(LINK_ETH_FEED_ANSWER)),
    )
    .await
    .unwrap();
    let fast_gas_feed =
        MockV3Aggregator::deploy(&provider, 0, I256::from_raw(U256::from(FAST_GAS_FEED_ANSWER)))
            .await
            .unwrap();

    let link = LinkToken::deploy(&endpoint, owner.clone()).await.unwrap();

    let registry = KeeperRegistry::deploy(
        &endpoint,
        owner.clone(),
        RegistryDeployOpts {
            link: link.address(),
            link_eth_feed: *link_eth_feed.address(),
            fast_gas_feed: *fast_gas_feed.address(),
            transcoder: Address::ZERO,
            registrar: Address::ZERO,
            settings: RegistrySettings::default(),
        },
    )
    .await
    .unwrap();

    AnvilKeeperStack {
        registry: registry.address(),
        link_token: link.address(),
        link_eth_feed: *link_eth_feed.address(),
        fast_gas_feed: *fast_gas_feed.address(),
        anvil,
        owner,
        keepers,
        payees,
    }
}

impl AnvilKeeperStack {
    /// The harness deployment as a persistable [`DeployInfo`] record.
    pub const fn deploy_info(&self) -> DeployInfo {
        DeployInfo {
            registry: self.registry,
            link_token: self.link_token,
            link_eth_feed: self.link_eth_feed,
            fast_gas_feed: self.fast_gas_feed,
            vrf_coordinator: None,
        }
    }
}

/// Deploy an upkeep target contract that counts its performs. Returns the
/// target's address.
pub async fn deploy_upkeep_target(endpoint: &str, signer: PrivateKeySigner) -> Address {
    let wallet = EthereumWallet::from(signer);
    let provider = ProviderBuilder::new()
        .with_recommended_fillers()
        .wallet(wallet)
        .on_http(endpoint.parse().unwrap());

    // Eligible from the first check, for a window long enough for any test.
    let counter =
        UpkeepPerformCounter::deploy(&provider, U256::from(100_000), U256::from(1)).await.unwrap();

    *counter.address()
}

/// Output from [`anvil_with_vrf_coordinator`]
#[derive(Debug)]
pub struct AnvilVrfStack {
    /// Anvil instance
    pub anvil: AnvilInstance,
    /// Address of the VRF coordinator contract
    pub coordinator: Address,
    /// Address of the LINK token contract
    pub link_token: Address,
    /// Coordinator owner private key. Holds the entire LINK supply.
    pub owner: PrivateKeySigner,
    /// Oracle private key
    pub oracle: PrivateKeySigner,
}

/// Spin up an anvil instance with the LINK token and the VRF coordinator
/// deployed.
pub async fn anvil_with_vrf_coordinator(port: u16) -> AnvilVrfStack {
    let anvil = Anvil::new().block_time_f64(0.01).port(port).try_spawn().unwrap();

    let owner: PrivateKeySigner = anvil.keys()[0].clone().into();
    let oracle: PrivateKeySigner = anvil.keys()[1].clone().into();

    let endpoint = anvil.endpoint();

    let link = LinkToken::deploy(&endpoint, owner.clone()).await.unwrap();

    // No blockhash store: these tests never fulfill past the 256 block window.
    let coordinator =
        VrfCoordinator::deploy(&endpoint, owner.clone(), link.address(), Address::ZERO)
            .await
            .unwrap();

    AnvilVrfStack {
        coordinator: coordinator.address(),
        link_token: link.address(),
        anvil,
        owner,
        oracle,
    }
}
