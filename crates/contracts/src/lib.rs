//! This module contains bindings for the contracts that we interact with.
//!
//! Each binding is generated from the contract's artifact (ABI plus creation
//! bytecode) under `json/`.

#![allow(missing_docs)]

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

/// `KeeperRegistry1_2.sol` bindings
pub mod keeper_registry_1_2 {
    alloy::sol! {
      #[sol(rpc)]
      KeeperRegistry1_2,
      "json/KeeperRegistry1_2.json"
    }
}

/// `KeeperRegistry1_3.sol` bindings
pub mod keeper_registry_1_3 {
    alloy::sol! {
      #[sol(rpc)]
      KeeperRegistry1_3,
      "json/KeeperRegistry1_3.json"
    }
}

/// `VRFCoordinator.sol` bindings
pub mod vrf_coordinator {
    alloy::sol! {
      #[sol(rpc)]
      VRFCoordinator,
      "json/VRFCoordinator.json"
    }
}

/// `LinkToken.sol` bindings
pub mod link_token {
    alloy::sol! {
      #[sol(rpc)]
      LinkToken,
      "json/LinkToken.json"
    }
}

/// `KeeperRegistrar.sol` bindings
pub mod keeper_registrar {
    alloy::sol! {
      #[sol(rpc)]
      KeeperRegistrar,
      "json/KeeperRegistrar.json"
    }
}

/// `MockV3Aggregator.sol` bindings
pub mod mock_v3_aggregator {
    alloy::sol! {
      #[sol(rpc)]
      MockV3Aggregator,
      "json/MockV3Aggregator.json"
    }
}

/// `UpkeepPerformCounter.sol` bindings
pub mod upkeep_perform_counter {
    alloy::sol! {
      #[sol(rpc)]
      UpkeepPerformCounter,
      "json/UpkeepPerformCounter.json"
    }
}

/// Path to write deploy info to
pub const DEFAULT_DEPLOY_INFO: &str = "./logs/deploy_info.json";

/// Contract deployment info.
#[derive(Serialize, Deserialize, Debug)]
pub struct DeployInfo {
    /// Keeper registry contract address.
    pub registry: Address,
    /// LINK token contract address.
    pub link_token: Address,
    /// LINK/ETH price feed address.
    pub link_eth_feed: Address,
    /// Fast gas price feed address.
    pub fast_gas_feed: Address,
    /// VRF coordinator contract address.
    pub vrf_coordinator: Option<Address>,
}

pub fn get_default_deploy_info() -> eyre::Result<DeployInfo> {
    let filename = DEFAULT_DEPLOY_INFO.to_string();
    let raw_json = std::fs::read(filename)?;
    serde_json::from_slice(&raw_json).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::sol_types::SolEvent;

    #[test]
    fn upkeep_performed_topic_is_shared_across_registry_versions() {
        assert_eq!(
            keeper_registry_1_2::KeeperRegistry1_2::UpkeepPerformed::SIGNATURE,
            keeper_registry_1_3::KeeperRegistry1_3::UpkeepPerformed::SIGNATURE,
        );
        assert_eq!(
            keeper_registry_1_2::KeeperRegistry1_2::UpkeepPerformed::SIGNATURE,
            "UpkeepPerformed(uint256,bool,address,uint96,bytes)"
        );
    }

    #[test]
    fn randomness_request_signature() {
        assert_eq!(
            vrf_coordinator::VRFCoordinator::RandomnessRequest::SIGNATURE,
            "RandomnessRequest(bytes32,uint256,bytes32,address,uint256,bytes32)"
        );
    }
}
