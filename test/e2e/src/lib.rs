//! E2E tests and helpers.

use alloy::{primitives::Address, signers::local::PrivateKeySigner};
use keeper_clients::registry::{KeeperRegistry, RegistryVersion};
use keeper_test_utils::AnvilKeeperStack;

/// Build a client for the harness registry, transacting as `signer`.
pub fn registry_client(stack: &AnvilKeeperStack, signer: PrivateKeySigner) -> KeeperRegistry {
    KeeperRegistry::from_address(
        RegistryVersion::V1_2,
        stack.registry,
        &stack.anvil.endpoint(),
        signer,
    )
    .unwrap()
}

/// Addresses of the given signers, in order.
pub fn addresses(signers: &[PrivateKeySigner]) -> Vec<Address> {
    signers.iter().map(PrivateKeySigner::address).collect()
}
