//! VRF coordinator end to end tests.

use alloy::primitives::{Bytes, B256, U256};
use keeper_clients::{
    link::{juels, LinkToken},
    vrf::VrfCoordinator,
    Error,
};
use keeper_test_utils::{anvil_with_vrf_coordinator, get_localhost_port, test_tracing};

#[tokio::test]
async fn proving_key_registration_and_randomness_request() {
    test_tracing();

    let port = get_localhost_port();
    let stack = anvil_with_vrf_coordinator(port).await;
    let endpoint = stack.anvil.endpoint();

    let coordinator =
        VrfCoordinator::from_address(stack.coordinator, &endpoint, stack.owner.clone()).unwrap();
    let link = LinkToken::from_address(stack.link_token, &endpoint, stack.owner.clone()).unwrap();

    let public_key = [U256::from(1), U256::from(2)];
    let job_id = B256::repeat_byte(0x10);
    let fee = juels(1);

    let (key_hash, _receipt) = coordinator
        .register_proving_key(fee, stack.oracle.address(), public_key, job_id)
        .await
        .unwrap();
    assert_eq!(key_hash, coordinator.hash_of_key(public_key).await.unwrap());

    let agreement = coordinator.service_agreement(key_hash).await.unwrap();
    assert_eq!(agreement.oracle, stack.oracle.address());
    assert_eq!(U256::from(agreement.fee), fee);
    assert_eq!(agreement.job_id, job_id);

    // Request randomness straight from the owner account; the request
    // travels inside a LINK transferAndCall.
    let seed = U256::from(12_345);
    let (request, _receipt) =
        coordinator.request_randomness(&link, fee, key_hash, seed).await.unwrap();
    assert_eq!(request.key_hash, key_hash);
    assert_eq!(request.job_id, job_id);
    assert_eq!(request.sender, stack.owner.address());
    assert_eq!(request.fee, fee);

    // The fee is escrowed in the request's callback record.
    let callback = coordinator.callback(request.request_id).await.unwrap();
    assert_eq!(callback.callback_contract, stack.owner.address());
    assert_eq!(U256::from(callback.randomness_fee), fee);
    assert_ne!(callback.seed_and_block_num, B256::ZERO);

    // Nothing is withdrawable until the request is fulfilled.
    assert_eq!(
        coordinator.withdrawable_tokens(stack.oracle.address()).await.unwrap(),
        U256::ZERO
    );
}

#[tokio::test]
async fn repeated_requests_get_distinct_request_ids() {
    test_tracing();

    let port = get_localhost_port();
    let stack = anvil_with_vrf_coordinator(port).await;
    let endpoint = stack.anvil.endpoint();

    let coordinator =
        VrfCoordinator::from_address(stack.coordinator, &endpoint, stack.owner.clone()).unwrap();
    let link = LinkToken::from_address(stack.link_token, &endpoint, stack.owner.clone()).unwrap();

    let fee = juels(1);
    let (key_hash, _receipt) = coordinator
        .register_proving_key(fee, stack.oracle.address(), [U256::from(7), U256::from(8)], B256::ZERO)
        .await
        .unwrap();

    // The coordinator mixes a per-sender nonce into the request id, so the
    // same seed twice still yields fresh request ids.
    let seed = U256::from(1);
    let (first, _receipt) =
        coordinator.request_randomness(&link, fee, key_hash, seed).await.unwrap();
    let (second, _receipt) =
        coordinator.request_randomness(&link, fee, key_hash, seed).await.unwrap();
    assert_ne!(first.request_id, second.request_id);
    assert_ne!(first.seed, second.seed);
}

#[tokio::test]
async fn fulfillment_with_malformed_proof_is_rejected() {
    test_tracing();

    let port = get_localhost_port();
    let stack = anvil_with_vrf_coordinator(port).await;
    let endpoint = stack.anvil.endpoint();

    let coordinator =
        VrfCoordinator::from_address(stack.coordinator, &endpoint, stack.oracle.clone()).unwrap();

    // A proof blob of the wrong shape never reaches verification.
    let result = coordinator.fulfill_randomness_request(Bytes::from(vec![0u8; 64])).await;
    assert!(matches!(result, Err(Error::TxBroadcast(_))));
}
