//! Keeper registry end to end tests.

use alloy::{
    primitives::{aliases::U96, Address, Bytes, U256},
    providers::{Provider, ProviderBuilder},
    rpc::types::Filter,
    sol_types::SolEvent,
};
use e2e::{addresses, registry_client};
use keeper_clients::{
    link::{juels, LinkToken},
    registry::{KeeperRegistry, RegistryVersion},
    settings::{MigrationPermission, RegistrySettings},
};
use keeper_contracts::keeper_registry_1_2::KeeperRegistry1_2;
use keeper_test_utils::{
    anvil_with_keeper_registry, deploy_upkeep_target, get_localhost_port, test_tracing,
};

#[tokio::test]
async fn upkeep_lifecycle() {
    test_tracing();

    let port = get_localhost_port();
    let stack = anvil_with_keeper_registry(port).await;
    let endpoint = stack.anvil.endpoint();

    let registry = registry_client(&stack, stack.owner.clone());
    let link = LinkToken::from_address(stack.link_token, &endpoint, stack.owner.clone()).unwrap();

    assert_eq!(registry.type_and_version().await.unwrap(), "KeeperRegistry 1.2.0");
    assert_eq!(stack.deploy_info().registry, registry.address());

    // Rotate in the keeper set.
    let keepers = addresses(&stack.keepers);
    let payees = addresses(&stack.payees);
    registry.set_keepers(keepers.clone(), payees.clone()).await.unwrap();
    assert_eq!(registry.keeper_list().await.unwrap(), keepers);

    let keeper_info = registry.keeper_info(keepers[0]).await.unwrap();
    assert!(keeper_info.active);
    assert_eq!(keeper_info.payee, payees[0]);

    // Register a new upkeep against a fresh target.
    let target = deploy_upkeep_target(&endpoint, stack.owner.clone()).await;
    let admin = stack.owner.address();
    let (id, receipt) =
        registry.register_upkeep(target, 150_000, admin, Bytes::new()).await.unwrap();

    let registered_log = receipt
        .inner
        .as_receipt()
        .unwrap()
        .logs
        .iter()
        .find(|log| log.topic0() == Some(&KeeperRegistry1_2::UpkeepRegistered::SIGNATURE_HASH))
        .unwrap();
    assert_eq!(registry.parse_upkeep_id_from_registered_log(registered_log).unwrap(), id);

    let info = registry.upkeep_info(id).await.unwrap();
    assert_eq!(info.target, target);
    assert_eq!(info.execute_gas, 150_000);
    assert_eq!(info.admin, admin);
    assert_eq!(info.balance, U96::ZERO);
    assert_eq!(info.max_valid_blocknumber, u64::MAX);
    assert!(!info.paused);

    assert_eq!(registry.active_upkeep_ids(U256::ZERO, U256::ZERO).await.unwrap(), vec![id]);

    // Fund the upkeep. The registry pulls the LINK via transferFrom.
    link.approve(registry.address(), juels(100)).await.unwrap();
    registry.add_funds(id, juels(10).to::<U96>()).await.unwrap();
    let info = registry.upkeep_info(id).await.unwrap();
    assert_eq!(info.balance, juels(10).to::<U96>());

    assert!(registry.min_balance_for_upkeep(id).await.unwrap() > U96::ZERO);
    assert!(registry.max_payment_for_gas(U256::from(150_000)).await.unwrap() > U96::ZERO);

    // Perform as the first keeper and pull the UpkeepPerformed log back out.
    let as_keeper = KeeperRegistry::from_address(
        RegistryVersion::V1_2,
        stack.registry,
        &endpoint,
        stack.keepers[0].clone(),
    )
    .unwrap();
    let receipt = as_keeper.perform_upkeep(id, Bytes::new()).await.unwrap();

    let performed_log = receipt
        .inner
        .as_receipt()
        .unwrap()
        .logs
        .iter()
        .find(|log| log.topic0() == Some(&KeeperRegistry1_2::UpkeepPerformed::SIGNATURE_HASH))
        .unwrap();
    let performed = registry.parse_upkeep_performed_log(performed_log).unwrap();
    assert_eq!(performed.id, id);
    assert!(performed.success);
    assert_eq!(performed.from, keepers[0]);

    // The keeper got paid and the upkeep recorded the spend.
    let keeper_info = registry.keeper_info(keepers[0]).await.unwrap();
    assert!(keeper_info.balance > U96::ZERO);
    let info = registry.upkeep_info(id).await.unwrap();
    assert!(info.amount_spent > U96::ZERO);
    assert_eq!(info.last_keeper, keepers[0]);

    // The same event is visible through a log filter query.
    let provider = ProviderBuilder::new().on_http(endpoint.parse().unwrap());
    let filter = Filter::new()
        .address(stack.registry)
        .event(KeeperRegistry1_2::UpkeepPerformed::SIGNATURE)
        .from_block(0);
    let logs = provider.get_logs(&filter).await.unwrap();
    assert_eq!(logs.len(), 1);
}

#[tokio::test]
async fn config_roundtrip_pause_and_migration_permissions() {
    test_tracing();

    let port = get_localhost_port();
    let stack = anvil_with_keeper_registry(port).await;

    let registry = registry_client(&stack, stack.owner.clone());

    let settings = RegistrySettings {
        payment_premium_ppb: 250_000_000,
        block_count_per_turn: 25,
        check_gas_limit: 3_000_000,
        gas_ceiling_multiplier: 2,
        ..RegistrySettings::default()
    };
    registry.set_config(&settings).await.unwrap();
    assert_eq!(registry.settings().await.unwrap(), settings);

    registry.pause().await.unwrap();
    assert!(registry.paused().await.unwrap());
    registry.unpause().await.unwrap();
    assert!(!registry.paused().await.unwrap());

    let peer = Address::repeat_byte(0x42);
    assert_eq!(
        registry.peer_registry_migration_permission(peer).await.unwrap(),
        MigrationPermission::None
    );
    registry
        .set_peer_registry_migration_permission(peer, MigrationPermission::Outgoing)
        .await
        .unwrap();
    assert_eq!(
        registry.peer_registry_migration_permission(peer).await.unwrap(),
        MigrationPermission::Outgoing
    );
}

#[tokio::test]
async fn canceled_upkeep_funds_are_withdrawable() {
    test_tracing();

    let port = get_localhost_port();
    let stack = anvil_with_keeper_registry(port).await;
    let endpoint = stack.anvil.endpoint();

    let registry = registry_client(&stack, stack.owner.clone());
    let link = LinkToken::from_address(stack.link_token, &endpoint, stack.owner.clone()).unwrap();

    let target = deploy_upkeep_target(&endpoint, stack.owner.clone()).await;
    let (id, _receipt) = registry
        .register_upkeep(target, 150_000, stack.owner.address(), Bytes::new())
        .await
        .unwrap();

    link.approve(registry.address(), juels(10)).await.unwrap();
    registry.add_funds(id, juels(10).to::<U96>()).await.unwrap();

    // Cancellation by the registry owner takes effect immediately.
    registry.cancel_upkeep(id).await.unwrap();
    let info = registry.upkeep_info(id).await.unwrap();
    assert!(info.max_valid_blocknumber < u64::MAX);

    assert!(registry.active_upkeep_ids(U256::ZERO, U256::ZERO).await.unwrap().is_empty());

    // Withdrawal is gated on the cancellation block having passed.
    tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
    let recipient = Address::repeat_byte(0x77);
    registry.withdraw_funds(id, recipient).await.unwrap();
    assert_eq!(link.balance_of(recipient).await.unwrap(), juels(10));
}
