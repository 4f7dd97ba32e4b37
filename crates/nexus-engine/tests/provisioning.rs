// End-to-end provisioning flows over dry-run chain adapters

use std::sync::Arc;
use std::time::Duration;

use nexus_chain::ChainAdapterFactory;
use nexus_chain_evm::EvmAdapterFactory;
use nexus_chain_svm::SvmAdapterFactory;
use nexus_engine::{EngineConfig, NexusService};
use nexus_types::{Amount, ChainFamily, ChainId, CompanyId, DeploymentStatus, IdentityKey};

fn config_toml() -> String {
    format!(
        r#"
        master_key_version = 1
        master_key_hex = "{master}"
        max_deploy_attempts = 3
        confirmation_timeout_secs = 5

        [[chains]]
        chain_id = "ethereum"
        family = "evm"
        rpc_url = "http://localhost:0"
        factory_address = "0x00000000000000000000000000000000000000f1"
        init_code_hash = "0x0101010101010101010101010101010101010101010101010101010101010101"
        deployer = "0x00000000000000000000000000000000000000d0"
        confirmation_poll_ms = 10
        dry_run = true

        [[chains]]
        chain_id = "arbitrum"
        family = "evm"
        rpc_url = "http://localhost:0"
        factory_address = "0x00000000000000000000000000000000000000f1"
        init_code_hash = "0x0101010101010101010101010101010101010101010101010101010101010101"
        deployer = "0x00000000000000000000000000000000000000d0"
        confirmation_poll_ms = 10
        dry_run = true

        [[chains]]
        chain_id = "solana"
        family = "svm"
        rpc_url = "http://localhost:0"
        factory_address = "{program}"
        deployer = "{payer}"
        confirmation_poll_ms = 10
        dry_run = true
        "#,
        master = hex::encode([7u8; 32]),
        program = bs58::encode([7u8; 32]).into_string(),
        payer = hex::encode([4u8; 32]),
    )
}

async fn service() -> NexusService {
    let config = EngineConfig::from_toml(&config_toml()).unwrap();
    let factories: Vec<Arc<dyn ChainAdapterFactory>> = vec![
        Arc::new(EvmAdapterFactory::new()),
        Arc::new(SvmAdapterFactory::new()),
    ];
    NexusService::from_config(config, &factories).await.unwrap()
}

fn alice() -> IdentityKey {
    IdentityKey::new("email:alice@example.com")
}

async fn wait_for_deployed(service: &NexusService, identity: &IdentityKey, chain: &ChainId) {
    let family = service.chains().family_of(chain).unwrap();
    for _ in 0..300 {
        let record = service
            .registry()
            .get(identity, family)
            .await
            .unwrap()
            .unwrap();
        if record.status(chain) == DeploymentStatus::Deployed {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("deployment on {chain} did not confirm");
}

#[tokio::test]
async fn evm_chains_share_one_address_svm_differs() {
    let service = service().await;
    let view = service
        .wallet_get_or_create(
            &alice(),
            &[
                ChainId::new("ethereum"),
                ChainId::new("arbitrum"),
                ChainId::new("solana"),
            ],
        )
        .await
        .unwrap();

    let eth = &view.addresses[&ChainId::new("ethereum")];
    let arb = &view.addresses[&ChainId::new("arbitrum")];
    let sol = &view.addresses[&ChainId::new("solana")];
    assert_eq!(eth, arb);
    assert_ne!(eth, sol);
    assert!(view
        .per_chain_status
        .values()
        .all(|s| *s == DeploymentStatus::NotDeployed));
}

#[tokio::test]
async fn concurrent_get_or_create_persists_one_record() {
    let service = Arc::new(service().await);
    let mut handles = Vec::new();
    for _ in 0..16 {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            service
                .wallet_get_or_create(&alice(), &[ChainId::new("ethereum")])
                .await
                .unwrap()
                .addresses[&ChainId::new("ethereum")]
                .clone()
        }));
    }
    let mut addresses = Vec::new();
    for handle in handles {
        addresses.push(handle.await.unwrap());
    }
    addresses.dedup();
    assert_eq!(addresses.len(), 1);

    let record = service
        .registry()
        .get(&alice(), ChainFamily::Evm)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.predicted_address, addresses[0]);
}

#[tokio::test]
async fn deploys_on_both_families() {
    let service = service().await;
    for chain in [ChainId::new("ethereum"), ChainId::new("solana")] {
        let outcome = service.wallet_deploy(&alice(), &chain).await.unwrap();
        assert_eq!(outcome.status, DeploymentStatus::Pending);
        assert!(outcome.tx_ref.is_some());
        wait_for_deployed(&service, &alice(), &chain).await;
    }

    // a second deploy request is a no-op on the already-live chain
    let outcome = service
        .wallet_deploy(&alice(), &ChainId::new("ethereum"))
        .await
        .unwrap();
    assert_eq!(outcome.status, DeploymentStatus::Deployed);
}

#[tokio::test]
async fn sponsored_deploy_debits_the_tank() {
    let service = service().await;
    let company = CompanyId::new("acme");
    let chain = ChainId::new("ethereum");
    service
        .gas_tank_fund(&company, &chain, Amount::new(100_000_000_000_000), None)
        .await
        .unwrap();

    service
        .wallet_deploy_sponsored(&company, &alice(), &chain)
        .await
        .unwrap();
    wait_for_deployed(&service, &alice(), &chain).await;

    let account = service
        .gas_tank()
        .account(&company, &chain)
        .await
        .unwrap()
        .unwrap();
    assert!(account.total_spent > Amount::ZERO);
    assert_eq!(
        account.total_funded.checked_sub(account.total_spent),
        Some(account.balance)
    );
}

#[tokio::test]
async fn underfunded_tank_declines_sponsorship() {
    let service = service().await;
    let company = CompanyId::new("acme");
    let chain = ChainId::new("ethereum");
    service
        .gas_tank_fund(&company, &chain, Amount::new(1), None)
        .await
        .unwrap();

    let result = service
        .wallet_deploy_sponsored(&company, &alice(), &chain)
        .await;
    assert!(result.is_err());

    // nothing was debited and nothing was broadcast
    let account = service
        .gas_tank()
        .account(&company, &chain)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(account.balance, Amount::new(1));
    let record = service
        .registry()
        .get(&alice(), ChainFamily::Evm)
        .await
        .unwrap();
    assert!(record.is_none() || record.unwrap().status(&chain) == DeploymentStatus::NotDeployed);
}

#[tokio::test]
async fn failed_sponsored_deploy_refunds_the_tank() {
    let service = service().await;
    let company = CompanyId::new("acme");
    let chain = ChainId::new("ethereum");
    let funded = Amount::new(100_000_000_000_000);
    service
        .gas_tank_fund(&company, &chain, funded, None)
        .await
        .unwrap();

    // burn through every allowed attempt so the next deploy cannot start
    service
        .wallet_get_or_create(&alice(), &[chain.clone()])
        .await
        .unwrap();
    for _ in 0..3 {
        service
            .registry()
            .update_deployment_status(
                &alice(),
                ChainFamily::Evm,
                &chain,
                DeploymentStatus::Pending,
                None,
            )
            .await
            .unwrap();
        service
            .registry()
            .update_deployment_status(
                &alice(),
                ChainFamily::Evm,
                &chain,
                DeploymentStatus::Failed,
                None,
            )
            .await
            .unwrap();
    }

    let result = service
        .wallet_deploy_sponsored(&company, &alice(), &chain)
        .await;
    assert!(result.is_err());

    // the debit was compensated, so the company lost nothing
    let account = service
        .gas_tank()
        .account(&company, &chain)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(account.balance, funded);
    let entries = service
        .gas_tank()
        .entries(&company, &chain)
        .await
        .unwrap();
    assert_eq!(entries.len(), 3);
}

#[tokio::test]
async fn concurrent_authorizations_never_overspend() {
    let service = Arc::new(service().await);
    let company = CompanyId::new("acme");
    let chain = ChainId::new("ethereum");
    service
        .gas_tank_fund(&company, &chain, Amount::new(10), None)
        .await
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..2 {
        let service = service.clone();
        let company = company.clone();
        let chain = chain.clone();
        handles.push(tokio::spawn(async move {
            service
                .gas_tank_authorize(&company, &chain, Amount::new(6), None)
                .await
                .unwrap()
        }));
    }
    let mut authorized = 0;
    for handle in handles {
        if handle.await.unwrap().authorized {
            authorized += 1;
        }
    }
    assert_eq!(authorized, 1);

    let account = service
        .gas_tank()
        .account(&company, &chain)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(account.balance, Amount::new(4));
}
