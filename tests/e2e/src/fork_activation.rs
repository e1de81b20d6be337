//! E2E Test: Fork Activation Through Header Signals
//!
//! - The source signals the VM fork in its first headers; three signals in
//!   a four block window activate it from #4
//! - A CREATE transaction after activation replays on the syncing node,
//!   which reaches the same activation from the downloaded headers alone
//! - A node with a stricter rule never activates the fork and rejects the
//!   block carrying the CREATE

use {
    solana_keypair::Keypair,
    std::time::Duration,
    tessera_block_sync::Capability,
    tessera_chain::{Chain, NodeConfig},
    tessera_e2e_tests::helpers::*,
    tessera_executor::vm::SimpleVm,
    tessera_forks::ForkRule,
    tessera_ledger_types::{Address, Amount, Fork, Transaction, TransactionType},
};

const CONTRACT_CODE: [u8; 4] = [0x60, 0x01, 0x60, 0x02];

fn signaling_config(blocks_required: u64) -> NodeConfig {
    let mut config = NodeConfig::dev_default();
    config.forks.rules = vec![ForkRule {
        fork: Fork::VirtualMachine,
        blocks_required,
        blocks_to_check: 4,
        signaling_start: 0,
        signaling_end: 1_000,
    }];
    config.forks.signaled_forks = vec![Fork::VirtualMachine];
    config
}

fn create_transaction(nonce: u64) -> Transaction {
    Transaction {
        fee: Amount::ZERO,
        data: CONTRACT_CODE.to_vec(),
        gas: 100_000,
        gas_price: Amount::from_nano(1),
        ..transaction(TransactionType::Create, FAUCET, Address::ZERO, 0, nonce)
    }
}

/// Six padding blocks, the CREATE at #7, then three more.
fn produce_with_contract(source: &Chain, keys: &[Keypair]) -> Address {
    produce_blocks(source, keys, 6);
    let nonce = source.get_account(&FAUCET).unwrap().nonce;
    let block = produce_block(source, keys, &[create_transaction(nonce)]);
    assert_eq!(block.number(), 7);
    assert_eq!(block.transactions.len(), 1);
    produce_blocks(source, keys, 3);
    SimpleVm::contract_address(&FAUCET, nonce).unwrap()
}

#[test]
fn test_fork_activates_from_synced_headers() {
    init_logging();
    let config = signaling_config(3);
    let keys = validator_keys(4);
    let genesis = dev_genesis(&keys);
    let source = open_chain(&config, &genesis);
    let contract = produce_with_contract(&source, &keys);

    let activation = source.activated_forks()[&Fork::VirtualMachine];
    assert_eq!(activation.effective_from, 4);
    assert_eq!(source.get_code(&contract).unwrap(), Some(CONTRACT_CODE.to_vec()));
    // headers stop signaling once the fork is active
    for number in 4..=10 {
        let header = source.get_block_header(number).unwrap().unwrap();
        assert!(header.data.is_empty(), "header #{number} still signals");
    }

    let net = SyncNetwork::new(&config, &genesis, source.clone());
    net.connect("alice", &[Capability::Core]);
    assert!(net.sync(Duration::from_secs(30)), "sync did not finish");

    assert_same_chain(&source, &net.node);
    assert_eq!(net.node.activated_forks(), source.activated_forks());
    assert!(net.node.is_fork_activated(Fork::VirtualMachine, 4).unwrap());
    assert!(!net.node.is_fork_activated(Fork::VirtualMachine, 3).unwrap());
    assert_eq!(net.node.get_code(&contract).unwrap(), Some(CONTRACT_CODE.to_vec()));
    assert_eq!(
        net.node.get_account(&FAUCET).unwrap(),
        source.get_account(&FAUCET).unwrap()
    );
    assert_eq!(net.metrics.chain.forks_activated.get(), 1);
}

#[test]
fn test_stricter_rule_rejects_vm_block() {
    init_logging();
    let keys = validator_keys(4);
    let genesis = dev_genesis(&keys);
    let source = open_chain(&signaling_config(3), &genesis);
    produce_with_contract(&source, &keys);

    // four signals out of four never happen: the source stops after three
    let net = SyncNetwork::new(&signaling_config(4), &genesis, source.clone());
    net.connect("alice", &[Capability::Core]);
    assert!(!net.sync(Duration::from_secs(2)));

    assert_eq!(net.node.latest_block_number(), 6);
    assert!(net.node.activated_forks().is_empty());
    assert!(net.metrics.sync.invalid_blocks.get() >= 1);
    assert!(net.metrics.chain.blocks_rejected.get() >= 1);
}
