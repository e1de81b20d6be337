//! Shared utilities for the end-to-end tests.
//!
//! Provides:
//! - a dev genesis with funded accounts, a delegate and four validators
//! - block production on a source chain (propose, sign, import)
//! - a [`SyncNetwork`] that answers a syncing node's requests from the
//!   source chain, optionally serving tampered blocks from chosen peers

use {
    crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender},
    parking_lot::Mutex,
    solana_keypair::Keypair,
    solana_signer::Signer,
    std::{
        collections::{BTreeMap, HashMap},
        sync::{
            atomic::{AtomicBool, Ordering},
            Arc,
        },
        thread::{self, JoinHandle},
        time::{Duration, Instant},
    },
    tessera_block_sync::{
        simulated::{SimulatedChannel, SimulatedNetwork},
        Capability, SyncManager, SyncMessage, SyncRequest,
    },
    tessera_chain::{Chain, ChainStores, Genesis, GenesisValidator, NodeConfig, Premine},
    tessera_executor::vm::SimpleVm,
    tessera_ledger_types::{Address, Amount, Block, BlockVote, Transaction, TransactionType},
    tessera_monitoring::NodeMetrics,
};

// ─────────────────────────────────────────────────────────────────────────────
// Accounts
// ─────────────────────────────────────────────────────────────────────────────

/// Well funded account used to pad blocks with transfers.
pub const FAUCET: Address = Address::from_low_u64(0xfa0ce7);

/// Starts with exactly 1000 nano.
pub const SENDER: Address = Address::from_low_u64(0x5e4d);

/// Starts with 120 nano: enough to vote 100 and pay two fees.
pub const VOTER: Address = Address::from_low_u64(0x707e);

pub const DELEGATE: Address = Address::from_low_u64(0xde1e);
pub const DELEGATE_NAME: &str = "genesis";

/// Fee every test transaction pays; the dev minimum.
pub const FEE: u64 = 10;

pub fn init_logging() {
    let _ = env_logger::builder()
        .is_test(true)
        .filter_level(log::LevelFilter::Info)
        .try_init();
}

pub fn validator_keys(count: u8) -> Vec<Keypair> {
    (1..=count)
        .map(|seed| Keypair::new_from_array([seed; 32]))
        .collect()
}

pub fn dev_genesis(validators: &[Keypair]) -> Genesis {
    Genesis {
        timestamp: 1_700_000_000_000,
        premine: vec![
            Premine {
                address: FAUCET,
                amount: Amount::from_units(1_000_000),
                description: "faucet".to_string(),
            },
            Premine {
                address: SENDER,
                amount: Amount::from_nano(1_000),
                description: "sender".to_string(),
            },
            Premine {
                address: VOTER,
                amount: Amount::from_nano(120),
                description: "voter".to_string(),
            },
        ],
        delegates: BTreeMap::from([(DELEGATE_NAME.to_string(), DELEGATE)]),
        validators: validators
            .iter()
            .map(|key| GenesisValidator::new(&key.pubkey(), 100))
            .collect(),
    }
}

pub fn open_chain(config: &NodeConfig, genesis: &Genesis) -> Arc<Chain> {
    Arc::new(
        Chain::open(
            config,
            genesis,
            ChainStores::in_memory(),
            Some(Arc::new(SimpleVm)),
        )
        .unwrap(),
    )
}

pub fn transaction(
    tx_type: TransactionType,
    from: Address,
    to: Address,
    value: u64,
    nonce: u64,
) -> Transaction {
    Transaction {
        tx_type,
        from,
        to,
        value: Amount::from_nano(value),
        fee: Amount::from_nano(FEE),
        nonce,
        timestamp: 1_700_000_000_000,
        ..Transaction::default()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Block production
// ─────────────────────────────────────────────────────────────────────────────

pub fn sign_block(block: &mut Block, keys: &[Keypair]) {
    let hash = block.hash().unwrap();
    block.votes = keys
        .iter()
        .map(|key| BlockVote {
            validator: key.pubkey(),
            signature: key.sign_message(hash.as_ref()),
        })
        .collect();
}

/// Proposes a block from `candidates`, signs it with every key and imports
/// it with vote validation.
pub fn produce_block(chain: &Chain, keys: &[Keypair], candidates: &[Transaction]) -> Block {
    let timestamp = chain.latest_block_header().timestamp.saturating_add(1_000);
    let mut block = chain
        .propose_block(candidates, Address::from_low_u64(0xc0ffee), timestamp)
        .unwrap();
    sign_block(&mut block, keys);
    assert!(
        chain.import_block(&block, true).unwrap(),
        "source chain rejected its own block #{}",
        block.number()
    );
    block
}

/// Produces `count` blocks, each carrying one faucet transfer.
pub fn produce_blocks(chain: &Chain, keys: &[Keypair], count: u64) {
    for _ in 0..count {
        let nonce = chain.get_account(&FAUCET).unwrap().nonce;
        let recipient = Address::from_low_u64(chain.latest_block_number().saturating_add(0x1000));
        let tx = transaction(TransactionType::Transfer, FAUCET, recipient, 1_000, nonce);
        let block = produce_block(chain, keys, &[tx]);
        assert_eq!(block.transactions.len(), 1);
    }
}

/// Asserts both chains hold the same blocks, headers and results.
pub fn assert_same_chain(source: &Chain, node: &Chain) {
    assert_eq!(node.latest_block_number(), source.latest_block_number());
    assert_eq!(node.latest_block_hash(), source.latest_block_hash());
    for number in 0..=source.latest_block_number() {
        let expected = source.get_block(number).unwrap().unwrap();
        let actual = node.get_block(number).unwrap().unwrap();
        assert_eq!(actual.header, expected.header, "header #{number}");
        assert_eq!(actual.transactions, expected.transactions, "transactions #{number}");
        assert_eq!(actual.results, expected.results, "results #{number}");
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Simulated network
// ─────────────────────────────────────────────────────────────────────────────

type Tampered = Arc<Mutex<HashMap<(String, u64), Block>>>;

/// A syncing node plus the peers it downloads from. Peers answer from the
/// source chain on a responder thread.
pub struct SyncNetwork {
    pub source: Arc<Chain>,
    pub node: Arc<Chain>,
    pub network: Arc<SimulatedNetwork>,
    pub manager: SyncManager,
    pub metrics: Arc<NodeMetrics>,
    outbox: Sender<(String, SyncRequest)>,
    tampered: Tampered,
    exit: Arc<AtomicBool>,
    responder: Option<JoinHandle<()>>,
}

impl SyncNetwork {
    pub fn new(config: &NodeConfig, genesis: &Genesis, source: Arc<Chain>) -> Self {
        Self::with_stores(config, genesis, source, ChainStores::in_memory())
    }

    /// Same as [`SyncNetwork::new`], with the syncing node opened on `stores`.
    pub fn with_stores(
        config: &NodeConfig,
        genesis: &Genesis,
        source: Arc<Chain>,
        stores: ChainStores,
    ) -> Self {
        let metrics = Arc::new(NodeMetrics::new());
        let node = Arc::new(
            Chain::open_with_metrics(
                config,
                genesis,
                stores,
                Some(Arc::new(SimpleVm)),
                metrics.chain.clone(),
            )
            .unwrap(),
        );
        let network = Arc::new(SimulatedNetwork::new());
        let manager = SyncManager::with_metrics(
            config.sync.clone(),
            config.chain.validator_update_interval,
            node.clone(),
            network.clone(),
            metrics.sync.clone(),
        )
        .unwrap();
        let (outbox, requests) = unbounded();
        let tampered = Tampered::default();
        let exit = Arc::new(AtomicBool::new(false));

        let responder = {
            let source = source.clone();
            let network = network.clone();
            let manager = manager.clone();
            let tampered = tampered.clone();
            let exit = exit.clone();
            thread::Builder::new()
                .name("tesseraTestResp".to_string())
                .spawn(move || respond(&source, &network, &manager, &tampered, &requests, &exit))
                .unwrap()
        };

        Self {
            source,
            node,
            network,
            manager,
            metrics,
            outbox,
            tampered,
            exit,
            responder: Some(responder),
        }
    }

    /// Connects a peer at the source chain's height.
    pub fn connect(&self, peer_id: &str, capabilities: &[Capability]) -> Arc<SimulatedChannel> {
        self.network.connect(
            SimulatedChannel::new(peer_id, self.source.latest_block_number())
                .with_capabilities(capabilities)
                .with_outbox(self.outbox.clone()),
        )
    }

    /// `peer_id` serves `block` instead of the source chain's block at the
    /// same height.
    pub fn tamper(&self, peer_id: &str, block: Block) {
        self.tampered
            .lock()
            .insert((peer_id.to_string(), block.number()), block);
    }

    /// Syncs the node up to the source head. Returns false if the session
    /// had to be stopped at `timeout`.
    pub fn sync(&self, timeout: Duration) -> bool {
        let target = self.source.latest_block_number().saturating_add(1);
        let manager = self.manager.clone();
        let session = thread::Builder::new()
            .name("tesseraTestSync".to_string())
            .spawn(move || manager.start(target))
            .unwrap();

        let deadline = Instant::now().checked_add(timeout).unwrap();
        while !session.is_finished() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        let finished = session.is_finished();
        if !finished {
            self.manager.stop();
        }
        session.join().unwrap();
        finished && self.node.latest_block_number().saturating_add(1) >= target
    }
}

impl Drop for SyncNetwork {
    fn drop(&mut self) {
        self.manager.stop();
        self.exit.store(true, Ordering::Relaxed);
        if let Some(responder) = self.responder.take() {
            let _ = responder.join();
        }
    }
}

/// Answers one request the way a peer holding `source` would.
pub fn serve(source: &Chain, request: &SyncRequest, tampered: Option<Block>) -> Option<SyncMessage> {
    let block = match tampered {
        Some(block) => block,
        None => source.get_block(request.number()).ok()??,
    };
    match request {
        SyncRequest::GetBlock { .. } => Some(SyncMessage::Block(block)),
        SyncRequest::GetBlockParts { .. } => {
            SyncMessage::block_parts(&block, &request.requested_parts()).ok()
        }
    }
}

fn respond(
    source: &Chain,
    network: &SimulatedNetwork,
    manager: &SyncManager,
    tampered: &Tampered,
    requests: &Receiver<(String, SyncRequest)>,
    exit: &AtomicBool,
) {
    loop {
        let (peer_id, request) = match requests.recv_timeout(Duration::from_millis(10)) {
            Ok(received) => received,
            Err(RecvTimeoutError::Timeout) => {
                if exit.load(Ordering::Relaxed) {
                    return;
                }
                continue;
            }
            Err(RecvTimeoutError::Disconnected) => return,
        };
        let replacement = tampered
            .lock()
            .get(&(peer_id.clone(), request.number()))
            .cloned();
        let Some(message) = serve(source, &request, replacement) else {
            continue;
        };
        if let Some(channel) = network.channel(&peer_id) {
            manager.on_message(channel, message);
        }
    }
}
