//! The reference blockchain the sync engine imports into.
//!
//! A block is appended only after it passes every check: height, parent
//! link, header data size, transactions root, optional votes, execution of
//! every transaction with an acceptable result, and the results root. The
//! state write lock is held from the first check until the new head is
//! published, so readers never see state from a half-imported block.

use {
    crate::{
        config::NodeConfig,
        error::{ChainError, ConfigError, Result},
        genesis::Genesis,
        store::BlockStore,
        validators::ValidatorSet,
    },
    log::{debug, error, info, warn},
    parking_lot::RwLock,
    solana_hash::Hash,
    std::{
        collections::{BTreeSet, HashMap},
        sync::Arc,
        time::Instant,
    },
    tessera_block_sync::{Blockchain, ImportFault},
    tessera_executor::{BlockContext, ChainSpec, TransactionExecutor, VmExecutor},
    tessera_forks::{ActivatedForks, ForkError, ForkSignalSource},
    tessera_ledger_types::{
        header_data::MAX_HEADER_DATA_SIZE, results_root, transactions_root, Account, Address,
        Amount, Block, BlockHeader, BlockHeaderData, Delegate, Fork, ForkActivation,
        ForkSignalSet, Transaction,
    },
    tessera_monitoring::ChainMetrics,
    tessera_state::{AccountState, DelegateState, KeyValueStore, MemoryStore, WriteBatch},
};

/// Where a chain keeps its blocks and its two state trees.
#[derive(Clone)]
pub struct ChainStores {
    pub blocks: Arc<dyn KeyValueStore>,
    pub accounts: Arc<dyn KeyValueStore>,
    pub delegates: Arc<dyn KeyValueStore>,
}

impl ChainStores {
    pub fn in_memory() -> Self {
        Self {
            blocks: Arc::new(MemoryStore::new()),
            accounts: Arc::new(MemoryStore::new()),
            delegates: Arc::new(MemoryStore::new()),
        }
    }
}

#[derive(Debug, Clone)]
struct Head {
    number: u64,
    hash: Hash,
    header: BlockHeader,
}

#[derive(Debug)]
struct LedgerState {
    accounts: AccountState,
    delegates: DelegateState,
    head: Head,
}

#[derive(Debug)]
pub struct Chain {
    executor: TransactionExecutor,
    forks: ActivatedForks,
    validators: ValidatorSet,
    blocks: BlockStore,
    state: RwLock<LedgerState>,
    metrics: Arc<ChainMetrics>,
}

impl Chain {
    pub fn open(
        config: &NodeConfig,
        genesis: &Genesis,
        stores: ChainStores,
        vm: Option<Arc<dyn VmExecutor>>,
    ) -> Result<Self> {
        Self::open_with_metrics(config, genesis, stores, vm, Arc::new(ChainMetrics::new()))
    }

    /// Opens the chain in `stores`, applying `genesis` first when the block
    /// store is empty.
    pub fn open_with_metrics(
        config: &NodeConfig,
        genesis: &Genesis,
        stores: ChainStores,
        vm: Option<Arc<dyn VmExecutor>>,
        metrics: Arc<ChainMetrics>,
    ) -> Result<Self> {
        config.validate()?;
        genesis.validate()?;
        let validators = genesis.validator_set()?;

        let blocks = BlockStore::new(stores.blocks);
        let mut accounts = AccountState::new(stores.accounts);
        let mut delegates = DelegateState::new(stores.delegates);

        let genesis_hash = genesis.block()?.hash()?;
        let head = match blocks.latest_number()? {
            Some(number) => {
                let stored_genesis = blocks
                    .get_header(0)?
                    .ok_or_else(|| ChainError::Corrupt("missing block #0".to_string()))?;
                if stored_genesis.hash()? != genesis_hash {
                    return Err(ConfigError::Genesis(
                        "block store was created from a different genesis".to_string(),
                    )
                    .into());
                }
                let header = blocks
                    .get_header(number)?
                    .ok_or_else(|| ChainError::Corrupt(format!("missing block #{number}")))?;
                info!("Opened chain at #{number}");
                Head {
                    number,
                    hash: header.hash()?,
                    header,
                }
            }
            None => Self::apply_genesis(genesis, &blocks, &mut accounts, &mut delegates)?,
        };

        let recorded = blocks.fork_activations()?;
        for activation in &recorded {
            debug!(
                "fork {} recorded active from #{}",
                activation.fork, activation.effective_from
            );
        }
        metrics
            .latest_block
            .set(i64::try_from(head.number).unwrap_or(i64::MAX));

        Ok(Self {
            executor: TransactionExecutor::new(config.chain.clone(), vm),
            forks: ActivatedForks::new(config.forks.clone(), recorded),
            validators,
            blocks,
            state: RwLock::new(LedgerState {
                accounts,
                delegates,
                head,
            }),
            metrics,
        })
    }

    fn apply_genesis(
        genesis: &Genesis,
        blocks: &BlockStore,
        accounts: &mut AccountState,
        delegates: &mut DelegateState,
    ) -> Result<Head> {
        for premine in &genesis.premine {
            accounts.add_available(&premine.address, premine.amount)?;
        }
        for (name, address) in &genesis.delegates {
            if !delegates.register(address, name, 0)? {
                return Err(ConfigError::Genesis(format!("delegate {name} registered twice")).into());
            }
        }
        accounts.commit()?;
        delegates.commit()?;

        let block = genesis.block()?;
        let hash = block.hash()?;
        blocks.put_block(&block, &hash, &[])?;
        info!(
            "Applied genesis {}: {} premine entries, {} delegates",
            hex::encode(&hash),
            genesis.premine.len(),
            genesis.delegates.len()
        );
        Ok(Head {
            number: 0,
            hash,
            header: block.header,
        })
    }

    pub fn spec(&self) -> &ChainSpec {
        self.executor.spec()
    }

    pub fn validators(&self) -> &ValidatorSet {
        &self.validators
    }

    pub fn metrics(&self) -> &Arc<ChainMetrics> {
        &self.metrics
    }

    pub fn fork_tracker(&self) -> &ActivatedForks {
        &self.forks
    }

    pub fn latest_block_number(&self) -> u64 {
        self.state.read().head.number
    }

    pub fn latest_block_hash(&self) -> Hash {
        self.state.read().head.hash.clone()
    }

    pub fn latest_block_header(&self) -> BlockHeader {
        self.state.read().head.header.clone()
    }

    pub fn has_block(&self, number: u64) -> bool {
        number <= self.latest_block_number()
    }

    pub fn get_block(&self, number: u64) -> Result<Option<Block>> {
        self.blocks.get_block(number)
    }

    pub fn get_block_header(&self, number: u64) -> Result<Option<BlockHeader>> {
        self.blocks.get_header(number)
    }

    pub fn get_block_by_hash(&self, hash: &Hash) -> Result<Option<Block>> {
        match self.blocks.get_block_number(hash)? {
            Some(number) => self.blocks.get_block(number),
            None => Ok(None),
        }
    }

    pub fn get_account(&self, address: &Address) -> Result<Account> {
        Ok(self.state.read().accounts.get_account(address)?)
    }

    pub fn get_code(&self, address: &Address) -> Result<Option<Vec<u8>>> {
        Ok(self.state.read().accounts.get_code(address)?)
    }

    pub fn get_delegate_by_name(&self, name: &str) -> Result<Option<Delegate>> {
        Ok(self.state.read().delegates.get_delegate_by_name(name)?)
    }

    pub fn get_delegate_by_address(&self, address: &Address) -> Result<Option<Delegate>> {
        Ok(self.state.read().delegates.get_delegate_by_address(address)?)
    }

    pub fn get_delegates(&self) -> Result<Vec<Delegate>> {
        Ok(self.state.read().delegates.get_delegates()?)
    }

    pub fn get_vote(&self, voter: &Address, delegate: &Address) -> Result<Amount> {
        Ok(self.state.read().delegates.get_vote(voter, delegate)?)
    }

    /// Whether `fork` is in effect for the block at `height`.
    pub fn is_fork_activated(&self, fork: Fork, height: u64) -> Result<bool> {
        Ok(self.forks.is_activated(self, fork, height)?)
    }

    pub fn activated_forks(&self) -> HashMap<Fork, ForkActivation> {
        self.forks.activated_forks()
    }

    fn active_forks(&self, height: u64) -> Result<BTreeSet<Fork>> {
        let mut active = BTreeSet::new();
        for fork in Fork::ALL {
            if self.is_fork_activated(fork, height)? {
                active.insert(fork);
            }
        }
        Ok(active)
    }

    fn block_context(&self, header: &BlockHeader) -> Result<BlockContext> {
        Ok(BlockContext {
            number: header.number,
            coinbase: header.coinbase,
            parent_hash: header.parent_hash.clone(),
            timestamp: header.timestamp,
            gas_limit: self.spec().max_block_gas_limit,
            active_forks: self.active_forks(header.number)?,
        })
    }

    pub fn validate_block_votes(&self, block: &Block) -> bool {
        self.validators.verify_votes(block)
    }

    /// Validates, executes and appends `block`. `Ok(false)` means the block
    /// is invalid and nothing was written.
    pub fn import_block(&self, block: &Block, validate_votes: bool) -> Result<bool> {
        let started = Instant::now();
        let mut state = self.state.write();
        let imported = self.import_locked(&mut state, block, validate_votes)?;
        drop(state);

        if imported {
            self.metrics.blocks_imported.inc();
            self.metrics
                .transactions_executed
                .add(u64::try_from(block.transactions.len()).unwrap_or(u64::MAX));
            self.metrics
                .latest_block
                .set(i64::try_from(block.number()).unwrap_or(i64::MAX));
            self.metrics
                .import_time_ms
                .observe(started.elapsed().as_secs_f64() * 1_000.0);
        } else {
            self.metrics.blocks_rejected.inc();
        }
        Ok(imported)
    }

    fn import_locked(
        &self,
        state: &mut LedgerState,
        block: &Block,
        validate_votes: bool,
    ) -> Result<bool> {
        let header = &block.header;
        let number = header.number;

        let expected = state.head.number.saturating_add(1);
        if number != expected {
            warn!("Rejecting block #{number}: expected #{expected}");
            return Ok(false);
        }
        if header.parent_hash != state.head.hash {
            warn!("Rejecting block #{number}: parent hash does not match #{}", state.head.number);
            return Ok(false);
        }
        if header.data.len() > MAX_HEADER_DATA_SIZE {
            warn!(
                "Rejecting block #{number}: {} bytes of header data",
                header.data.len()
            );
            return Ok(false);
        }
        if transactions_root(&block.transactions)? != header.transactions_root {
            warn!("Rejecting block #{number}: transactions root mismatch");
            return Ok(false);
        }
        if validate_votes && !self.validators.verify_votes(block) {
            warn!("Rejecting block #{number}: votes are not a valid quorum");
            return Ok(false);
        }

        let context = self.block_context(header)?;
        let mut accounts = state.accounts.track();
        let mut delegates = state.delegates.track();
        let results =
            self.executor
                .execute(&block.transactions, &mut accounts, &mut delegates, &context, 0)?;

        if let Some((index, result)) = results
            .iter()
            .enumerate()
            .find(|(_, result)| !result.is_acceptable())
        {
            warn!(
                "Rejecting block #{number}: transaction {index} failed with {}",
                result.code
            );
            return Ok(false);
        }
        if results_root(&results)? != header.results_root {
            warn!("Rejecting block #{number}: results root mismatch");
            return Ok(false);
        }

        let activations = self.pending_activations(header)?;

        // fast-synced blocks arrive without results; store the executed ones
        let stored = Block {
            header: header.clone(),
            transactions: block.transactions.clone(),
            results,
            votes: block.votes.clone(),
        };
        let hash = header.hash()?;

        if let Err(err) = accounts.commit().and_then(|_| delegates.commit()) {
            state.accounts.rollback();
            state.delegates.rollback();
            return Err(err.into());
        }
        if let Err(err) = self.persist(state, &stored, &hash, &activations) {
            self.forks.forget(number.saturating_add(1));
            return Err(err);
        }

        state.head = Head {
            number,
            hash,
            header: header.clone(),
        };
        for activation in activations {
            self.forks.record(activation);
            self.metrics.forks_activated.inc();
        }
        debug!(
            "Imported block #{number} with {} transactions",
            block.transactions.len()
        );
        Ok(true)
    }

    /// Fork activations `header` completes once it is the latest block.
    fn pending_activations(&self, header: &BlockHeader) -> Result<Vec<ForkActivation>> {
        let source = ImportingHeader {
            chain: self,
            header,
        };
        let mut activations = Vec::new();
        for fork in Fork::ALL {
            if let Some(activation) = self.forks.pending_activation(&source, fork, header.number)? {
                activations.push(activation);
            }
        }
        Ok(activations)
    }

    /// Writes the two state roots and the block. The three stores are
    /// separate, so every root write that landed before a failure is undone
    /// and the pending roots are dropped: either all of the block reaches
    /// the stores or none of it does.
    fn persist(
        &self,
        state: &mut LedgerState,
        block: &Block,
        hash: &Hash,
        activations: &[ForkActivation],
    ) -> Result<()> {
        let mut account_undo = None;
        let mut delegate_undo = None;
        let written = Self::write_roots(state, &mut account_undo, &mut delegate_undo)
            .and_then(|()| self.blocks.put_block(block, hash, activations));
        let Err(err) = written else {
            return Ok(());
        };

        state.accounts.rollback();
        state.delegates.rollback();
        if let Some(undo) = account_undo {
            state.accounts.restore(undo).map_err(|restore| {
                error!("Failed to restore accounts after {err}: {restore}");
                ChainError::Corrupt(format!("accounts left at #{}: {restore}", block.number()))
            })?;
        }
        if let Some(undo) = delegate_undo {
            state.delegates.restore(undo).map_err(|restore| {
                error!("Failed to restore delegates after {err}: {restore}");
                ChainError::Corrupt(format!("delegates left at #{}: {restore}", block.number()))
            })?;
        }
        warn!("Block #{} was not persisted: {err}", block.number());
        Err(err)
    }

    fn write_roots(
        state: &mut LedgerState,
        account_undo: &mut Option<WriteBatch>,
        delegate_undo: &mut Option<WriteBatch>,
    ) -> Result<()> {
        *account_undo = Some(state.accounts.commit_reversible()?);
        *delegate_undo = Some(state.delegates.commit_reversible()?);
        Ok(())
    }

    /// Header data for the next block: signals for every configured fork
    /// that is in its signaling period and not yet active.
    pub fn construct_block_header_data(&self) -> Result<Vec<u8>> {
        let number = self.latest_block_number().saturating_add(1);
        self.header_data_at(number)
    }

    fn header_data_at(&self, number: u64) -> Result<Vec<u8>> {
        let config = self.forks.config();
        let signaled: BTreeSet<Fork> = config.signaled_forks.iter().copied().collect();
        let mut pending = Vec::new();
        for fork in signaled {
            if config.rule(fork).in_signaling_period(number)
                && !self.is_fork_activated(fork, number)?
            {
                pending.push(fork);
            }
        }
        if pending.is_empty() {
            return Ok(Vec::new());
        }
        let data = BlockHeaderData::from_fork_signals(&ForkSignalSet::of(&pending)?)?;
        Ok(data.into_bytes())
    }

    /// Builds the next block from `candidates`, keeping those that execute
    /// with an acceptable result. Nothing is committed; the returned block
    /// still needs votes unless it is imported without vote validation.
    pub fn propose_block(
        &self,
        candidates: &[Transaction],
        coinbase: Address,
        timestamp: u64,
    ) -> Result<Block> {
        let state = self.state.read();
        let number = state.head.number.saturating_add(1);
        let mut header = BlockHeader {
            number,
            coinbase,
            parent_hash: state.head.hash.clone(),
            timestamp,
            data: self.header_data_at(number)?,
            ..BlockHeader::default()
        };
        let context = self.block_context(&header)?;

        let mut accounts = state.accounts.track();
        let mut delegates = state.delegates.track();
        let mut transactions = Vec::new();
        let mut results = Vec::new();
        let mut gas_used = 0u64;
        for tx in candidates {
            let result =
                self.executor
                    .execute_single(tx, &mut accounts, &mut delegates, &context, gas_used)?;
            if !result.is_acceptable() {
                debug!(
                    "Leaving {} from {} out of #{number}: {}",
                    tx.tx_type, tx.from, result.code
                );
                continue;
            }
            let gas = if tx.is_vm_transaction() {
                result.gas_used
            } else {
                self.spec().non_vm_transaction_gas_cost
            };
            gas_used = gas_used.saturating_add(gas);
            transactions.push(tx.clone());
            results.push(result);
        }

        header.transactions_root = transactions_root(&transactions)?;
        header.results_root = results_root(&results)?;
        Ok(Block {
            header,
            transactions,
            results,
            votes: Vec::new(),
        })
    }
}

impl ForkSignalSource for Chain {
    fn fork_signals(&self, height: u64) -> std::result::Result<ForkSignalSet, ForkError> {
        match self.blocks.get_header(height) {
            Ok(Some(header)) => Ok(header.decoded_data().parse_fork_signals()),
            Ok(None) => Ok(ForkSignalSet::default()),
            Err(err) => {
                warn!("Failed to read header #{height} for fork signals: {err}");
                Err(ForkError::SignalsUnavailable {
                    height,
                    reason: err.to_string(),
                })
            }
        }
    }
}

/// The stored headers plus one that is being imported on top of them.
struct ImportingHeader<'a> {
    chain: &'a Chain,
    header: &'a BlockHeader,
}

impl ForkSignalSource for ImportingHeader<'_> {
    fn fork_signals(&self, height: u64) -> std::result::Result<ForkSignalSet, ForkError> {
        if height == self.header.number {
            return Ok(self.header.decoded_data().parse_fork_signals());
        }
        self.chain.fork_signals(height)
    }
}

impl Blockchain for Chain {
    fn import_block(&self, block: &Block, validate_votes: bool) -> std::result::Result<bool, ImportFault> {
        Chain::import_block(self, block, validate_votes).map_err(|err| {
            error!("Failed to import block #{}: {err}", block.number());
            ImportFault::from(err)
        })
    }

    fn validate_block_votes(&self, block: &Block) -> bool {
        Chain::validate_block_votes(self, block)
    }

    fn has_block(&self, number: u64) -> bool {
        Chain::has_block(self, number)
    }

    fn latest_block_number(&self) -> u64 {
        Chain::latest_block_number(self)
    }
}
