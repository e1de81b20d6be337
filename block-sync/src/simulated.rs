//! In-memory chain and peers for driving the sync engine in tests.

use {
    crate::{
        channel::{Blockchain, Capability, Channel, ChannelProvider, DisconnectReason},
        error::{ImportFault, Result, SyncError},
        message::{SyncMessage, SyncRequest},
    },
    crossbeam_channel::Sender,
    parking_lot::{Mutex, RwLock},
    solana_hash::Hash,
    std::{
        collections::HashSet,
        sync::{
            atomic::{AtomicBool, AtomicU64, Ordering},
            Arc,
        },
    },
    tessera_ledger_types::{Block, BlockHeader},
};

/// `len` hash-linked blocks numbered from 1; block 1 links to the default hash.
pub fn build_chain(len: u64) -> Vec<Block> {
    let mut blocks: Vec<Block> = Vec::new();
    let mut parent_hash = Hash::default();
    for number in 1..=len {
        let block = Block {
            header: BlockHeader {
                number,
                parent_hash,
                timestamp: number.saturating_mul(1_000),
                ..BlockHeader::default()
            },
            ..Block::default()
        };
        parent_hash = block.hash().unwrap_or_default();
        blocks.push(block);
    }
    blocks
}

/// Answer to `request` from a peer holding `blocks` (numbered from 1).
pub fn serve_request(blocks: &[Block], request: &SyncRequest) -> Option<SyncMessage> {
    let index = usize::try_from(request.number().checked_sub(1)?).ok()?;
    let block = blocks.get(index)?;
    match request {
        SyncRequest::GetBlock { .. } => Some(SyncMessage::Block(block.clone())),
        SyncRequest::GetBlockParts { .. } => {
            SyncMessage::block_parts(block, &request.requested_parts()).ok()
        }
    }
}

/// A chain that accepts hash-linked blocks in order.
#[derive(Debug, Default)]
pub struct SimulatedChain {
    blocks: RwLock<Vec<Block>>,
    bad_votes: Mutex<HashSet<u64>>,
    pending_faults: AtomicU64,
    import_log: Mutex<Vec<(u64, bool)>>,
}

impl SimulatedChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// A chain already holding `blocks`.
    pub fn with_blocks(blocks: Vec<Block>) -> Self {
        Self {
            blocks: RwLock::new(blocks),
            ..Self::default()
        }
    }

    /// Vote validation fails for `number`.
    pub fn reject_votes_at(&self, number: u64) {
        self.bad_votes.lock().insert(number);
    }

    /// The next `count` imports fail with an [`ImportFault`].
    pub fn fail_next_imports(&self, count: u64) {
        self.pending_faults.store(count, Ordering::Relaxed);
    }

    /// `(number, validate_votes)` of every successful import.
    pub fn import_log(&self) -> Vec<(u64, bool)> {
        self.import_log.lock().clone()
    }

    pub fn blocks(&self) -> Vec<Block> {
        self.blocks.read().clone()
    }
}

impl Blockchain for SimulatedChain {
    fn import_block(&self, block: &Block, validate_votes: bool) -> std::result::Result<bool, ImportFault> {
        let faults = self.pending_faults.load(Ordering::Relaxed);
        if faults > 0 {
            self.pending_faults.store(faults.saturating_sub(1), Ordering::Relaxed);
            return Err(ImportFault("simulated store failure".to_string()));
        }
        if validate_votes && !self.validate_block_votes(block) {
            return Ok(false);
        }

        let mut blocks = self.blocks.write();
        let expected_number = u64::try_from(blocks.len()).unwrap_or(u64::MAX).saturating_add(1);
        let expected_parent = match blocks.last() {
            Some(parent) => parent
                .hash()
                .map_err(|err| ImportFault(err.to_string()))?,
            None => Hash::default(),
        };
        if block.number() != expected_number || *block.parent_hash() != expected_parent {
            return Ok(false);
        }
        blocks.push(block.clone());
        self.import_log.lock().push((block.number(), validate_votes));
        Ok(true)
    }

    fn validate_block_votes(&self, block: &Block) -> bool {
        !self.bad_votes.lock().contains(&block.number())
    }

    fn has_block(&self, number: u64) -> bool {
        number <= self.latest_block_number()
    }

    fn latest_block_number(&self) -> u64 {
        u64::try_from(self.blocks.read().len()).unwrap_or(u64::MAX)
    }
}

/// A peer connection that records what it is asked to do.
#[derive(Debug)]
pub struct SimulatedChannel {
    peer_id: String,
    remote_height: AtomicU64,
    capabilities: Vec<Capability>,
    idle: AtomicBool,
    sent: Mutex<Vec<SyncRequest>>,
    disconnected: Mutex<Option<DisconnectReason>>,
    outbox: Option<Sender<(String, SyncRequest)>>,
}

impl SimulatedChannel {
    pub fn new(peer_id: &str, remote_height: u64) -> Self {
        Self {
            peer_id: peer_id.to_string(),
            remote_height: AtomicU64::new(remote_height),
            capabilities: vec![Capability::Core],
            idle: AtomicBool::new(true),
            sent: Mutex::new(Vec::new()),
            disconnected: Mutex::new(None),
            outbox: None,
        }
    }

    pub fn with_capabilities(mut self, capabilities: &[Capability]) -> Self {
        self.capabilities = capabilities.to_vec();
        self
    }

    /// Forwards every request, tagged with the peer id, to `outbox`.
    pub fn with_outbox(mut self, outbox: Sender<(String, SyncRequest)>) -> Self {
        self.outbox = Some(outbox);
        self
    }

    pub fn set_idle(&self, idle: bool) {
        self.idle.store(idle, Ordering::Relaxed);
    }

    pub fn set_remote_height(&self, height: u64) {
        self.remote_height.store(height, Ordering::Relaxed);
    }

    pub fn take_sent(&self) -> Vec<SyncRequest> {
        std::mem::take(&mut *self.sent.lock())
    }

    pub fn disconnected(&self) -> Option<DisconnectReason> {
        *self.disconnected.lock()
    }
}

impl Channel for SimulatedChannel {
    fn peer_id(&self) -> &str {
        &self.peer_id
    }

    fn is_idle(&self) -> bool {
        self.idle.load(Ordering::Relaxed) && self.disconnected.lock().is_none()
    }

    fn remote_height(&self) -> u64 {
        self.remote_height.load(Ordering::Relaxed)
    }

    fn capabilities(&self) -> &[Capability] {
        &self.capabilities
    }

    fn send(&self, request: SyncRequest) -> Result<()> {
        self.sent.lock().push(request.clone());
        if let Some(outbox) = &self.outbox {
            outbox
                .send((self.peer_id.clone(), request))
                .map_err(|err| SyncError::Send {
                    peer: self.peer_id.clone(),
                    reason: err.to_string(),
                })?;
        }
        Ok(())
    }

    fn disconnect(&self, reason: DisconnectReason) {
        *self.disconnected.lock() = Some(reason);
    }
}

/// The set of connected peers.
#[derive(Debug, Default)]
pub struct SimulatedNetwork {
    channels: RwLock<Vec<Arc<SimulatedChannel>>>,
}

impl SimulatedNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connect(&self, channel: SimulatedChannel) -> Arc<SimulatedChannel> {
        let channel = Arc::new(channel);
        self.channels.write().push(channel.clone());
        channel
    }

    pub fn channel(&self, peer_id: &str) -> Option<Arc<SimulatedChannel>> {
        self.channels
            .read()
            .iter()
            .find(|channel| channel.peer_id == peer_id)
            .cloned()
    }
}

impl ChannelProvider for SimulatedNetwork {
    fn active_channels(&self) -> Vec<Arc<dyn Channel>> {
        self.channels
            .read()
            .iter()
            .filter(|channel| channel.disconnected().is_none())
            .map(|channel| channel.clone() as Arc<dyn Channel>)
            .collect()
    }
}
