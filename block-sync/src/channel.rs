//! Collaborators the sync engine talks to: peer channels and the chain.

use {
    crate::{
        error::{ImportFault, Result},
        message::SyncRequest,
    },
    std::sync::Arc,
    tessera_ledger_types::Block,
};

/// Optional protocol features a peer advertises during its handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Core,
    /// Serves block parts, which fast sync requires.
    FastSync,
    Light,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum DisconnectReason {
    /// The peer served an invalid block.
    BadPeer,
}

/// A connection to one remote peer.
pub trait Channel: Send + Sync {
    fn peer_id(&self) -> &str;

    /// Whether no request is outstanding on this connection.
    fn is_idle(&self) -> bool;

    /// Latest block number the peer advertised.
    fn remote_height(&self) -> u64;

    fn capabilities(&self) -> &[Capability];

    fn send(&self, request: SyncRequest) -> Result<()>;

    fn disconnect(&self, reason: DisconnectReason);

    fn supports(&self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }
}

pub trait ChannelProvider: Send + Sync {
    fn active_channels(&self) -> Vec<Arc<dyn Channel>>;
}

/// The chain the sync engine imports into.
pub trait Blockchain: Send + Sync {
    /// `Ok(false)` means the block is invalid; `Err` means the chain could
    /// not decide and the import should be retried.
    fn import_block(&self, block: &Block, validate_votes: bool) -> std::result::Result<bool, ImportFault>;

    fn validate_block_votes(&self, block: &Block) -> bool;

    fn has_block(&self, number: u64) -> bool;

    fn latest_block_number(&self) -> u64;
}
