//! The block a batch of transactions executes in.

use {
    solana_hash::Hash,
    std::collections::BTreeSet,
    tessera_ledger_types::{Address, Fork},
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockContext {
    pub number: u64,
    pub coinbase: Address,
    pub parent_hash: Hash,
    pub timestamp: u64,
    pub gas_limit: u64,
    /// Forks in effect at `number`.
    pub active_forks: BTreeSet<Fork>,
}

impl BlockContext {
    pub fn is_fork_active(&self, fork: Fork) -> bool {
        self.active_forks.contains(&fork)
    }
}
