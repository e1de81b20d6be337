//! The stake-weighted validator set that signs blocks.

use {
    crate::error::ConfigError,
    solana_pubkey::Pubkey,
    std::collections::{btree_map::Keys, BTreeMap, HashSet},
    tessera_ledger_types::Block,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatorSet {
    stakes: BTreeMap<Pubkey, u64>,
    total_stake: u64,
}

impl ValidatorSet {
    pub fn new(validators: impl IntoIterator<Item = (Pubkey, u64)>) -> Result<Self, ConfigError> {
        let mut stakes = BTreeMap::new();
        let mut total_stake = 0u64;
        for (pubkey, stake) in validators {
            if stake == 0 {
                return Err(ConfigError::Genesis(format!(
                    "validator {} has no stake",
                    hex::encode(pubkey)
                )));
            }
            if stakes.insert(pubkey, stake).is_some() {
                return Err(ConfigError::Genesis(format!(
                    "validator {} listed twice",
                    hex::encode(pubkey)
                )));
            }
            total_stake = total_stake
                .checked_add(stake)
                .ok_or_else(|| ConfigError::Genesis("total stake overflows".to_string()))?;
        }
        if stakes.is_empty() {
            return Err(ConfigError::Genesis("no validators".to_string()));
        }
        Ok(Self {
            stakes,
            total_stake,
        })
    }

    pub fn len(&self) -> usize {
        self.stakes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stakes.is_empty()
    }

    pub fn total_stake(&self) -> u64 {
        self.total_stake
    }

    pub fn stake_of(&self, pubkey: &Pubkey) -> Option<u64> {
        self.stakes.get(pubkey).copied()
    }

    pub fn pubkeys(&self) -> Keys<'_, Pubkey, u64> {
        self.stakes.keys()
    }

    /// More than two thirds of the total stake.
    pub fn has_quorum(&self, stake: u64) -> bool {
        u128::from(stake).saturating_mul(3) > u128::from(self.total_stake).saturating_mul(2)
    }

    /// Whether the votes of `block` are a quorum of distinct validators,
    /// each with a valid signature over the block hash. A single vote from
    /// an unknown key, a repeated validator or a bad signature fails the
    /// whole block.
    pub fn verify_votes(&self, block: &Block) -> bool {
        let Ok(hash) = block.hash() else {
            return false;
        };
        let mut seen = HashSet::with_capacity(block.votes.len());
        let mut stake = 0u64;
        for vote in &block.votes {
            let Some(validator_stake) = self.stake_of(&vote.validator) else {
                return false;
            };
            if !seen.insert(vote.validator) || !vote.verify(&hash) {
                return false;
            }
            stake = stake.saturating_add(validator_stake);
        }
        self.has_quorum(stake)
    }
}
