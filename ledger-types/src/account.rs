//! Account and delegate records as persisted by the state layers.

use {
    crate::{address::Address, amount::Amount},
    borsh::{BorshDeserialize, BorshSerialize},
};

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Account {
    pub address: Address,
    pub available: Amount,
    pub locked: Amount,
    pub nonce: u64,
}

impl Account {
    /// The account every address has before it is first written.
    pub fn empty(address: Address) -> Self {
        Self {
            address,
            available: Amount::ZERO,
            locked: Amount::ZERO,
            nonce: 0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Delegate {
    pub address: Address,
    pub name: String,
    pub registered_at: u64,
    pub votes: Amount,
}

/// Delegate names are 3 to 16 bytes drawn from `[a-z0-9_]`.
pub fn is_valid_delegate_name(name: &[u8]) -> bool {
    (3..=16).contains(&name.len())
        && name
            .iter()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || *b == b'_')
}
