//! Delegate registry and votes.
//!
//! Three record families share one layer:
//!
//! | Prefix | Key | Value |
//! |--------|-----|-------|
//! | `0x00` | name | delegate address |
//! | `0x01` | delegate address | [`Delegate`] |
//! | `0x02` | delegate address, voter address | voted [`Amount`] |

use {
    crate::{
        error::{Result, StateError},
        layers::StateLayer,
        store::{KeyValueStore, WriteBatch},
    },
    borsh::BorshDeserialize,
    log::debug,
    std::sync::Arc,
    tessera_ledger_types::{Address, Amount, Delegate},
};

const NAME_PREFIX: u8 = 0x00;
const DELEGATE_PREFIX: u8 = 0x01;
const VOTE_PREFIX: u8 = 0x02;

fn name_key(name: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(name.len().saturating_add(1));
    key.push(NAME_PREFIX);
    key.extend_from_slice(name.as_bytes());
    key
}

fn delegate_key(address: &Address) -> Vec<u8> {
    let mut key = Vec::with_capacity(Address::LEN.saturating_add(1));
    key.push(DELEGATE_PREFIX);
    key.extend_from_slice(address.as_bytes());
    key
}

fn votes_prefix(delegate: &Address) -> Vec<u8> {
    let mut key = Vec::with_capacity(Address::LEN.saturating_mul(2).saturating_add(1));
    key.push(VOTE_PREFIX);
    key.extend_from_slice(delegate.as_bytes());
    key
}

fn vote_key(voter: &Address, delegate: &Address) -> Vec<u8> {
    let mut key = votes_prefix(delegate);
    key.extend_from_slice(voter.as_bytes());
    key
}

fn decode<T: BorshDeserialize>(key: &[u8], bytes: &[u8]) -> Result<T> {
    T::try_from_slice(bytes).map_err(|e| StateError::corrupt(key, e))
}

#[derive(Debug, Clone)]
pub struct DelegateState {
    layer: StateLayer,
}

impl DelegateState {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            layer: StateLayer::root(store),
        }
    }

    /// Registers a delegate. Returns false when the address or the name is
    /// already taken.
    pub fn register(&mut self, address: &Address, name: &str, registered_at: u64) -> Result<bool> {
        if self.layer.get(&delegate_key(address))?.is_some()
            || self.layer.get(&name_key(name))?.is_some()
        {
            return Ok(false);
        }
        let delegate = Delegate {
            address: *address,
            name: name.to_string(),
            registered_at,
            votes: Amount::ZERO,
        };
        self.put_delegate(&delegate)?;
        self.layer.put(name_key(name), address.as_bytes().to_vec());
        debug!("registered delegate {name} at {address}");
        Ok(true)
    }

    fn put_delegate(&mut self, delegate: &Delegate) -> Result<()> {
        let key = delegate_key(&delegate.address);
        let bytes = borsh::to_vec(delegate).map_err(|e| StateError::corrupt(&key, e))?;
        self.layer.put(key, bytes);
        Ok(())
    }

    fn put_vote(&mut self, voter: &Address, delegate: &Address, amount: Amount) -> Result<()> {
        let key = vote_key(voter, delegate);
        if amount.is_zero() {
            self.layer.delete(key);
        } else {
            let bytes = borsh::to_vec(&amount).map_err(|e| StateError::corrupt(&key, e))?;
            self.layer.put(key, bytes);
        }
        Ok(())
    }

    /// Adds `amount` to the vote of `voter` for `delegate`. Returns false when
    /// no such delegate exists.
    pub fn vote(&mut self, voter: &Address, delegate: &Address, amount: Amount) -> Result<bool> {
        let Some(mut record) = self.get_delegate_by_address(delegate)? else {
            return Ok(false);
        };
        let current = self.get_vote(voter, delegate)?;
        let updated = current.checked_add(amount)?;
        record.votes = record.votes.checked_add(amount)?;
        self.put_vote(voter, delegate, updated)?;
        self.put_delegate(&record)?;
        Ok(true)
    }

    /// Withdraws `amount` from the vote of `voter` for `delegate`. Returns
    /// false when the delegate is unknown or the recorded vote is smaller.
    pub fn unvote(&mut self, voter: &Address, delegate: &Address, amount: Amount) -> Result<bool> {
        let Some(mut record) = self.get_delegate_by_address(delegate)? else {
            return Ok(false);
        };
        let current = self.get_vote(voter, delegate)?;
        if current < amount {
            return Ok(false);
        }
        let updated = current.checked_sub(amount)?;
        record.votes = record.votes.checked_sub(amount)?;
        self.put_vote(voter, delegate, updated)?;
        self.put_delegate(&record)?;
        Ok(true)
    }

    pub fn get_vote(&self, voter: &Address, delegate: &Address) -> Result<Amount> {
        let key = vote_key(voter, delegate);
        match self.layer.get(&key)? {
            Some(bytes) => decode(&key, &bytes),
            None => Ok(Amount::ZERO),
        }
    }

    pub fn get_delegate_by_name(&self, name: &str) -> Result<Option<Delegate>> {
        let key = name_key(name);
        let Some(bytes) = self.layer.get(&key)? else {
            return Ok(None);
        };
        let address = Address::try_from(bytes.as_slice())
            .map_err(|e| StateError::corrupt(&key, e))?;
        self.get_delegate_by_address(&address)
    }

    pub fn get_delegate_by_address(&self, address: &Address) -> Result<Option<Delegate>> {
        let key = delegate_key(address);
        self.layer
            .get(&key)?
            .map(|bytes| decode(&key, &bytes))
            .transpose()
    }

    /// All delegates, most votes first and then by name.
    pub fn get_delegates(&self) -> Result<Vec<Delegate>> {
        let mut delegates = self
            .layer
            .scan_prefix(&[DELEGATE_PREFIX])?
            .iter()
            .map(|(key, bytes)| decode::<Delegate>(key, bytes))
            .collect::<Result<Vec<_>>>()?;
        delegates.sort_by(|a, b| b.votes.cmp(&a.votes).then_with(|| a.name.cmp(&b.name)));
        Ok(delegates)
    }

    /// Every voter of `delegate` with its voted amount, in voter address order.
    pub fn get_votes(&self, delegate: &Address) -> Result<Vec<(Address, Amount)>> {
        let prefix = votes_prefix(delegate);
        self.layer
            .scan_prefix(&prefix)?
            .iter()
            .map(|(key, bytes)| {
                let voter = Address::try_from(&key[prefix.len()..])
                    .map_err(|e| StateError::corrupt(key, e))?;
                Ok((voter, decode::<Amount>(key, bytes)?))
            })
            .collect()
    }

    pub fn track(&self) -> DelegateState {
        DelegateState {
            layer: self.layer.track(),
        }
    }

    pub fn commit(&mut self) -> Result<usize> {
        self.layer.commit()
    }

    pub fn rollback(&mut self) {
        self.layer.rollback()
    }

    pub fn commit_reversible(&mut self) -> Result<WriteBatch> {
        self.layer.commit_reversible()
    }

    pub fn restore(&mut self, undo: WriteBatch) -> Result<()> {
        self.layer.restore(undo)
    }
}
