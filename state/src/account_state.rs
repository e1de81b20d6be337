//! Account balances, nonces, contract code and contract storage.

use {
    crate::{
        error::{Result, StateError},
        layers::StateLayer,
        store::{KeyValueStore, WriteBatch},
    },
    borsh::BorshDeserialize,
    std::sync::Arc,
    tessera_ledger_types::{Account, Address, Amount, ArithmeticError},
};

const ACCOUNT_PREFIX: u8 = 0x00;
const CODE_PREFIX: u8 = 0x01;
const STORAGE_PREFIX: u8 = 0x02;

fn account_key(address: &Address) -> Vec<u8> {
    let mut key = Vec::with_capacity(Address::LEN.saturating_add(1));
    key.push(ACCOUNT_PREFIX);
    key.extend_from_slice(address.as_bytes());
    key
}

fn code_key(address: &Address) -> Vec<u8> {
    let mut key = Vec::with_capacity(Address::LEN.saturating_add(1));
    key.push(CODE_PREFIX);
    key.extend_from_slice(address.as_bytes());
    key
}

fn storage_key(address: &Address, slot: &[u8]) -> Vec<u8> {
    let mut key = Vec::with_capacity(Address::LEN.saturating_add(slot.len()).saturating_add(1));
    key.push(STORAGE_PREFIX);
    key.extend_from_slice(address.as_bytes());
    key.extend_from_slice(slot);
    key
}

/// Account view over one state layer.
///
/// Missing accounts read as [`Account::empty`].
#[derive(Debug, Clone)]
pub struct AccountState {
    layer: StateLayer,
}

impl AccountState {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            layer: StateLayer::root(store),
        }
    }

    pub fn get_account(&self, address: &Address) -> Result<Account> {
        let key = account_key(address);
        match self.layer.get(&key)? {
            Some(bytes) => {
                Account::try_from_slice(&bytes).map_err(|e| StateError::corrupt(&key, e))
            }
            None => Ok(Account::empty(*address)),
        }
    }

    fn put_account(&mut self, account: &Account) -> Result<()> {
        let key = account_key(&account.address);
        let bytes = borsh::to_vec(account).map_err(|e| StateError::corrupt(&key, e))?;
        self.layer.put(key, bytes);
        Ok(())
    }

    fn update<F>(&mut self, address: &Address, f: F) -> Result<Account>
    where
        F: FnOnce(&mut Account) -> Result<()>,
    {
        let mut account = self.get_account(address)?;
        f(&mut account)?;
        self.put_account(&account)?;
        Ok(account)
    }

    pub fn add_available(&mut self, address: &Address, amount: Amount) -> Result<Account> {
        self.update(address, |a| {
            a.available = a.available.checked_add(amount)?;
            Ok(())
        })
    }

    pub fn sub_available(&mut self, address: &Address, amount: Amount) -> Result<Account> {
        self.update(address, |a| {
            a.available = a.available.checked_sub(amount)?;
            Ok(())
        })
    }

    pub fn add_locked(&mut self, address: &Address, amount: Amount) -> Result<Account> {
        self.update(address, |a| {
            a.locked = a.locked.checked_add(amount)?;
            Ok(())
        })
    }

    pub fn sub_locked(&mut self, address: &Address, amount: Amount) -> Result<Account> {
        self.update(address, |a| {
            a.locked = a.locked.checked_sub(amount)?;
            Ok(())
        })
    }

    pub fn increase_nonce(&mut self, address: &Address) -> Result<Account> {
        self.update(address, |a| {
            a.nonce = a
                .nonce
                .checked_add(1)
                .ok_or(ArithmeticError::Overflow)?;
            Ok(())
        })
    }

    pub fn set_nonce(&mut self, address: &Address, nonce: u64) -> Result<Account> {
        self.update(address, |a| {
            a.nonce = nonce;
            Ok(())
        })
    }

    pub fn get_code(&self, address: &Address) -> Result<Option<Vec<u8>>> {
        self.layer.get(&code_key(address))
    }

    pub fn set_code(&mut self, address: &Address, code: Vec<u8>) {
        self.layer.put(code_key(address), code);
    }

    pub fn get_storage(&self, address: &Address, slot: &[u8]) -> Result<Option<Vec<u8>>> {
        self.layer.get(&storage_key(address, slot))
    }

    pub fn put_storage(&mut self, address: &Address, slot: &[u8], value: Vec<u8>) {
        self.layer.put(storage_key(address, slot), value);
    }

    pub fn remove_storage(&mut self, address: &Address, slot: &[u8]) {
        self.layer.delete(storage_key(address, slot));
    }

    /// An address exists once an account record or contract code was written.
    pub fn exists(&self, address: &Address) -> Result<bool> {
        Ok(self.layer.get(&account_key(address))?.is_some()
            || self.layer.get(&code_key(address))?.is_some())
    }

    pub fn track(&self) -> AccountState {
        AccountState {
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

    pub fn layer(&self) -> &StateLayer {
        &self.layer
    }
}
