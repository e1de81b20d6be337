//! Block persistence over a [`KeyValueStore`].
//!
//! | Key | Value |
//! |-----|-------|
//! | `0x00 ‖ number` | encoded block |
//! | `0x01 ‖ number` | encoded header |
//! | `0x02 ‖ hash`   | block number |
//! | `0x03`          | latest block number |
//! | `0x04 ‖ fork id`| height the fork is effective from |
//!
//! Numbers and fork ids are big-endian so prefix scans come out in order.

use {
    crate::error::{ChainError, Result},
    solana_hash::Hash,
    std::sync::Arc,
    tessera_ledger_types::{Block, BlockHeader, Fork, ForkActivation},
    tessera_state::{KeyValueStore, WriteBatch},
};

const BLOCK_PREFIX: u8 = 0x00;
const HEADER_PREFIX: u8 = 0x01;
const HASH_PREFIX: u8 = 0x02;
const LATEST_KEY: [u8; 1] = [0x03];
const FORK_PREFIX: u8 = 0x04;

fn number_key(prefix: u8, number: u64) -> Vec<u8> {
    let mut key = Vec::with_capacity(9);
    key.push(prefix);
    key.extend_from_slice(&number.to_be_bytes());
    key
}

fn hash_key(hash: &Hash) -> Vec<u8> {
    let mut key = Vec::with_capacity(33);
    key.push(HASH_PREFIX);
    key.extend_from_slice(hash.as_ref());
    key
}

fn fork_key(fork: Fork) -> Vec<u8> {
    let mut key = Vec::with_capacity(3);
    key.push(FORK_PREFIX);
    key.extend_from_slice(&fork.id().to_be_bytes());
    key
}

fn decode_u64(what: &str, bytes: &[u8]) -> Result<u64> {
    let array: [u8; 8] = bytes
        .try_into()
        .map_err(|_| ChainError::Corrupt(format!("{what}: expected 8 bytes, got {}", bytes.len())))?;
    Ok(u64::from_be_bytes(array))
}

#[derive(Clone)]
pub struct BlockStore {
    store: Arc<dyn KeyValueStore>,
}

impl std::fmt::Debug for BlockStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockStore").finish_non_exhaustive()
    }
}

impl BlockStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn latest_number(&self) -> Result<Option<u64>> {
        self.store
            .get(&LATEST_KEY)?
            .map(|bytes| decode_u64("latest block number", &bytes))
            .transpose()
    }

    /// Writes `block`, makes it the latest and records the fork
    /// activations it triggered, all in one batch.
    pub fn put_block(
        &self,
        block: &Block,
        hash: &Hash,
        activations: &[ForkActivation],
    ) -> Result<()> {
        let number = block.number();
        let mut batch = WriteBatch::new();
        batch.put(number_key(BLOCK_PREFIX, number), block.to_bytes()?);
        batch.put(number_key(HEADER_PREFIX, number), block.header.to_bytes()?);
        batch.put(hash_key(hash), number.to_be_bytes().to_vec());
        batch.put(LATEST_KEY.to_vec(), number.to_be_bytes().to_vec());
        for activation in activations {
            batch.put(
                fork_key(activation.fork),
                activation.effective_from.to_be_bytes().to_vec(),
            );
        }
        self.store.write_batch(batch)?;
        Ok(())
    }

    pub fn get_block(&self, number: u64) -> Result<Option<Block>> {
        self.store
            .get(&number_key(BLOCK_PREFIX, number))?
            .map(|bytes| Block::from_bytes(&bytes).map_err(ChainError::from))
            .transpose()
    }

    pub fn get_header(&self, number: u64) -> Result<Option<BlockHeader>> {
        self.store
            .get(&number_key(HEADER_PREFIX, number))?
            .map(|bytes| BlockHeader::from_bytes(&bytes).map_err(ChainError::from))
            .transpose()
    }

    pub fn get_block_number(&self, hash: &Hash) -> Result<Option<u64>> {
        self.store
            .get(&hash_key(hash))?
            .map(|bytes| decode_u64("block number", &bytes))
            .transpose()
    }

    /// Every recorded activation of a known fork. Records of fork ids this
    /// build does not know are skipped.
    pub fn fork_activations(&self) -> Result<Vec<ForkActivation>> {
        let mut activations = Vec::new();
        for (key, value) in self.store.prefix_iter(&[FORK_PREFIX])? {
            let id_bytes: [u8; 2] = key
                .get(1..)
                .and_then(|rest| rest.try_into().ok())
                .ok_or_else(|| ChainError::Corrupt(format!("fork key {}", hex::encode(&key))))?;
            let Some(fork) = Fork::from_id(u16::from_be_bytes(id_bytes)) else {
                continue;
            };
            activations.push(ForkActivation {
                fork,
                effective_from: decode_u64("fork activation", &value)?,
            });
        }
        Ok(activations)
    }
}
