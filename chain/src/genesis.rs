//! The genesis document: block 0 and the state it seeds.
//!
//! ```json
//! {
//!   "timestamp": 1504742400000,
//!   "premine": [{ "address": "0x…", "amount": 5000000000000000, "description": "foundation" }],
//!   "delegates": { "genesis": "0x…" },
//!   "validators": [{ "pubkey": "…64 hex chars…", "stake": 100 }]
//! }
//! ```

use {
    crate::{error::ConfigError, validators::ValidatorSet},
    serde::{Deserialize, Serialize},
    solana_hash::Hash,
    solana_pubkey::Pubkey,
    std::{collections::BTreeMap, fs, path::Path},
    tessera_ledger_types::{
        is_valid_delegate_name, results_root, transactions_root, Address, Amount, Block,
        BlockHeader, CodecError,
    },
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Premine {
    pub address: Address,
    pub amount: Amount,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisValidator {
    /// Hex-encoded ed25519 public key.
    pub pubkey: String,
    pub stake: u64,
}

impl GenesisValidator {
    pub fn new(pubkey: &Pubkey, stake: u64) -> Self {
        Self {
            pubkey: hex::encode(pubkey),
            stake,
        }
    }

    pub fn decode_pubkey(&self) -> Result<Pubkey, ConfigError> {
        let text = self.pubkey.strip_prefix("0x").unwrap_or(&self.pubkey);
        let bytes = hex::decode(text)
            .map_err(|err| ConfigError::Genesis(format!("validator key {text}: {err}")))?;
        let array: [u8; 32] = bytes.try_into().map_err(|bytes: Vec<u8>| {
            ConfigError::Genesis(format!(
                "validator key {text}: expected 32 bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Pubkey::new_from_array(array))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genesis {
    pub timestamp: u64,
    #[serde(default)]
    pub premine: Vec<Premine>,
    /// Delegates registered at height 0, by name.
    #[serde(default)]
    pub delegates: BTreeMap<String, Address>,
    pub validators: Vec<GenesisValidator>,
}

impl Genesis {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let genesis: Self = serde_json::from_str(text)?;
        genesis.validate()?;
        Ok(genesis)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut delegate_addresses = BTreeMap::new();
        for (name, address) in &self.delegates {
            if !is_valid_delegate_name(name.as_bytes()) {
                return Err(ConfigError::Genesis(format!(
                    "invalid delegate name {name:?}"
                )));
            }
            if let Some(other) = delegate_addresses.insert(address, name) {
                return Err(ConfigError::Genesis(format!(
                    "delegates {other:?} and {name:?} share address {address}"
                )));
            }
        }
        self.validator_set()?;
        Ok(())
    }

    pub fn validator_set(&self) -> Result<ValidatorSet, ConfigError> {
        let validators = self
            .validators
            .iter()
            .map(|v| Ok((v.decode_pubkey()?, v.stake)))
            .collect::<Result<Vec<_>, ConfigError>>()?;
        ValidatorSet::new(validators)
    }

    /// Block 0. It carries no transactions and links to the default hash.
    pub fn block(&self) -> Result<Block, CodecError> {
        Ok(Block {
            header: BlockHeader {
                number: 0,
                coinbase: Address::ZERO,
                parent_hash: Hash::default(),
                timestamp: self.timestamp,
                transactions_root: transactions_root(&[])?,
                results_root: results_root(&[])?,
                ..BlockHeader::default()
            },
            ..Block::default()
        })
    }
}
