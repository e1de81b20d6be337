//! Consensus constants that every node must agree on.

use {
    crate::error::{ExecutorError, Result},
    serde::{Deserialize, Serialize},
    tessera_ledger_types::{Amount, TransactionType},
};

/// Largest `data` field accepted per transaction type, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataLimits {
    pub transfer: usize,
    pub delegate: usize,
    pub vote: usize,
    pub unvote: usize,
    pub create: usize,
    pub call: usize,
}

impl Default for DataLimits {
    fn default() -> Self {
        Self {
            transfer: 128,
            delegate: 16,
            vote: 0,
            unvote: 0,
            create: 512 * 1024,
            call: 512 * 1024,
        }
    }
}

impl DataLimits {
    pub fn for_type(&self, tx_type: TransactionType) -> usize {
        match tx_type {
            TransactionType::Transfer => self.transfer,
            TransactionType::Delegate => self.delegate,
            TransactionType::Vote => self.vote,
            TransactionType::Unvote => self.unvote,
            TransactionType::Create => self.create,
            TransactionType::Call => self.call,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainSpec {
    /// Lowest fee a non-VM transaction may pay.
    pub min_transaction_fee: Amount,

    /// Lowest value a DELEGATE transaction must burn.
    pub min_delegate_burn_amount: Amount,

    /// Gas available to a whole block; also caps a single VM transaction.
    pub max_block_gas_limit: u64,

    /// Gas a non-VM transaction counts against the block limit.
    pub non_vm_transaction_gas_cost: u64,

    pub data_limits: DataLimits,

    /// Validator set changes happen every this many blocks; sync verifies
    /// votes only on these heights when fast syncing.
    pub validator_update_interval: u64,
}

impl Default for ChainSpec {
    fn default() -> Self {
        Self {
            min_transaction_fee: Amount::from_nano(5_000_000),
            min_delegate_burn_amount: Amount::from_units(1_000),
            max_block_gas_limit: 10_000_000,
            non_vm_transaction_gas_cost: 5_000,
            data_limits: DataLimits::default(),
            validator_update_interval: 200,
        }
    }
}

impl ChainSpec {
    /// Small amounts and a short validator interval for local tests.
    #[cfg(any(test, feature = "dev-context-only-utils"))]
    pub fn dev_default() -> Self {
        Self {
            min_transaction_fee: Amount::from_nano(10),
            min_delegate_burn_amount: Amount::from_nano(1_000),
            validator_update_interval: 10,
            ..Self::default()
        }
    }

    pub fn max_transaction_data_size(&self, tx_type: TransactionType) -> usize {
        self.data_limits.for_type(tx_type)
    }

    pub fn validate(&self) -> Result<()> {
        if self.validator_update_interval == 0 {
            return Err(ExecutorError::InvalidConfig(
                "validator_update_interval must be positive".to_string(),
            ));
        }
        if self.non_vm_transaction_gas_cost > self.max_block_gas_limit {
            return Err(ExecutorError::InvalidConfig(format!(
                "non-VM gas cost {} exceeds the block gas limit {}",
                self.non_vm_transaction_gas_cost, self.max_block_gas_limit
            )));
        }
        if self.max_block_gas_limit < crate::vm::MIN_VM_GAS {
            return Err(ExecutorError::InvalidConfig(format!(
                "block gas limit {} is below the minimum VM transaction gas",
                self.max_block_gas_limit
            )));
        }
        Ok(())
    }
}
