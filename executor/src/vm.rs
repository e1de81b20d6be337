//! The seam between the transaction executor and a virtual machine.
//!
//! Opcode semantics live behind [`VmExecutor`]; the executor only needs the
//! receipt. A VM charges gas and moves value through the account state it is
//! handed, and manages the sender nonce itself.

use {
    crate::{context::BlockContext, error::Result},
    tessera_ledger_types::{Address, InternalTransaction, LogInfo, Transaction},
    tessera_state::{AccountState, DelegateState},
};

/// Gas every VM transaction must provide at least.
pub const MIN_VM_GAS: u64 = 21_000;

/// Contracts served natively rather than by bytecode.
const PRECOMPILED: [std::ops::RangeInclusive<u64>; 2] = [1..=8, 100..=103];

/// Whether `address` hosts a precompiled contract.
///
/// `1..=8` are the standard Ethereum precompiles; `100..=103` are vote,
/// unvote, get-votes and get-vote.
pub fn is_precompiled(address: &Address) -> bool {
    address
        .to_low_u64()
        .is_some_and(|n| PRECOMPILED.iter().any(|range| range.contains(&n)))
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VmReceipt {
    pub success: bool,
    pub gas_used: u64,
    pub return_data: Vec<u8>,
    pub logs: Vec<LogInfo>,
    pub internal_transactions: Vec<InternalTransaction>,
}

pub trait VmExecutor: Send + Sync {
    /// Runs a CALL or CREATE. `None` means the VM refused the transaction
    /// outright (for example, the sender cannot cover the gas).
    fn execute(
        &self,
        tx: &Transaction,
        block: &BlockContext,
        accounts: &mut AccountState,
        delegates: &mut DelegateState,
        gas_used_in_block: u64,
    ) -> Result<Option<VmReceipt>>;
}

#[cfg(any(test, feature = "dev-context-only-utils"))]
pub use simple::{SimpleVm, REVERT_MARKER};

#[cfg(any(test, feature = "dev-context-only-utils"))]
mod simple {
    use {
        super::*,
        crate::error::ExecutorError,
        solana_sha256_hasher::hashv,
        tessera_ledger_types::{Amount, TransactionType},
        tessera_state::StateError,
    };

    /// Calls whose data starts with this byte revert.
    pub const REVERT_MARKER: u8 = 0xfe;

    /// A value-moving VM without bytecode.
    ///
    /// Charges `21000 + 16 * data.len()` gas (capped at the gas limit),
    /// echoes call data back, stores CREATE data as code at an address
    /// derived from the sender and nonce, and reverts on [`REVERT_MARKER`].
    #[derive(Debug, Default, Clone, Copy)]
    pub struct SimpleVm;

    impl SimpleVm {
        pub fn contract_address(creator: &Address, nonce: u64) -> Result<Address> {
            let digest = hashv(&[creator.as_ref(), &nonce.to_be_bytes()[..]]);
            let bytes: &[u8] = digest.as_ref();
            Address::try_from(&bytes[12..]).map_err(|e| ExecutorError::Vm(e.to_string()))
        }

        fn intrinsic_gas(tx: &Transaction) -> u64 {
            let data_gas = (tx.data.len() as u64).saturating_mul(16);
            MIN_VM_GAS.saturating_add(data_gas).min(tx.gas)
        }
    }

    impl VmExecutor for SimpleVm {
        fn execute(
            &self,
            tx: &Transaction,
            block: &BlockContext,
            accounts: &mut AccountState,
            _delegates: &mut DelegateState,
            gas_used_in_block: u64,
        ) -> Result<Option<VmReceipt>> {
            if gas_used_in_block.saturating_add(tx.gas) > block.gas_limit {
                return Ok(None);
            }
            let max_fee = tx.gas_price.checked_mul(tx.gas).map_err(StateError::from)?;
            let required = max_fee.checked_add(tx.value).map_err(StateError::from)?;
            let sender = accounts.get_account(&tx.from)?;
            if sender.available < required {
                return Ok(None);
            }

            accounts.sub_available(&tx.from, max_fee)?;
            accounts.increase_nonce(&tx.from)?;

            let gas_used = Self::intrinsic_gas(tx);
            let refund = tx
                .gas_price
                .checked_mul(tx.gas.saturating_sub(gas_used))
                .map_err(StateError::from)?;
            accounts.add_available(&tx.from, refund)?;

            if tx.data.first() == Some(&REVERT_MARKER) {
                return Ok(Some(VmReceipt {
                    success: false,
                    gas_used,
                    ..VmReceipt::default()
                }));
            }

            let (target, return_data) = match tx.tx_type {
                TransactionType::Create => {
                    let address = Self::contract_address(&tx.from, tx.nonce)?;
                    accounts.set_code(&address, tx.data.clone());
                    (address, address.as_bytes().to_vec())
                }
                _ => (tx.to, tx.data.clone()),
            };
            if tx.value > Amount::ZERO {
                accounts.sub_available(&tx.from, tx.value)?;
                accounts.add_available(&target, tx.value)?;
            }

            Ok(Some(VmReceipt {
                success: true,
                gas_used,
                return_data,
                logs: vec![LogInfo {
                    address: target,
                    topics: Vec::new(),
                    data: Vec::new(),
                }],
                internal_transactions: Vec::new(),
            }))
        }
    }
}
