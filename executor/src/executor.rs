//! Deterministic transaction execution.
//!
//! Each transaction runs in its own tracked child of the block's account and
//! delegate layers. The child is committed into the block layer only when
//! the result is acceptable (SUCCESS or FAILURE), so a rejected transaction
//! leaves no trace except its result code.
//!
//! ## Checks, in order
//!
//! 1. nonce matches the sender account
//! 2. fee (non-VM) or gas parameters (VM)
//! 3. data size for the transaction type
//! 4. block gas for non-VM transactions
//! 5. type-specific rules in the per-kind handlers

use {
    crate::{
        chain_spec::ChainSpec,
        context::BlockContext,
        error::{ExecutorError, Result},
        vm::{is_precompiled, VmExecutor, MIN_VM_GAS},
    },
    log::{debug, warn},
    std::sync::Arc,
    tessera_ledger_types::{
        is_valid_delegate_name, Account, ArithmeticError, Fork, ResultCode, Transaction,
        TransactionResult, TransactionType,
    },
    tessera_state::{AccountState, DelegateState, StateError},
};

/// Precompiles whose legacy versions always failed.
const LEGACY_FAILING_PRECOMPILES: [u64; 2] = [102, 103];

/// Largest gas price a VM transaction may offer, in nano.
const MAX_GAS_PRICE: u64 = i32::MAX as u64;

pub struct TransactionExecutor {
    spec: ChainSpec,
    vm: Option<Arc<dyn VmExecutor>>,
}

impl std::fmt::Debug for TransactionExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionExecutor")
            .field("spec", &self.spec)
            .field("vm", &self.vm.is_some())
            .finish()
    }
}

impl TransactionExecutor {
    pub fn new(spec: ChainSpec, vm: Option<Arc<dyn VmExecutor>>) -> Self {
        Self { spec, vm }
    }

    pub fn spec(&self) -> &ChainSpec {
        &self.spec
    }

    /// CALL and CREATE are only valid with a VM and the VIRTUAL_MACHINE fork.
    pub fn is_vm_enabled(&self, block: &BlockContext) -> bool {
        self.vm.is_some() && block.is_fork_active(Fork::VirtualMachine)
    }

    /// Executes `transactions` in order and returns one result per
    /// transaction. Acceptable results are committed into `accounts` and
    /// `delegates`; nothing is written for rejected ones.
    ///
    /// An error means the state or the VM failed and the whole batch must be
    /// discarded by the caller.
    pub fn execute(
        &self,
        transactions: &[Transaction],
        accounts: &mut AccountState,
        delegates: &mut DelegateState,
        block: &BlockContext,
        mut gas_used_in_block: u64,
    ) -> Result<Vec<TransactionResult>> {
        let mut results = Vec::with_capacity(transactions.len());

        for tx in transactions {
            let mut tx_accounts = accounts.track();
            let mut tx_delegates = delegates.track();

            let mut result = match self.execute_one(
                tx,
                &mut tx_accounts,
                &mut tx_delegates,
                block,
                gas_used_in_block,
            ) {
                Ok(result) => result,
                Err(ExecutorError::State(StateError::Arithmetic(e))) => {
                    warn!("arithmetic error executing transaction from {}: {e}", tx.from);
                    TransactionResult::with_code(ResultCode::Invalid)
                }
                Err(e) => return Err(e),
            };

            if result.is_acceptable() {
                // the VM manages the nonce of CALL and CREATE senders
                let nonce_update = if tx.is_vm_transaction() {
                    Ok(())
                } else {
                    tx_accounts.increase_nonce(&tx.from).map(|_| ())
                };
                match nonce_update {
                    Ok(()) => {
                        tx_accounts.commit()?;
                        tx_delegates.commit()?;
                        let gas = if tx.is_vm_transaction() {
                            result.gas_used
                        } else {
                            self.spec.non_vm_transaction_gas_cost
                        };
                        gas_used_in_block = gas_used_in_block.saturating_add(gas);
                    }
                    Err(StateError::Arithmetic(e)) => {
                        warn!("nonce overflow for {}: {e}", tx.from);
                        result = TransactionResult::with_code(ResultCode::Invalid);
                    }
                    Err(e) => return Err(e.into()),
                }
            } else {
                debug!("transaction from {} rejected: {}", tx.from, result.code);
            }

            result.block_number = block.number;
            results.push(result);
        }

        Ok(results)
    }

    /// Executes a single transaction as a batch of one.
    pub fn execute_single(
        &self,
        tx: &Transaction,
        accounts: &mut AccountState,
        delegates: &mut DelegateState,
        block: &BlockContext,
        gas_used_in_block: u64,
    ) -> Result<TransactionResult> {
        let mut results = self.execute(
            std::slice::from_ref(tx),
            accounts,
            delegates,
            block,
            gas_used_in_block,
        )?;
        Ok(results.pop().unwrap_or_default())
    }

    fn execute_one(
        &self,
        tx: &Transaction,
        accounts: &mut AccountState,
        delegates: &mut DelegateState,
        block: &BlockContext,
        gas_used_in_block: u64,
    ) -> Result<TransactionResult> {
        let sender = accounts.get_account(&tx.from)?;

        if tx.nonce != sender.nonce {
            return Ok(TransactionResult::with_code(ResultCode::InvalidNonce));
        }

        if !self.has_valid_fee(tx) {
            return Ok(TransactionResult::with_code(ResultCode::InvalidFee));
        }

        if tx.data.len() > self.spec.max_transaction_data_size(tx.tx_type) {
            return Ok(TransactionResult::with_code(ResultCode::InvalidData));
        }

        if !tx.is_vm_transaction()
            && self
                .spec
                .non_vm_transaction_gas_cost
                .saturating_add(gas_used_in_block)
                > block.gas_limit
        {
            return Ok(TransactionResult::with_code(ResultCode::Invalid));
        }

        let code = match tx.tx_type {
            TransactionType::Transfer => self.transfer(tx, &sender, accounts)?,
            TransactionType::Delegate => self.delegate(tx, &sender, accounts, delegates, block)?,
            TransactionType::Vote => self.vote(tx, &sender, accounts, delegates)?,
            TransactionType::Unvote => self.unvote(tx, &sender, accounts, delegates)?,
            TransactionType::Call | TransactionType::Create => {
                return self.call_vm(tx, accounts, delegates, block, gas_used_in_block);
            }
        };
        Ok(TransactionResult::with_code(code))
    }

    fn has_valid_fee(&self, tx: &Transaction) -> bool {
        if tx.is_vm_transaction() {
            tx.fee.is_zero()
                && (MIN_VM_GAS..=self.spec.max_block_gas_limit).contains(&tx.gas)
                && (1..=MAX_GAS_PRICE).contains(&tx.gas_price.nano())
        } else {
            tx.fee >= self.spec.min_transaction_fee
        }
    }

    /// `fee`, `value` and their sum each fit in the available balance.
    fn can_afford(tx: &Transaction, sender: &Account) -> Result<bool> {
        let total = tx.value.checked_add(tx.fee).map_err(StateError::from)?;
        Ok(tx.fee <= sender.available && tx.value <= sender.available && total <= sender.available)
    }

    fn debit_and_credit(tx: &Transaction, accounts: &mut AccountState) -> Result<()> {
        let total = tx.value.checked_add(tx.fee).map_err(StateError::from)?;
        accounts.sub_available(&tx.from, total)?;
        accounts.add_available(&tx.to, tx.value)?;
        Ok(())
    }

    fn transfer(&self, tx: &Transaction, sender: &Account, accounts: &mut AccountState) -> Result<ResultCode> {
        if !Self::can_afford(tx, sender)? {
            return Ok(ResultCode::InsufficientAvailable);
        }
        Self::debit_and_credit(tx, accounts)?;
        Ok(ResultCode::Success)
    }

    fn delegate(
        &self,
        tx: &Transaction,
        sender: &Account,
        accounts: &mut AccountState,
        delegates: &mut DelegateState,
        block: &BlockContext,
    ) -> Result<ResultCode> {
        if !is_valid_delegate_name(&tx.data) {
            return Ok(ResultCode::InvalidDelegateName);
        }
        if tx.value < self.spec.min_delegate_burn_amount {
            return Ok(ResultCode::InvalidDelegateBurnAmount);
        }
        if !tx.to.is_zero() {
            return Ok(ResultCode::InvalidDelegateBurnAddress);
        }
        if !Self::can_afford(tx, sender)? {
            return Ok(ResultCode::InsufficientAvailable);
        }
        // the name charset was checked above, so this cannot fail
        let name = String::from_utf8_lossy(&tx.data);
        if !delegates.register(&tx.from, &name, block.number)? {
            return Ok(ResultCode::InvalidDelegating);
        }
        Self::debit_and_credit(tx, accounts)?;
        Ok(ResultCode::Success)
    }

    fn vote(
        &self,
        tx: &Transaction,
        sender: &Account,
        accounts: &mut AccountState,
        delegates: &mut DelegateState,
    ) -> Result<ResultCode> {
        if !Self::can_afford(tx, sender)? {
            return Ok(ResultCode::InsufficientAvailable);
        }
        if !delegates.vote(&tx.from, &tx.to, tx.value)? {
            return Ok(ResultCode::InvalidVoting);
        }
        let total = tx.value.checked_add(tx.fee).map_err(StateError::from)?;
        accounts.sub_available(&tx.from, total)?;
        accounts.add_locked(&tx.from, tx.value)?;
        Ok(ResultCode::Success)
    }

    fn unvote(
        &self,
        tx: &Transaction,
        sender: &Account,
        accounts: &mut AccountState,
        delegates: &mut DelegateState,
    ) -> Result<ResultCode> {
        if sender.available < tx.fee {
            return Ok(ResultCode::InsufficientAvailable);
        }
        if sender.locked < tx.value {
            return Ok(ResultCode::InsufficientLocked);
        }
        if !delegates.unvote(&tx.from, &tx.to, tx.value)? {
            return Ok(ResultCode::InvalidUnvoting);
        }
        // available += value - fee, without going through a negative amount
        accounts.add_available(&tx.from, tx.value)?;
        accounts.sub_available(&tx.from, tx.fee)?;
        accounts.sub_locked(&tx.from, tx.value)?;
        Ok(ResultCode::Success)
    }

    fn call_vm(
        &self,
        tx: &Transaction,
        accounts: &mut AccountState,
        delegates: &mut DelegateState,
        block: &BlockContext,
        gas_used_in_block: u64,
    ) -> Result<TransactionResult> {
        let vm = match &self.vm {
            Some(vm) if block.is_fork_active(Fork::VirtualMachine) => vm,
            _ => return Ok(TransactionResult::with_code(ResultCode::InvalidType)),
        };

        let Some(receipt) = vm.execute(tx, block, accounts, delegates, gas_used_in_block)? else {
            return Ok(TransactionResult::with_code(ResultCode::Invalid));
        };

        let mut code = if receipt.success {
            ResultCode::Success
        } else {
            ResultCode::Failure
        };
        let mut gas_used = receipt.gas_used;
        let mut return_data = receipt.return_data;

        if !block.is_fork_active(Fork::VotingPrecompiledUpgrade) {
            // Reproduces pre-upgrade clients so that historical blocks replay
            // to the same results.
            if tx
                .to
                .to_low_u64()
                .is_some_and(|n| LEGACY_FAILING_PRECOMPILES.contains(&n))
            {
                code = ResultCode::Failure;
                return_data = Vec::new();
                gas_used = tx.gas;
            }
            if is_precompiled(&tx.to) {
                code = ResultCode::Success;
            }
            if !receipt.success {
                gas_used = tx.gas;
            }
            let extra_gas = gas_used
                .checked_sub(receipt.gas_used)
                .ok_or(ArithmeticError::Underflow)
                .map_err(StateError::from)?;
            let extra_charge = tx.gas_price.checked_mul(extra_gas).map_err(StateError::from)?;
            accounts.sub_available(&tx.from, extra_charge)?;
        }

        Ok(TransactionResult {
            code,
            gas: tx.gas,
            gas_price: tx.gas_price,
            gas_used,
            return_data,
            logs: receipt.logs,
            internal_transactions: receipt.internal_transactions,
            block_number: block.number,
        })
    }
}
