//! # Tessera transaction executor
//!
//! Applies the transactions of a block to tracked account and delegate
//! layers and produces one [`TransactionResult`] per transaction. Invalid
//! transactions are reported through result codes; only state or VM faults
//! surface as [`ExecutorError`].
//!
//! CALL and CREATE are delegated to an injected [`VmExecutor`] once the
//! VIRTUAL_MACHINE fork is active.
//!
//! ## Crate modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`chain_spec`] | `ChainSpec`: fees, gas limits, data limits |
//! | [`context`]    | `BlockContext` handed to every execution |
//! | [`vm`]         | `VmExecutor`, `VmReceipt`, precompile addresses |
//! | [`executor`]   | `TransactionExecutor` |
//! | [`error`]      | `ExecutorError` |
//!
//! [`TransactionResult`]: tessera_ledger_types::TransactionResult

pub mod chain_spec;
pub mod context;
pub mod error;
pub mod executor;
pub mod vm;

pub use {
    chain_spec::{ChainSpec, DataLimits},
    context::BlockContext,
    error::{ExecutorError, Result},
    executor::TransactionExecutor,
    vm::{is_precompiled, VmExecutor, VmReceipt, MIN_VM_GAS},
};
