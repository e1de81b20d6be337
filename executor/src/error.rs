//! Error types for transaction execution.
//!
//! Transaction validity problems are never errors: they surface as result
//! codes. An `ExecutorError` means the block cannot be executed at all.

use {tessera_state::StateError, thiserror::Error};

#[derive(Error, Debug)]
pub enum ExecutorError {
    /// The state layers or the store behind them failed.
    #[error("state error: {0}")]
    State(#[from] StateError),

    /// The virtual machine failed for reasons unrelated to the transaction.
    #[error("vm fault: {0}")]
    Vm(String),

    #[error("invalid chain spec: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, ExecutorError>;
