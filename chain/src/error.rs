//! Error types for the reference chain and node configuration.
//!
//! A block that fails validation is not an error: `import_block` returns
//! `Ok(false)` for it. A `ChainError` means the node itself could not make
//! progress.

use {
    std::path::PathBuf,
    tessera_block_sync::{ImportFault, SyncError},
    tessera_executor::ExecutorError,
    tessera_forks::ForkError,
    tessera_ledger_types::CodecError,
    tessera_state::StateError,
    thiserror::Error,
};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Fork(#[from] ForkError),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error("invalid chain spec: {0}")]
    ChainSpec(String),

    #[error("invalid genesis: {0}")]
    Genesis(String),
}

#[derive(Error, Debug)]
pub enum ChainError {
    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Executor(#[from] ExecutorError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Fork(#[from] ForkError),

    /// A stored record does not decode to what its key promises.
    #[error("corrupt block store: {0}")]
    Corrupt(String),
}

impl From<ChainError> for ImportFault {
    fn from(err: ChainError) -> Self {
        ImportFault(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ChainError>;
