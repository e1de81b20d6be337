//! Error types for the block sync engine.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("invalid sync config: {0}")]
    InvalidConfig(String),

    /// The transport could not deliver a request to a peer.
    #[error("failed to send to peer {peer}: {reason}")]
    Send { peer: String, reason: String },

    /// Block parts that do not add up to a block.
    #[error("malformed block parts: {0}")]
    MalformedParts(String),

    #[error("message too large: {size} bytes (max {max} bytes)")]
    MessageTooLarge { size: usize, max: usize },
}

/// A blockchain failure unrelated to the validity of the block being
/// imported, such as a store write error. The import is retried later.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("import fault: {0}")]
pub struct ImportFault(pub String);

pub type Result<T> = std::result::Result<T, SyncError>;
