//! Error types for the state layers.

use {tessera_ledger_types::ArithmeticError, thiserror::Error};

#[derive(Error, Debug)]
pub enum StateError {
    /// The durable store failed.
    #[error("store error: {0}")]
    Store(String),

    /// A stored record could not be decoded or encoded.
    #[error("corrupt state record {key}: {reason}")]
    Corrupt { key: String, reason: String },

    /// Balance or nonce arithmetic left the representable range.
    #[error(transparent)]
    Arithmetic(#[from] ArithmeticError),

    /// A layer index did not resolve to a live layer.
    #[error("layer {0} is not live")]
    MissingLayer(usize),

    /// A store-level operation was asked of a child layer.
    #[error("layer {0} is not a root layer")]
    NotRoot(usize),
}

impl StateError {
    pub(crate) fn corrupt(key: &[u8], reason: impl ToString) -> Self {
        Self::Corrupt {
            key: hex::encode(key),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, StateError>;
