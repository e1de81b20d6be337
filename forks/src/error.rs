//! Error types for fork tracking.

use {tessera_ledger_types::Fork, thiserror::Error};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ForkError {
    /// A rule needs more signaling blocks than its window holds.
    #[error("fork {fork}: {required} blocks required but only {window} checked")]
    RequirementExceedsWindow {
        fork: Fork,
        required: u64,
        window: u64,
    },

    /// Zero-sized windows or requirements never activate anything.
    #[error("fork {0}: blocks required and blocks to check must be positive")]
    EmptyRule(Fork),

    #[error("fork {fork}: signaling period starts at {start} after it ends at {end}")]
    InvertedPeriod { fork: Fork, start: u64, end: u64 },

    /// The header at `height` could not be read.
    #[error("fork signals of #{height} unavailable: {reason}")]
    SignalsUnavailable { height: u64, reason: String },
}

pub type Result<T> = std::result::Result<T, ForkError>;
