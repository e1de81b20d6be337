//! Error types for ledger entity encoding and amount arithmetic.

use thiserror::Error;

/// Errors raised while decoding or encoding ledger entities.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The input ended before a complete value could be read.
    #[error("unexpected end of input: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEof {
        /// Bytes the decoder tried to read.
        needed: usize,
        /// Bytes that were still available.
        remaining: usize,
    },

    /// A size prefix does not fit the 4-group varint encoding.
    #[error("size {0} exceeds the encodable maximum")]
    SizeTooLarge(u64),

    /// A size prefix used more than 4 groups.
    #[error("malformed size prefix")]
    MalformedSize,

    /// A string field was not valid UTF-8.
    #[error("invalid utf-8 in string field")]
    InvalidUtf8,

    /// A fixed-width field had the wrong length.
    #[error("invalid {field} length: expected {expected}, got {actual}")]
    InvalidLength {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Unknown transaction type tag.
    #[error("unknown transaction type 0x{0:02x}")]
    UnknownTransactionType(u8),

    /// Unknown transaction result code.
    #[error("unknown result code 0x{0:02x}")]
    UnknownResultCode(u8),

    /// Unknown internal transaction kind.
    #[error("unknown internal transaction kind {0}")]
    UnknownInternalKind(u8),

    /// More forks were signaled than a header can carry.
    #[error("too many pending forks: {0} (max {max})", max = crate::fork::MAX_PENDING_FORKS)]
    TooManyForks(usize),

    /// Header data exceeds its size cap.
    #[error("header data too large: {0} bytes (max {max})", max = crate::header_data::MAX_HEADER_DATA_SIZE)]
    HeaderDataTooLarge(usize),

    /// Bytes were left over after decoding a complete record.
    #[error("{0} trailing bytes after record")]
    TrailingBytes(usize),

    /// A mandatory block component was absent.
    #[error("missing block component: {0}")]
    MissingComponent(&'static str),

    /// Malformed hexadecimal input.
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

/// Overflow or underflow in amount arithmetic.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticError {
    #[error("amount overflow")]
    Overflow,
    #[error("amount underflow")]
    Underflow,
}

/// Convenience result type for codec operations.
pub type Result<T> = std::result::Result<T, CodecError>;
