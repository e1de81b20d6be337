//! # Tessera ledger types
//!
//! Entities shared by every part of the node core: addresses and amounts,
//! transactions and their results, accounts and delegates, blocks and their
//! transferable parts, fork identifiers and the header signal sets.
//!
//! Wire encodings use length-prefixed records (see [`codec`]); state records
//! are stored with borsh.
//!
//! ## Crate modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`codec`]       | `SimpleEncoder` / `SimpleDecoder` |
//! | [`address`]     | 20-byte addresses, small precompile addresses |
//! | [`amount`]      | Checked nano-unit amounts |
//! | [`transaction`] | `Transaction`, `TransactionType` |
//! | [`result`]      | `TransactionResult`, `ResultCode`, logs, internal transactions |
//! | [`account`]     | `Account`, `Delegate`, delegate name rules |
//! | [`block`]       | `Block`, `BlockHeader`, `BlockVote`, `BlockPart`, roots |
//! | [`fork`]        | `Fork`, `ForkActivation`, `ForkSignalSet` |
//! | [`header_data`] | `BlockHeaderData` |
//! | [`error`]       | `CodecError`, `ArithmeticError` |

pub mod account;
pub mod address;
pub mod amount;
pub mod block;
pub mod codec;
pub mod error;
pub mod fork;
pub mod header_data;
pub mod result;
pub mod transaction;

pub use {
    account::{is_valid_delegate_name, Account, Delegate},
    address::Address,
    amount::Amount,
    block::{results_root, transactions_root, Block, BlockHeader, BlockPart, BlockVote},
    error::{ArithmeticError, CodecError},
    fork::{Fork, ForkActivation, ForkSignalSet},
    header_data::BlockHeaderData,
    result::{InternalTransaction, InternalTransactionKind, LogInfo, ResultCode, TransactionResult},
    transaction::{Transaction, TransactionType},
};
