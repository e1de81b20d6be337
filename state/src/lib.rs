//! # Tessera state
//!
//! Layered copy-on-write state over a durable [`KeyValueStore`].
//!
//! A node keeps one root [`AccountState`] and one root [`DelegateState`].
//! Block import tracks a child layer of each root, and every transaction
//! tracks a child of the block layer, so a rejected transaction or a failed
//! block is discarded with a rollback and nothing reaches the store until the
//! root commits.
//!
//! ## Crate modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`store`]          | `KeyValueStore`, `WriteBatch`, `MemoryStore` |
//! | [`layers`]         | Arena of reference-counted layers, `StateLayer` handles |
//! | [`account_state`]  | Balances, nonces, contract code and storage |
//! | [`delegate_state`] | Delegate registry and votes |
//! | [`error`]          | `StateError` |

pub mod account_state;
pub mod delegate_state;
pub mod error;
pub mod layers;
pub mod store;

pub use {
    account_state::AccountState,
    delegate_state::DelegateState,
    error::{Result, StateError},
    layers::{LayerId, StateLayer},
    store::{KeyValueStore, MemoryStore, WriteBatch},
};
