//! # Tessera chain
//!
//! The reference blockchain behind the sync engine. It applies the genesis
//! document, keeps blocks in a [`KeyValueStore`](tessera_state::KeyValueStore),
//! executes imported blocks against the layered account and delegate state,
//! and records fork activations as headers arrive.
//!
//! ```text
//!   SyncManager ──import_block──▶ Chain ──execute──▶ TransactionExecutor
//!                                   │                       │
//!                                   │ fork signals          ▼
//!                                   ▼               AccountState / DelegateState
//!                            ActivatedForks
//! ```
//!
//! ## Crate modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`chain`]      | `Chain`: import, proposal, queries |
//! | [`config`]     | `NodeConfig`, loaded from TOML |
//! | [`genesis`]    | `Genesis`, loaded from JSON |
//! | [`store`]      | `BlockStore` key layout |
//! | [`validators`] | `ValidatorSet` and vote quorum |
//! | [`error`]      | `ChainError`, `ConfigError` |

pub mod chain;
pub mod config;
pub mod error;
pub mod genesis;
pub mod store;
pub mod validators;

pub use {
    chain::{Chain, ChainStores},
    config::NodeConfig,
    error::{ChainError, ConfigError, Result},
    genesis::{Genesis, GenesisValidator, Premine},
    store::BlockStore,
    validators::ValidatorSet,
};
