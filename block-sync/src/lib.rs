//! # Tessera block sync
//!
//! Catches a node up with its peers. A session downloads every height
//! between the local head and a target from randomly chosen idle peers,
//! validates received blocks in checkpoint runs and imports them in order.
//!
//! ```text
//!  ┌─────────────┐  SyncRequest   ┌───────────┐
//!  │ SyncManager │ ─────────────▶ │  Channel  │  (transport, not in this crate)
//!  │             │ ◀───────────── │           │
//!  └──────┬──────┘  SyncMessage   └───────────┘
//!         │ import_block / validate_block_votes
//!  ┌──────▼──────┐
//!  │ Blockchain  │
//!  └─────────────┘
//! ```
//!
//! With fast sync enabled, votes are only fetched and checked for
//! validator-set pivot heights and the last interval before the target;
//! the blocks in between are trusted through the hash links leading up to
//! a checked block.
//!
//! ## Crate modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`]    | `SyncConfig` defaults, dev overrides, validation |
//! | [`channel`]   | `Channel`, `ChannelProvider` and `Blockchain` collaborators |
//! | [`message`]   | `SyncRequest` / `SyncMessage` and block part reassembly |
//! | [`queues`]    | The four session queues |
//! | [`manager`]   | `SyncManager`: session lifecycle and loops |
//! | [`progress`]  | `SyncProgress` and the ETA estimate |
//! | [`error`]     | `SyncError`, `ImportFault` |

pub mod channel;
pub mod config;
pub mod error;
pub mod manager;
pub mod message;
pub mod progress;
pub mod queues;
#[cfg(any(test, feature = "dev-context-only-utils"))]
pub mod simulated;

pub use {
    channel::{Blockchain, Capability, Channel, ChannelProvider, DisconnectReason},
    config::SyncConfig,
    error::{ImportFault, Result, SyncError},
    manager::SyncManager,
    message::{SyncMessage, SyncRequest},
    progress::SyncProgress,
    queues::{PendingBlock, QueueSnapshot},
};
