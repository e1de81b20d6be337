//! # Tessera fork activation
//!
//! Block producers signal the forks they support in the header data of each
//! block. A fork becomes active once enough recent headers signal it; from
//! then on the activation is recorded and no longer depends on signals.
//!
//! ## Crate modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`]     | `ForkConfig`, `ForkRule`, manual activations |
//! | [`activation`] | `ActivatedForks`, `ForkSignalSource`, the activation memo |
//! | [`error`]      | `ForkError` |

pub mod activation;
pub mod config;
pub mod error;

pub use {
    activation::{ActivatedForks, ForkMemo, ForkSignalSource, MEMO_CAPACITY},
    config::{ForkConfig, ForkRule, ManualActivation},
    error::{ForkError, Result},
};
