//! Tessera End-to-End Test Suite
//!
//! A source chain produces signed blocks; a fresh node syncs from it over
//! simulated peers that answer requests on a responder thread. Every test
//! file can be run on its own:
//!
//! ```bash
//! cargo test -p tessera-e2e-tests --test chain_sync -- --nocapture
//! cargo test -p tessera-e2e-tests --test fast_sync -- --nocapture
//! cargo test -p tessera-e2e-tests --test invalid_votes -- --nocapture
//! cargo test -p tessera-e2e-tests --test fork_activation -- --nocapture
//! cargo test -p tessera-e2e-tests --test ledger_scenarios -- --nocapture
//! ```

pub mod helpers;
