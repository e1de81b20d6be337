//! Tessera Property-Based Invariant Tests
//!
//! Uses proptest to verify system invariants across:
//! - Copy-on-write state layers: reads, rollback and commit
//! - Fork activation: memoized answers against a full window scan
//! - Transaction execution: nonces, conservation of value, vote totals
//! - Block sync: queue exclusivity and a monotone head
//! - Chain import: hash links and per-account nonces

pub mod fork_invariants;
