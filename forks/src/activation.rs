//! Fork activation lookups over the header signal history.
//!
//! For a fork with window `W` and requirement `R`, the fork is active at
//! height `h` when at least `R` of the headers in `[max(0, h - W), h - 1]`
//! signal it. Counting that window for every query is O(W), so results are
//! memoized per `(fork, height)`:
//!
//! ```text
//!   memo[h].count       = memo[h-1].count
//!                         - (lower(h) > 0 && memo[h-1].lower_signaled)
//!                         + signaled(h - 1)
//!   memo[h].lower_signaled = signaled(lower(h))
//! ```
//!
//! The incremental step is taken when `memo[h-1]` is cached; otherwise the
//! full window is scanned. Both paths are public so they can be checked
//! against each other. A header that cannot be read fails the query and
//! nothing is memoized for it.

use {
    crate::{
        config::{ForkConfig, ForkRule},
        error::Result,
    },
    dashmap::DashMap,
    log::{info, trace},
    lru::LruCache,
    parking_lot::Mutex,
    std::collections::HashMap,
    tessera_ledger_types::{Fork, ForkActivation, ForkSignalSet},
};

/// Entries kept in the activation memo.
pub const MEMO_CAPACITY: usize = 1024;

/// Read access to the fork signals of past headers.
pub trait ForkSignalSource {
    /// Signals carried by the header at `height`; empty when there is none.
    fn fork_signals(&self, height: u64) -> Result<ForkSignalSet>;
}

impl<F> ForkSignalSource for F
where
    F: Fn(u64) -> ForkSignalSet,
{
    fn fork_signals(&self, height: u64) -> Result<ForkSignalSet> {
        Ok(self(height))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForkMemo {
    /// Whether the lowest header of the window signaled the fork.
    pub lower_signaled: bool,
    /// Signaling headers in the window.
    pub count: u64,
}

/// Window bounds `(lower, higher)` for a query at `height`.
fn window(rule: &ForkRule, height: u64) -> (u64, u64) {
    (
        height.saturating_sub(rule.blocks_to_check),
        height.saturating_sub(1),
    )
}

fn signaled(source: &dyn ForkSignalSource, fork: Fork, height: u64) -> Result<bool> {
    Ok(source.fork_signals(height)?.contains(fork))
}

pub struct ActivatedForks {
    config: ForkConfig,
    activated: DashMap<Fork, ForkActivation>,
    memo: Mutex<LruCache<(Fork, u64), ForkMemo>>,
}

impl std::fmt::Debug for ActivatedForks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivatedForks")
            .field("activated", &self.activated_forks())
            .field("memo_len", &self.memo.lock().len())
            .finish()
    }
}

impl ActivatedForks {
    /// Creates a tracker seeded with activations recorded earlier.
    pub fn new(config: ForkConfig, recorded: impl IntoIterator<Item = ForkActivation>) -> Self {
        let activated = DashMap::new();
        for activation in recorded {
            activated.insert(activation.fork, activation);
        }
        Self {
            config,
            activated,
            memo: Mutex::new(LruCache::new(MEMO_CAPACITY)),
        }
    }

    pub fn config(&self) -> &ForkConfig {
        &self.config
    }

    /// Whether `fork` is in effect for the block at `height`.
    pub fn is_activated(
        &self,
        source: &dyn ForkSignalSource,
        fork: Fork,
        height: u64,
    ) -> Result<bool> {
        if let Some(activation) = self.activated.get(&fork) {
            return Ok(height >= activation.effective_from);
        }
        if let Some(from) = self.config.manual_activation(fork) {
            return Ok(height >= from);
        }

        let rule = self.config.rule(fork);
        let Some(previous_height) = height.checked_sub(1) else {
            return Ok(false);
        };
        if !rule.in_signaling_period(previous_height) {
            return Ok(false);
        }

        if let Some(memo) = self.memo.lock().get(&(fork, height)) {
            return Ok(memo.count >= rule.blocks_required);
        }

        let previous = self.memo.lock().get(&(fork, previous_height)).copied();
        let memo = match previous {
            Some(previous) => self.count_incremental(source, fork, height, previous)?,
            None => self.count_full_scan(source, fork, height)?,
        };
        self.memo.lock().put((fork, height), memo);

        if memo.count > 0 {
            trace!(
                "fork {fork} at #{height}: {} / {} of {} blocks signaled",
                memo.count,
                rule.blocks_required,
                rule.blocks_to_check
            );
        }
        Ok(memo.count >= rule.blocks_required)
    }

    /// O(1) step from the memo of `height - 1`.
    pub fn count_incremental(
        &self,
        source: &dyn ForkSignalSource,
        fork: Fork,
        height: u64,
        previous: ForkMemo,
    ) -> Result<ForkMemo> {
        let (lower, higher) = window(&self.config.rule(fork), height);
        let dropped = u64::from(lower > 0 && previous.lower_signaled);
        let added = u64::from(signaled(source, fork, higher)?);
        Ok(ForkMemo {
            lower_signaled: signaled(source, fork, lower)?,
            count: previous
                .count
                .saturating_sub(dropped)
                .saturating_add(added),
        })
    }

    /// O(window) count over every header in the window.
    pub fn count_full_scan(
        &self,
        source: &dyn ForkSignalSource,
        fork: Fork,
        height: u64,
    ) -> Result<ForkMemo> {
        let (lower, higher) = window(&self.config.rule(fork), height);
        let mut count = 0u64;
        for h in lower..=higher {
            count = count.saturating_add(u64::from(signaled(source, fork, h)?));
        }
        Ok(ForkMemo {
            lower_signaled: signaled(source, fork, lower)?,
            count,
        })
    }

    /// The activation `fork` would get with `head` as the latest block: some
    /// when `head` is the last block before the fork takes effect. Nothing
    /// is recorded.
    pub fn pending_activation(
        &self,
        source: &dyn ForkSignalSource,
        fork: Fork,
        head: u64,
    ) -> Result<Option<ForkActivation>> {
        let rule = self.config.rule(fork);
        if !rule.in_signaling_period(head)
            || self.is_activated(source, fork, head)?
            || !self.is_activated(source, fork, head.saturating_add(1))?
        {
            return Ok(None);
        }
        Ok(Some(ForkActivation {
            fork,
            effective_from: head.saturating_add(1),
        }))
    }

    /// Makes `activation` permanent for this tracker.
    pub fn record(&self, activation: ForkActivation) {
        self.activated.insert(activation.fork, activation);
        info!(
            "fork {} activated, effective from #{}",
            activation.fork, activation.effective_from
        );
    }

    /// Records the activation of `fork` when `head` is the last block before
    /// it takes effect. Returns true when a new activation was recorded.
    pub fn activate_fork(
        &self,
        source: &dyn ForkSignalSource,
        fork: Fork,
        head: u64,
    ) -> Result<bool> {
        match self.pending_activation(source, fork, head)? {
            Some(activation) => {
                self.record(activation);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Drops the memo of every fork at `height`, for when the header below
    /// it was not kept.
    pub fn forget(&self, height: u64) {
        let mut memo = self.memo.lock();
        for fork in Fork::ALL {
            memo.pop(&(fork, height));
        }
    }

    /// Every recorded activation.
    pub fn activated_forks(&self) -> HashMap<Fork, ForkActivation> {
        self.activated
            .iter()
            .map(|entry| (*entry.key(), *entry.value()))
            .collect()
    }

    pub fn memo_len(&self) -> usize {
        self.memo.lock().len()
    }

    #[cfg(any(test, feature = "dev-context-only-utils"))]
    pub fn clear_memo(&self) {
        self.memo.lock().clear();
    }
}
