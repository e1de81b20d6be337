//! The four queues a sync session moves heights through.
//!
//! ```text
//!  to_download ──request──▶ to_receive ──response──▶ to_validate ──▶ to_import ──▶ chain
//!       ▲                        │ timeout                                │
//!       └────────────────────────┴──────────── invalid block ◀────────────┘
//! ```
//!
//! A height is in at most one of `to_download`, `to_receive` and
//! `to_validate ∪ to_import` at any time.

use {
    crate::channel::Channel,
    std::{
        collections::{BTreeMap, BTreeSet, HashMap},
        fmt,
        sync::Arc,
        time::{Duration, Instant},
    },
    tessera_ledger_types::Block,
};

/// A received block and the channel it came from.
#[derive(Clone)]
pub struct PendingBlock {
    pub block: Block,
    pub channel: Arc<dyn Channel>,
}

impl PendingBlock {
    pub fn number(&self) -> u64 {
        self.block.number()
    }
}

impl fmt::Debug for PendingBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingBlock")
            .field("number", &self.block.number())
            .field("peer", &self.channel.peer_id())
            .finish()
    }
}

#[derive(Debug, Default)]
pub struct SyncQueues {
    pub(crate) to_download: BTreeSet<u64>,
    /// Height to the time its request was sent.
    pub(crate) to_receive: HashMap<u64, Instant>,
    /// Keyed by height; the first arrival for a height wins.
    pub(crate) to_validate: BTreeMap<u64, PendingBlock>,
    pub(crate) to_import: BTreeMap<u64, PendingBlock>,
}

impl SyncQueues {
    pub fn clear(&mut self) {
        self.to_download.clear();
        self.to_receive.clear();
        self.to_validate.clear();
        self.to_import.clear();
    }

    /// Whether `height` is queued anywhere.
    pub fn contains(&self, height: u64) -> bool {
        self.to_download.contains(&height)
            || self.to_receive.contains_key(&height)
            || self.to_validate.contains_key(&height)
            || self.to_import.contains_key(&height)
    }

    /// Moves requests older than `timeout` back to `to_download` and returns
    /// their heights.
    pub fn expire(&mut self, now: Instant, timeout: Duration) -> Vec<u64> {
        let expired: Vec<u64> = self
            .to_receive
            .iter()
            .filter(|(_, sent_at)| now.saturating_duration_since(**sent_at) > timeout)
            .map(|(height, _)| *height)
            .collect();
        for height in &expired {
            self.to_receive.remove(height);
            self.to_download.insert(*height);
        }
        expired
    }

    /// Records a received block. Returns false if its height was not
    /// awaiting a response.
    pub fn receive(&mut self, pending: PendingBlock) -> bool {
        let height = pending.number();
        if self.to_receive.remove(&height).is_none() {
            return false;
        }
        self.to_validate.insert(height, pending);
        true
    }

    /// Puts `height` back into `to_download` and drops it from every other
    /// queue.
    pub fn requeue(&mut self, height: u64) {
        self.to_receive.remove(&height);
        self.to_validate.remove(&height);
        self.to_import.remove(&height);
        self.to_download.insert(height);
    }

    /// Lowest height awaiting validation.
    pub fn lowest_to_validate(&self) -> Option<u64> {
        self.to_validate.keys().next().copied()
    }

    /// Blocks received but not yet imported.
    pub fn pending_blocks(&self) -> usize {
        self.to_validate.len().saturating_add(self.to_import.len())
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        let mut to_receive: Vec<u64> = self.to_receive.keys().copied().collect();
        to_receive.sort_unstable();
        QueueSnapshot {
            to_download: self.to_download.iter().copied().collect(),
            to_receive,
            to_validate: self.to_validate.keys().copied().collect(),
            to_import: self.to_import.keys().copied().collect(),
        }
    }
}

/// Heights per queue, each sorted ascending.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueSnapshot {
    pub to_download: Vec<u64>,
    pub to_receive: Vec<u64>,
    pub to_validate: Vec<u64>,
    pub to_import: Vec<u64>,
}

impl QueueSnapshot {
    pub fn is_empty(&self) -> bool {
        self.to_download.is_empty()
            && self.to_receive.is_empty()
            && self.to_validate.is_empty()
            && self.to_import.is_empty()
    }

    /// Every queued height with the number of queues holding it, counting
    /// `to_validate` and `to_import` as one.
    pub fn occurrences(&self) -> BTreeMap<u64, usize> {
        let mut counts: BTreeMap<u64, usize> = BTreeMap::new();
        let mut bump = |height: u64| {
            let count = counts.entry(height).or_default();
            *count = count.saturating_add(1);
        };
        self.to_download.iter().copied().for_each(&mut bump);
        self.to_receive.iter().copied().for_each(&mut bump);
        let staged: BTreeSet<u64> = self
            .to_validate
            .iter()
            .chain(&self.to_import)
            .copied()
            .collect();
        staged.into_iter().for_each(&mut bump);
        counts
    }

    pub fn lowest(&self) -> Option<u64> {
        self.occurrences().keys().next().copied()
    }
}
