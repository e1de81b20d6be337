//! # Tessera Monitoring
//!
//! Metrics for the Tessera node core.
//!
//! Three metric types matching Prometheus conventions:
//! - **Counter**: monotonically increasing value (e.g., blocks imported)
//! - **Gauge**: value that can go up or down (e.g., queued downloads)
//! - **Histogram**: distribution of observations (e.g., import latency)
//!
//! [`SyncMetrics`] is updated by the block sync engine and [`ChainMetrics`]
//! by block import. Both are plain structs of metrics, shared behind an
//! `Arc`.
//!
//! ## Usage
//!
//! ```rust
//! use tessera_monitoring::{prometheus, NodeMetrics};
//!
//! let metrics = NodeMetrics::new();
//! metrics.sync.blocks_imported.inc();
//! metrics.chain.latest_block.set(42);
//! metrics.chain.import_time_ms.observe(12.0);
//!
//! let text = prometheus::encode(&metrics.snapshot());
//! assert!(text.contains("tessera_chain_latest_block 42"));
//! ```

pub mod prometheus;

use {
    parking_lot::Mutex,
    std::sync::{
        atomic::{AtomicI64, AtomicU64, Ordering},
        Arc,
    },
};

// ---------------------------------------------------------------------------
// Metric primitives
// ---------------------------------------------------------------------------

/// A monotonically increasing counter.
#[derive(Debug)]
pub struct Counter {
    value: AtomicU64,
    name: &'static str,
    help: &'static str,
}

impl Counter {
    pub const fn new(name: &'static str, help: &'static str) -> Self {
        Self {
            value: AtomicU64::new(0),
            name,
            help,
        }
    }

    /// Increment the counter by 1.
    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    /// Add a value to the counter.
    pub fn add(&self, v: u64) {
        self.value.fetch_add(v, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }

    pub fn sample(&self) -> MetricFamily {
        MetricFamily {
            name: self.name,
            help: self.help,
            value: MetricValue::Counter(self.get()),
        }
    }
}

/// A gauge that can go up or down.
#[derive(Debug)]
pub struct Gauge {
    value: AtomicI64,
    name: &'static str,
    help: &'static str,
}

impl Gauge {
    pub const fn new(name: &'static str, help: &'static str) -> Self {
        Self {
            value: AtomicI64::new(0),
            name,
            help,
        }
    }

    pub fn set(&self, v: i64) {
        self.value.store(v, Ordering::Relaxed);
    }

    /// Sets the gauge from a length or count, saturating at `i64::MAX`.
    pub fn set_len(&self, len: usize) {
        self.set(i64::try_from(len).unwrap_or(i64::MAX));
    }

    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dec(&self) {
        self.value.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn get(&self) -> i64 {
        self.value.load(Ordering::Relaxed)
    }

    pub fn sample(&self) -> MetricFamily {
        MetricFamily {
            name: self.name,
            help: self.help,
            value: MetricValue::Gauge(self.get()),
        }
    }
}

/// A histogram that collects observations into cumulative buckets.
#[derive(Debug)]
pub struct Histogram {
    buckets: Vec<f64>,
    counts: Vec<AtomicU64>,
    sum: Mutex<f64>,
    count: AtomicU64,
    name: &'static str,
    help: &'static str,
}

impl Histogram {
    /// Create a histogram with the given bucket upper bounds.
    pub fn new(name: &'static str, help: &'static str, buckets: Vec<f64>) -> Self {
        let counts = buckets.iter().map(|_| AtomicU64::new(0)).collect();
        Self {
            buckets,
            counts,
            sum: Mutex::new(0.0),
            count: AtomicU64::new(0),
            name,
            help,
        }
    }

    pub fn observe(&self, v: f64) {
        self.count.fetch_add(1, Ordering::Relaxed);
        *self.sum.lock() += v;
        for (bound, count) in self.buckets.iter().zip(&self.counts) {
            if v <= *bound {
                count.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn get_count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn get_sum(&self) -> f64 {
        *self.sum.lock()
    }

    /// `(upper bound, cumulative count)` per bucket.
    pub fn get_buckets(&self) -> Vec<(f64, u64)> {
        self.buckets
            .iter()
            .zip(self.counts.iter())
            .map(|(bound, count)| (*bound, count.load(Ordering::Relaxed)))
            .collect()
    }

    pub fn sample(&self) -> MetricFamily {
        MetricFamily {
            name: self.name,
            help: self.help,
            value: MetricValue::Histogram {
                buckets: self.get_buckets(),
                sum: self.get_sum(),
                count: self.get_count(),
            },
        }
    }
}

/// Default buckets for timing histograms (milliseconds).
pub fn default_time_buckets() -> Vec<f64> {
    vec![
        1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 5000.0,
    ]
}

// ---------------------------------------------------------------------------
// Snapshot (point-in-time export)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum MetricValue {
    Counter(u64),
    Gauge(i64),
    Histogram {
        buckets: Vec<(f64, u64)>,
        sum: f64,
        count: u64,
    },
}

/// One named metric at a point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricFamily {
    pub name: &'static str,
    pub help: &'static str,
    pub value: MetricValue,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsSnapshot {
    pub families: Vec<MetricFamily>,
}

impl MetricsSnapshot {
    pub fn get(&self, name: &str) -> Option<&MetricValue> {
        self.families
            .iter()
            .find(|family| family.name == name)
            .map(|family| &family.value)
    }
}

// ---------------------------------------------------------------------------
// Sync and chain metrics
// ---------------------------------------------------------------------------

/// Metrics of the block sync engine.
#[derive(Debug)]
pub struct SyncMetrics {
    pub sessions_started: Counter,
    pub blocks_requested: Counter,
    pub blocks_received: Counter,
    pub blocks_imported: Counter,
    pub invalid_blocks: Counter,
    pub download_timeouts: Counter,
    pub dropped_messages: Counter,
    pub bad_peers: Gauge,
    pub to_download: Gauge,
    pub to_receive: Gauge,
    pub to_validate: Gauge,
    pub to_import: Gauge,
}

impl SyncMetrics {
    pub fn new() -> Self {
        Self {
            sessions_started: Counter::new(
                "tessera_sync_sessions_total",
                "Sync sessions started",
            ),
            blocks_requested: Counter::new(
                "tessera_sync_blocks_requested_total",
                "Block or block part requests sent to peers",
            ),
            blocks_received: Counter::new(
                "tessera_sync_blocks_received_total",
                "Blocks received from peers and queued for validation",
            ),
            blocks_imported: Counter::new(
                "tessera_sync_blocks_imported_total",
                "Blocks imported by the sync engine",
            ),
            invalid_blocks: Counter::new(
                "tessera_sync_invalid_blocks_total",
                "Blocks rejected as invalid during sync",
            ),
            download_timeouts: Counter::new(
                "tessera_sync_download_timeouts_total",
                "Requests that expired before a response arrived",
            ),
            dropped_messages: Counter::new(
                "tessera_sync_dropped_messages_total",
                "Malformed, oversized or stale sync messages",
            ),
            bad_peers: Gauge::new(
                "tessera_sync_bad_peers",
                "Peers excluded from the current session",
            ),
            to_download: Gauge::new("tessera_sync_to_download", "Heights waiting to be requested"),
            to_receive: Gauge::new("tessera_sync_to_receive", "Heights requested and in flight"),
            to_validate: Gauge::new("tessera_sync_to_validate", "Received blocks awaiting validation"),
            to_import: Gauge::new("tessera_sync_to_import", "Validated blocks awaiting import"),
        }
    }

    pub fn families(&self) -> Vec<MetricFamily> {
        vec![
            self.sessions_started.sample(),
            self.blocks_requested.sample(),
            self.blocks_received.sample(),
            self.blocks_imported.sample(),
            self.invalid_blocks.sample(),
            self.download_timeouts.sample(),
            self.dropped_messages.sample(),
            self.bad_peers.sample(),
            self.to_download.sample(),
            self.to_receive.sample(),
            self.to_validate.sample(),
            self.to_import.sample(),
        ]
    }
}

impl Default for SyncMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Metrics of block import and execution.
#[derive(Debug)]
pub struct ChainMetrics {
    pub latest_block: Gauge,
    pub blocks_imported: Counter,
    pub blocks_rejected: Counter,
    pub transactions_executed: Counter,
    pub forks_activated: Counter,
    pub import_time_ms: Histogram,
}

impl ChainMetrics {
    pub fn new() -> Self {
        Self {
            latest_block: Gauge::new("tessera_chain_latest_block", "Number of the chain head"),
            blocks_imported: Counter::new(
                "tessera_chain_blocks_imported_total",
                "Blocks appended to the chain",
            ),
            blocks_rejected: Counter::new(
                "tessera_chain_blocks_rejected_total",
                "Blocks that failed import validation",
            ),
            transactions_executed: Counter::new(
                "tessera_chain_transactions_total",
                "Transactions executed in imported blocks",
            ),
            forks_activated: Counter::new(
                "tessera_chain_forks_activated_total",
                "Forks activated by this node",
            ),
            import_time_ms: Histogram::new(
                "tessera_chain_import_time_ms",
                "Time to validate, execute and commit one block in milliseconds",
                default_time_buckets(),
            ),
        }
    }

    pub fn families(&self) -> Vec<MetricFamily> {
        vec![
            self.latest_block.sample(),
            self.blocks_imported.sample(),
            self.blocks_rejected.sample(),
            self.transactions_executed.sample(),
            self.forks_activated.sample(),
            self.import_time_ms.sample(),
        ]
    }
}

impl Default for ChainMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Every metric a node exports. The halves are shared with the sync engine
/// and the chain that update them.
#[derive(Debug, Default)]
pub struct NodeMetrics {
    pub sync: Arc<SyncMetrics>,
    pub chain: Arc<ChainMetrics>,
}

impl NodeMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let mut families = self.sync.families();
        families.extend(self.chain.families());
        MetricsSnapshot { families }
    }
}
