//! Configuration for the block sync engine.

use {
    crate::error::{Result, SyncError},
    serde::{Deserialize, Serialize},
    std::time::Duration,
};

/// Tuning knobs of a sync session.
///
/// Queue limits bound memory while the download loop runs ahead of import;
/// intervals control how often each loop wakes up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// A request without a response after this long is re-queued (ms).
    pub download_timeout_ms: u64,

    /// Upper bound of the `toDownload` queue.
    pub max_queued_jobs: usize,

    /// Requests in flight above which the download loop pauses.
    pub max_pending_jobs: usize,

    /// Blocks awaiting validation or import above which downloading pauses,
    /// unless the next task fills a gap below them.
    pub max_pending_blocks: usize,

    /// Disconnect a peer that served an invalid block.
    pub disconnect_on_invalid_block: bool,

    /// Download votes only on validator-set pivot heights and the tail.
    pub fast_sync: bool,

    /// Period of the download loop (µs).
    pub download_interval_us: u64,

    /// Period of the import loop (µs).
    pub import_interval_us: u64,

    /// Period of the status reporter (s).
    pub report_interval_secs: u64,

    /// Largest accepted block parts payload in bytes.
    pub max_message_size: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            download_timeout_ms: 10_000,
            max_queued_jobs: 8_192,
            max_pending_jobs: 256,
            max_pending_blocks: 512,
            disconnect_on_invalid_block: false,
            fast_sync: false,
            download_interval_us: 500,
            import_interval_us: 1_000,
            report_interval_secs: 30,
            max_message_size: 16 * 1024 * 1024, // 16 MB
        }
    }
}

impl SyncConfig {
    /// Small queues and short timeouts for local testing.
    #[cfg(any(test, feature = "dev-context-only-utils"))]
    pub fn dev_default() -> Self {
        Self {
            download_timeout_ms: 200,
            max_queued_jobs: 16,
            max_pending_jobs: 8,
            max_pending_blocks: 32,
            disconnect_on_invalid_block: true,
            fast_sync: false,
            download_interval_us: 200,
            import_interval_us: 200,
            report_interval_secs: 1,
            max_message_size: 1_048_576,
        }
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_millis(self.download_timeout_ms)
    }

    pub fn download_interval(&self) -> Duration {
        Duration::from_micros(self.download_interval_us)
    }

    pub fn import_interval(&self) -> Duration {
        Duration::from_micros(self.import_interval_us)
    }

    pub fn report_interval(&self) -> Duration {
        Duration::from_secs(self.report_interval_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_queued_jobs < 2 {
            return Err(SyncError::InvalidConfig(format!(
                "max_queued_jobs must be at least 2, got {}",
                self.max_queued_jobs
            )));
        }
        if self.download_interval_us == 0 || self.import_interval_us == 0 {
            return Err(SyncError::InvalidConfig(
                "loop intervals must be positive".to_string(),
            ));
        }
        if self.report_interval_secs == 0 {
            return Err(SyncError::InvalidConfig(
                "report_interval_secs must be positive".to_string(),
            ));
        }
        if self.max_message_size == 0 {
            return Err(SyncError::InvalidConfig(
                "max_message_size must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
