use std::time::Duration;

/// Where a sync session stands.
///
/// `current_height` is the next height to import, so a fresh session has
/// `current_height == starting_height`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncProgress {
    pub starting_height: u64,
    pub current_height: u64,
    pub target_height: u64,
    pub elapsed: Duration,
}

impl SyncProgress {
    pub fn imported(&self) -> u64 {
        self.current_height.saturating_sub(self.starting_height)
    }

    pub fn remaining(&self) -> u64 {
        self.target_height.saturating_sub(self.current_height)
    }

    /// Time left at the average import rate so far; `None` until a block has
    /// been imported.
    pub fn estimate(&self) -> Option<Duration> {
        let imported = self.imported();
        if imported == 0 {
            return None;
        }
        let secs = self
            .remaining()
            .saturating_mul(self.elapsed.as_secs())
            .checked_div(imported)?;
        Some(Duration::from_secs(secs))
    }
}
