//! Orchestration limits

use std::time::Duration;

/// 单个账户在扇出查询中的最长等待时间
pub const DEFAULT_FANOUT_TIMEOUT: Duration = Duration::from_secs(30);
/// 单次批量操作的最大条目数
pub const DEFAULT_BATCH_MAX_ITEMS: usize = 100;
/// 批量操作的并发上限
pub const DEFAULT_BATCH_CONCURRENCY: usize = 10;

/// Tunables for fan-out and batch execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Per-account timeout for fan-out reads.
    pub fanout_timeout: Duration,
    /// Largest accepted batch.
    pub batch_max_items: usize,
    /// Batch items in flight at once.
    pub batch_concurrency: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            fanout_timeout: DEFAULT_FANOUT_TIMEOUT,
            batch_max_items: DEFAULT_BATCH_MAX_ITEMS,
            batch_concurrency: DEFAULT_BATCH_CONCURRENCY,
        }
    }
}

impl OrchestratorConfig {
    #[must_use]
    pub fn with_fanout_timeout(mut self, timeout: Duration) -> Self {
        self.fanout_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_batch_max_items(mut self, max_items: usize) -> Self {
        self.batch_max_items = max_items;
        self
    }

    #[must_use]
    pub fn with_batch_concurrency(mut self, concurrency: usize) -> Self {
        self.batch_concurrency = concurrency;
        self
    }

    /// Replace zero values, which would stall or reject everything, with the defaults.
    #[must_use]
    pub fn validated(self) -> Self {
        let defaults = Self::default();
        Self {
            fanout_timeout: if self.fanout_timeout.is_zero() {
                defaults.fanout_timeout
            } else {
                self.fanout_timeout
            },
            batch_max_items: if self.batch_max_items == 0 {
                defaults.batch_max_items
            } else {
                self.batch_max_items
            },
            batch_concurrency: if self.batch_concurrency == 0 {
                defaults.batch_concurrency
            } else {
                self.batch_concurrency
            },
        }
    }
}
