// ============================================================================
// Engine Configuration
// ============================================================================

use crate::error::{EngineError, EngineResult};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Configuration for the matching engine.
///
/// # Example
/// ```ignore
/// let config = EngineConfig::default()
///     .with_matching_threads(2)
///     .with_queue_capacity(1 << 12);
/// config.validate()?;
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EngineConfig {
    /// Number of matching workers. Order queues are sharded by symbol hash
    /// across exactly this many workers.
    pub matching_threads: usize,

    /// Number of market-data fan-out workers.
    pub market_data_threads: usize,

    /// Capacity of each hand-off ring queue. Must be a power of two.
    pub queue_capacity: usize,

    /// Run the per-second throughput sampler thread.
    pub enable_metrics: bool,

    /// Levels per side included in published snapshots.
    pub snapshot_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            matching_threads: 4,
            market_data_threads: 2,
            queue_capacity: 65_536,
            enable_metrics: true,
            snapshot_depth: 10,
        }
    }
}

impl EngineConfig {
    /// Builder method: set the number of matching workers.
    pub fn with_matching_threads(mut self, threads: usize) -> Self {
        self.matching_threads = threads;
        self
    }

    /// Builder method: set the number of market-data workers.
    pub fn with_market_data_threads(mut self, threads: usize) -> Self {
        self.market_data_threads = threads;
        self
    }

    /// Builder method: set the ring-queue capacity (power of two).
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Builder method: enable or disable the metrics sampler thread.
    pub fn with_metrics(mut self, enabled: bool) -> Self {
        self.enable_metrics = enabled;
        self
    }

    /// Builder method: set the published snapshot depth.
    pub fn with_snapshot_depth(mut self, depth: usize) -> Self {
        self.snapshot_depth = depth;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> EngineResult<()> {
        if self.matching_threads == 0 {
            return Err(EngineError::InvalidConfig(
                "matching_threads must be at least 1".into(),
            ));
        }
        if self.market_data_threads == 0 {
            return Err(EngineError::InvalidConfig(
                "market_data_threads must be at least 1".into(),
            ));
        }
        if !self.queue_capacity.is_power_of_two() {
            return Err(EngineError::InvalidConfig(
                "queue_capacity must be a power of two".into(),
            ));
        }
        if self.snapshot_depth == 0 {
            return Err(EngineError::InvalidConfig(
                "snapshot_depth must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
