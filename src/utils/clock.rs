// ============================================================================
// Monotonic Clock
// ============================================================================

use once_cell::sync::Lazy;
use std::time::Instant;

static EPOCH: Lazy<Instant> = Lazy::new(Instant::now);

/// Nanoseconds elapsed since the process-wide clock epoch.
///
/// The epoch is captured on first use, so absolute values are only meaningful
/// within one process. The value never goes backwards, which is what order
/// time priority requires; wall-clock time is stamped separately on trades.
#[inline]
pub fn monotonic_ns() -> u64 {
    EPOCH.elapsed().as_nanos() as u64
}
