// ============================================================================
// Queue Module
// Bounded lock-free hand-off between ingress and the matching workers
// ============================================================================

mod ring;

pub use ring::RingQueue;
