// ============================================================================
// Interfaces Module
// Contains all trait definitions and contracts
// ============================================================================

mod event_sink;

pub use event_sink::{CountingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
