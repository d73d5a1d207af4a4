//! Coalesced change-event queue (spec.md §4.9): a bounded ring of typed
//! event records, per-id change-mask coalescing, and the overflow/resync
//! back-pressure handshake.

pub mod mask;
pub mod queue;

pub use mask::{ChangeMask, EventType};
pub use queue::{EventQueue, EventRecord, DEFAULT_CAPACITY};
