//! Event queue facade (spec.md §4.9): draining and resync-acknowledgment
//! pass straight through to the owned [`core_events::EventQueue`] — there
//! is nothing batched here since flushing already happened inside whatever
//! top-level call staged the events.

use core_events::EventRecord;

use crate::Engine;

impl Engine {
    pub fn poll_events(&mut self) -> Vec<EventRecord> {
        self.events.poll_events()
    }

    pub fn peek_events(&self) -> &[EventRecord] {
        self.events.peek_events()
    }

    pub fn is_resync_pending(&self) -> bool {
        self.events.is_resync_pending()
    }

    pub fn ack_resync(&mut self, generation: u64) {
        self.events.ack_resync(generation);
    }
}
