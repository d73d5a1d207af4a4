//! Bounded event ring with per-entity coalescing and overflow/resync
//! handshake (spec.md §4.9).
//!
//! The queue has two stages, mirroring spec.md's own split between
//! "mutations complete" and "host polls": mutation paths call the
//! `record_*` methods to stage a change, and `flush_pending_events` folds
//! the staged changes into the ring buffer once per completed top-level
//! operation (spec.md §5 "the event queue is flushed after the buffer
//! completes, not after each command"). `poll_events` drains the ring for
//! the host.

use std::collections::HashMap;

use core_types::{EntityId, EntityKind};

use crate::mask::{ChangeMask, EventType};

pub const DEFAULT_CAPACITY: usize = 2048;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EventRecord {
    pub event_type: EventType,
    pub flags: u32,
    pub a: u32,
    pub b: u32,
    pub c: u32,
    pub d: u32,
}

#[derive(Debug, Clone, Default)]
struct PendingEntity {
    kind: EntityKind,
    mask: ChangeMask,
    created: bool,
    deleted: bool,
}

#[derive(Debug, Clone)]
pub struct EventQueue {
    capacity: usize,
    ring: Vec<EventRecord>,
    // Preserves first-touch order for coalesced per-entity records.
    entity_order: Vec<EntityId>,
    entity_pending: HashMap<EntityId, PendingEntity>,
    layer_changed: bool,
    selection_changed: bool,
    order_changed: bool,
    history_changed: bool,
    doc_changed: bool,
    overflow_generation: Option<u64>,
    resync_pending: bool,
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl EventQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            ring: Vec::new(),
            entity_order: Vec::new(),
            entity_pending: HashMap::new(),
            layer_changed: false,
            selection_changed: false,
            order_changed: false,
            history_changed: false,
            doc_changed: false,
            overflow_generation: None,
            resync_pending: false,
        }
    }

    // --- staging (called by mutation paths) -------------------------

    pub fn record_entity_created(&mut self, id: EntityId, kind: EntityKind) {
        let entry = self.touch(id, kind);
        entry.created = true;
        self.doc_changed = true;
    }

    pub fn record_entity_deleted(&mut self, id: EntityId, kind: EntityKind) {
        let entry = self.touch(id, kind);
        entry.deleted = true;
        self.doc_changed = true;
    }

    pub fn record_entity_changed(&mut self, id: EntityId, kind: EntityKind, mask: ChangeMask) {
        let entry = self.touch(id, kind);
        entry.mask |= mask;
        self.doc_changed = true;
    }

    pub fn record_layer_changed(&mut self) {
        self.layer_changed = true;
        self.doc_changed = true;
    }

    pub fn record_selection_changed(&mut self) {
        self.selection_changed = true;
    }

    pub fn record_order_changed(&mut self) {
        self.order_changed = true;
        self.doc_changed = true;
    }

    pub fn record_history_changed(&mut self) {
        self.history_changed = true;
    }

    fn touch(&mut self, id: EntityId, kind: EntityKind) -> &mut PendingEntity {
        if !self.entity_pending.contains_key(&id) {
            self.entity_order.push(id);
        }
        self.entity_pending.entry(id).or_insert_with(|| PendingEntity {
            kind,
            ..Default::default()
        })
    }

    // --- flush --------------------------------------------------------

    /// Folds every staged change into the ring, in the order each id/latch
    /// was first touched since the previous flush, then clears staging.
    /// `generation` is the host-visible generation this flush corresponds
    /// to, stamped onto `Overflow` if the ring would exceed capacity.
    pub fn flush_pending_events(&mut self, generation: u64) {
        if self.resync_pending {
            // Host hasn't acked the last overflow; drop everything staged
            // rather than surfacing more events out of a known-incomplete
            // stream.
            self.clear_staging();
            return;
        }

        let mut produced = Vec::new();
        for id in self.entity_order.drain(..) {
            let Some(pending) = self.entity_pending.remove(&id) else {
                continue;
            };
            if pending.created {
                produced.push(EventRecord {
                    event_type: EventType::EntityCreated,
                    flags: 0,
                    a: id.0,
                    b: pending.kind.tag() as u32,
                    c: 0,
                    d: 0,
                });
            }
            if pending.deleted {
                produced.push(EventRecord {
                    event_type: EventType::EntityDeleted,
                    flags: 0,
                    a: id.0,
                    b: pending.kind.tag() as u32,
                    c: 0,
                    d: 0,
                });
            } else if !pending.mask.is_empty() {
                produced.push(EventRecord {
                    event_type: EventType::EntityChanged,
                    flags: pending.mask.bits(),
                    a: id.0,
                    b: pending.kind.tag() as u32,
                    c: 0,
                    d: 0,
                });
            }
        }
        if self.layer_changed {
            produced.push(latch(EventType::LayerChanged));
        }
        if self.selection_changed {
            produced.push(latch(EventType::SelectionChanged));
        }
        if self.order_changed {
            produced.push(latch(EventType::OrderChanged));
        }
        if self.history_changed {
            produced.push(latch(EventType::HistoryChanged));
        }
        if self.doc_changed {
            produced.push(latch(EventType::DocChanged));
        }
        self.clear_staging();

        if self.ring.len() + produced.len() > self.capacity {
            self.ring.clear();
            self.overflow_generation = Some(generation);
            self.resync_pending = true;
            self.ring.push(EventRecord {
                event_type: EventType::Overflow,
                flags: 0,
                a: generation as u32,
                b: (generation >> 32) as u32,
                c: 0,
                d: 0,
            });
            tracing::warn!(target: "engine.events", generation, "event queue overflow, resync required");
            return;
        }
        self.ring.extend(produced);
    }

    fn clear_staging(&mut self) {
        self.entity_order.clear();
        self.entity_pending.clear();
        self.layer_changed = false;
        self.selection_changed = false;
        self.order_changed = false;
        self.history_changed = false;
        self.doc_changed = false;
    }

    // --- draining -------------------------------------------------------

    /// Drains and returns every buffered event, in emission order.
    pub fn poll_events(&mut self) -> Vec<EventRecord> {
        std::mem::take(&mut self.ring)
    }

    pub fn peek_events(&self) -> &[EventRecord] {
        &self.ring
    }

    /// Acks the overflow at `generation`, allowing future flushes to
    /// surface events again. A mismatched generation is ignored — the host
    /// must ack the exact generation it observed in the `Overflow` record.
    pub fn ack_resync(&mut self, generation: u64) {
        if self.overflow_generation == Some(generation) {
            self.resync_pending = false;
            self.overflow_generation = None;
        }
    }

    pub fn is_resync_pending(&self) -> bool {
        self.resync_pending
    }

    pub fn clear(&mut self) {
        self.ring.clear();
        self.clear_staging();
        self.overflow_generation = None;
        self.resync_pending = false;
    }
}

fn latch(event_type: EventType) -> EventRecord {
    EventRecord {
        event_type,
        flags: 0,
        a: 0,
        b: 0,
        c: 0,
        d: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_entity_changes_coalesce_into_one_record() {
        let mut q = EventQueue::new(16);
        q.record_entity_changed(EntityId(1), EntityKind::Rect, ChangeMask::GEOMETRY);
        q.record_entity_changed(EntityId(1), EntityKind::Rect, ChangeMask::STYLE);
        q.flush_pending_events(1);
        let events = q.poll_events();
        let entity_changed: Vec<_> = events
            .iter()
            .filter(|e| e.event_type == EventType::EntityChanged)
            .collect();
        assert_eq!(entity_changed.len(), 1);
        assert_eq!(
            entity_changed[0].flags,
            (ChangeMask::GEOMETRY | ChangeMask::STYLE).bits()
        );
    }

    #[test]
    fn creation_scenario_emits_created_and_changed() {
        let mut q = EventQueue::new(16);
        q.record_entity_created(EntityId(7), EntityKind::Rect);
        q.record_entity_changed(
            EntityId(7),
            EntityKind::Rect,
            ChangeMask::GEOMETRY | ChangeMask::STYLE,
        );
        q.flush_pending_events(1);
        let events = q.poll_events();
        assert!(events
            .iter()
            .any(|e| e.event_type == EventType::EntityCreated && e.a == 7));
        assert!(events
            .iter()
            .any(|e| e.event_type == EventType::EntityChanged && e.a == 7));
    }

    #[test]
    fn latches_fire_at_most_once_per_flush() {
        let mut q = EventQueue::new(16);
        q.record_selection_changed();
        q.record_selection_changed();
        q.record_order_changed();
        q.flush_pending_events(1);
        let events = q.poll_events();
        assert_eq!(
            events.iter().filter(|e| e.event_type == EventType::SelectionChanged).count(),
            1
        );
        assert_eq!(
            events.iter().filter(|e| e.event_type == EventType::OrderChanged).count(),
            1
        );
    }

    #[test]
    fn overflow_drops_buffer_and_requires_ack_before_resuming() {
        let mut q = EventQueue::new(2);
        q.record_entity_created(EntityId(1), EntityKind::Rect);
        q.record_entity_created(EntityId(2), EntityKind::Rect);
        q.record_entity_created(EntityId(3), EntityKind::Rect);
        q.flush_pending_events(5);
        let events = q.poll_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, EventType::Overflow);
        assert!(q.is_resync_pending());

        // Further flushes produce nothing until acked.
        q.record_entity_created(EntityId(4), EntityKind::Rect);
        q.flush_pending_events(6);
        assert!(q.poll_events().is_empty());

        q.ack_resync(5);
        assert!(!q.is_resync_pending());
        q.record_entity_created(EntityId(5), EntityKind::Rect);
        q.flush_pending_events(7);
        assert!(!q.poll_events().is_empty());
    }
}
