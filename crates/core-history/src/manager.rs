//! Transaction lifecycle and undo/redo cursor (spec.md §4.7 "Transaction
//! lifecycle", "Undo/Redo").
//!
//! `HistoryManager` holds one linear `Vec<HistoryEntry>` plus a `cursor`
//! pointing just past the last applied entry — not the teacher's
//! undo_stack/redo_stack pair — because spec.md describes a single cursor
//! that `undo`/`redo` move back and forth over, and `commitEntry` truncates
//! "any redo tail" of that same vector rather than swapping between two
//! stacks.

use std::collections::HashMap;

use core_store::{EntityStore, Layer};
use core_text::TextStore;
use core_types::EntityId;

use crate::entry::{EntityChange, HistoryEntry};
use crate::snapshot::EntitySnapshot;

struct OpenTransaction {
    next_id_before: u32,
    touched: HashMap<EntityId, EntityChange>,
    touch_order: Vec<EntityId>,
    layers_before: Option<Vec<Layer>>,
    draw_order_before: Option<Vec<EntityId>>,
    selection_before: Option<Vec<EntityId>>,
}

pub struct HistoryManager {
    entries: Vec<HistoryEntry>,
    cursor: usize,
    capacity: Option<usize>,
    open_tx: Option<OpenTransaction>,
    suppressed: bool,
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::new(None)
    }
}

impl HistoryManager {
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            entries: Vec::new(),
            cursor: 0,
            capacity,
            open_tx: None,
            suppressed: false,
        }
    }

    pub fn depth(&self) -> usize {
        self.entries.len()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor < self.entries.len()
    }

    /// Whether mutation application is currently suppressed from being
    /// captured into history (spec.md §4.7 "History is *suppressed* during
    /// application to avoid recursive capture").
    pub fn is_suppressed(&self) -> bool {
        self.suppressed
    }

    pub fn has_open_entry(&self) -> bool {
        self.open_tx.is_some()
    }

    /// Opens a transaction. Debug-asserts none is already open — every
    /// mutation path must `commit_entry` or `discard_entry` before
    /// returning (spec.md §5 "Scoped acquisition").
    pub fn begin_entry(&mut self, next_id_before: u32) {
        debug_assert!(self.open_tx.is_none(), "history transaction already open");
        self.open_tx = Some(OpenTransaction {
            next_id_before,
            touched: HashMap::new(),
            touch_order: Vec::new(),
            layers_before: None,
            draw_order_before: None,
            selection_before: None,
        });
    }

    /// Captures a before-snapshot for `id` the first time it's touched in
    /// the open transaction; later calls for the same id are no-ops.
    pub fn mark_entity_change(&mut self, id: EntityId, store: &EntityStore, texts: &TextStore) {
        let Some(tx) = self.open_tx.as_mut() else {
            return;
        };
        if tx.touched.contains_key(&id) {
            return;
        }
        let before = EntitySnapshot::capture(id, store, texts);
        tx.touched.insert(
            id,
            EntityChange {
                id,
                existed_before: before.is_some(),
                existed_after: false,
                before,
                after: None,
            },
        );
        tx.touch_order.push(id);
    }

    pub fn mark_layers_change(&mut self, layers: &[Layer]) {
        if let Some(tx) = self.open_tx.as_mut() {
            if tx.layers_before.is_none() {
                tx.layers_before = Some(layers.to_vec());
            }
        }
    }

    pub fn mark_draw_order_change(&mut self, order: &[EntityId]) {
        if let Some(tx) = self.open_tx.as_mut() {
            if tx.draw_order_before.is_none() {
                tx.draw_order_before = Some(order.to_vec());
            }
        }
    }

    pub fn mark_selection_change(&mut self, selection: &[EntityId]) {
        if let Some(tx) = self.open_tx.as_mut() {
            if tx.selection_before.is_none() {
                tx.selection_before = Some(selection.to_vec());
            }
        }
    }

    /// Fills every after-snapshot, de-duplicates changes where before ==
    /// after, drops the entry entirely if nothing survives, sorts entity
    /// changes by id for determinism, truncates any redo tail, and appends
    /// (spec.md §4.7 "commitEntry").
    #[allow(clippy::too_many_arguments)]
    pub fn commit_entry(
        &mut self,
        next_id_after: u32,
        generation: u64,
        store: &EntityStore,
        texts: &TextStore,
        layers_after: Option<&[Layer]>,
        draw_order_after: Option<&[EntityId]>,
        selection_after: Option<&[EntityId]>,
    ) {
        let Some(mut tx) = self.open_tx.take() else {
            return;
        };

        let mut entities = Vec::with_capacity(tx.touch_order.len());
        for id in tx.touch_order.drain(..) {
            let Some(mut change) = tx.touched.remove(&id) else {
                continue;
            };
            let after = EntitySnapshot::capture(id, store, texts);
            change.existed_after = after.is_some();
            change.after = after;
            if change.before != change.after || change.existed_before != change.existed_after {
                entities.push(change);
            }
        }
        entities.sort_by_key(|c| c.id.0);

        let entry = HistoryEntry {
            layers_after: tx.layers_before.as_ref().and(layers_after.map(|l| l.to_vec())),
            layers_before: tx.layers_before,
            entities,
            draw_order_after: tx.draw_order_before.as_ref().and(draw_order_after.map(|o| o.to_vec())),
            draw_order_before: tx.draw_order_before,
            selection_after: tx.selection_before.as_ref().and(selection_after.map(|s| s.to_vec())),
            selection_before: tx.selection_before,
            next_id_before: tx.next_id_before,
            next_id_after,
            generation,
        };

        if entry.is_empty() {
            return;
        }

        self.entries.truncate(self.cursor);
        self.entries.push(entry);
        self.cursor = self.entries.len();
        if let Some(cap) = self.capacity {
            if self.entries.len() > cap {
                let excess = self.entries.len() - cap;
                self.entries.drain(0..excess);
                self.cursor -= excess.min(self.cursor);
            }
        }
    }

    /// Aborts the open transaction without recording anything.
    pub fn discard_entry(&mut self) {
        self.open_tx = None;
    }

    /// Re-applies the pre-state of the entry just before the cursor and
    /// moves the cursor back one step. Returns `false` if there is nothing
    /// to undo.
    pub fn undo(&mut self, store: &mut EntityStore, texts: &mut TextStore) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        let entry = self.entries[self.cursor].clone();
        self.suppressed = true;
        apply_side(&entry, Side::Before, store, texts);
        self.suppressed = false;
        true
    }

    /// Re-applies the post-state of the entry at the cursor and advances
    /// it. Returns `false` if there is nothing to redo.
    pub fn redo(&mut self, store: &mut EntityStore, texts: &mut TextStore) -> bool {
        if self.cursor >= self.entries.len() {
            return false;
        }
        let entry = self.entries[self.cursor].clone();
        self.suppressed = true;
        apply_side(&entry, Side::After, store, texts);
        self.suppressed = false;
        self.cursor += 1;
        true
    }

    pub fn entry_at(&self, index: usize) -> Option<&HistoryEntry> {
        self.entries.get(index)
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn restore(&mut self, entries: Vec<HistoryEntry>, cursor: usize) {
        self.cursor = cursor.min(entries.len());
        self.entries = entries;
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = 0;
        self.open_tx = None;
    }
}

#[derive(Clone, Copy)]
enum Side {
    Before,
    After,
}

fn apply_side(entry: &HistoryEntry, side: Side, store: &mut EntityStore, texts: &mut TextStore) {
    for change in &entry.entities {
        let (existed, snapshot) = match side {
            Side::Before => (change.existed_before, change.before.as_ref()),
            Side::After => (change.existed_after, change.after.as_ref()),
        };
        match (existed, snapshot) {
            (true, Some(snap)) => snap.restore(change.id, store, texts),
            _ => {
                let kind = store
                    .kind_of(change.id)
                    .or_else(|| texts.find(change.id).map(|_| core_types::EntityKind::Text))
                    .or_else(|| change.before.as_ref().map(|s| s.kind()))
                    .or_else(|| change.after.as_ref().map(|s| s.kind()));
                if let Some(kind) = kind {
                    crate::snapshot::remove(change.id, kind, store, texts);
                }
            }
        }
    }
    match side {
        Side::Before => {
            if let Some(order) = &entry.draw_order_before {
                store.set_draw_order(order.clone());
            }
            if let Some(layers) = &entry.layers_before {
                for layer in layers {
                    store.upsert_layer(layer.clone());
                }
            }
            if let Some(selection) = &entry.selection_before {
                store.set_selection(selection, core_store::SelectionMode::Replace);
            }
            store.restore_id_watermark(entry.next_id_before);
        }
        Side::After => {
            if let Some(order) = &entry.draw_order_after {
                store.set_draw_order(order.clone());
            }
            if let Some(layers) = &entry.layers_after {
                for layer in layers {
                    store.upsert_layer(layer.clone());
                }
            }
            if let Some(selection) = &entry.selection_after {
                store.set_selection(selection, core_store::SelectionMode::Replace);
            }
            store.restore_id_watermark(entry.next_id_after);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_store::{EntityFlags, Rect};
    use core_types::{LayerId, Rgba};

    fn rect(id: u32, x: f32) -> Rect {
        Rect {
            id: EntityId(id),
            layer_id: LayerId(1),
            flags: EntityFlags::default(),
            x,
            y: 0.0,
            w: 10.0,
            h: 5.0,
            fill: Rgba::BLACK,
            stroke: Rgba::BLACK,
            stroke_enabled: true,
            stroke_width_px: 1.0,
        }
    }

    #[test]
    fn end_to_end_scenario_3_move_undo_redo() {
        let mut store = EntityStore::new();
        let mut texts = TextStore::new();
        store.upsert_rect(EntityId(7), rect(7, 0.0));

        let mut history = HistoryManager::new(None);
        history.begin_entry(store.next_entity_id());
        history.mark_entity_change(EntityId(7), &store, &texts);
        let mut moved = rect(7, 10.0);
        moved.y = 10.0;
        store.upsert_rect(EntityId(7), moved);
        history.commit_entry(store.next_entity_id(), 1, &store, &texts, None, None, None);

        assert_eq!(history.depth(), 1);
        assert_eq!(store.find_rect(EntityId(7)).unwrap().x, 10.0);

        assert!(history.undo(&mut store, &mut texts));
        assert_eq!(store.find_rect(EntityId(7)).unwrap().x, 0.0);

        assert!(history.redo(&mut store, &mut texts));
        assert_eq!(store.find_rect(EntityId(7)).unwrap().x, 10.0);
    }

    #[test]
    fn commit_drops_empty_entries() {
        let mut store = EntityStore::new();
        let texts = TextStore::new();
        store.upsert_rect(EntityId(7), rect(7, 0.0));

        let mut history = HistoryManager::new(None);
        history.begin_entry(store.next_entity_id());
        history.mark_entity_change(EntityId(7), &store, &texts);
        // No mutation performed before commit: before == after.
        history.commit_entry(store.next_entity_id(), 1, &store, &texts, None, None, None);
        assert_eq!(history.depth(), 0);
    }

    #[test]
    fn commit_truncates_redo_tail() {
        let mut store = EntityStore::new();
        let mut texts = TextStore::new();
        store.upsert_rect(EntityId(7), rect(7, 0.0));

        let mut history = HistoryManager::new(None);
        for x in [1.0, 2.0, 3.0] {
            history.begin_entry(store.next_entity_id());
            history.mark_entity_change(EntityId(7), &store, &texts);
            store.upsert_rect(EntityId(7), rect(7, x));
            history.commit_entry(store.next_entity_id(), 1, &store, &texts, None, None, None);
        }
        assert_eq!(history.depth(), 3);
        history.undo(&mut store, &mut texts);
        history.undo(&mut store, &mut texts);
        assert_eq!(history.cursor(), 1);

        history.begin_entry(store.next_entity_id());
        history.mark_entity_change(EntityId(7), &store, &texts);
        store.upsert_rect(EntityId(7), rect(7, 9.0));
        history.commit_entry(store.next_entity_id(), 1, &store, &texts, None, None, None);

        assert_eq!(history.depth(), 2);
        assert!(!history.can_redo());
    }
}
