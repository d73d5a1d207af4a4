//! Undo/redo (spec.md §4.7, §8 invariants 4-5): `HistoryManager::undo`/
//! `redo` only touch the entity/text stores, so this module's job is the
//! bookkeeping the lower layer can't do itself — refreshing the spatial
//! index and render ranges for every entity an entry touched, and bumping
//! `generation`.

use core_spatial::pick::{aabb_of, PickContext};
use core_types::EntityId;

use crate::Engine;

impl Engine {
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Returns `false` (a no-op, per spec.md §8 "undo/redo no-op when the
    /// stack end is reached") if there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        let Some(entry) = self.history.entry_at(self.history.cursor().wrapping_sub(1)).cloned() else {
            return false;
        };
        if !self.history.undo(&mut self.store, &mut self.texts) {
            return false;
        }
        self.refresh_touched(entry.entities.iter().map(|e| e.id));
        if entry.draw_order_before.is_some() || entry.draw_order_after.is_some() {
            self.render.mark_shapes_dirty();
        }
        self.generation += 1;
        self.digest.mark_dirty();
        self.events.record_history_changed();
        self.events.flush_pending_events(self.generation);
        true
    }

    /// Returns `false` if there is nothing to redo.
    pub fn redo(&mut self) -> bool {
        let Some(entry) = self.history.entry_at(self.history.cursor()).cloned() else {
            return false;
        };
        if !self.history.redo(&mut self.store, &mut self.texts) {
            return false;
        }
        self.refresh_touched(entry.entities.iter().map(|e| e.id));
        if entry.draw_order_before.is_some() || entry.draw_order_after.is_some() {
            self.render.mark_shapes_dirty();
        }
        self.generation += 1;
        self.digest.mark_dirty();
        self.events.record_history_changed();
        self.events.flush_pending_events(self.generation);
        true
    }

    fn refresh_touched(&mut self, ids: impl Iterator<Item = EntityId>) {
        for id in ids {
            self.render.refresh_entity_render_range(id, &self.store, self.view_scale);
            self.render.mark_shapes_dirty();
            let ctx = PickContext { store: &self.store, texts: &self.texts, view_scale: self.view_scale };
            match aabb_of(&ctx, id) {
                Some(aabb) => self.grid.update(id, aabb),
                None => self.grid.remove(id),
            }
        }
    }
}
