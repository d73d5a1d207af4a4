//! Spatial query and selection/draw-order facade (spec.md §4.5 "Point
//! pick", "Marquee"; §4.10 "Selection & draw order"): point pick and
//! marquee queries against the owned grid, plus the selection and
//! draw-order mutations a host drives directly off their results.

use core_spatial::pick::{pick as pick_point, query_area as query_area_impl, query_marquee as query_marquee_impl, PickContext};
use core_spatial::MarqueeMode;
use core_store::{ReorderAction, SelectionMode};
use core_types::{Aabb, EntityId};

use crate::Engine;

impl Engine {
    fn pick_context(&self) -> PickContext<'_> {
        PickContext {
            store: &self.store,
            texts: &self.texts,
            view_scale: self.view_scale,
        }
    }

    /// Point pick (spec.md §4.5 "Point pick"): `EntityId::NONE` if nothing
    /// within `tolerance` qualifies.
    pub fn pick(&self, x: f32, y: f32, tolerance: f32) -> EntityId {
        pick_point(&self.pick_context(), &self.grid, x, y, tolerance)
    }

    /// Every id whose AABB intersects `rect` (spec.md §4.5 "queryArea").
    pub fn query_area(&self, rect: Aabb) -> Vec<EntityId> {
        query_area_impl(&self.pick_context(), &self.grid, rect)
    }

    /// Marquee query under `mode` (spec.md §4.5 "queryMarquee"), returned
    /// de-duplicated in draw order.
    pub fn query_marquee(&self, rect: Aabb, mode: MarqueeMode) -> Vec<EntityId> {
        query_marquee_impl(&self.pick_context(), &self.grid, rect, mode, self.store.draw_order())
    }

    pub fn selection(&self) -> &[EntityId] {
        self.store.selection().ids()
    }

    /// Picks at `(x, y)` and folds the result into the selection under
    /// `mode` (spec.md §4.10 "selectByPick"). A miss applies an empty id
    /// set, so `Replace` on a miss clears the selection (click-on-empty
    /// deselects).
    pub fn select_by_pick(&mut self, x: f32, y: f32, tolerance: f32, mode: SelectionMode) -> EntityId {
        let hit = self.pick(x, y, tolerance);
        let ids: &[EntityId] = if hit == EntityId::NONE { &[] } else { std::slice::from_ref(&hit) };
        self.store.set_selection(ids, mode);
        self.finish_selection_mutation();
        hit
    }

    /// Marquee-selects under `marquee_mode` and folds the hits into the
    /// selection under `selection_mode`.
    pub fn marquee_select(&mut self, rect: Aabb, marquee_mode: MarqueeMode, selection_mode: SelectionMode) -> Vec<EntityId> {
        let hits = self.query_marquee(rect, marquee_mode);
        self.store.set_selection(&hits, selection_mode);
        self.finish_selection_mutation();
        hits
    }

    pub fn clear_selection(&mut self) {
        if self.store.selection().is_empty() {
            return;
        }
        self.store.selection_mut().clear();
        self.finish_selection_mutation();
    }

    /// Drops selected ids that no longer exist (spec.md §4.10 "prune").
    pub fn prune_selection(&mut self) {
        let before = self.store.selection().ids().len();
        let surviving: Vec<EntityId> = self
            .store
            .selection()
            .ids()
            .iter()
            .copied()
            .filter(|&id| self.store.kind_of(id).is_some() || self.texts.find(id).is_some())
            .collect();
        if surviving.len() != before {
            self.store.set_selection(&surviving, SelectionMode::Replace);
            self.finish_selection_mutation();
        }
    }

    fn finish_selection_mutation(&mut self) {
        self.events.record_selection_changed();
        self.generation += 1;
        self.events.flush_pending_events(self.generation);
    }

    /// Reorders `targets` within the draw-order vector (spec.md §4.10
    /// "Reorder") and refreshes the spatial index's z-order cache and the
    /// render model's dirty flag to match.
    pub fn reorder(&mut self, targets: &[EntityId], action: ReorderAction, ref_id: Option<EntityId>) {
        self.store.reorder(targets, action, ref_id);
        self.grid.set_draw_order(self.store.draw_order());
        self.render.mark_shapes_dirty();
        self.events.record_order_changed();
        self.generation += 1;
        self.digest.mark_dirty();
        self.events.flush_pending_events(self.generation);
    }
}

#[cfg(test)]
mod tests {
    use crate::tests::scenario_1_buffer;
    use crate::Engine;
    use core_spatial::MarqueeMode;
    use core_store::SelectionMode;
    use core_types::{Aabb, EntityId};

    #[test]
    fn scenario_2_pick_hit_and_miss() {
        let mut engine = Engine::new();
        engine.apply_command_buffer(&scenario_1_buffer()).unwrap();

        assert_eq!(engine.pick(5.0, 2.5, 1.0), EntityId(7));
        assert_eq!(engine.pick(20.0, 20.0, 1.0), EntityId::NONE);
    }

    #[test]
    fn select_by_pick_hit_replaces_selection() {
        let mut engine = Engine::new();
        engine.apply_command_buffer(&scenario_1_buffer()).unwrap();

        let hit = engine.select_by_pick(5.0, 2.5, 1.0, SelectionMode::Replace);
        assert_eq!(hit, EntityId(7));
        assert_eq!(engine.selection(), &[EntityId(7)]);
    }

    #[test]
    fn select_by_pick_miss_with_replace_clears_selection() {
        let mut engine = Engine::new();
        engine.apply_command_buffer(&scenario_1_buffer()).unwrap();
        engine.select_by_pick(5.0, 2.5, 1.0, SelectionMode::Replace);

        engine.select_by_pick(20.0, 20.0, 1.0, SelectionMode::Replace);
        assert!(engine.selection().is_empty());
    }

    #[test]
    fn marquee_window_excludes_partial_overlap() {
        let mut engine = Engine::new();
        engine.apply_command_buffer(&scenario_1_buffer()).unwrap();

        let partial = Aabb { min_x: 5.0, min_y: 0.0, max_x: 20.0, max_y: 20.0 };
        assert!(engine.query_marquee(partial, MarqueeMode::Window).is_empty());
        assert_eq!(engine.query_marquee(partial, MarqueeMode::Crossing), vec![EntityId(7)]);
    }

    #[test]
    fn reorder_updates_draw_order_and_z_index() {
        let mut engine = Engine::new();
        engine.apply_command_buffer(&scenario_1_buffer()).unwrap();
        let mut second = core_types::ByteWriter::new();
        second.write_u32(core_types::protocol::COMMAND_BUFFER_MAGIC);
        second.write_u32(core_types::protocol::COMMAND_BUFFER_VERSION);
        second.write_u32(1);
        second.write_u32(core_commands::Opcode::UpsertRect as u32);
        second.write_u32(8);
        let mut payload = core_types::ByteWriter::new();
        for v in [20.0, 0.0, 10.0, 5.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0] {
            payload.write_f32(v);
        }
        let bytes = payload.into_vec();
        second.write_u32(bytes.len() as u32);
        second.write_u32(0);
        second.write_bytes(&bytes);
        engine.apply_command_buffer(&second.into_vec()).unwrap();

        assert_eq!(engine.store().draw_order(), &[EntityId(7), EntityId(8)]);
        engine.reorder(&[EntityId(7)], core_store::ReorderAction::BringToFront, None);
        assert_eq!(engine.store().draw_order(), &[EntityId(8), EntityId(7)]);
    }
}
