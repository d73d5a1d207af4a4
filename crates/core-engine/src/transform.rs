//! Live transform and draft facade (spec.md §4.6): threads the engine's
//! owned store/texts/grid/render/history into [`InteractionSession`] and
//! folds each call's side effects (spatial/render refresh, a generation
//! bump, an `EntityChanged` event per touched id) the same way
//! `apply_command_buffer` does for a command buffer. Every call is also
//! mirrored into the transform log when one is attached, so a host can
//! replay a live session bit-for-bit later.

use core_events::ChangeMask;
use core_interact::{CommitResult, EdgeSide, HandleCorner, PreviewGeometry, SessionState, SnapOptions, TransformMode, ViewState};
use core_store::{EntityFlags, SelectionMode};
use core_types::{EngineError, EngineResult, EntityId, EntityKind, LayerId};

use crate::Engine;

impl Engine {
    fn view_state(&self) -> ViewState {
        ViewState { x: 0.0, y: 0.0, scale: self.view_scale, width: 0.0, height: 0.0 }
    }

    pub fn session_state(&self) -> SessionState {
        self.session.state()
    }

    pub fn begin_move(&mut self, ids: &[EntityId], pointer: (f32, f32)) -> EngineResult<()> {
        self.session.begin_move(ids, &self.store, &self.texts, &mut self.history, pointer)?;
        if let Some(log) = &mut self.transform_log {
            log.record_begin(TransformMode::Move, ids, None, pointer, 0, self.view_state(), SnapOptions::default());
        }
        Ok(())
    }

    pub fn begin_vertex_drag(&mut self, id: EntityId, vertex_index: u32, pointer: (f32, f32)) -> EngineResult<()> {
        self.session.begin_vertex_drag(id, vertex_index, &self.store, &self.texts, &mut self.history, pointer)?;
        if let Some(log) = &mut self.transform_log {
            log.record_begin(TransformMode::VertexDrag, &[id], Some(vertex_index), pointer, 0, self.view_state(), SnapOptions::default());
        }
        Ok(())
    }

    pub fn begin_resize(&mut self, id: EntityId, handle: HandleCorner, pointer: (f32, f32)) -> EngineResult<()> {
        self.session.begin_resize(id, handle, &self.store, &self.texts, &mut self.history, pointer)?;
        if let Some(log) = &mut self.transform_log {
            log.record_begin(TransformMode::Resize, &[id], Some(handle.index() as u32), pointer, 0, self.view_state(), SnapOptions::default());
        }
        Ok(())
    }

    pub fn begin_edge_drag(&mut self, id: EntityId, side: EdgeSide, pointer: (f32, f32)) -> EngineResult<()> {
        self.session.begin_edge_drag(id, side, &self.store, &self.texts, &mut self.history, pointer)?;
        if let Some(log) = &mut self.transform_log {
            log.record_begin(TransformMode::EdgeDrag, &[id], Some(side.index() as u32), pointer, 0, self.view_state(), SnapOptions::default());
        }
        Ok(())
    }

    fn active_mode(&self, caller: &'static str) -> EngineResult<TransformMode> {
        match self.session.state() {
            SessionState::TransformActive(mode) => Ok(mode),
            _ => Err(EngineError::InvalidOperation(format!("{caller} called with no active transform"))),
        }
    }

    /// Advances the active transform to `pointer` (world units, pre-snap)
    /// and refreshes the render/spatial caches for every touched id.
    /// Returns the touched ids.
    pub fn update_transform(&mut self, pointer: (f32, f32), snap: SnapOptions) -> EngineResult<Vec<EntityId>> {
        let mode = self.active_mode("update_transform")?;
        let touched = self
            .session
            .update_transform(&mut self.store, &self.texts, &mut self.grid, &mut self.render, pointer, self.view_scale, snap)?;
        if let Some(log) = &mut self.transform_log {
            log.record_update(mode, pointer, 0, self.view_state(), snap);
        }
        Ok(touched)
    }

    /// Finalizes the active transform, bumping `generation` once and
    /// emitting one coalesced `EntityChanged` event per touched id.
    pub fn commit_transform(&mut self) -> EngineResult<CommitResult> {
        let mode = self.active_mode("commit_transform")?;
        let result = self.session.commit_transform(&self.store, &self.texts, &mut self.history, self.generation)?;
        for &id in &result.ids {
            if let Some(kind) = self.store.kind_of(id) {
                self.events.record_entity_changed(id, kind, ChangeMask::GEOMETRY);
            }
        }
        if let Some(log) = &mut self.transform_log {
            log.record_commit(mode);
        }
        self.generation += 1;
        self.digest.mark_dirty();
        self.events.flush_pending_events(self.generation);
        Ok(result)
    }

    pub fn cancel_transform(&mut self) -> EngineResult<()> {
        let mode = self.active_mode("cancel_transform")?;
        self.session.cancel_transform(&mut self.store, &mut self.history)?;
        if let Some(log) = &mut self.transform_log {
            log.record_cancel(mode);
        }
        Ok(())
    }

    // ---- Draft ----

    #[allow(clippy::too_many_arguments)]
    pub fn begin_draft(&mut self, kind: EntityKind, layer_id: LayerId, flags: EntityFlags, style: core_interact::DraftStyle, start: (f32, f32)) -> EngineResult<()> {
        self.session.begin_draft(kind, layer_id, flags, style, start)
    }

    pub fn update_draft(&mut self, point: (f32, f32)) -> EngineResult<()> {
        self.session.update_draft(point)
    }

    pub fn add_draft_vertex(&mut self, point: (f32, f32)) -> EngineResult<()> {
        self.session.add_draft_vertex(point)
    }

    pub fn draft_preview(&self) -> EngineResult<PreviewGeometry> {
        self.session.draft_preview()
    }

    /// Realizes the draft under a freshly allocated id, pushes it into the
    /// draw order, seeds its spatial/render entries, and replaces the
    /// selection with the new id (spec.md §4.6 "Commit" for a draft mirrors
    /// the single-entity creation scenario in §8). Wrapped in its own
    /// history transaction — same as `apply_command_buffer` does for a
    /// command-created entity — so the new entity is undoable (spec.md §7
    /// "Transactions as scoped resources", §8 invariant 4).
    pub fn commit_draft(&mut self) -> EngineResult<EntityId> {
        let id = self.store.allocate_id();
        self.history.begin_entry(self.store.next_entity_id());
        self.history.mark_entity_change(id, &self.store, &self.texts);
        self.history.mark_draw_order_change(self.store.draw_order());
        self.history.mark_selection_change(self.store.selection().ids());

        let kind = match self.session.commit_draft(id, &mut self.store) {
            Ok(kind) => kind,
            Err(err) => {
                self.history.discard_entry();
                return Err(err);
            }
        };

        self.store.push_draw_order(id);
        self.render.refresh_entity_render_range(id, &self.store, self.view_scale);
        self.render.mark_shapes_dirty();
        let ctx = core_spatial::pick::PickContext { store: &self.store, texts: &self.texts, view_scale: self.view_scale };
        if let Some(aabb) = core_spatial::pick::aabb_of(&ctx, id) {
            self.grid.update(id, aabb);
        }
        self.grid.set_draw_order(self.store.draw_order());

        self.store.set_selection(&[id], SelectionMode::Replace);
        self.history.commit_entry(
            self.store.next_entity_id(),
            self.generation,
            &self.store,
            &self.texts,
            None,
            Some(self.store.draw_order()),
            Some(self.store.selection().ids()),
        );
        self.events.record_entity_created(id, kind);
        self.events.record_order_changed();
        self.events.record_selection_changed();
        self.generation += 1;
        self.digest.mark_dirty();
        self.events.flush_pending_events(self.generation);
        Ok(id)
    }

    pub fn cancel_draft(&mut self) -> EngineResult<()> {
        self.session.cancel_draft()
    }
}

#[cfg(test)]
mod tests {
    use crate::tests::scenario_1_buffer;
    use crate::Engine;
    use core_types::{EntityId, EntityKind, LayerId};

    #[test]
    fn move_gesture_updates_geometry_and_emits_one_changed_event() {
        let mut engine = Engine::new();
        engine.apply_command_buffer(&scenario_1_buffer()).unwrap();
        engine.poll_events();

        engine.begin_move(&[EntityId(7)], (5.0, 2.5)).unwrap();
        engine.update_transform((15.0, 12.5), Default::default()).unwrap();
        let result = engine.commit_transform().unwrap();

        assert_eq!(result.ids, vec![EntityId(7)]);
        let rect = engine.store().find_rect(EntityId(7)).unwrap();
        assert_eq!((rect.x, rect.y), (10.0, 10.0));
        assert_eq!(engine.generation(), 2);

        let events = engine.poll_events();
        assert!(events.iter().any(|e| e.event_type == core_events::EventType::EntityChanged && e.a == 7));
    }

    #[test]
    fn cancel_restores_original_geometry() {
        let mut engine = Engine::new();
        engine.apply_command_buffer(&scenario_1_buffer()).unwrap();

        engine.begin_move(&[EntityId(7)], (5.0, 2.5)).unwrap();
        engine.update_transform((15.0, 12.5), Default::default()).unwrap();
        engine.cancel_transform().unwrap();

        let rect = engine.store().find_rect(EntityId(7)).unwrap();
        assert_eq!((rect.x, rect.y), (0.0, 0.0));
    }

    #[test]
    fn draft_commit_creates_entity_pushes_draw_order_and_selects_it() {
        let mut engine = Engine::new();

        engine
            .begin_draft(EntityKind::Rect, LayerId(1), Default::default(), core_interact::DraftStyle::default(), (0.0, 0.0))
            .unwrap();
        engine.update_draft((10.0, 10.0)).unwrap();
        let id = engine.commit_draft().unwrap();

        assert!(engine.store().find_rect(id).is_some());
        assert_eq!(engine.store().draw_order(), &[id]);
        assert_eq!(engine.selection(), &[id]);
        assert_eq!(engine.pick(5.0, 5.0, 1.0), id);

        let events = engine.poll_events();
        assert!(events.iter().any(|e| e.event_type == core_events::EventType::EntityCreated));
    }

    #[test]
    fn draft_commit_is_undoable_and_redoable() {
        let mut engine = Engine::new();
        let before = engine.digest();

        engine
            .begin_draft(EntityKind::Rect, LayerId(1), Default::default(), core_interact::DraftStyle::default(), (0.0, 0.0))
            .unwrap();
        engine.update_draft((10.0, 10.0)).unwrap();
        let id = engine.commit_draft().unwrap();
        assert!(engine.store().find_rect(id).is_some());
        assert!(engine.can_undo());

        assert!(engine.undo());
        assert!(engine.store().find_rect(id).is_none());
        assert!(engine.store().draw_order().is_empty());
        assert!(engine.selection().is_empty());
        assert_eq!(engine.digest(), before);

        assert!(engine.redo());
        assert!(engine.store().find_rect(id).is_some());
        assert_eq!(engine.store().draw_order(), &[id]);
        assert_eq!(engine.selection(), &[id]);
    }

    #[test]
    fn draft_cancel_leaves_store_untouched() {
        let mut engine = Engine::new();
        engine
            .begin_draft(EntityKind::Rect, LayerId(1), Default::default(), core_interact::DraftStyle::default(), (0.0, 0.0))
            .unwrap();
        engine.update_draft((10.0, 10.0)).unwrap();
        engine.cancel_draft().unwrap();

        assert!(engine.store().rects().count() == 0);
        assert_eq!(engine.session_state(), core_interact::SessionState::Idle);
    }

    #[test]
    fn begin_while_another_transform_is_active_is_rejected() {
        let mut engine = Engine::new();
        engine.apply_command_buffer(&scenario_1_buffer()).unwrap();
        engine.begin_move(&[EntityId(7)], (5.0, 2.5)).unwrap();
        assert!(engine.begin_move(&[EntityId(7)], (5.0, 2.5)).is_err());
        engine.cancel_transform().unwrap();
    }
}
