//! Interaction session state machine (spec.md §4.6): `Idle`,
//! `TransformActive{mode}`, `DraftActive{kind}`, with `begin*` -> `update*`
//! -> `commit*`/`cancel*` transitions. Only one of a transform or a draft is
//! ever active, modeled here as a single `active` field rather than two
//! independent flags so the FSM's mutual exclusion is structural, not a
//! runtime invariant someone has to remember to check.

use core_history::HistoryManager;
use core_render::RenderModel;
use core_spatial::pick::{aabb_of, PickContext};
use core_spatial::SpatialIndex;
use core_store::{EntityFlags, EntityStore};
use core_text::TextStore;
use core_types::{EngineError, EngineResult, EntityId, LayerId};

use crate::commit::{build_commit_result, CommitResult};
use crate::draft::{DraftState, DraftStyle, PreviewGeometry};
use crate::snap::{snap_point, SnapOptions};
use crate::snapshot::TransformSnapshot;
use crate::transform::{opposite_corner, opposite_edge, ActiveTransform, EdgeContext, EdgeSide, HandleCorner, ResizeContext, TransformMode, VertexContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    TransformActive(TransformMode),
    DraftActive(core_types::EntityKind),
}

#[derive(Debug, Default)]
enum Active {
    #[default]
    Idle,
    Transform(ActiveTransform),
    Draft(DraftState),
}

/// Owns at most one in-progress transform or draft gesture. Stateless
/// between gestures: `Idle` carries no scratch data at all.
#[derive(Debug, Default)]
pub struct InteractionSession {
    active: Active,
}

fn capture_snapshots(ids: &[EntityId], store: &EntityStore) -> Vec<TransformSnapshot> {
    let mut seen = Vec::new();
    let mut out = Vec::new();
    for &id in ids {
        if seen.contains(&id) {
            continue;
        }
        seen.push(id);
        if let Some(snap) = TransformSnapshot::capture(id, store) {
            out.push(snap);
        }
    }
    out
}

impl InteractionSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SessionState {
        match &self.active {
            Active::Idle => SessionState::Idle,
            Active::Transform(t) => SessionState::TransformActive(t.mode),
            Active::Draft(d) => SessionState::DraftActive(d.kind()),
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.active, Active::Idle)
    }

    fn ensure_idle(&self) -> EngineResult<()> {
        match &self.active {
            Active::Idle => Ok(()),
            _ => Err(EngineError::InvalidOperation("a transform or draft session is already active".into())),
        }
    }

    fn begin_transform(
        &mut self,
        mode: TransformMode,
        snapshots: Vec<TransformSnapshot>,
        resize: Option<ResizeContext>,
        edge: Option<EdgeContext>,
        vertex: Option<VertexContext>,
        store: &EntityStore,
        texts: &TextStore,
        history: &mut HistoryManager,
        pointer: (f32, f32),
    ) -> EngineResult<()> {
        if snapshots.is_empty() {
            return Err(EngineError::InvalidOperation("no transformable entity to begin a transform on".into()));
        }
        history.begin_entry(store.next_entity_id());
        for snap in &snapshots {
            history.mark_entity_change(snap.id, store, texts);
        }
        self.active = Active::Transform(ActiveTransform { mode, start_pointer: pointer, snapshots, resize, edge, vertex });
        Ok(())
    }

    /// Begins a `Move` gesture over every id in `ids` that is both present
    /// and a geometric (non-text) kind; ids that are absent or unknown are
    /// silently skipped rather than failing the whole gesture.
    pub fn begin_move(&mut self, ids: &[EntityId], store: &EntityStore, texts: &TextStore, history: &mut HistoryManager, pointer: (f32, f32)) -> EngineResult<()> {
        self.ensure_idle()?;
        let snapshots = capture_snapshots(ids, store);
        self.begin_transform(TransformMode::Move, snapshots, None, None, None, store, texts, history, pointer)
    }

    pub fn begin_vertex_drag(
        &mut self,
        id: EntityId,
        vertex_index: u32,
        store: &EntityStore,
        texts: &TextStore,
        history: &mut HistoryManager,
        pointer: (f32, f32),
    ) -> EngineResult<()> {
        self.ensure_idle()?;
        let snap = TransformSnapshot::capture(id, store).ok_or_else(|| EngineError::InvalidOperation("entity is absent or not a vertex-draggable kind".into()))?;
        self.begin_transform(TransformMode::VertexDrag, vec![snap], None, None, Some(VertexContext { vertex_index }), store, texts, history, pointer)
    }

    pub fn begin_resize(&mut self, id: EntityId, handle: HandleCorner, store: &EntityStore, texts: &TextStore, history: &mut HistoryManager, pointer: (f32, f32)) -> EngineResult<()> {
        self.ensure_idle()?;
        let snap = TransformSnapshot::capture(id, store).ok_or_else(|| EngineError::InvalidOperation("entity is absent or not a resizable kind".into()))?;
        let anchor = opposite_corner(&snap.geometry, handle).ok_or_else(|| EngineError::InvalidOperation("entity kind has no resize rule".into()))?;
        self.begin_transform(TransformMode::Resize, vec![snap], Some(ResizeContext { handle, anchor }), None, None, store, texts, history, pointer)
    }

    pub fn begin_edge_drag(&mut self, id: EntityId, side: EdgeSide, store: &EntityStore, texts: &TextStore, history: &mut HistoryManager, pointer: (f32, f32)) -> EngineResult<()> {
        self.ensure_idle()?;
        let snap = TransformSnapshot::capture(id, store).ok_or_else(|| EngineError::InvalidOperation("entity is absent or not a rect".into()))?;
        let anchor = opposite_edge(&snap.geometry, side).ok_or_else(|| EngineError::InvalidOperation("edge drag is only defined for a rect".into()))?;
        self.begin_transform(TransformMode::EdgeDrag, vec![snap], None, Some(EdgeContext { side, anchor }), None, store, texts, history, pointer)
    }

    /// Resolves the snapped pointer position, applies the active transform's
    /// per-mode update rule, and refreshes the render/spatial caches for
    /// every touched id. Returns the ids actually touched.
    #[allow(clippy::too_many_arguments)]
    pub fn update_transform(
        &mut self,
        store: &mut EntityStore,
        texts: &TextStore,
        grid: &mut SpatialIndex,
        render: &mut RenderModel,
        pointer_raw: (f32, f32),
        view_scale: f32,
        snap_options: SnapOptions,
    ) -> EngineResult<Vec<EntityId>> {
        let (mode, start_pointer, exclude) = match &self.active {
            Active::Transform(a) => (a.mode, a.start_pointer, a.snapshots.iter().map(|s| s.id).collect::<Vec<_>>()),
            _ => return Err(EngineError::InvalidOperation("update_transform called with no active transform".into())),
        };

        let pointer = {
            let ctx = PickContext { store: &*store, texts, view_scale };
            snap_point(&ctx, grid, pointer_raw, snap_options, view_scale, &exclude)
        };

        let touched = {
            let Active::Transform(active) = &self.active else {
                unreachable!("checked above")
            };
            match mode {
                TransformMode::Move => active.apply_move(store, pointer.0 - start_pointer.0, pointer.1 - start_pointer.1),
                TransformMode::VertexDrag => active.apply_vertex_drag(store, pointer.0 - start_pointer.0, pointer.1 - start_pointer.1).into_iter().collect(),
                TransformMode::Resize => active.apply_resize(store, pointer).into_iter().collect(),
                TransformMode::EdgeDrag => active.apply_edge_drag(store, pointer).into_iter().collect(),
            }
        };

        for &id in &touched {
            render.refresh_entity_render_range(id, store, view_scale);
            let ctx = PickContext { store: &*store, texts, view_scale };
            if let Some(aabb) = aabb_of(&ctx, id) {
                grid.update(id, aabb);
            }
        }
        Ok(touched)
    }

    /// Finalizes the active transform, folding the touched entities' final
    /// state into one history entry, and returns the commit payload for the
    /// caller to fan out to events/the transform log.
    pub fn commit_transform(&mut self, store: &EntityStore, texts: &TextStore, history: &mut HistoryManager, generation: u64) -> EngineResult<CommitResult> {
        match &self.active {
            Active::Transform(_) => {}
            _ => return Err(EngineError::InvalidOperation("commit_transform called with no active transform".into())),
        }
        let Active::Transform(active) = std::mem::replace(&mut self.active, Active::Idle) else {
            unreachable!("checked above")
        };
        let result = build_commit_result(&active, store);
        history.commit_entry(store.next_entity_id(), generation, store, texts, None, None, None);
        Ok(result)
    }

    /// Restores every touched entity to its pre-gesture snapshot and
    /// discards the in-progress history entry.
    pub fn cancel_transform(&mut self, store: &mut EntityStore, history: &mut HistoryManager) -> EngineResult<()> {
        match &self.active {
            Active::Transform(_) => {}
            _ => return Err(EngineError::InvalidOperation("cancel_transform called with no active transform".into())),
        }
        let Active::Transform(active) = std::mem::replace(&mut self.active, Active::Idle) else {
            unreachable!("checked above")
        };
        for snap in &active.snapshots {
            snap.restore(store);
        }
        history.discard_entry();
        Ok(())
    }

    // ---- Draft ----

    pub fn begin_draft(&mut self, kind: core_types::EntityKind, layer_id: LayerId, flags: EntityFlags, style: DraftStyle, start: (f32, f32)) -> EngineResult<()> {
        self.ensure_idle()?;
        let draft = DraftState::new(kind, layer_id, flags, style, start)?;
        self.active = Active::Draft(draft);
        Ok(())
    }

    pub fn update_draft(&mut self, point: (f32, f32)) -> EngineResult<()> {
        match &mut self.active {
            Active::Draft(d) => {
                d.update(point);
                Ok(())
            }
            _ => Err(EngineError::InvalidOperation("update_draft called with no active draft".into())),
        }
    }

    pub fn add_draft_vertex(&mut self, point: (f32, f32)) -> EngineResult<()> {
        match &mut self.active {
            Active::Draft(d) => d.add_vertex(point),
            _ => Err(EngineError::InvalidOperation("add_draft_vertex called with no active draft".into())),
        }
    }

    pub fn draft_preview(&self) -> EngineResult<PreviewGeometry> {
        match &self.active {
            Active::Draft(d) => Ok(d.preview()),
            _ => Err(EngineError::InvalidOperation("draft_preview called with no active draft".into())),
        }
    }

    /// Realizes the draft into `store` under `id` and returns to `Idle`
    /// regardless of success — a failed commit (e.g. a too-short polyline)
    /// simply produces nothing, it does not leave the draft resumable.
    pub fn commit_draft(&mut self, id: EntityId, store: &mut EntityStore) -> EngineResult<core_types::EntityKind> {
        match &self.active {
            Active::Draft(_) => {}
            _ => return Err(EngineError::InvalidOperation("commit_draft called with no active draft".into())),
        }
        let Active::Draft(draft) = std::mem::replace(&mut self.active, Active::Idle) else {
            unreachable!("checked above")
        };
        draft.commit(id, store)
    }

    pub fn cancel_draft(&mut self) -> EngineResult<()> {
        match &self.active {
            Active::Draft(_) => {}
            _ => return Err(EngineError::InvalidOperation("cancel_draft called with no active draft".into())),
        }
        self.active = Active::Idle;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_history::HistoryManager;
    use core_render::RenderModel;
    use core_spatial::SpatialIndex;
    use core_store::Rect;
    use core_text::TextStore;
    use core_types::{EntityId as Id, Rgba};

    fn rect(id: u32) -> Rect {
        Rect {
            id: Id(id),
            layer_id: LayerId(1),
            flags: EntityFlags::default(),
            x: 0.0,
            y: 0.0,
            w: 10.0,
            h: 10.0,
            fill: Rgba::BLACK,
            stroke: Rgba::BLACK,
            stroke_enabled: true,
            stroke_width_px: 1.0,
        }
    }

    #[test]
    fn move_gesture_commits_into_one_history_entry() {
        let mut store = EntityStore::new();
        store.upsert_rect(Id(1), rect(1));
        let texts = TextStore::new();
        let mut history = HistoryManager::new(None);
        let mut grid = SpatialIndex::new();
        let mut render = RenderModel::new();

        let mut session = InteractionSession::new();
        session.begin_move(&[Id(1)], &store, &texts, &mut history, (0.0, 0.0)).unwrap();
        assert_eq!(session.state(), SessionState::TransformActive(TransformMode::Move));

        session
            .update_transform(&mut store, &texts, &mut grid, &mut render, (5.0, 5.0), 1.0, SnapOptions::default())
            .unwrap();
        assert_eq!(store.find_rect(Id(1)).unwrap().x, 5.0);

        let result = session.commit_transform(&store, &texts, &mut history, 1).unwrap();
        assert_eq!(result.ids, vec![Id(1)]);
        assert!(session.is_idle());
        assert_eq!(history.depth(), 1);
        assert!(history.can_undo());
    }

    #[test]
    fn cancel_restores_original_geometry_and_drops_history_entry() {
        let mut store = EntityStore::new();
        store.upsert_rect(Id(1), rect(1));
        let texts = TextStore::new();
        let mut history = HistoryManager::new(None);

        let mut session = InteractionSession::new();
        session.begin_move(&[Id(1)], &store, &texts, &mut history, (0.0, 0.0)).unwrap();
        {
            let Active::Transform(active) = &session.active else { panic!() };
            active.apply_move(&mut store, 5.0, 5.0);
        }
        session.cancel_transform(&mut store, &mut history).unwrap();

        assert_eq!(store.find_rect(Id(1)).unwrap().x, 0.0);
        assert_eq!(history.depth(), 0);
        assert!(session.is_idle());
    }

    #[test]
    fn begin_while_active_is_rejected() {
        let mut store = EntityStore::new();
        store.upsert_rect(Id(1), rect(1));
        let texts = TextStore::new();
        let mut history = HistoryManager::new(None);

        let mut session = InteractionSession::new();
        session.begin_move(&[Id(1)], &store, &texts, &mut history, (0.0, 0.0)).unwrap();
        assert!(session.begin_move(&[Id(1)], &store, &texts, &mut history, (0.0, 0.0)).is_err());
    }

    #[test]
    fn draft_round_trip_creates_entity() {
        let mut store = EntityStore::new();
        let mut session = InteractionSession::new();
        session
            .begin_draft(core_types::EntityKind::Rect, LayerId(1), EntityFlags::default(), DraftStyle::default(), (0.0, 0.0))
            .unwrap();
        session.update_draft((10.0, 10.0)).unwrap();
        let kind = session.commit_draft(Id(1), &mut store).unwrap();
        assert_eq!(kind, core_types::EntityKind::Rect);
        assert!(store.find_rect(Id(1)).is_some());
        assert!(session.is_idle());
    }
}
