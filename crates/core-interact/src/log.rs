//! Transform log and replay (spec.md §6 "Transform log buffer"). Every
//! `begin*`/`update*`/`commit*`/`cancel*` call the caller drives through an
//! [`InteractionSession`] can be mirrored into a [`TransformLog`] entry;
//! replaying the log against a fresh session and document reproduces the
//! same sequence of mutations bit-for-bit, since every field snap depends
//! on (the pointer, the view, the snap options) is itself part of the
//! recorded entry.
//!
//! Capacity is bounded on both the entry vector and the shared id array
//! (`begin` entries reference a range of ids, not an inline list). Once
//! either overflows, the log is tainted for good: further `record_*` calls
//! are no-ops, and [`replay_transform_log`] refuses to run.

use core_history::HistoryManager;
use core_render::RenderModel;
use core_spatial::SpatialIndex;
use core_store::EntityStore;
use core_text::TextStore;
use core_types::{EngineError, EngineResult, EntityId};

use crate::session::InteractionSession;
use crate::snap::SnapOptions;
use crate::transform::{EdgeSide, HandleCorner, TransformMode};

pub const DEFAULT_ENTRY_CAPACITY: usize = 4096;
pub const DEFAULT_ID_CAPACITY: usize = 16384;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum TransformLogEntryType {
    Begin = 0,
    Update = 1,
    Commit = 2,
    Cancel = 3,
}

/// The viewport state in effect when an entry was recorded, carried so a
/// replay reproduces the same screen-space snap tolerance even if the live
/// viewport has since moved on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewState {
    pub x: f32,
    pub y: f32,
    pub scale: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformLogEntry {
    pub entry_type: TransformLogEntryType,
    pub mode: TransformMode,
    pub id_offset: u32,
    pub id_count: u32,
    pub specific_id: EntityId,
    pub vertex_index: u32,
    pub x: f32,
    pub y: f32,
    pub modifiers: u32,
    pub view_x: f32,
    pub view_y: f32,
    pub view_scale: f32,
    pub view_width: f32,
    pub view_height: f32,
    pub snap_enabled: bool,
    pub snap_grid_enabled: bool,
    pub snap_grid_size: f32,
    pub snap_tolerance_px: f32,
    pub snap_endpoint_enabled: bool,
    pub snap_midpoint_enabled: bool,
    pub snap_center_enabled: bool,
    pub snap_nearest_enabled: bool,
}

fn snap_fields(e: &TransformLogEntry) -> SnapOptions {
    SnapOptions {
        enabled: e.snap_enabled,
        grid_enabled: e.snap_grid_enabled,
        grid_size: e.snap_grid_size,
        tolerance_px: e.snap_tolerance_px,
        endpoint_enabled: e.snap_endpoint_enabled,
        midpoint_enabled: e.snap_midpoint_enabled,
        center_enabled: e.snap_center_enabled,
        nearest_enabled: e.snap_nearest_enabled,
    }
}

#[derive(Debug, Clone, Default)]
pub struct TransformLog {
    entries: Vec<TransformLogEntry>,
    ids: Vec<EntityId>,
    max_entries: usize,
    max_ids: usize,
    tainted: bool,
}

impl TransformLog {
    pub fn new(max_entries: usize, max_ids: usize) -> Self {
        Self { entries: Vec::new(), ids: Vec::new(), max_entries, max_ids, tainted: false }
    }

    pub fn is_tainted(&self) -> bool {
        self.tainted
    }

    pub fn entries(&self) -> &[TransformLogEntry] {
        &self.entries
    }

    pub fn ids(&self) -> &[EntityId] {
        &self.ids
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.ids.clear();
        self.tainted = false;
    }

    fn push_ids(&mut self, ids: &[EntityId]) -> (u32, u32) {
        if self.tainted {
            return (0, 0);
        }
        if self.ids.len() + ids.len() > self.max_ids {
            self.tainted = true;
            return (0, 0);
        }
        let offset = self.ids.len() as u32;
        self.ids.extend_from_slice(ids);
        (offset, ids.len() as u32)
    }

    fn push(&mut self, entry: TransformLogEntry) {
        if self.tainted {
            return;
        }
        if self.entries.len() >= self.max_entries {
            self.tainted = true;
            return;
        }
        self.entries.push(entry);
    }

    #[allow(clippy::too_many_arguments)]
    pub fn record_begin(
        &mut self,
        mode: TransformMode,
        ids: &[EntityId],
        vertex_index: Option<u32>,
        pointer: (f32, f32),
        modifiers: u32,
        view: ViewState,
        snap: SnapOptions,
    ) {
        let (id_offset, id_count) = self.push_ids(ids);
        let specific_id = if ids.len() == 1 { ids[0] } else { EntityId::NONE };
        self.push(TransformLogEntry {
            entry_type: TransformLogEntryType::Begin,
            mode,
            id_offset,
            id_count,
            specific_id,
            vertex_index: vertex_index.unwrap_or(0),
            x: pointer.0,
            y: pointer.1,
            modifiers,
            view_x: view.x,
            view_y: view.y,
            view_scale: view.scale,
            view_width: view.width,
            view_height: view.height,
            snap_enabled: snap.enabled,
            snap_grid_enabled: snap.grid_enabled,
            snap_grid_size: snap.grid_size,
            snap_tolerance_px: snap.tolerance_px,
            snap_endpoint_enabled: snap.endpoint_enabled,
            snap_midpoint_enabled: snap.midpoint_enabled,
            snap_center_enabled: snap.center_enabled,
            snap_nearest_enabled: snap.nearest_enabled,
        });
    }

    pub fn record_update(&mut self, mode: TransformMode, pointer: (f32, f32), modifiers: u32, view: ViewState, snap: SnapOptions) {
        self.push(TransformLogEntry {
            entry_type: TransformLogEntryType::Update,
            mode,
            id_offset: 0,
            id_count: 0,
            specific_id: EntityId::NONE,
            vertex_index: 0,
            x: pointer.0,
            y: pointer.1,
            modifiers,
            view_x: view.x,
            view_y: view.y,
            view_scale: view.scale,
            view_width: view.width,
            view_height: view.height,
            snap_enabled: snap.enabled,
            snap_grid_enabled: snap.grid_enabled,
            snap_grid_size: snap.grid_size,
            snap_tolerance_px: snap.tolerance_px,
            snap_endpoint_enabled: snap.endpoint_enabled,
            snap_midpoint_enabled: snap.midpoint_enabled,
            snap_center_enabled: snap.center_enabled,
            snap_nearest_enabled: snap.nearest_enabled,
        });
    }

    fn record_close(&mut self, entry_type: TransformLogEntryType, mode: TransformMode) {
        self.push(TransformLogEntry {
            entry_type,
            mode,
            id_offset: 0,
            id_count: 0,
            specific_id: EntityId::NONE,
            vertex_index: 0,
            x: 0.0,
            y: 0.0,
            modifiers: 0,
            view_x: 0.0,
            view_y: 0.0,
            view_scale: 1.0,
            view_width: 0.0,
            view_height: 0.0,
            snap_enabled: false,
            snap_grid_enabled: false,
            snap_grid_size: 0.0,
            snap_tolerance_px: 0.0,
            snap_endpoint_enabled: false,
            snap_midpoint_enabled: false,
            snap_center_enabled: false,
            snap_nearest_enabled: false,
        });
    }

    pub fn record_commit(&mut self, mode: TransformMode) {
        self.record_close(TransformLogEntryType::Commit, mode);
    }

    pub fn record_cancel(&mut self, mode: TransformMode) {
        self.record_close(TransformLogEntryType::Cancel, mode);
    }
}

/// Replays `log` from scratch against `store`/`texts`/`history`/`render`/
/// `grid`, driving a fresh [`InteractionSession`] through the exact
/// `begin*`/`update*`/`commit*`/`cancel*` sequence it recorded. Refuses to
/// run at all if the log was tainted by a capacity overflow while it was
/// being recorded.
pub fn replay_transform_log(
    log: &TransformLog,
    store: &mut EntityStore,
    texts: &TextStore,
    history: &mut HistoryManager,
    render: &mut RenderModel,
    grid: &mut SpatialIndex,
) -> EngineResult<()> {
    if log.is_tainted() {
        return Err(EngineError::InvalidOperation("transform log is tainted by a capacity overflow, refusing to replay".into()));
    }
    let mut session = InteractionSession::new();
    let mut generation: u64 = 0;
    for entry in &log.entries {
        match entry.entry_type {
            TransformLogEntryType::Begin => {
                let ids = &log.ids[entry.id_offset as usize..(entry.id_offset + entry.id_count) as usize];
                let pointer = (entry.x, entry.y);
                match entry.mode {
                    TransformMode::Move => session.begin_move(ids, store, texts, history, pointer)?,
                    TransformMode::VertexDrag => session.begin_vertex_drag(entry.specific_id, entry.vertex_index, store, texts, history, pointer)?,
                    TransformMode::Resize => {
                        let handle = HandleCorner::from_index(entry.vertex_index as u8)
                            .ok_or_else(|| EngineError::InvalidOperation("transform log entry has an invalid resize handle".into()))?;
                        session.begin_resize(entry.specific_id, handle, store, texts, history, pointer)?
                    }
                    TransformMode::EdgeDrag => {
                        let side = EdgeSide::from_index(entry.vertex_index as u8)
                            .ok_or_else(|| EngineError::InvalidOperation("transform log entry has an invalid edge side".into()))?;
                        session.begin_edge_drag(entry.specific_id, side, store, texts, history, pointer)?
                    }
                }
            }
            TransformLogEntryType::Update => {
                let snap = snap_fields(entry);
                session.update_transform(store, texts, grid, render, (entry.x, entry.y), entry.view_scale, snap)?;
            }
            TransformLogEntryType::Commit => {
                generation += 1;
                session.commit_transform(store, texts, history, generation)?;
            }
            TransformLogEntryType::Cancel => {
                session.cancel_transform(store, history)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_store::{EntityFlags, Rect};
    use core_text::TextStore;
    use core_types::{EntityId as Id, LayerId, Rgba};

    fn view() -> ViewState {
        ViewState { x: 0.0, y: 0.0, scale: 1.0, width: 800.0, height: 600.0 }
    }

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
    fn replay_reproduces_a_move_gesture() {
        let mut store = EntityStore::new();
        store.upsert_rect(Id(1), rect(1));
        let texts = TextStore::new();
        let mut history = HistoryManager::new(None);
        let mut render = RenderModel::new();
        let mut grid = SpatialIndex::new();

        let mut log = TransformLog::new(DEFAULT_ENTRY_CAPACITY, DEFAULT_ID_CAPACITY);
        log.record_begin(TransformMode::Move, &[Id(1)], None, (0.0, 0.0), 0, view(), SnapOptions::default());
        log.record_update(TransformMode::Move, (5.0, 5.0), 0, view(), SnapOptions::default());
        log.record_commit(TransformMode::Move);
        assert!(!log.is_tainted());

        replay_transform_log(&log, &mut store, &texts, &mut history, &mut render, &mut grid).unwrap();
        assert_eq!(store.find_rect(Id(1)).unwrap().x, 5.0);
        assert_eq!(history.depth(), 1);
    }

    #[test]
    fn overflowing_entry_capacity_taints_the_log() {
        let mut log = TransformLog::new(1, DEFAULT_ID_CAPACITY);
        log.record_begin(TransformMode::Move, &[Id(1)], None, (0.0, 0.0), 0, view(), SnapOptions::default());
        assert!(!log.is_tainted());
        log.record_commit(TransformMode::Move);
        assert!(log.is_tainted());
    }

    #[test]
    fn tainted_log_refuses_replay() {
        let mut store = EntityStore::new();
        let texts = TextStore::new();
        let mut history = HistoryManager::new(None);
        let mut render = RenderModel::new();
        let mut grid = SpatialIndex::new();

        let mut log = TransformLog::new(0, DEFAULT_ID_CAPACITY);
        log.record_begin(TransformMode::Move, &[Id(1)], None, (0.0, 0.0), 0, view(), SnapOptions::default());
        assert!(log.is_tainted());
        assert!(replay_transform_log(&log, &mut store, &texts, &mut history, &mut render, &mut grid).is_err());
    }
}
