//! Engine facade (spec.md §6): wires every subsystem crate into one
//! `Engine` type that owns a single document and exposes the external
//! interface a host program drives — command buffers in, render buffers
//! and events out.
//!
//! Invariants / Integration Points:
//! - [`Engine`] owns exactly one document. There is no process-wide state;
//!   a host that needs multiple documents constructs multiple `Engine`s
//!   (spec.md §9 "Global engine state").
//! - `generation` increments exactly once per completed top-level
//!   operation (spec.md §5), not once per entity touched. Every facade
//!   method that can mutate the document bumps it on success and leaves
//!   it untouched on an atomic (no-mutation) failure.
//! - The event queue is staged by lower layers during a call and flushed
//!   by the facade method itself, never by the crates underneath — so a
//!   caller who went around `Engine` straight to `core_commands` would see
//!   staged-but-unflushed events, by design (spec.md §5).
//! - Text shaping and glyph rasterization are host-owned collaborators:
//!   every render-buffer method takes `&mut dyn LayoutProvider` / `&mut
//!   dyn GlyphAtlas` rather than owning an implementation.

mod commands;
mod events;
mod history;
mod pick;
mod render;
mod snapshot;
mod transform;

pub use commands::apply_command_buffer;
pub use core_commands::DispatchResult;
pub use core_events::EventRecord;
pub use core_interact::{CommitResult, SnapOptions, TransformLog, ViewState, DEFAULT_ENTRY_CAPACITY, DEFAULT_ID_CAPACITY};
pub use core_render::RenderDirty;
pub use core_spatial::MarqueeMode;
pub use render::BufferMeta;

use core_events::EventQueue;
use core_history::HistoryManager;
use core_interact::InteractionSession;
use core_render::RenderModel;
use core_snapshot::DigestState;
use core_spatial::SpatialIndex;
use core_store::EntityStore;
use core_text::TextStore;
use core_types::ProtocolInfo;

/// One document and every subsystem that operates on it: entity/text
/// stores, the event queue, undo history, the spatial index, the render
/// model, the interaction session, and an optional transform log.
pub struct Engine {
    store: EntityStore,
    texts: TextStore,
    events: EventQueue,
    history: HistoryManager,
    grid: SpatialIndex,
    render: RenderModel,
    session: InteractionSession,
    transform_log: Option<TransformLog>,
    digest: DigestState,
    view_scale: f32,
    generation: u64,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        Self::with_capacities(None, core_events::DEFAULT_CAPACITY)
    }

    pub fn with_capacities(history_capacity: Option<usize>, event_capacity: usize) -> Self {
        Self {
            store: EntityStore::new(),
            texts: TextStore::new(),
            events: EventQueue::new(event_capacity),
            history: HistoryManager::new(history_capacity),
            grid: SpatialIndex::new(),
            render: RenderModel::new(),
            session: InteractionSession::new(),
            transform_log: None,
            digest: DigestState::new(),
            view_scale: 1.0,
            generation: 0,
        }
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    pub fn texts(&self) -> &TextStore {
        &self.texts
    }

    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    pub fn grid(&self) -> &SpatialIndex {
        &self.grid
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn view_scale(&self) -> f32 {
        self.view_scale
    }

    pub fn set_view_scale(&mut self, scale: f32) {
        self.view_scale = scale;
        self.render.mark_shapes_dirty();
    }

    /// The document digest (spec.md §4.11), recomputed lazily since the
    /// last mutation.
    pub fn digest(&mut self) -> (u32, u32) {
        self.digest.digest(&self.store, &self.texts)
    }

    /// Enables transform-log recording (spec.md §4.6 "Transform log"); a
    /// previously recorded log, if any, is discarded.
    pub fn enable_transform_log(&mut self, max_entries: usize, max_ids: usize) {
        self.transform_log = Some(TransformLog::new(max_entries, max_ids));
    }

    pub fn disable_transform_log(&mut self) {
        self.transform_log = None;
    }

    pub fn transform_log(&self) -> Option<&TransformLog> {
        self.transform_log.as_ref()
    }

    /// Replays a previously recorded transform log against this engine's
    /// current document, driving a fresh session through the exact
    /// recorded `begin/update/commit/cancel` sequence.
    pub fn replay_transform_log(&mut self, log: &TransformLog) -> core_types::EngineResult<()> {
        core_interact::replay_transform_log(log, &mut self.store, &self.texts, &mut self.history, &mut self.render, &mut self.grid)?;
        self.generation += 1;
        self.digest.mark_dirty();
        Ok(())
    }

    /// The engine handshake (spec.md §6 "Engine handshake"): a host calls
    /// this once to confirm it is linked against a compatible engine
    /// build before trusting any command buffer it sends.
    pub fn protocol_info(&self) -> ProtocolInfo {
        ProtocolInfo::current()
    }

    /// Resets every owned subsystem to an empty document. Does not touch
    /// `generation`'s monotonicity with prior state — it still bumps once,
    /// same as any other completed top-level operation.
    pub fn clear(&mut self) {
        self.store.clear();
        self.texts.clear();
        self.events.clear();
        self.history.clear();
        self.grid.clear();
        self.render.clear();
        self.session = InteractionSession::new();
        self.transform_log = None;
        self.digest.mark_dirty();
        self.view_scale = 1.0;
        self.generation += 1;
        tracing::trace!(target: "engine.facade", generation = self.generation, "engine cleared");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::ByteWriter;
    use core_types::protocol::{COMMAND_BUFFER_MAGIC, COMMAND_BUFFER_VERSION};

    pub(crate) fn scenario_1_buffer() -> Vec<u8> {
        let mut payload = ByteWriter::new();
        payload.write_f32(0.0);
        payload.write_f32(0.0);
        payload.write_f32(10.0);
        payload.write_f32(5.0);
        for v in [1.0, 0.0, 0.0, 1.0] {
            payload.write_f32(v);
        }
        for v in [0.0, 0.0, 0.0, 1.0] {
            payload.write_f32(v);
        }
        payload.write_f32(1.0);
        payload.write_f32(1.0);
        let payload_bytes = payload.into_vec();

        let mut w = ByteWriter::new();
        w.write_u32(COMMAND_BUFFER_MAGIC);
        w.write_u32(COMMAND_BUFFER_VERSION);
        w.write_u32(1);
        w.write_u32(core_commands::Opcode::UpsertRect as u32);
        w.write_u32(7);
        w.write_u32(payload_bytes.len() as u32);
        w.write_u32(0);
        w.write_bytes(&payload_bytes);
        w.into_vec()
    }

    #[test]
    fn clear_resets_generation_and_document() {
        let mut engine = Engine::new();
        engine.apply_command_buffer(&scenario_1_buffer()).unwrap();
        assert_eq!(engine.store().rects().count(), 1);

        engine.clear();
        assert_eq!(engine.store().rects().count(), 0);
        assert_eq!(engine.generation(), 2);
    }

    #[test]
    fn protocol_info_reports_current_versions() {
        let engine = Engine::new();
        let info = engine.protocol_info();
        assert_eq!(info.protocol_version, 3);
        assert_eq!(info.command_version, 2);
        assert_eq!(info.snapshot_version, 1);
    }
}
