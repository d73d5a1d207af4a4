//! Command buffer dispatcher (spec.md §4.2, §5): applies a fully-decoded
//! EWDC buffer to the document, in order, as one history transaction.
//!
//! Mirrors the teacher's `core-actions::dispatcher` shape — a small
//! `DispatchResult` with named constructors, one function per opcode
//! family — generalized from "apply one editor `Action`" to "apply one
//! decoded wire command against the engine's subsystems".

use core_events::{ChangeMask, EventQueue};
use core_history::HistoryManager;
use core_render::RenderModel;
use core_spatial::pick::{aabb_of, PickContext};
use core_spatial::SpatialIndex;
use core_store::{EntityFlags, EntityStore};
use core_text::TextStore;
use core_types::{EngineError, EngineResult, EntityId, EntityKind, LayerId};

use crate::payload::Payload;
use crate::wire::{decode_buffer, DecodedCommand};

/// Result of applying one command buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchResult {
    pub dirty: bool,
    pub commands_applied: usize,
}

impl DispatchResult {
    pub fn dirty(commands_applied: usize) -> Self {
        Self {
            dirty: true,
            commands_applied,
        }
    }

    pub fn clean() -> Self {
        Self {
            dirty: false,
            commands_applied: 0,
        }
    }
}

/// Every mutable subsystem a command buffer may touch, bundled so
/// `apply_command_buffer` doesn't take eight separate `&mut` parameters.
/// `core-engine` owns the real instances; this crate only borrows them for
/// the duration of one dispatch call.
pub struct DispatchContext<'a> {
    pub store: &'a mut EntityStore,
    pub texts: &'a mut TextStore,
    pub events: &'a mut EventQueue,
    pub history: &'a mut HistoryManager,
    pub grid: &'a mut SpatialIndex,
    pub render: &'a mut RenderModel,
    pub view_scale: &'a mut f32,
}

/// Parses and applies `bytes` as one EWDC command buffer.
///
/// Decoding is atomic: a malformed buffer (bad magic/version, truncation,
/// unknown opcode, wrong payload size) is rejected in full before any
/// command is dispatched (spec.md §7). Once decoding succeeds, commands
/// apply strictly in order inside one history transaction; a logical error
/// from an individual command (`InvalidOperation`) halts the remainder of
/// the buffer but does not roll back commands already applied, per the
/// canonical policy spec.md §7 describes for per-command errors.
pub fn apply_command_buffer(bytes: &[u8], ctx: &mut DispatchContext) -> EngineResult<DispatchResult> {
    let commands = decode_buffer(bytes)?;
    if commands.is_empty() {
        return Ok(DispatchResult::clean());
    }

    ctx.history.begin_entry(ctx.store.next_entity_id());
    let outcome = apply_all(&commands, ctx);
    let next_id_after = ctx.store.next_entity_id();
    // `commit_entry` reads whatever draw order/layers/selection exist now;
    // command buffers never touch layers so only draw order is passed.
    ctx.history.commit_entry(
        next_id_after,
        0,
        ctx.store,
        ctx.texts,
        None,
        Some(ctx.store.draw_order()),
        None,
    );

    outcome.map(|applied| DispatchResult::dirty(applied))
}

fn apply_all(commands: &[DecodedCommand], ctx: &mut DispatchContext) -> EngineResult<usize> {
    let mut applied = 0;
    for command in commands {
        apply_one(command, ctx)?;
        applied += 1;
    }
    Ok(applied)
}

fn refresh_spatial_and_render(id: EntityId, ctx: &mut DispatchContext) {
    ctx.render.mark_shapes_dirty();
    let pick_ctx = PickContext {
        store: &*ctx.store,
        texts: &*ctx.texts,
        view_scale: *ctx.view_scale,
    };
    match aabb_of(&pick_ctx, id) {
        Some(aabb) => ctx.grid.update(id, aabb),
        None => ctx.grid.remove(id),
    }
}

fn mark_entity(id: EntityId, ctx: &mut DispatchContext) {
    ctx.history.mark_entity_change(id, ctx.store, ctx.texts);
}

fn apply_one(command: &DecodedCommand, ctx: &mut DispatchContext) -> EngineResult<()> {
    let id = EntityId(command.id);
    match &command.payload {
        Payload::ClearAll => {
            for existing in ctx.store.draw_order().to_vec() {
                mark_entity(existing, ctx);
            }
            ctx.history.mark_draw_order_change(ctx.store.draw_order());
            ctx.store.clear();
            ctx.texts.clear();
            ctx.grid.clear();
            ctx.render.clear();
            ctx.events.record_order_changed();
        }
        Payload::UpsertRect(p) => {
            mark_entity(id, ctx);
            let created = ctx.store.kind_of(id).is_none();
            ctx.store.upsert_rect(
                id,
                core_store::Rect {
                    id,
                    layer_id: LayerId::NONE,
                    flags: EntityFlags::default(),
                    x: p.x,
                    y: p.y,
                    w: p.w,
                    h: p.h,
                    fill: p.fill,
                    stroke: p.stroke,
                    stroke_enabled: p.stroke_enabled,
                    stroke_width_px: p.stroke_width_px,
                },
            );
            record_upsert(id, EntityKind::Rect, created, ctx);
        }
        Payload::UpsertLine(p) => {
            mark_entity(id, ctx);
            let created = ctx.store.kind_of(id).is_none();
            ctx.store.upsert_line(
                id,
                core_store::Line {
                    id,
                    layer_id: LayerId::NONE,
                    flags: EntityFlags::default(),
                    x0: p.x0,
                    y0: p.y0,
                    x1: p.x1,
                    y1: p.y1,
                    rgba: p.rgba,
                    enabled: p.enabled,
                    stroke_width_px: p.stroke_width_px,
                },
            );
            record_upsert(id, EntityKind::Line, created, ctx);
        }
        Payload::UpsertPolyline(p) => {
            mark_entity(id, ctx);
            let created = ctx.store.kind_of(id).is_none();
            ctx.store
                .upsert_polyline(id, LayerId::NONE, EntityFlags::default(), &p.points, p.rgba, p.enabled, p.stroke_width_px);
            record_upsert(id, EntityKind::Polyline, created, ctx);
        }
        Payload::UpsertCircle(p) => {
            mark_entity(id, ctx);
            let created = ctx.store.kind_of(id).is_none();
            ctx.store.upsert_circle(
                id,
                core_store::Circle {
                    id,
                    layer_id: LayerId::NONE,
                    flags: EntityFlags::default(),
                    cx: p.cx,
                    cy: p.cy,
                    rx: p.rx,
                    ry: p.ry,
                    rot: p.rot,
                    sx: p.sx,
                    sy: p.sy,
                    fill: p.fill,
                    stroke: p.stroke,
                    stroke_flags: p.stroke_flags,
                },
            );
            record_upsert(id, EntityKind::Circle, created, ctx);
        }
        Payload::UpsertPolygon(p) => {
            mark_entity(id, ctx);
            let created = ctx.store.kind_of(id).is_none();
            ctx.store.upsert_polygon(
                id,
                core_store::Polygon {
                    id,
                    layer_id: LayerId::NONE,
                    flags: EntityFlags::default(),
                    cx: p.cx,
                    cy: p.cy,
                    rx: p.rx,
                    ry: p.ry,
                    rot: p.rot,
                    sx: p.sx,
                    sy: p.sy,
                    fill: p.fill,
                    stroke: p.stroke,
                    stroke_flags: p.stroke_flags,
                    sides: p.sides,
                },
            );
            record_upsert(id, EntityKind::Polygon, created, ctx);
        }
        Payload::UpsertArrow(p) => {
            mark_entity(id, ctx);
            let created = ctx.store.kind_of(id).is_none();
            ctx.store.upsert_arrow(
                id,
                core_store::Arrow {
                    id,
                    layer_id: LayerId::NONE,
                    flags: EntityFlags::default(),
                    ax: p.ax,
                    ay: p.ay,
                    bx: p.bx,
                    by: p.by,
                    head: p.head,
                    rgba: p.rgba,
                    stroke_width_px: p.stroke_width_px,
                },
            );
            record_upsert(id, EntityKind::Arrow, created, ctx);
        }
        Payload::DeleteEntity => {
            if ctx.store.kind_of(id).is_some() {
                mark_entity(id, ctx);
                let kind = ctx.store.kind_of(id).expect("checked above");
                ctx.store.delete_entity(id);
                ctx.render.remove_entity(id);
                ctx.grid.remove(id);
                ctx.events.record_entity_deleted(id, kind);
            }
        }
        Payload::SetDrawOrder(ids) => {
            ctx.history.mark_draw_order_change(ctx.store.draw_order());
            let order: Vec<EntityId> = ids.iter().copied().map(EntityId).collect();
            ctx.store.set_draw_order(order.clone());
            ctx.grid.set_draw_order(&order);
            ctx.render.mark_shapes_dirty();
            ctx.events.record_order_changed();
        }
        Payload::SetViewScale(scale) => {
            *ctx.view_scale = *scale;
            ctx.render.mark_shapes_dirty();
        }
        Payload::UpsertText(p) => {
            mark_entity(id, ctx);
            let created = ctx.texts.find(id).is_none();
            ctx.texts.upsert_text(id, LayerId::NONE, EntityFlags::default(), p.x, p.y, p.rotation, p.box_mode, p.align, p.constraint_width);
            if created {
                ctx.store.push_draw_order(id);
            }
            record_upsert(id, EntityKind::Text, created, ctx);
        }
        Payload::DeleteText => {
            if ctx.texts.find(id).is_some() {
                mark_entity(id, ctx);
                ctx.texts.delete(id);
                ctx.store.remove_from_draw_order(id);
                ctx.render.remove_entity(id);
                ctx.grid.remove(id);
                ctx.events.record_entity_deleted(id, EntityKind::Text);
            }
        }
        Payload::SetTextCaret(caret) => {
            require_text(ctx, id)?;
            ctx.texts.set_caret(id, *caret);
        }
        Payload::SetTextSelection { anchor, caret } => {
            require_text(ctx, id)?;
            ctx.texts.set_selection(id, *anchor, *caret);
        }
        Payload::InsertTextContent { at, text } => {
            require_text(ctx, id)?;
            mark_entity(id, ctx);
            if !ctx.texts.insert_content(id, *at, text) {
                return Err(EngineError::InvalidOperation(format!(
                    "InsertTextContent: offset {at} is out of range or not a char boundary for text {}",
                    id.0
                )));
            }
            ctx.events.record_entity_changed(id, EntityKind::Text, ChangeMask::TEXT | ChangeMask::BOUNDS);
            refresh_spatial_and_render(id, ctx);
        }
        Payload::DeleteTextContent { lo, hi } => {
            require_text(ctx, id)?;
            mark_entity(id, ctx);
            if !ctx.texts.delete_content(id, *lo, *hi) {
                return Err(EngineError::InvalidOperation(format!(
                    "DeleteTextContent: range [{lo},{hi}) is invalid for text {}",
                    id.0
                )));
            }
            ctx.events.record_entity_changed(id, EntityKind::Text, ChangeMask::TEXT | ChangeMask::BOUNDS);
            refresh_spatial_and_render(id, ctx);
        }
        Payload::ApplyTextStyle(p) => {
            require_text(ctx, id)?;
            mark_entity(id, ctx);
            if !ctx
                .texts
                .apply_text_style(id, p.lo, p.hi, p.mode, p.flags_mask, p.font_id, p.font_size)
            {
                return Err(EngineError::InvalidOperation(format!("ApplyTextStyle: text {} does not exist", id.0)));
            }
            ctx.events.record_entity_changed(id, EntityKind::Text, ChangeMask::STYLE);
        }
        Payload::SetTextAlign(align) => {
            require_text(ctx, id)?;
            mark_entity(id, ctx);
            ctx.texts.set_text_align(id, *align);
            ctx.events.record_entity_changed(id, EntityKind::Text, ChangeMask::BOUNDS);
            refresh_spatial_and_render(id, ctx);
        }
    }
    Ok(())
}

fn require_text(ctx: &DispatchContext, id: EntityId) -> EngineResult<()> {
    if ctx.texts.find(id).is_none() {
        return Err(EngineError::InvalidOperation(format!("text entity {} does not exist", id.0)));
    }
    Ok(())
}

fn record_upsert(id: EntityId, kind: EntityKind, created: bool, ctx: &mut DispatchContext) {
    if created {
        ctx.events.record_entity_created(id, kind);
    }
    ctx.events.record_entity_changed(id, kind, ChangeMask::GEOMETRY | ChangeMask::STYLE);
    refresh_spatial_and_render(id, ctx);
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::ByteWriter;
    use core_types::protocol::{COMMAND_BUFFER_MAGIC, COMMAND_BUFFER_VERSION};

    fn scenario_1_buffer() -> Vec<u8> {
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
        w.write_u32(crate::opcode::Opcode::UpsertRect as u32);
        w.write_u32(7);
        w.write_u32(payload_bytes.len() as u32);
        w.write_u32(0);
        w.write_bytes(&payload_bytes);
        w.into_vec()
    }

    #[test]
    fn scenario_1_end_to_end() {
        let mut store = EntityStore::new();
        let mut texts = TextStore::new();
        let mut events = EventQueue::new(core_events::DEFAULT_CAPACITY);
        let mut history = HistoryManager::new(None);
        let mut grid = SpatialIndex::new();
        let mut render = RenderModel::new();
        let mut view_scale = 1.0f32;

        let mut ctx = DispatchContext {
            store: &mut store,
            texts: &mut texts,
            events: &mut events,
            history: &mut history,
            grid: &mut grid,
            render: &mut render,
            view_scale: &mut view_scale,
        };
        let result = apply_command_buffer(&scenario_1_buffer(), &mut ctx).unwrap();
        assert!(result.dirty);

        assert_eq!(store.rects().count(), 1);
        assert_eq!(store.kind_of(EntityId(7)), Some(EntityKind::Rect));
        assert_eq!(store.draw_order(), &[EntityId(7)]);

        render.ensure_built(&store, &mut texts, 1.0, &mut NoopLayout, &mut NoopAtlas);
        assert_eq!(render.shapes().triangle_buffer().len(), 42);
        assert_eq!(render.shapes().line_buffer().len(), 56);
        assert_eq!(render.generation(), 1);

        events.flush_pending_events(1);
        let polled = events.poll_events();
        assert!(polled.iter().any(|e| e.event_type == core_events::EventType::EntityCreated && e.a == 7));
        assert!(polled.iter().any(|e| e.event_type == core_events::EventType::EntityChanged && e.a == 7));
    }

    #[test]
    fn delete_of_missing_id_is_a_no_op() {
        let mut store = EntityStore::new();
        let mut texts = TextStore::new();
        let mut events = EventQueue::new(core_events::DEFAULT_CAPACITY);
        let mut history = HistoryManager::new(None);
        let mut grid = SpatialIndex::new();
        let mut render = RenderModel::new();
        let mut view_scale = 1.0f32;
        let mut ctx = DispatchContext {
            store: &mut store,
            texts: &mut texts,
            events: &mut events,
            history: &mut history,
            grid: &mut grid,
            render: &mut render,
            view_scale: &mut view_scale,
        };

        let mut w = ByteWriter::new();
        w.write_u32(COMMAND_BUFFER_MAGIC);
        w.write_u32(COMMAND_BUFFER_VERSION);
        w.write_u32(1);
        w.write_u32(crate::opcode::Opcode::DeleteEntity as u32);
        w.write_u32(999);
        w.write_u32(0);
        w.write_u32(0);

        let result = apply_command_buffer(&w.into_vec(), &mut ctx).unwrap();
        assert!(!store.delete_entity(EntityId(999)));
        assert_eq!(result.commands_applied, 1);
    }

    #[test]
    fn malformed_buffer_touches_nothing() {
        let mut store = EntityStore::new();
        let mut texts = TextStore::new();
        let mut events = EventQueue::new(core_events::DEFAULT_CAPACITY);
        let mut history = HistoryManager::new(None);
        let mut grid = SpatialIndex::new();
        let mut render = RenderModel::new();
        let mut view_scale = 1.0f32;
        let mut ctx = DispatchContext {
            store: &mut store,
            texts: &mut texts,
            events: &mut events,
            history: &mut history,
            grid: &mut grid,
            render: &mut render,
            view_scale: &mut view_scale,
        };

        let mut bytes = scenario_1_buffer();
        bytes[4..8].copy_from_slice(&99u32.to_le_bytes());
        assert!(apply_command_buffer(&bytes, &mut ctx).is_err());
        assert_eq!(store.rects().count(), 0);
    }

    struct NoopLayout;
    impl core_text::LayoutProvider for NoopLayout {
        fn layout_text(&mut self, _id: EntityId) -> Option<core_text::TextLayout> {
            None
        }
        fn ensure_layout(&mut self, _id: EntityId) -> Option<core_text::TextLayout> {
            None
        }
        fn layout_dirty_texts(&mut self, _dirty: &[EntityId]) -> Vec<EntityId> {
            Vec::new()
        }
    }

    struct NoopAtlas;
    impl core_text::GlyphAtlas for NoopAtlas {
        fn get_glyph(&mut self, _font_id: u32, _glyph_id: u32, _style_flags: core_text::TextStyleFlags) -> Option<core_text::AtlasEntry> {
            None
        }
        fn white_pixel(&self) -> core_text::AtlasEntry {
            core_text::AtlasEntry {
                u0: 0.0,
                v0: 0.0,
                u1: 0.0,
                v1: 0.0,
                bearing_x: 0.0,
                bearing_y: 0.0,
                width: 0.0,
                height: 0.0,
            }
        }
        fn reset_version(&self) -> u64 {
            0
        }
    }
}
