//! Render buffer builder (spec.md §4.4): two GPU-ready vertex buffers
//! (triangles for fills, lines for strokes/outlines), per-entity
//! `RenderRange` bookkeeping, and the incremental-refresh/full-rebuild
//! dirty protocol.
//!
//! Invariants / Integration Points:
//! - `ensure_built` is the only path that clears `dirty`; every mutation
//!   elsewhere in the engine must call [`RenderBuffers::mark_dirty`].
//! - `refresh_entity_render_range` patches a single entity's slice in
//!   place only when the new vertex count matches the old range's width
//!   in both buffers; any mismatch sets `pending_full_rebuild` and the
//!   next `ensure_built` call does a full rebuild (SPEC_FULL.md, open
//!   question 2).
//! - Text entities never contribute to these buffers; their quads live in
//!   [`crate::glyph::GlyphQuadBuffer`] instead, but they still reserve a
//!   zero-width range here so draw-order iteration stays uniform.

use ahash::AHashMap;

use core_store::EntityStore;
use core_text::TextStore;
use core_types::{EntityId, EntityKind, Rgba};

use crate::style;
use crate::tessellate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderRange {
    pub first: u32,
    pub last: u32,
}

impl RenderRange {
    pub fn width(&self) -> u32 {
        self.last - self.first
    }

    pub fn is_empty(&self) -> bool {
        self.first == self.last
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EntityRanges {
    pub triangles: RenderRange,
    pub lines: RenderRange,
}

#[derive(Debug, Clone)]
pub struct RenderBuffers {
    triangles: Vec<f32>,
    lines: Vec<f32>,
    ranges: AHashMap<EntityId, EntityRanges>,
    dirty: bool,
    pending_full_rebuild: bool,
    generation: u64,
}

impl Default for RenderBuffers {
    fn default() -> Self {
        Self {
            triangles: Vec::new(),
            lines: Vec::new(),
            ranges: AHashMap::new(),
            dirty: true,
            pending_full_rebuild: true,
            generation: 0,
        }
    }
}

/// Tessellates one entity's vertex contribution, or `(vec![], vec![])`
/// when it's invisible, has unknown kind, or is a text entity.
fn tessellate_entity(id: EntityId, store: &EntityStore, view_scale: f32) -> (Vec<f32>, Vec<f32>) {
    let Some(kind) = store.kind_of(id) else {
        return (Vec::new(), Vec::new());
    };
    let layer_of = |layer_id| store.find_layer(layer_id);

    match kind {
        EntityKind::Rect => {
            let Some(r) = store.find_rect(id) else { return (Vec::new(), Vec::new()) };
            if !style::is_visible(r.flags, layer_of(r.layer_id)) {
                return (Vec::new(), Vec::new());
            }
            let resolved = style::resolve(store, id, r.fill, r.stroke);
            tessellate::rect(r.x, r.y, r.w, r.h, resolved.fill, resolved.stroke)
        }
        EntityKind::Line => {
            let Some(l) = store.find_line(id) else { return (Vec::new(), Vec::new()) };
            if !style::is_visible(l.flags, layer_of(l.layer_id)) {
                return (Vec::new(), Vec::new());
            }
            let resolved = style::resolve(store, id, l.rgba, l.rgba);
            (Vec::new(), tessellate::line(l.x0, l.y0, l.x1, l.y1, resolved.stroke))
        }
        EntityKind::Polyline => {
            let Some(p) = store.find_polyline(id) else { return (Vec::new(), Vec::new()) };
            if !style::is_visible(p.flags, layer_of(p.layer_id)) {
                return (Vec::new(), Vec::new());
            }
            let resolved = style::resolve(store, id, p.rgba, p.rgba);
            let points = store.polyline_points(p);
            (Vec::new(), tessellate::polyline(points, resolved.stroke))
        }
        EntityKind::Circle => {
            let Some(c) = store.find_circle(id) else { return (Vec::new(), Vec::new()) };
            if !style::is_visible(c.flags, layer_of(c.layer_id)) {
                return (Vec::new(), Vec::new());
            }
            let resolved = style::resolve(store, id, c.fill, c.stroke);
            tessellate::circle(c.cx, c.cy, c.rx, c.ry, c.rot, c.sx, c.sy, view_scale, resolved.fill, resolved.stroke)
        }
        EntityKind::Polygon => {
            let Some(p) = store.find_polygon(id) else { return (Vec::new(), Vec::new()) };
            if !style::is_visible(p.flags, layer_of(p.layer_id)) {
                return (Vec::new(), Vec::new());
            }
            let resolved = style::resolve(store, id, p.fill, p.stroke);
            tessellate::polygon(p.cx, p.cy, p.rx, p.ry, p.rot, p.sx, p.sy, p.sides, resolved.fill, resolved.stroke)
        }
        EntityKind::Arrow => {
            let Some(a) = store.find_arrow(id) else { return (Vec::new(), Vec::new()) };
            if !style::is_visible(a.flags, layer_of(a.layer_id)) {
                return (Vec::new(), Vec::new());
            }
            let resolved = style::resolve(store, id, a.rgba, a.rgba);
            tessellate::arrow(a.ax, a.ay, a.bx, a.by, a.head, resolved.stroke)
        }
        EntityKind::Text => (Vec::new(), Vec::new()),
    }
}

impl RenderBuffers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn triangle_buffer(&self) -> &[f32] {
        &self.triangles
    }

    pub fn line_buffer(&self) -> &[f32] {
        &self.lines
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn range_of(&self, id: EntityId) -> Option<EntityRanges> {
        self.ranges.get(&id).copied()
    }

    /// Any mutation path must call this; [`RenderBuffers::ensure_built`]
    /// is the only thing that clears it.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Rebuilds both buffers from scratch if dirty or a full rebuild is
    /// pending; returns whether a rebuild actually ran.
    pub fn ensure_built(&mut self, store: &EntityStore, _texts: &TextStore, view_scale: f32) -> bool {
        if !self.dirty && !self.pending_full_rebuild {
            return false;
        }
        self.rebuild(store, view_scale);
        true
    }

    fn rebuild(&mut self, store: &EntityStore, view_scale: f32) {
        self.triangles.clear();
        self.lines.clear();
        self.ranges.clear();
        let order: Vec<EntityId> = store.draw_order().to_vec();
        for id in order {
            let tri_start = self.triangles.len() as u32;
            let line_start = self.lines.len() as u32;
            let (tris, lines) = tessellate_entity(id, store, view_scale);
            self.triangles.extend_from_slice(&tris);
            self.lines.extend_from_slice(&lines);
            self.ranges.insert(
                id,
                EntityRanges {
                    triangles: RenderRange {
                        first: tri_start,
                        last: self.triangles.len() as u32,
                    },
                    lines: RenderRange {
                        first: line_start,
                        last: self.lines.len() as u32,
                    },
                },
            );
        }
        self.dirty = false;
        self.pending_full_rebuild = false;
        self.generation += 1;
        tracing::trace!(
            target: "engine.render",
            generation = self.generation,
            triangle_floats = self.triangles.len(),
            line_floats = self.lines.len(),
            "full render buffer rebuild"
        );
    }

    /// Re-tessellates a single entity in place (spec.md §4.4 "Incremental
    /// refresh"). Returns `true` if it patched both ranges in place;
    /// `false` means the vertex count changed and a full rebuild was
    /// scheduled instead.
    pub fn refresh_entity_render_range(&mut self, id: EntityId, store: &EntityStore, view_scale: f32) -> bool {
        let Some(ranges) = self.ranges.get(&id).copied() else {
            self.pending_full_rebuild = true;
            self.dirty = true;
            return false;
        };
        let (tris, lines) = tessellate_entity(id, store, view_scale);
        if tris.len() as u32 != ranges.triangles.width() || lines.len() as u32 != ranges.lines.width() {
            self.pending_full_rebuild = true;
            self.dirty = true;
            return false;
        }
        let tri_range = ranges.triangles.first as usize..ranges.triangles.last as usize;
        let line_range = ranges.lines.first as usize..ranges.lines.last as usize;
        self.triangles[tri_range].copy_from_slice(&tris);
        self.lines[line_range].copy_from_slice(&lines);
        self.generation += 1;
        true
    }

    pub fn remove_entity(&mut self, id: EntityId) {
        self.ranges.remove(&id);
        self.pending_full_rebuild = true;
        self.dirty = true;
    }

    pub fn clear(&mut self) {
        self.triangles.clear();
        self.lines.clear();
        self.ranges.clear();
        self.generation += 1;
        self.dirty = false;
        self.pending_full_rebuild = false;
    }
}

pub const BACKGROUND: Rgba = Rgba::TRANSPARENT;

#[cfg(test)]
mod tests {
    use super::*;
    use core_store::{EntityFlags, Rect};
    use core_types::LayerId;

    fn rect(id: u32) -> Rect {
        Rect {
            id: EntityId(id),
            layer_id: LayerId::NONE,
            flags: EntityFlags::default(),
            x: 0.0,
            y: 0.0,
            w: 10.0,
            h: 5.0,
            fill: Rgba::new(1.0, 0.0, 0.0, 1.0),
            stroke: Rgba::BLACK,
            stroke_enabled: true,
            stroke_width_px: 1.0,
        }
    }

    #[test]
    fn scenario_1_rect_buffer_lengths() {
        let mut store = EntityStore::new();
        store.upsert_rect(EntityId(7), rect(7));
        let texts = TextStore::new();

        let mut buffers = RenderBuffers::new();
        buffers.ensure_built(&store, &texts, 1.0);

        assert_eq!(buffers.triangle_buffer().len(), 42);
        assert_eq!(buffers.line_buffer().len(), 56);
        assert_eq!(buffers.generation(), 1);
    }

    #[test]
    fn invisible_entity_reserves_zero_width_range() {
        let mut store = EntityStore::new();
        let mut r = rect(7);
        r.flags.remove(EntityFlags::VISIBLE);
        store.upsert_rect(EntityId(7), r);
        let texts = TextStore::new();

        let mut buffers = RenderBuffers::new();
        buffers.ensure_built(&store, &texts, 1.0);
        let ranges = buffers.range_of(EntityId(7)).unwrap();
        assert!(ranges.triangles.is_empty());
        assert!(ranges.lines.is_empty());
    }

    #[test]
    fn refresh_in_place_when_width_unchanged() {
        let mut store = EntityStore::new();
        store.upsert_rect(EntityId(7), rect(7));
        let texts = TextStore::new();

        let mut buffers = RenderBuffers::new();
        buffers.ensure_built(&store, &texts, 1.0);
        let gen_before = buffers.generation();

        let mut moved = rect(7);
        moved.x = 50.0;
        store.upsert_rect(EntityId(7), moved);

        assert!(buffers.refresh_entity_render_range(EntityId(7), &store, 1.0));
        assert!(buffers.generation() > gen_before);
        assert_eq!(buffers.triangle_buffer()[0], 50.0);
    }

    #[test]
    fn refresh_falls_back_to_full_rebuild_on_width_change() {
        let mut store = EntityStore::new();
        store.upsert_rect(EntityId(7), rect(7));
        let texts = TextStore::new();

        let mut buffers = RenderBuffers::new();
        buffers.ensure_built(&store, &texts, 1.0);

        // Swap kind entirely: a Line produces a different vertex layout.
        store.upsert_line(
            EntityId(7),
            core_store::Line {
                id: EntityId(7),
                layer_id: LayerId::NONE,
                flags: EntityFlags::default(),
                x0: 0.0,
                y0: 0.0,
                x1: 1.0,
                y1: 1.0,
                rgba: Rgba::BLACK,
                enabled: true,
                stroke_width_px: 1.0,
            },
        );

        assert!(!buffers.refresh_entity_render_range(EntityId(7), &store, 1.0));
        assert!(buffers.ensure_built(&store, &texts, 1.0));
        assert_eq!(buffers.triangle_buffer().len(), 0);
        assert_eq!(buffers.line_buffer().len(), 2 * tessellate::floats_per_vertex());
    }
}
