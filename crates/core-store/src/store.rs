//! The entity store: typed arenas per geometric kind, the global
//! `id -> (kind, slot)` index, the shared point arena, layers, draw order,
//! selection, and per-entity style overrides (spec.md §3, §4.1).
//!
//! Text entities are owned by `core-text`'s `TextStore`, not by this crate
//! — `EntityStore` only tracks their presence in `draw_order` via
//! [`EntityStore::push_draw_order`]/[`EntityStore::remove_from_draw_order`],
//! which `core-commands` calls alongside the matching `TextStore` mutation
//! so the two stay in lockstep.

use std::collections::HashMap;

use core_types::{EntityId, EntityKind, IdAllocator, LayerId};

use crate::arena::Arena;
use crate::entities::{Arrow, Circle, Line, Polygon, Polyline, Rect};
use crate::layer::Layer;
use crate::points::PointArena;
use crate::reorder::{reorder, ReorderAction};
use crate::selection::{Selection, SelectionMode};
use crate::style::StyleOverride;

#[derive(Debug, Clone, Default)]
pub struct EntityStore {
    rects: Arena<Rect>,
    lines: Arena<Line>,
    polylines: Arena<Polyline>,
    circles: Arena<Circle>,
    polygons: Arena<Polygon>,
    arrows: Arena<Arrow>,
    points: PointArena,
    index: HashMap<EntityId, (EntityKind, usize)>,
    draw_order: Vec<EntityId>,
    layers: Vec<Layer>,
    style_overrides: HashMap<EntityId, StyleOverride>,
    selection: Selection,
    ids: IdAllocator,
}

macro_rules! upsert_kind {
    ($name:ident, $kind:expr, $arena:ident, $record:ty) => {
        /// Inserts or updates the record for `id`, enforcing kind
        /// stability: if `id` previously existed as a different kind, the
        /// old record is fully deleted first. Returns the record's slot in
        /// this kind's arena.
        pub fn $name(&mut self, id: EntityId, record: $record) -> usize {
            debug_assert_eq!(record.id, id, "record id must match upsert id");
            self.ids.observe(id.0);
            self.ensure_kind_stability(id, $kind);
            if let Some(&(kind, slot)) = self.index.get(&id) {
                debug_assert_eq!(kind, $kind);
                *self.$arena.get_mut(slot).expect("index points at a live slot") = record;
                slot
            } else {
                let slot = self.$arena.push(record);
                self.index.insert(id, ($kind, slot));
                self.push_draw_order(id);
                slot
            }
        }
    };
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    upsert_kind!(upsert_rect, EntityKind::Rect, rects, Rect);
    upsert_kind!(upsert_line, EntityKind::Line, lines, Line);
    upsert_kind!(upsert_circle, EntityKind::Circle, circles, Circle);
    upsert_kind!(upsert_polygon, EntityKind::Polygon, polygons, Polygon);
    upsert_kind!(upsert_arrow, EntityKind::Arrow, arrows, Arrow);

    /// Polylines can't use the generic macro: points live in the shared
    /// `PointArena` rather than inline on the record, so upserting new
    /// point data always appends a fresh run and orphans the old one.
    pub fn upsert_polyline(
        &mut self,
        id: EntityId,
        layer_id: LayerId,
        flags: crate::flags::EntityFlags,
        points: &[(f32, f32)],
        rgba: core_types::Rgba,
        enabled: bool,
        stroke_width_px: f32,
    ) -> usize {
        self.ids.observe(id.0);
        self.ensure_kind_stability(id, EntityKind::Polyline);
        let (offset, count) = self.points.push_run(points);
        if let Some(&(EntityKind::Polyline, slot)) = self.index.get(&id) {
            let old_count = self.polylines.get(slot).unwrap().count;
            self.points.mark_orphaned(old_count);
            *self.polylines.get_mut(slot).unwrap() = Polyline {
                id,
                layer_id,
                flags,
                offset,
                count,
                rgba,
                enabled,
                stroke_width_px,
            };
            self.maybe_compact_points();
            slot
        } else {
            let slot = self.polylines.push(Polyline {
                id,
                layer_id,
                flags,
                offset,
                count,
                rgba,
                enabled,
                stroke_width_px,
            });
            self.index.insert(id, (EntityKind::Polyline, slot));
            self.push_draw_order(id);
            slot
        }
    }

    fn maybe_compact_points(&mut self) {
        if self.points.needs_compaction() {
            self.points.compact(&mut self.polylines);
        }
    }

    pub fn compact_polyline_points(&mut self) {
        self.points.compact(&mut self.polylines);
    }

    pub fn find_rect(&self, id: EntityId) -> Option<&Rect> {
        self.slot_of(id, EntityKind::Rect).and_then(|s| self.rects.get(s))
    }
    pub fn find_line(&self, id: EntityId) -> Option<&Line> {
        self.slot_of(id, EntityKind::Line).and_then(|s| self.lines.get(s))
    }
    pub fn find_polyline(&self, id: EntityId) -> Option<&Polyline> {
        self.slot_of(id, EntityKind::Polyline).and_then(|s| self.polylines.get(s))
    }
    pub fn find_circle(&self, id: EntityId) -> Option<&Circle> {
        self.slot_of(id, EntityKind::Circle).and_then(|s| self.circles.get(s))
    }
    pub fn find_polygon(&self, id: EntityId) -> Option<&Polygon> {
        self.slot_of(id, EntityKind::Polygon).and_then(|s| self.polygons.get(s))
    }
    pub fn find_arrow(&self, id: EntityId) -> Option<&Arrow> {
        self.slot_of(id, EntityKind::Arrow).and_then(|s| self.arrows.get(s))
    }

    pub fn polyline_points(&self, polyline: &Polyline) -> &[(f32, f32)] {
        self.points.slice(polyline.offset, polyline.count).unwrap_or(&[])
    }

    fn slot_of(&self, id: EntityId, kind: EntityKind) -> Option<usize> {
        match self.index.get(&id) {
            Some(&(k, slot)) if k == kind => Some(slot),
            _ => None,
        }
    }

    pub fn kind_of(&self, id: EntityId) -> Option<EntityKind> {
        self.index.get(&id).map(|(k, _)| *k)
    }

    pub fn rects(&self) -> impl Iterator<Item = &Rect> {
        self.rects.iter()
    }
    pub fn lines(&self) -> impl Iterator<Item = &Line> {
        self.lines.iter()
    }
    pub fn polylines(&self) -> impl Iterator<Item = &Polyline> {
        self.polylines.iter()
    }
    pub fn circles(&self) -> impl Iterator<Item = &Circle> {
        self.circles.iter()
    }
    pub fn polygons(&self) -> impl Iterator<Item = &Polygon> {
        self.polygons.iter()
    }
    pub fn arrows(&self) -> impl Iterator<Item = &Arrow> {
        self.arrows.iter()
    }

    /// Deletes a geometric entity (spec.md §4.1 "Algorithm — swap-remove
    /// delete"). Returns `false` (a no-op) if `id` is absent or belongs to
    /// text, which is deleted through `TextStore` instead.
    pub fn delete_entity(&mut self, id: EntityId) -> bool {
        let Some((kind, slot)) = self.index.remove(&id) else {
            return false;
        };
        self.remove_by_kind_slot(kind, slot);
        self.remove_from_draw_order(id);
        self.style_overrides.remove(&id);
        true
    }

    fn ensure_kind_stability(&mut self, id: EntityId, new_kind: EntityKind) {
        if let Some(&(kind, slot)) = self.index.get(&id) {
            if kind != new_kind {
                self.remove_by_kind_slot(kind, slot);
                self.index.remove(&id);
                self.remove_from_draw_order(id);
                self.style_overrides.remove(&id);
            }
        }
    }

    fn remove_by_kind_slot(&mut self, kind: EntityKind, slot: usize) {
        let moved_id = match kind {
            EntityKind::Rect => self.rects.swap_remove(slot).1,
            EntityKind::Line => self.lines.swap_remove(slot).1,
            EntityKind::Polyline => {
                let (removed, moved) = self.polylines.swap_remove(slot);
                self.points.mark_orphaned(removed.count);
                moved
            }
            EntityKind::Circle => self.circles.swap_remove(slot).1,
            EntityKind::Polygon => self.polygons.swap_remove(slot).1,
            EntityKind::Arrow => self.arrows.swap_remove(slot).1,
            EntityKind::Text => {
                debug_assert!(false, "text entities are not stored in core-store arenas");
                None
            }
        };
        if let Some(moved_id) = moved_id {
            self.index.insert(moved_id, (kind, slot));
        }
        if kind == EntityKind::Polyline {
            self.maybe_compact_points();
        }
    }

    // --- draw order -------------------------------------------------

    pub fn draw_order(&self) -> &[EntityId] {
        &self.draw_order
    }

    pub fn set_draw_order(&mut self, order: Vec<EntityId>) {
        self.draw_order = order;
    }

    /// Appends `id` to the back of the paint order, unless already present.
    /// Public so `core-commands` can push text ids on text creation — per
    /// the resolved open question, text IS a first-class draw-order member.
    pub fn push_draw_order(&mut self, id: EntityId) {
        if !self.draw_order.contains(&id) {
            self.draw_order.push(id);
        }
    }

    pub fn remove_from_draw_order(&mut self, id: EntityId) {
        self.draw_order.retain(|existing| *existing != id);
    }

    pub fn reorder(&mut self, targets: &[EntityId], action: ReorderAction, ref_id: Option<EntityId>) {
        reorder(&mut self.draw_order, targets, action, ref_id);
    }

    // --- selection ----------------------------------------------------

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn selection_mut(&mut self) -> &mut Selection {
        &mut self.selection
    }

    pub fn set_selection(&mut self, ids: &[EntityId], mode: SelectionMode) {
        self.selection.apply(ids, mode);
    }

    // --- layers ---------------------------------------------------------

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn upsert_layer(&mut self, layer: Layer) {
        if let Some(existing) = self.layers.iter_mut().find(|l| l.id == layer.id) {
            *existing = layer;
        } else {
            self.layers.push(layer);
        }
        self.layers.sort_by_key(|l| l.order);
    }

    pub fn find_layer(&self, id: LayerId) -> Option<&Layer> {
        self.layers.iter().find(|l| l.id == id)
    }

    pub fn delete_layer(&mut self, id: LayerId) -> bool {
        let before = self.layers.len();
        self.layers.retain(|l| l.id != id);
        self.layers.len() != before
    }

    // --- style overrides --------------------------------------------------

    pub fn style_override(&self, id: EntityId) -> Option<&StyleOverride> {
        self.style_overrides.get(&id)
    }

    pub fn set_style_override(&mut self, id: EntityId, style: StyleOverride) {
        if style.is_empty() {
            self.style_overrides.remove(&id);
        } else {
            self.style_overrides.insert(id, style);
        }
    }

    pub fn style_overrides(&self) -> impl Iterator<Item = (EntityId, &StyleOverride)> {
        self.style_overrides.iter().map(|(&id, style)| (id, style))
    }

    // --- ids ------------------------------------------------------------

    pub fn next_entity_id(&self) -> u32 {
        self.ids.peek()
    }

    pub fn allocate_id(&mut self) -> EntityId {
        self.ids.allocate()
    }

    pub fn observe_id(&mut self, id: u32) {
        self.ids.observe(id);
    }

    pub fn restore_id_watermark(&mut self, next: u32) {
        self.ids.restore(next);
    }

    pub fn clear(&mut self) {
        self.rects.clear();
        self.lines.clear();
        self.polylines.clear();
        self.circles.clear();
        self.polygons.clear();
        self.arrows.clear();
        self.points = PointArena::new();
        self.index.clear();
        self.draw_order.clear();
        self.layers.clear();
        self.style_overrides.clear();
        self.selection = Selection::new();
        self.ids = IdAllocator::default();
    }

    pub fn points(&self) -> &PointArena {
        &self.points
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::EntityFlags;
    use core_types::Rgba;

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
    fn upsert_then_find_round_trips() {
        let mut store = EntityStore::new();
        store.upsert_rect(EntityId(7), rect(7, 0.0));
        assert_eq!(store.find_rect(EntityId(7)).unwrap().x, 0.0);
        assert_eq!(store.kind_of(EntityId(7)), Some(EntityKind::Rect));
        assert_eq!(store.draw_order(), &[EntityId(7)]);
    }

    #[test]
    fn update_does_not_duplicate_draw_order_entry() {
        let mut store = EntityStore::new();
        store.upsert_rect(EntityId(7), rect(7, 0.0));
        store.upsert_rect(EntityId(7), rect(7, 5.0));
        assert_eq!(store.draw_order(), &[EntityId(7)]);
        assert_eq!(store.find_rect(EntityId(7)).unwrap().x, 5.0);
    }

    #[test]
    fn kind_change_fully_deletes_old_record() {
        let mut store = EntityStore::new();
        store.upsert_rect(EntityId(7), rect(7, 0.0));
        store.upsert_circle(
            EntityId(7),
            Circle {
                id: EntityId(7),
                layer_id: LayerId(1),
                flags: EntityFlags::default(),
                cx: 0.0,
                cy: 0.0,
                rx: 1.0,
                ry: 1.0,
                rot: 0.0,
                sx: 1.0,
                sy: 1.0,
                fill: Rgba::BLACK,
                stroke: Rgba::BLACK,
                stroke_flags: Default::default(),
            },
        );
        assert!(store.find_rect(EntityId(7)).is_none());
        assert!(store.find_circle(EntityId(7)).is_some());
        assert_eq!(store.kind_of(EntityId(7)), Some(EntityKind::Circle));
    }

    #[test]
    fn delete_updates_moved_index_entry() {
        let mut store = EntityStore::new();
        store.upsert_rect(EntityId(1), rect(1, 0.0));
        store.upsert_rect(EntityId(2), rect(2, 1.0));
        store.upsert_rect(EntityId(3), rect(3, 2.0));
        assert!(store.delete_entity(EntityId(1)));
        // id 3 (the last element) should have moved into slot 0.
        assert_eq!(store.kind_of(EntityId(3)), Some(EntityKind::Rect));
        assert_eq!(store.find_rect(EntityId(3)).unwrap().x, 2.0);
        assert!(store.find_rect(EntityId(1)).is_none());
    }

    #[test]
    fn delete_nonexistent_id_is_a_no_op() {
        let mut store = EntityStore::new();
        assert!(!store.delete_entity(EntityId(42)));
    }
}
