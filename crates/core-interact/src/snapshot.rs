//! Pre-transform geometry snapshots (spec.md §4.6 "Begin": `TransformSnapshot
//! {id, x, y, w, h, points?}`). The flat `{x,y,w,h}` shape the spec names
//! covers Rect directly; every other transformable kind is generalized
//! here into its own tagged variant instead of overloading `w`/`h` with
//! kind-dependent meaning (a Line's second point is not a width and
//! height), which is what `w`/`h` would otherwise have to smuggle.

use core_store::EntityStore;
use core_types::{EntityId, EntityKind};

#[derive(Debug, Clone, PartialEq)]
pub enum TransformGeometry {
    Rect { x: f32, y: f32, w: f32, h: f32 },
    Line { x0: f32, y0: f32, x1: f32, y1: f32 },
    Circle { cx: f32, cy: f32, rx: f32, ry: f32 },
    Polygon { cx: f32, cy: f32, rx: f32, ry: f32 },
    Arrow { ax: f32, ay: f32, bx: f32, by: f32 },
    Polyline { points: Vec<(f32, f32)> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransformSnapshot {
    pub id: EntityId,
    pub geometry: TransformGeometry,
}

impl TransformSnapshot {
    pub fn capture(id: EntityId, store: &EntityStore) -> Option<Self> {
        let geometry = match store.kind_of(id)? {
            EntityKind::Rect => {
                let r = store.find_rect(id)?;
                TransformGeometry::Rect { x: r.x, y: r.y, w: r.w, h: r.h }
            }
            EntityKind::Line => {
                let l = store.find_line(id)?;
                TransformGeometry::Line { x0: l.x0, y0: l.y0, x1: l.x1, y1: l.y1 }
            }
            EntityKind::Polyline => {
                let pl = store.find_polyline(id)?;
                TransformGeometry::Polyline { points: store.polyline_points(pl).to_vec() }
            }
            EntityKind::Circle => {
                let c = store.find_circle(id)?;
                TransformGeometry::Circle { cx: c.cx, cy: c.cy, rx: c.rx, ry: c.ry }
            }
            EntityKind::Polygon => {
                let p = store.find_polygon(id)?;
                TransformGeometry::Polygon { cx: p.cx, cy: p.cy, rx: p.rx, ry: p.ry }
            }
            EntityKind::Arrow => {
                let a = store.find_arrow(id)?;
                TransformGeometry::Arrow { ax: a.ax, ay: a.ay, bx: a.bx, by: a.by }
            }
            // Text entities carry position but aren't a transform-session
            // target (spec.md §4.6 only names the geometric kinds).
            EntityKind::Text => return None,
        };
        Some(Self { id, geometry })
    }

    /// Translates every position-bearing field by `(dx, dy)`. Size fields
    /// (a Rect's `w`/`h`, a Circle/Polygon's `rx`/`ry`) are untouched —
    /// Move only carries anchors, never extents.
    pub fn translated(&self, dx: f32, dy: f32) -> TransformGeometry {
        match &self.geometry {
            TransformGeometry::Rect { x, y, w, h } => TransformGeometry::Rect { x: x + dx, y: y + dy, w: *w, h: *h },
            TransformGeometry::Line { x0, y0, x1, y1 } => {
                TransformGeometry::Line { x0: x0 + dx, y0: y0 + dy, x1: x1 + dx, y1: y1 + dy }
            }
            TransformGeometry::Circle { cx, cy, rx, ry } => {
                TransformGeometry::Circle { cx: cx + dx, cy: cy + dy, rx: *rx, ry: *ry }
            }
            TransformGeometry::Polygon { cx, cy, rx, ry } => {
                TransformGeometry::Polygon { cx: cx + dx, cy: cy + dy, rx: *rx, ry: *ry }
            }
            TransformGeometry::Arrow { ax, ay, bx, by } => {
                TransformGeometry::Arrow { ax: ax + dx, ay: ay + dy, bx: bx + dx, by: by + dy }
            }
            TransformGeometry::Polyline { points } => {
                TransformGeometry::Polyline { points: points.iter().map(|(x, y)| (x + dx, y + dy)).collect() }
            }
        }
    }

    pub fn restore(&self, store: &mut EntityStore) {
        write_geometry(store, self.id, &self.geometry);
    }
}

/// Writes `geometry` onto `id`'s existing record, leaving every other
/// field (layer, flags, color, stroke width...) exactly as it was.
pub fn write_geometry(store: &mut EntityStore, id: EntityId, geometry: &TransformGeometry) {
    match geometry {
        TransformGeometry::Rect { x, y, w, h } => {
            if let Some(r) = store.find_rect(id) {
                let mut r = r.clone();
                r.x = *x;
                r.y = *y;
                r.w = *w;
                r.h = *h;
                store.upsert_rect(id, r);
            }
        }
        TransformGeometry::Line { x0, y0, x1, y1 } => {
            if let Some(l) = store.find_line(id) {
                let mut l = l.clone();
                l.x0 = *x0;
                l.y0 = *y0;
                l.x1 = *x1;
                l.y1 = *y1;
                store.upsert_line(id, l);
            }
        }
        TransformGeometry::Circle { cx, cy, rx, ry } => {
            if let Some(c) = store.find_circle(id) {
                let mut c = c.clone();
                c.cx = *cx;
                c.cy = *cy;
                c.rx = *rx;
                c.ry = *ry;
                store.upsert_circle(id, c);
            }
        }
        TransformGeometry::Polygon { cx, cy, rx, ry } => {
            if let Some(p) = store.find_polygon(id) {
                let mut p = p.clone();
                p.cx = *cx;
                p.cy = *cy;
                p.rx = *rx;
                p.ry = *ry;
                store.upsert_polygon(id, p);
            }
        }
        TransformGeometry::Arrow { ax, ay, bx, by } => {
            if let Some(a) = store.find_arrow(id) {
                let mut a = a.clone();
                a.ax = *ax;
                a.ay = *ay;
                a.bx = *bx;
                a.by = *by;
                store.upsert_arrow(id, a);
            }
        }
        TransformGeometry::Polyline { points } => {
            if let Some(pl) = store.find_polyline(id) {
                let (layer_id, flags, rgba, enabled, stroke_width_px) = (pl.layer_id, pl.flags, pl.rgba, pl.enabled, pl.stroke_width_px);
                store.upsert_polyline(id, layer_id, flags, points, rgba, enabled, stroke_width_px);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_store::{EntityFlags, Rect};
    use core_types::{LayerId, Rgba};

    fn rect(id: u32) -> Rect {
        Rect {
            id: EntityId(id),
            layer_id: LayerId(1),
            flags: EntityFlags::default(),
            x: 1.0,
            y: 2.0,
            w: 10.0,
            h: 5.0,
            fill: Rgba::BLACK,
            stroke: Rgba::BLACK,
            stroke_enabled: true,
            stroke_width_px: 1.0,
        }
    }

    #[test]
    fn translate_moves_position_not_size() {
        let mut store = EntityStore::new();
        store.upsert_rect(EntityId(1), rect(1));
        let snap = TransformSnapshot::capture(EntityId(1), &store).unwrap();
        let moved = snap.translated(5.0, -3.0);
        assert_eq!(moved, TransformGeometry::Rect { x: 6.0, y: -1.0, w: 10.0, h: 5.0 });
    }

    #[test]
    fn restore_writes_back_original_geometry() {
        let mut store = EntityStore::new();
        store.upsert_rect(EntityId(1), rect(1));
        let snap = TransformSnapshot::capture(EntityId(1), &store).unwrap();

        let mut moved = rect(1);
        moved.x = 99.0;
        store.upsert_rect(EntityId(1), moved);
        assert_eq!(store.find_rect(EntityId(1)).unwrap().x, 99.0);

        snap.restore(&mut store);
        assert_eq!(store.find_rect(EntityId(1)).unwrap().x, 1.0);
    }
}
