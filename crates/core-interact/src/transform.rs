//! Active transform state (spec.md §4.6): the mode-specific scratch data
//! carried between `begin*`/`update*`/`commit*`/`cancel*`.

use core_store::EntityStore;
use core_types::EntityId;

use crate::snapshot::{write_geometry, TransformGeometry, TransformSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformMode {
    Move,
    VertexDrag,
    EdgeDrag,
    Resize,
}

/// Which corner is anchored opposite the dragged handle (spec.md §4.6
/// "For Resize, also record which handle corner (0..3) is being dragged").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleCorner {
    TopLeft = 0,
    TopRight = 1,
    BottomRight = 2,
    BottomLeft = 3,
}

impl HandleCorner {
    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(Self::TopLeft),
            1 => Some(Self::TopRight),
            2 => Some(Self::BottomRight),
            3 => Some(Self::BottomLeft),
            _ => None,
        }
    }

    pub fn index(self) -> u8 {
        self as u8
    }
}

/// Which single edge is being dragged. Unlike `Resize`, only one axis of
/// the bounding box moves; the opposite edge stays anchored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeSide {
    Left = 0,
    Top = 1,
    Right = 2,
    Bottom = 3,
}

impl EdgeSide {
    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(Self::Left),
            1 => Some(Self::Top),
            2 => Some(Self::Right),
            3 => Some(Self::Bottom),
            _ => None,
        }
    }

    pub fn index(self) -> u8 {
        self as u8
    }
}

pub const MIN_SIZE: f32 = 1e-3;

#[derive(Debug, Clone, Copy)]
pub struct ResizeContext {
    pub handle: HandleCorner,
    /// The opposite corner, fixed for the whole gesture.
    pub anchor: (f32, f32),
}

#[derive(Debug, Clone, Copy)]
pub struct EdgeContext {
    pub side: EdgeSide,
    /// The opposite edge's fixed coordinate (x for Left/Right, y for
    /// Top/Bottom).
    pub anchor: f32,
}

#[derive(Debug, Clone, Copy)]
pub struct VertexContext {
    pub vertex_index: u32,
}

#[derive(Debug, Clone)]
pub struct ActiveTransform {
    pub mode: TransformMode,
    pub start_pointer: (f32, f32),
    pub snapshots: Vec<TransformSnapshot>,
    pub resize: Option<ResizeContext>,
    pub edge: Option<EdgeContext>,
    pub vertex: Option<VertexContext>,
}

impl ActiveTransform {
    pub fn specific_id(&self) -> Option<EntityId> {
        if self.snapshots.len() == 1 {
            Some(self.snapshots[0].id)
        } else {
            None
        }
    }

    /// Applies `(dx, dy)` to every snapshotted entity and writes the
    /// result into `store` (spec.md §4.6 "Move").
    pub fn apply_move(&self, store: &mut EntityStore, dx: f32, dy: f32) -> Vec<EntityId> {
        let mut touched = Vec::with_capacity(self.snapshots.len());
        for snap in &self.snapshots {
            let geometry = snap.translated(dx, dy);
            write_geometry(store, snap.id, &geometry);
            touched.push(snap.id);
        }
        touched
    }

    /// Mutates a single vertex of the one snapshotted entity (spec.md §4.6
    /// "VertexDrag").
    pub fn apply_vertex_drag(&self, store: &mut EntityStore, dx: f32, dy: f32) -> Option<EntityId> {
        let ctx = self.vertex?;
        let snap = self.snapshots.first()?;
        let geometry = match &snap.geometry {
            TransformGeometry::Polyline { points } => {
                let idx = ctx.vertex_index as usize;
                if idx >= points.len() {
                    return None;
                }
                let mut points = points.clone();
                let (ox, oy) = points[idx];
                points[idx] = (ox + dx, oy + dy);
                TransformGeometry::Polyline { points }
            }
            TransformGeometry::Line { x0, y0, x1, y1 } => match ctx.vertex_index {
                0 => TransformGeometry::Line { x0: x0 + dx, y0: y0 + dy, x1: *x1, y1: *y1 },
                _ => TransformGeometry::Line { x0: *x0, y0: *y0, x1: x1 + dx, y1: y1 + dy },
            },
            TransformGeometry::Arrow { ax, ay, bx, by } => match ctx.vertex_index {
                0 => TransformGeometry::Arrow { ax: ax + dx, ay: ay + dy, bx: *bx, by: *by },
                _ => TransformGeometry::Arrow { ax: *ax, ay: *ay, bx: bx + dx, by: by + dy },
            },
            _ => return None,
        };
        write_geometry(store, snap.id, &geometry);
        Some(snap.id)
    }

    /// Recomputes the AABB from the fixed opposite corner and the current
    /// (snapped) pointer, enforcing the minimum size, then applies the
    /// per-kind resize rule (spec.md §4.6 "Resize").
    pub fn apply_resize(&self, store: &mut EntityStore, pointer: (f32, f32)) -> Option<EntityId> {
        let ctx = self.resize?;
        let snap = self.snapshots.first()?;
        let (min_x, max_x) = enforce_min_size(ctx.anchor.0, pointer.0);
        let (min_y, max_y) = enforce_min_size(ctx.anchor.1, pointer.1);
        let geometry = resized_geometry(&snap.geometry, min_x, min_y, max_x, max_y)?;
        write_geometry(store, snap.id, &geometry);
        Some(snap.id)
    }

    /// Moves a single edge, leaving the opposite edge at `ctx.anchor`.
    pub fn apply_edge_drag(&self, store: &mut EntityStore, pointer: (f32, f32)) -> Option<EntityId> {
        let ctx = self.edge?;
        let snap = self.snapshots.first()?;
        let TransformGeometry::Rect { x, y, w, h } = &snap.geometry else {
            return None;
        };
        let (mut min_x, mut max_x) = (*x, *x + *w);
        let (mut min_y, mut max_y) = (*y, *y + *h);
        match ctx.side {
            EdgeSide::Left => (min_x, max_x) = enforce_min_size(ctx.anchor, pointer.0),
            EdgeSide::Right => (min_x, max_x) = enforce_min_size(ctx.anchor, pointer.0),
            EdgeSide::Top => (min_y, max_y) = enforce_min_size(ctx.anchor, pointer.1),
            EdgeSide::Bottom => (min_y, max_y) = enforce_min_size(ctx.anchor, pointer.1),
        }
        let geometry = TransformGeometry::Rect { x: min_x, y: min_y, w: max_x - min_x, h: max_y - min_y };
        write_geometry(store, snap.id, &geometry);
        Some(snap.id)
    }
}

fn enforce_min_size(anchor: f32, pointer: f32) -> (f32, f32) {
    let (mut lo, mut hi) = if anchor <= pointer { (anchor, pointer) } else { (pointer, anchor) };
    if hi - lo < MIN_SIZE {
        hi = lo + MIN_SIZE;
    }
    (lo, hi)
}

fn resized_geometry(geometry: &TransformGeometry, min_x: f32, min_y: f32, max_x: f32, max_y: f32) -> Option<TransformGeometry> {
    match geometry {
        TransformGeometry::Rect { .. } => Some(TransformGeometry::Rect { x: min_x, y: min_y, w: max_x - min_x, h: max_y - min_y }),
        TransformGeometry::Circle { .. } => Some(TransformGeometry::Circle {
            cx: (min_x + max_x) * 0.5,
            cy: (min_y + max_y) * 0.5,
            rx: (max_x - min_x) * 0.5,
            ry: (max_y - min_y) * 0.5,
        }),
        TransformGeometry::Polygon { .. } => Some(TransformGeometry::Polygon {
            cx: (min_x + max_x) * 0.5,
            cy: (min_y + max_y) * 0.5,
            rx: (max_x - min_x) * 0.5,
            ry: (max_y - min_y) * 0.5,
        }),
        // Resize is only defined over box-like kinds (spec.md §4.6 names
        // Rect/Circle/Polygon explicitly); Line/Arrow/Polyline don't have
        // an AABB-resize rule of their own.
        _ => None,
    }
}

/// The corner of `geometry`'s bounding box opposite `handle`, used as the
/// fixed anchor for the whole resize gesture.
pub fn opposite_corner(geometry: &TransformGeometry, handle: HandleCorner) -> Option<(f32, f32)> {
    let (min_x, min_y, max_x, max_y) = match geometry {
        TransformGeometry::Rect { x, y, w, h } => (*x, *y, x + w, y + h),
        TransformGeometry::Circle { cx, cy, rx, ry } => (cx - rx, cy - ry, cx + rx, cy + ry),
        TransformGeometry::Polygon { cx, cy, rx, ry } => (cx - rx, cy - ry, cx + rx, cy + ry),
        _ => return None,
    };
    Some(match handle {
        HandleCorner::TopLeft => (max_x, max_y),
        HandleCorner::TopRight => (min_x, max_y),
        HandleCorner::BottomRight => (min_x, min_y),
        HandleCorner::BottomLeft => (max_x, min_y),
    })
}

/// The fixed coordinate of the edge opposite `side`.
pub fn opposite_edge(geometry: &TransformGeometry, side: EdgeSide) -> Option<f32> {
    let TransformGeometry::Rect { x, y, w, h } = geometry else {
        return None;
    };
    Some(match side {
        EdgeSide::Left => x + w,
        EdgeSide::Right => *x,
        EdgeSide::Top => y + h,
        EdgeSide::Bottom => *y,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_store::{EntityFlags, Rect};
    use core_types::{EntityId as Id, LayerId, Rgba};

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
    fn resize_recomputes_rect_from_anchor_and_pointer() {
        let mut store = EntityStore::new();
        store.upsert_rect(Id(1), rect(1));
        let snap = TransformSnapshot::capture(Id(1), &store).unwrap();
        let anchor = opposite_corner(&snap.geometry, HandleCorner::BottomRight).unwrap();
        assert_eq!(anchor, (0.0, 0.0));

        let active = ActiveTransform {
            mode: TransformMode::Resize,
            start_pointer: (10.0, 10.0),
            snapshots: vec![snap],
            resize: Some(ResizeContext { handle: HandleCorner::BottomRight, anchor }),
            edge: None,
            vertex: None,
        };
        active.apply_resize(&mut store, (20.0, 15.0));
        let r = store.find_rect(Id(1)).unwrap();
        assert_eq!((r.x, r.y, r.w, r.h), (0.0, 0.0, 20.0, 15.0));
    }

    #[test]
    fn resize_enforces_minimum_size() {
        let mut store = EntityStore::new();
        store.upsert_rect(Id(1), rect(1));
        let snap = TransformSnapshot::capture(Id(1), &store).unwrap();
        let active = ActiveTransform {
            mode: TransformMode::Resize,
            start_pointer: (10.0, 10.0),
            snapshots: vec![snap],
            resize: Some(ResizeContext { handle: HandleCorner::BottomRight, anchor: (0.0, 0.0) }),
            edge: None,
            vertex: None,
        };
        active.apply_resize(&mut store, (0.0, 0.0));
        let r = store.find_rect(Id(1)).unwrap();
        assert!(r.w >= MIN_SIZE && r.h >= MIN_SIZE);
    }
}
