//! Draft sessions (GLOSSARY "Draft": a transient shape being drawn by the
//! user, committed into the document or canceled). Unlike a transform, a
//! draft has no prior entity to snapshot — it grows a brand-new record from
//! a start point and a running pointer position, and is only ever realized
//! in the store at `commit`.

use core_store::{Arrow, Circle, EntityFlags, EntityStore, Polygon, Rect, StrokeFlags};
use core_types::{EngineError, EngineResult, EntityId, EntityKind, LayerId, Rgba};

/// Style inputs captured at `begin_draft`, a flat superset over every
/// draftable kind's color/stroke fields. Only the fields relevant to
/// `kind` are read back out at commit time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DraftStyle {
    pub fill: Rgba,
    pub stroke: Rgba,
    pub stroke_enabled: bool,
    pub stroke_flags: StrokeFlags,
    pub rgba: Rgba,
    pub enabled: bool,
    pub stroke_width_px: f32,
    pub head: f32,
    pub sides: u32,
}

impl Default for DraftStyle {
    fn default() -> Self {
        Self {
            fill: Rgba::TRANSPARENT,
            stroke: Rgba::BLACK,
            stroke_enabled: true,
            stroke_flags: StrokeFlags::ENABLED,
            rgba: Rgba::BLACK,
            enabled: true,
            stroke_width_px: 1.0,
            head: 10.0,
            sides: 3,
        }
    }
}

/// The shape a draft currently previews as, including the tentative
/// pointer position (for `Polyline`, not yet a committed vertex).
#[derive(Debug, Clone, PartialEq)]
pub enum PreviewGeometry {
    Rect { x: f32, y: f32, w: f32, h: f32 },
    Line { x0: f32, y0: f32, x1: f32, y1: f32 },
    Circle { cx: f32, cy: f32, rx: f32, ry: f32 },
    Polygon { cx: f32, cy: f32, rx: f32, ry: f32 },
    Arrow { ax: f32, ay: f32, bx: f32, by: f32 },
    Polyline { points: Vec<(f32, f32)> },
}

#[derive(Debug, Clone)]
pub struct DraftState {
    kind: EntityKind,
    layer_id: LayerId,
    flags: EntityFlags,
    style: DraftStyle,
    start: (f32, f32),
    current: (f32, f32),
    points: Vec<(f32, f32)>,
}

fn min_max(a: f32, b: f32) -> (f32, f32) {
    if a <= b { (a, b) } else { (b, a) }
}

fn dist(a: (f32, f32), b: (f32, f32)) -> f32 {
    ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt()
}

impl DraftState {
    pub fn new(kind: EntityKind, layer_id: LayerId, flags: EntityFlags, style: DraftStyle, start: (f32, f32)) -> EngineResult<Self> {
        if kind == EntityKind::Text {
            return Err(EngineError::InvalidOperation("text has no draft form".into()));
        }
        let points = if kind == EntityKind::Polyline { vec![start] } else { Vec::new() };
        Ok(Self { kind, layer_id, flags, style, start, current: start, points })
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Moves the tentative pointer position. For everything but `Polyline`
    /// this is the only thing that changes between frames.
    pub fn update(&mut self, point: (f32, f32)) {
        self.current = point;
    }

    /// `Polyline`-only: commits `point` as a permanent vertex.
    pub fn add_vertex(&mut self, point: (f32, f32)) -> EngineResult<()> {
        if self.kind != EntityKind::Polyline {
            return Err(EngineError::InvalidOperation("add_vertex only applies to a polyline draft".into()));
        }
        self.points.push(point);
        self.current = point;
        Ok(())
    }

    pub fn preview(&self) -> PreviewGeometry {
        match self.kind {
            EntityKind::Rect => {
                let (min_x, max_x) = min_max(self.start.0, self.current.0);
                let (min_y, max_y) = min_max(self.start.1, self.current.1);
                PreviewGeometry::Rect { x: min_x, y: min_y, w: max_x - min_x, h: max_y - min_y }
            }
            EntityKind::Line => PreviewGeometry::Line { x0: self.start.0, y0: self.start.1, x1: self.current.0, y1: self.current.1 },
            EntityKind::Circle => {
                let r = dist(self.start, self.current);
                PreviewGeometry::Circle { cx: self.start.0, cy: self.start.1, rx: r, ry: r }
            }
            EntityKind::Polygon => {
                let r = dist(self.start, self.current);
                PreviewGeometry::Polygon { cx: self.start.0, cy: self.start.1, rx: r, ry: r }
            }
            EntityKind::Arrow => PreviewGeometry::Arrow { ax: self.start.0, ay: self.start.1, bx: self.current.0, by: self.current.1 },
            EntityKind::Polyline => {
                let mut pts = self.points.clone();
                if pts.last().copied() != Some(self.current) {
                    pts.push(self.current);
                }
                PreviewGeometry::Polyline { points: pts }
            }
            EntityKind::Text => unreachable!("a draft never holds the Text kind"),
        }
    }

    /// Realizes the drafted shape into `store` under `id`.
    pub fn commit(&self, id: EntityId, store: &mut EntityStore) -> EngineResult<EntityKind> {
        match self.kind {
            EntityKind::Rect => {
                let (min_x, max_x) = min_max(self.start.0, self.current.0);
                let (min_y, max_y) = min_max(self.start.1, self.current.1);
                store.upsert_rect(
                    id,
                    Rect {
                        id,
                        layer_id: self.layer_id,
                        flags: self.flags,
                        x: min_x,
                        y: min_y,
                        w: max_x - min_x,
                        h: max_y - min_y,
                        fill: self.style.fill,
                        stroke: self.style.stroke,
                        stroke_enabled: self.style.stroke_enabled,
                        stroke_width_px: self.style.stroke_width_px,
                    },
                );
            }
            EntityKind::Line => {
                store.upsert_line(
                    id,
                    core_store::Line {
                        id,
                        layer_id: self.layer_id,
                        flags: self.flags,
                        x0: self.start.0,
                        y0: self.start.1,
                        x1: self.current.0,
                        y1: self.current.1,
                        rgba: self.style.rgba,
                        enabled: self.style.enabled,
                        stroke_width_px: self.style.stroke_width_px,
                    },
                );
            }
            EntityKind::Circle => {
                let r = dist(self.start, self.current);
                store.upsert_circle(
                    id,
                    Circle {
                        id,
                        layer_id: self.layer_id,
                        flags: self.flags,
                        cx: self.start.0,
                        cy: self.start.1,
                        rx: r,
                        ry: r,
                        rot: 0.0,
                        sx: 1.0,
                        sy: 1.0,
                        fill: self.style.fill,
                        stroke: self.style.stroke,
                        stroke_flags: self.style.stroke_flags,
                    },
                );
            }
            EntityKind::Polygon => {
                let r = dist(self.start, self.current);
                store.upsert_polygon(
                    id,
                    Polygon {
                        id,
                        layer_id: self.layer_id,
                        flags: self.flags,
                        cx: self.start.0,
                        cy: self.start.1,
                        rx: r,
                        ry: r,
                        rot: 0.0,
                        sx: 1.0,
                        sy: 1.0,
                        fill: self.style.fill,
                        stroke: self.style.stroke,
                        stroke_flags: self.style.stroke_flags,
                        sides: self.style.sides.max(3),
                    },
                );
            }
            EntityKind::Arrow => {
                store.upsert_arrow(
                    id,
                    Arrow {
                        id,
                        layer_id: self.layer_id,
                        flags: self.flags,
                        ax: self.start.0,
                        ay: self.start.1,
                        bx: self.current.0,
                        by: self.current.1,
                        head: self.style.head,
                        rgba: self.style.rgba,
                        stroke_width_px: self.style.stroke_width_px,
                    },
                );
            }
            EntityKind::Polyline => {
                if self.points.len() < 2 {
                    return Err(EngineError::InvalidOperation("a polyline draft needs at least two vertices".into()));
                }
                store.upsert_polyline(id, self.layer_id, self.flags, &self.points, self.style.rgba, self.style.enabled, self.style.stroke_width_px);
            }
            EntityKind::Text => unreachable!("a draft never holds the Text kind"),
        }
        Ok(self.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::EntityId as Id;

    #[test]
    fn rect_draft_commits_normalized_bounds() {
        let mut store = EntityStore::new();
        let mut draft = DraftState::new(EntityKind::Rect, LayerId(1), EntityFlags::default(), DraftStyle::default(), (10.0, 10.0)).unwrap();
        draft.update((0.0, 0.0));
        draft.commit(Id(1), &mut store).unwrap();
        let r = store.find_rect(Id(1)).unwrap();
        assert_eq!((r.x, r.y, r.w, r.h), (0.0, 0.0, 10.0, 10.0));
    }

    #[test]
    fn polyline_draft_requires_two_vertices() {
        let mut store = EntityStore::new();
        let draft = DraftState::new(EntityKind::Polyline, LayerId(1), EntityFlags::default(), DraftStyle::default(), (0.0, 0.0)).unwrap();
        assert!(draft.commit(Id(1), &mut store).is_err());
    }

    #[test]
    fn polyline_draft_grows_with_added_vertices() {
        let mut store = EntityStore::new();
        let mut draft = DraftState::new(EntityKind::Polyline, LayerId(1), EntityFlags::default(), DraftStyle::default(), (0.0, 0.0)).unwrap();
        draft.add_vertex((5.0, 0.0)).unwrap();
        draft.update((5.0, 5.0));
        draft.commit(Id(1), &mut store).unwrap();
        let pl = store.find_polyline(Id(1)).unwrap();
        assert_eq!(store.polyline_points(pl), &[(0.0, 0.0), (5.0, 0.0), (5.0, 5.0)]);
    }

    #[test]
    fn text_kind_is_rejected_at_begin() {
        assert!(DraftState::new(EntityKind::Text, LayerId(1), EntityFlags::default(), DraftStyle::default(), (0.0, 0.0)).is_err());
    }
}
