//! Point pick and marquee queries (spec.md §4.5 "Point pick", "Marquee").

use core_store::{Arrow, Circle, EntityStore, Line, Polygon, Polyline, Rect};
use core_text::{TextRec, TextStore};
use core_types::{Aabb, EntityId, EntityKind};

use crate::aabb;
use crate::grid::SpatialIndex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarqueeMode {
    Window,
    Crossing,
}

/// Context bundle threaded through every distance rule — the pick/marquee
/// functions only need read access to the document, never mutate it.
pub struct PickContext<'a> {
    pub store: &'a EntityStore,
    pub texts: &'a TextStore,
    pub view_scale: f32,
}

fn point_seg_distance(px: f32, py: f32, x0: f32, y0: f32, x1: f32, y1: f32) -> f32 {
    let (dx, dy) = (x1 - x0, y1 - y0);
    let len_sq = dx * dx + dy * dy;
    let t = if len_sq > 0.0 {
        (((px - x0) * dx + (py - y0) * dy) / len_sq).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let (cx, cy) = (x0 + t * dx, y0 + t * dy);
    ((px - cx).powi(2) + (py - cy).powi(2)).sqrt()
}

fn half_stroke(stroke_width_px: f32, view_scale: f32) -> f32 {
    if view_scale <= 0.0 {
        0.0
    } else {
        stroke_width_px / (2.0 * view_scale)
    }
}

/// Even-odd ray cast: true if `(px, py)` is inside the polygon described by
/// `points` (closed implicitly between the last and first vertex).
fn point_in_polygon(px: f32, py: f32, points: &[(f32, f32)]) -> bool {
    let mut inside = false;
    let n = points.len();
    if n < 3 {
        return false;
    }
    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = points[i];
        let (xj, yj) = points[j];
        if ((yi > py) != (yj > py)) && (px < (xj - xi) * (py - yi) / (yj - yi) + xi) {
            inside = !inside;
        }
        j = i;
    }
    inside
}

fn min_edge_distance(px: f32, py: f32, points: &[(f32, f32)]) -> f32 {
    let n = points.len();
    let mut best = f32::INFINITY;
    for i in 0..n {
        let (x0, y0) = points[i];
        let (x1, y1) = points[(i + 1) % n];
        best = best.min(point_seg_distance(px, py, x0, y0, x1, y1));
    }
    best
}

fn polygon_points(polygon: &Polygon) -> Vec<(f32, f32)> {
    let sides = polygon.sides.max(3);
    (0..sides)
        .map(|i| {
            let theta = polygon.rot + (i as f32) * std::f32::consts::TAU / sides as f32;
            let (sin, cos) = theta.sin_cos();
            (
                polygon.cx + cos * polygon.rx * polygon.sx,
                polygon.cy + sin * polygon.ry * polygon.sy,
            )
        })
        .collect()
}

fn rect_distance(rect: &Rect, px: f32, py: f32) -> f32 {
    let opaque = rect.fill.a > 0.0;
    let inside = px >= rect.x && px <= rect.x + rect.w && py >= rect.y && py <= rect.y + rect.h;
    if opaque && inside {
        0.0
    } else {
        aabb::rect_aabb(rect).distance_to_point(px, py)
    }
}

fn line_distance(line: &Line, px: f32, py: f32, view_scale: f32) -> f32 {
    let d = point_seg_distance(px, py, line.x0, line.y0, line.x1, line.y1);
    (d - half_stroke(line.stroke_width_px, view_scale)).max(0.0)
}

fn polyline_distance(polyline: &Polyline, pts: &[(f32, f32)], px: f32, py: f32, view_scale: f32) -> f32 {
    if pts.len() < 2 {
        return f32::INFINITY;
    }
    let mut best = f32::INFINITY;
    for w in pts.windows(2) {
        best = best.min(point_seg_distance(px, py, w[0].0, w[0].1, w[1].0, w[1].1));
    }
    (best - half_stroke(polyline.stroke_width_px, view_scale)).max(0.0)
}

fn circle_distance(circle: &Circle, px: f32, py: f32) -> f32 {
    let d = ((px - circle.cx).powi(2) + (py - circle.cy).powi(2)).sqrt();
    (d - circle.rx.max(circle.ry)).max(0.0)
}

fn polygon_distance(polygon: &Polygon, px: f32, py: f32) -> f32 {
    let pts = polygon_points(polygon);
    if point_in_polygon(px, py, &pts) {
        0.0
    } else {
        min_edge_distance(px, py, &pts)
    }
}

fn arrow_distance(arrow: &Arrow, px: f32, py: f32, view_scale: f32) -> f32 {
    let shaft = point_seg_distance(px, py, arrow.ax, arrow.ay, arrow.bx, arrow.by);
    let shaft_d = (shaft - half_stroke(arrow.stroke_width_px, view_scale)).max(0.0);

    // Arrowhead: an isoceles triangle at `b`, base perpendicular to the
    // shaft, `head` long. Conservative inside test via the same ray cast
    // used for Polygon.
    let (dx, dy) = (arrow.bx - arrow.ax, arrow.by - arrow.ay);
    let len = (dx * dx + dy * dy).sqrt();
    if len <= f32::EPSILON {
        return shaft_d;
    }
    let (ux, uy) = (dx / len, dy / len);
    let (nx, ny) = (-uy, ux);
    let half_base = arrow.head * 0.5;
    let base_x = arrow.bx - ux * arrow.head;
    let base_y = arrow.by - uy * arrow.head;
    let tri = [
        (arrow.bx, arrow.by),
        (base_x + nx * half_base, base_y + ny * half_base),
        (base_x - nx * half_base, base_y - ny * half_base),
    ];
    if point_in_polygon(px, py, &tri) {
        0.0
    } else {
        shaft_d.min(min_edge_distance(px, py, &tri))
    }
}

fn text_distance(text: &TextRec, px: f32, py: f32) -> f32 {
    let bounds = aabb::text_aabb(text);
    if bounds.contains_point(px, py) {
        0.0
    } else {
        bounds.distance_to_point(px, py)
    }
}

/// Computes the per-kind distance rule (spec.md §4.5 table) for one entity.
pub fn distance_to(ctx: &PickContext, id: EntityId, px: f32, py: f32) -> Option<f32> {
    match ctx.store.kind_of(id) {
        Some(EntityKind::Rect) => ctx.store.find_rect(id).map(|r| rect_distance(r, px, py)),
        Some(EntityKind::Line) => ctx
            .store
            .find_line(id)
            .map(|l| line_distance(l, px, py, ctx.view_scale)),
        Some(EntityKind::Polyline) => ctx.store.find_polyline(id).map(|pl| {
            let pts = ctx.store.polyline_points(pl);
            polyline_distance(pl, pts, px, py, ctx.view_scale)
        }),
        Some(EntityKind::Circle) => ctx.store.find_circle(id).map(|c| circle_distance(c, px, py)),
        Some(EntityKind::Polygon) => ctx.store.find_polygon(id).map(|p| polygon_distance(p, px, py)),
        Some(EntityKind::Arrow) => ctx
            .store
            .find_arrow(id)
            .map(|a| arrow_distance(a, px, py, ctx.view_scale)),
        Some(EntityKind::Text) => ctx.texts.find(id).map(|t| text_distance(t, px, py)),
        None => ctx.texts.find(id).map(|t| text_distance(t, px, py)),
    }
}

pub fn aabb_of(ctx: &PickContext, id: EntityId) -> Option<Aabb> {
    match ctx.store.kind_of(id) {
        Some(EntityKind::Rect) => ctx.store.find_rect(id).map(aabb::rect_aabb),
        Some(EntityKind::Line) => ctx.store.find_line(id).map(aabb::line_aabb),
        Some(EntityKind::Polyline) => ctx.store.find_polyline(id).map(|pl| aabb::polyline_aabb(pl, ctx.store)),
        Some(EntityKind::Circle) => ctx.store.find_circle(id).map(aabb::circle_aabb),
        Some(EntityKind::Polygon) => ctx.store.find_polygon(id).map(aabb::polygon_aabb),
        Some(EntityKind::Arrow) => ctx.store.find_arrow(id).map(aabb::arrow_aabb),
        Some(EntityKind::Text) => ctx.texts.find(id).map(aabb::text_aabb),
        None => ctx.texts.find(id).map(aabb::text_aabb),
    }
}

/// Point pick (spec.md §4.5 "Point pick"): queries the broad-phase grid,
/// keeps candidates within `tolerance`, ranks by `(ascending distance,
/// descending zIndex)` and returns the winner's id, or `EntityId::NONE`.
pub fn pick(ctx: &PickContext, grid: &SpatialIndex, x: f32, y: f32, tolerance: f32) -> EntityId {
    let query_box = Aabb {
        min_x: x - tolerance,
        min_y: y - tolerance,
        max_x: x + tolerance,
        max_y: y + tolerance,
    };
    let mut best: Option<(f32, usize, EntityId)> = None;
    for id in grid.query_candidates(&query_box) {
        let Some(d) = distance_to(ctx, id, x, y) else {
            continue;
        };
        if d > tolerance {
            continue;
        }
        let z = grid.z_index(id);
        let better = match best {
            None => true,
            Some((bd, bz, _)) => d < bd || (d == bd && z > bz),
        };
        if better {
            best = Some((d, z, id));
        }
    }
    best.map(|(_, _, id)| id).unwrap_or(EntityId::NONE)
}

/// Rectangular query (spec.md §4.5 "Marquee" `queryArea`): every id whose
/// AABB intersects `rect`.
pub fn query_area(ctx: &PickContext, grid: &SpatialIndex, rect: Aabb) -> Vec<EntityId> {
    grid.query_candidates(&rect)
        .into_iter()
        .filter(|id| aabb_of(ctx, *id).is_some_and(|a| a.intersects(&rect)))
        .collect()
}

/// Marquee select with hit mode, de-duplicated and returned in draw order.
pub fn query_marquee(
    ctx: &PickContext,
    grid: &SpatialIndex,
    rect: Aabb,
    mode: MarqueeMode,
    draw_order: &[EntityId],
) -> Vec<EntityId> {
    let mut hits: Vec<EntityId> = grid
        .query_candidates(&rect)
        .into_iter()
        .filter(|id| {
            aabb_of(ctx, *id).is_some_and(|a| match mode {
                MarqueeMode::Window => rect.contains(&a),
                MarqueeMode::Crossing => rect.intersects(&a),
            })
        })
        .collect();
    hits.sort_by_key(|id| draw_order.iter().position(|d| d == id).unwrap_or(usize::MAX));
    hits.dedup();
    hits
}
