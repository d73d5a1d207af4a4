//! Per-kind AABB computation (spec.md §4.5 "AABBs per kind").

use core_store::{Arrow, Circle, EntityStore, Line, Polygon, Polyline, Rect};
use core_text::TextRec;
use core_types::Aabb;

pub fn rect_aabb(rect: &Rect) -> Aabb {
    Aabb {
        min_x: rect.x,
        min_y: rect.y,
        max_x: rect.x + rect.w,
        max_y: rect.y + rect.h,
    }
}

pub fn line_aabb(line: &Line) -> Aabb {
    Aabb::from_points([(line.x0, line.y0), (line.x1, line.y1)])
}

pub fn polyline_aabb(polyline: &Polyline, store: &EntityStore) -> Aabb {
    Aabb::from_points(store.polyline_points(polyline).iter().copied())
}

/// Circle/Polygon both use the conservative `center ± max(rx, ry)` box
/// (spec.md §4.5), ignoring rotation/scale for the broad-phase box.
pub fn circle_aabb(circle: &Circle) -> Aabb {
    let r = circle.rx.max(circle.ry);
    Aabb {
        min_x: circle.cx - r,
        min_y: circle.cy - r,
        max_x: circle.cx + r,
        max_y: circle.cy + r,
    }
}

pub fn polygon_aabb(polygon: &Polygon) -> Aabb {
    let r = polygon.rx.max(polygon.ry);
    Aabb {
        min_x: polygon.cx - r,
        min_y: polygon.cy - r,
        max_x: polygon.cx + r,
        max_y: polygon.cy + r,
    }
}

pub fn arrow_aabb(arrow: &Arrow) -> Aabb {
    Aabb::from_points([(arrow.ax, arrow.ay), (arrow.bx, arrow.by)]).expanded(arrow.head.max(0.0))
}

pub fn text_aabb(text: &TextRec) -> Aabb {
    Aabb {
        min_x: text.x + text.bounds.min_x,
        min_y: text.y + text.bounds.min_y,
        max_x: text.x + text.bounds.max_x,
        max_y: text.y + text.bounds.max_y,
    }
}
