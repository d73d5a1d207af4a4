//! Per-shape tessellation into `(x,y,z,r,g,b,a)` vertex runs (spec.md
//! §4.4 "Per-shape tessellation"). Stroke width is a host-side draw-call
//! parameter, not vertex geometry — these functions only ever emit the
//! segment/triangle positions a GPU line-list or triangle-list expects.

use core_types::Rgba;

const Z: f32 = 0.0;
const FLOATS_PER_VERTEX: usize = 7;
const MIN_CIRCLE_SEGMENTS: u32 = 8;
const MAX_CIRCLE_SEGMENTS: u32 = 128;
const TARGET_SAGITTA_PX: f32 = 0.5;

pub fn floats_per_vertex() -> usize {
    FLOATS_PER_VERTEX
}

fn push_vertex(buf: &mut Vec<f32>, x: f32, y: f32, color: Rgba) {
    buf.push(x);
    buf.push(y);
    buf.push(Z);
    buf.push(color.r);
    buf.push(color.g);
    buf.push(color.b);
    buf.push(color.a);
}

/// Segment count for a circle of on-screen `radius_px`, bounding the
/// fan's sagitta error to `TARGET_SAGITTA_PX` (spec.md §4.4).
pub fn circle_segment_count(radius_px: f32) -> u32 {
    if radius_px <= TARGET_SAGITTA_PX {
        return MIN_CIRCLE_SEGMENTS;
    }
    let theta = ((1.0 - TARGET_SAGITTA_PX / radius_px).acos()) * 2.0;
    if !theta.is_finite() || theta <= 0.0 {
        return MAX_CIRCLE_SEGMENTS;
    }
    let segments = (2.0 * std::f32::consts::PI / theta).ceil() as u32;
    segments.clamp(MIN_CIRCLE_SEGMENTS, MAX_CIRCLE_SEGMENTS)
}

fn ellipse_point(cx: f32, cy: f32, rx: f32, ry: f32, sx: f32, sy: f32, rot: f32, theta: f32) -> (f32, f32) {
    let lx = rx * sx * theta.cos();
    let ly = ry * sy * theta.sin();
    let (sin_r, cos_r) = rot.sin_cos();
    (cx + lx * cos_r - ly * sin_r, cy + lx * sin_r + ly * cos_r)
}

/// Rect fill: two triangles (6 vertices). Outline: 4 segments (8 vertices).
pub fn rect(x: f32, y: f32, w: f32, h: f32, fill: Rgba, stroke: Rgba) -> (Vec<f32>, Vec<f32>) {
    let corners = [(x, y), (x + w, y), (x + w, y + h), (x, y + h)];
    let mut tris = Vec::with_capacity(6 * FLOATS_PER_VERTEX);
    for &(vx, vy) in &[corners[0], corners[1], corners[2], corners[0], corners[2], corners[3]] {
        push_vertex(&mut tris, vx, vy, fill);
    }
    let mut lines = Vec::with_capacity(8 * FLOATS_PER_VERTEX);
    for i in 0..4 {
        let a = corners[i];
        let b = corners[(i + 1) % 4];
        push_vertex(&mut lines, a.0, a.1, stroke);
        push_vertex(&mut lines, b.0, b.1, stroke);
    }
    (tris, lines)
}

pub fn line(x0: f32, y0: f32, x1: f32, y1: f32, color: Rgba) -> Vec<f32> {
    let mut lines = Vec::with_capacity(2 * FLOATS_PER_VERTEX);
    push_vertex(&mut lines, x0, y0, color);
    push_vertex(&mut lines, x1, y1, color);
    lines
}

pub fn polyline(points: &[(f32, f32)], color: Rgba) -> Vec<f32> {
    if points.len() < 2 {
        return Vec::new();
    }
    let mut lines = Vec::with_capacity((points.len() - 1) * 2 * FLOATS_PER_VERTEX);
    for pair in points.windows(2) {
        push_vertex(&mut lines, pair[0].0, pair[0].1, color);
        push_vertex(&mut lines, pair[1].0, pair[1].1, color);
    }
    lines
}

/// Fan-triangulated ellipse/polygon. `segments` is the caller-chosen
/// vertex count: derived from screen-space radius for circles, or the
/// record's `sides` for polygons.
#[allow(clippy::too_many_arguments)]
fn ellipse_fan(
    cx: f32,
    cy: f32,
    rx: f32,
    ry: f32,
    sx: f32,
    sy: f32,
    rot: f32,
    segments: u32,
    fill: Rgba,
    stroke: Rgba,
) -> (Vec<f32>, Vec<f32>) {
    let segments = segments.max(3);
    let boundary: Vec<(f32, f32)> = (0..segments)
        .map(|i| {
            let theta = (i as f32) * std::f32::consts::TAU / (segments as f32) - std::f32::consts::FRAC_PI_2;
            ellipse_point(cx, cy, rx, ry, sx, sy, rot, theta)
        })
        .collect();

    let mut tris = Vec::with_capacity(segments as usize * 3 * FLOATS_PER_VERTEX);
    for i in 0..segments as usize {
        let a = boundary[i];
        let b = boundary[(i + 1) % segments as usize];
        push_vertex(&mut tris, cx, cy, fill);
        push_vertex(&mut tris, a.0, a.1, fill);
        push_vertex(&mut tris, b.0, b.1, fill);
    }

    let mut lines = Vec::with_capacity(segments as usize * 2 * FLOATS_PER_VERTEX);
    for i in 0..segments as usize {
        let a = boundary[i];
        let b = boundary[(i + 1) % segments as usize];
        push_vertex(&mut lines, a.0, a.1, stroke);
        push_vertex(&mut lines, b.0, b.1, stroke);
    }

    (tris, lines)
}

#[allow(clippy::too_many_arguments)]
pub fn circle(cx: f32, cy: f32, rx: f32, ry: f32, rot: f32, sx: f32, sy: f32, view_scale: f32, fill: Rgba, stroke: Rgba) -> (Vec<f32>, Vec<f32>) {
    let radius_px = rx.max(ry) * view_scale;
    let segments = circle_segment_count(radius_px);
    ellipse_fan(cx, cy, rx, ry, sx, sy, rot, segments, fill, stroke)
}

#[allow(clippy::too_many_arguments)]
pub fn polygon(cx: f32, cy: f32, rx: f32, ry: f32, rot: f32, sx: f32, sy: f32, sides: u32, fill: Rgba, stroke: Rgba) -> (Vec<f32>, Vec<f32>) {
    ellipse_fan(cx, cy, rx, ry, sx, sy, rot, sides, fill, stroke)
}

/// Shaft + triangular head (spec.md §4.4): shaft is 2 line vertices, the
/// head is 3 triangle vertices plus 3 outline segments (6 line vertices).
pub fn arrow(ax: f32, ay: f32, bx: f32, by: f32, head: f32, color: Rgba) -> (Vec<f32>, Vec<f32>) {
    let (dx, dy) = (bx - ax, by - ay);
    let len = (dx * dx + dy * dy).sqrt();
    let (dir_x, dir_y) = if len > f32::EPSILON { (dx / len, dy / len) } else { (1.0, 0.0) };
    let (perp_x, perp_y) = (-dir_y, dir_x);

    let back_x = bx - dir_x * head;
    let back_y = by - dir_y * head;
    let half = head * 0.5;
    let left = (back_x + perp_x * half, back_y + perp_y * half);
    let right = (back_x - perp_x * half, back_y - perp_y * half);

    let mut tris = Vec::with_capacity(3 * FLOATS_PER_VERTEX);
    push_vertex(&mut tris, bx, by, color);
    push_vertex(&mut tris, left.0, left.1, color);
    push_vertex(&mut tris, right.0, right.1, color);

    let mut lines = Vec::with_capacity(8 * FLOATS_PER_VERTEX);
    push_vertex(&mut lines, ax, ay, color);
    push_vertex(&mut lines, back_x, back_y, color);
    push_vertex(&mut lines, bx, by, color);
    push_vertex(&mut lines, left.0, left.1, color);
    push_vertex(&mut lines, left.0, left.1, color);
    push_vertex(&mut lines, right.0, right.1, color);
    push_vertex(&mut lines, right.0, right.1, color);
    push_vertex(&mut lines, bx, by, color);

    (tris, lines)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_emits_spec_scenario_1_vertex_counts() {
        let (tris, lines) = rect(0.0, 0.0, 10.0, 5.0, Rgba::new(1.0, 0.0, 0.0, 1.0), Rgba::BLACK);
        assert_eq!(tris.len(), 6 * FLOATS_PER_VERTEX);
        assert_eq!(lines.len(), 8 * FLOATS_PER_VERTEX);
    }

    #[test]
    fn zero_or_one_point_polyline_emits_nothing() {
        assert!(polyline(&[], Rgba::BLACK).is_empty());
        assert!(polyline(&[(0.0, 0.0)], Rgba::BLACK).is_empty());
    }

    #[test]
    fn polyline_emits_count_minus_one_segments() {
        let pts = [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)];
        let lines = polyline(&pts, Rgba::BLACK);
        assert_eq!(lines.len(), 2 * 2 * FLOATS_PER_VERTEX);
    }

    #[test]
    fn circle_segment_count_grows_with_screen_radius() {
        let small = circle_segment_count(1.0);
        let large = circle_segment_count(500.0);
        assert!(large >= small);
        assert!(small >= MIN_CIRCLE_SEGMENTS);
        assert!(large <= MAX_CIRCLE_SEGMENTS);
    }

    #[test]
    fn polygon_uses_exact_side_count() {
        let (tris, lines) = polygon(0.0, 0.0, 1.0, 1.0, 0.0, 1.0, 1.0, 6, Rgba::BLACK, Rgba::BLACK);
        assert_eq!(tris.len(), 6 * 3 * FLOATS_PER_VERTEX);
        assert_eq!(lines.len(), 6 * 2 * FLOATS_PER_VERTEX);
    }

    #[test]
    fn arrow_emits_shaft_and_head_geometry() {
        let (tris, lines) = arrow(0.0, 0.0, 10.0, 0.0, 2.0, Rgba::BLACK);
        assert_eq!(tris.len(), 3 * FLOATS_PER_VERTEX);
        assert_eq!(lines.len(), 8 * FLOATS_PER_VERTEX);
    }
}
