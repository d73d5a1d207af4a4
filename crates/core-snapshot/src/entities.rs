//! `ENTS` section codec (spec.md §4.3): per-kind record arrays in a fixed
//! field order, ids ascending within each kind, followed by the flattened
//! polyline point array. Record field layout mirrors `core-history`'s
//! entity-snapshot codec, since both are serializing the same arena
//! structs.

use core_store::{Arrow, Circle, EntityStore, Line, Polygon, Rect, StrokeFlags};
use core_types::{ByteReader, ByteWriter, EngineResult, EntityId, LayerId, Rgba};

fn write_rgba(w: &mut ByteWriter, c: Rgba) {
    w.write_f32(c.r);
    w.write_f32(c.g);
    w.write_f32(c.b);
    w.write_f32(c.a);
}

fn read_rgba(r: &mut ByteReader) -> EngineResult<Rgba> {
    Ok(Rgba::new(r.read_f32()?, r.read_f32()?, r.read_f32()?, r.read_f32()?))
}

fn sorted_by_id<'a, T>(iter: impl Iterator<Item = &'a T>, id_of: impl Fn(&T) -> EntityId) -> Vec<&'a T> {
    let mut items: Vec<&T> = iter.collect();
    items.sort_by_key(|item| id_of(item).0);
    items
}

fn write_rect(w: &mut ByteWriter, r: &Rect) {
    w.write_u32(r.id.0);
    w.write_u32(r.layer_id.0);
    w.write_u32(r.flags.bits());
    w.write_f32(r.x);
    w.write_f32(r.y);
    w.write_f32(r.w);
    w.write_f32(r.h);
    write_rgba(w, r.fill);
    write_rgba(w, r.stroke);
    w.write_u8(r.stroke_enabled as u8);
    w.write_f32(r.stroke_width_px);
}

fn read_rect(r: &mut ByteReader) -> EngineResult<Rect> {
    Ok(Rect {
        id: EntityId(r.read_u32()?),
        layer_id: LayerId(r.read_u32()?),
        flags: core_store::EntityFlags::from_bits_truncate(r.read_u32()?),
        x: r.read_f32()?,
        y: r.read_f32()?,
        w: r.read_f32()?,
        h: r.read_f32()?,
        fill: read_rgba(r)?,
        stroke: read_rgba(r)?,
        stroke_enabled: r.read_u8()? != 0,
        stroke_width_px: r.read_f32()?,
    })
}

fn write_line(w: &mut ByteWriter, l: &Line) {
    w.write_u32(l.id.0);
    w.write_u32(l.layer_id.0);
    w.write_u32(l.flags.bits());
    w.write_f32(l.x0);
    w.write_f32(l.y0);
    w.write_f32(l.x1);
    w.write_f32(l.y1);
    write_rgba(w, l.rgba);
    w.write_u8(l.enabled as u8);
    w.write_f32(l.stroke_width_px);
}

fn read_line(r: &mut ByteReader) -> EngineResult<Line> {
    Ok(Line {
        id: EntityId(r.read_u32()?),
        layer_id: LayerId(r.read_u32()?),
        flags: core_store::EntityFlags::from_bits_truncate(r.read_u32()?),
        x0: r.read_f32()?,
        y0: r.read_f32()?,
        x1: r.read_f32()?,
        y1: r.read_f32()?,
        rgba: read_rgba(r)?,
        enabled: r.read_u8()? != 0,
        stroke_width_px: r.read_f32()?,
    })
}

fn write_circle(w: &mut ByteWriter, c: &Circle) {
    w.write_u32(c.id.0);
    w.write_u32(c.layer_id.0);
    w.write_u32(c.flags.bits());
    w.write_f32(c.cx);
    w.write_f32(c.cy);
    w.write_f32(c.rx);
    w.write_f32(c.ry);
    w.write_f32(c.rot);
    w.write_f32(c.sx);
    w.write_f32(c.sy);
    write_rgba(w, c.fill);
    write_rgba(w, c.stroke);
    w.write_u32(c.stroke_flags.bits());
}

fn read_circle(r: &mut ByteReader) -> EngineResult<Circle> {
    Ok(Circle {
        id: EntityId(r.read_u32()?),
        layer_id: LayerId(r.read_u32()?),
        flags: core_store::EntityFlags::from_bits_truncate(r.read_u32()?),
        cx: r.read_f32()?,
        cy: r.read_f32()?,
        rx: r.read_f32()?,
        ry: r.read_f32()?,
        rot: r.read_f32()?,
        sx: r.read_f32()?,
        sy: r.read_f32()?,
        fill: read_rgba(r)?,
        stroke: read_rgba(r)?,
        stroke_flags: StrokeFlags::from_bits_truncate(r.read_u32()?),
    })
}

fn write_polygon(w: &mut ByteWriter, p: &Polygon) {
    w.write_u32(p.id.0);
    w.write_u32(p.layer_id.0);
    w.write_u32(p.flags.bits());
    w.write_f32(p.cx);
    w.write_f32(p.cy);
    w.write_f32(p.rx);
    w.write_f32(p.ry);
    w.write_f32(p.rot);
    w.write_f32(p.sx);
    w.write_f32(p.sy);
    write_rgba(w, p.fill);
    write_rgba(w, p.stroke);
    w.write_u32(p.stroke_flags.bits());
    w.write_u32(p.sides);
}

fn read_polygon(r: &mut ByteReader) -> EngineResult<Polygon> {
    Ok(Polygon {
        id: EntityId(r.read_u32()?),
        layer_id: LayerId(r.read_u32()?),
        flags: core_store::EntityFlags::from_bits_truncate(r.read_u32()?),
        cx: r.read_f32()?,
        cy: r.read_f32()?,
        rx: r.read_f32()?,
        ry: r.read_f32()?,
        rot: r.read_f32()?,
        sx: r.read_f32()?,
        sy: r.read_f32()?,
        fill: read_rgba(r)?,
        stroke: read_rgba(r)?,
        stroke_flags: StrokeFlags::from_bits_truncate(r.read_u32()?),
        sides: r.read_u32()?,
    })
}

fn write_arrow(w: &mut ByteWriter, a: &Arrow) {
    w.write_u32(a.id.0);
    w.write_u32(a.layer_id.0);
    w.write_u32(a.flags.bits());
    w.write_f32(a.ax);
    w.write_f32(a.ay);
    w.write_f32(a.bx);
    w.write_f32(a.by);
    w.write_f32(a.head);
    write_rgba(w, a.rgba);
    w.write_f32(a.stroke_width_px);
}

fn read_arrow(r: &mut ByteReader) -> EngineResult<Arrow> {
    Ok(Arrow {
        id: EntityId(r.read_u32()?),
        layer_id: LayerId(r.read_u32()?),
        flags: core_store::EntityFlags::from_bits_truncate(r.read_u32()?),
        ax: r.read_f32()?,
        ay: r.read_f32()?,
        bx: r.read_f32()?,
        by: r.read_f32()?,
        head: r.read_f32()?,
        rgba: read_rgba(r)?,
        stroke_width_px: r.read_f32()?,
    })
}

/// A decoded polyline header plus the point count it carries; the points
/// themselves live in the trailing flattened point array and are spliced
/// back in by [`read`].
struct PolylineHeader {
    id: EntityId,
    layer_id: LayerId,
    flags: core_store::EntityFlags,
    rgba: Rgba,
    enabled: bool,
    stroke_width_px: f32,
    point_count: u32,
}

pub fn write(w: &mut ByteWriter, store: &EntityStore) {
    let rects = sorted_by_id(store.rects(), |r| r.id);
    w.write_u32(rects.len() as u32);
    for r in rects {
        write_rect(w, r);
    }

    let lines = sorted_by_id(store.lines(), |l| l.id);
    w.write_u32(lines.len() as u32);
    for l in lines {
        write_line(w, l);
    }

    let polylines = sorted_by_id(store.polylines(), |p| p.id);
    w.write_u32(polylines.len() as u32);
    for p in &polylines {
        let points = store.polyline_points(p);
        w.write_u32(p.id.0);
        w.write_u32(p.layer_id.0);
        w.write_u32(p.flags.bits());
        w.write_u32(points.len() as u32);
        write_rgba(w, p.rgba);
        w.write_u8(p.enabled as u8);
        w.write_f32(p.stroke_width_px);
    }

    let circles = sorted_by_id(store.circles(), |c| c.id);
    w.write_u32(circles.len() as u32);
    for c in circles {
        write_circle(w, c);
    }

    let polygons = sorted_by_id(store.polygons(), |p| p.id);
    w.write_u32(polygons.len() as u32);
    for p in polygons {
        write_polygon(w, p);
    }

    let arrows = sorted_by_id(store.arrows(), |a| a.id);
    w.write_u32(arrows.len() as u32);
    for a in arrows {
        write_arrow(w, a);
    }

    let total_points: usize = polylines.iter().map(|p| store.polyline_points(p).len()).sum();
    w.write_u32(total_points as u32);
    for p in &polylines {
        for &(x, y) in store.polyline_points(p) {
            w.write_f32(x);
            w.write_f32(y);
        }
    }
}

pub fn read(r: &mut ByteReader, store: &mut EntityStore) -> EngineResult<()> {
    let rect_count = r.read_u32()? as usize;
    let mut rects = Vec::with_capacity(rect_count);
    for _ in 0..rect_count {
        rects.push(read_rect(r)?);
    }

    let line_count = r.read_u32()? as usize;
    let mut lines = Vec::with_capacity(line_count);
    for _ in 0..line_count {
        lines.push(read_line(r)?);
    }

    let polyline_count = r.read_u32()? as usize;
    let mut polyline_headers = Vec::with_capacity(polyline_count);
    for _ in 0..polyline_count {
        polyline_headers.push(PolylineHeader {
            id: EntityId(r.read_u32()?),
            layer_id: LayerId(r.read_u32()?),
            flags: core_store::EntityFlags::from_bits_truncate(r.read_u32()?),
            point_count: r.read_u32()?,
            rgba: read_rgba(r)?,
            enabled: r.read_u8()? != 0,
            stroke_width_px: r.read_f32()?,
        });
    }

    let circle_count = r.read_u32()? as usize;
    let mut circles = Vec::with_capacity(circle_count);
    for _ in 0..circle_count {
        circles.push(read_circle(r)?);
    }

    let polygon_count = r.read_u32()? as usize;
    let mut polygons = Vec::with_capacity(polygon_count);
    for _ in 0..polygon_count {
        polygons.push(read_polygon(r)?);
    }

    let arrow_count = r.read_u32()? as usize;
    let mut arrows = Vec::with_capacity(arrow_count);
    for _ in 0..arrow_count {
        arrows.push(read_arrow(r)?);
    }

    let total_points = r.read_u32()? as usize;
    let mut points = Vec::with_capacity(total_points);
    for _ in 0..total_points {
        points.push((r.read_f32()?, r.read_f32()?));
    }

    for rect in rects {
        store.upsert_rect(rect.id, rect);
    }
    for line in lines {
        store.upsert_line(line.id, line);
    }
    let mut cursor = 0usize;
    for header in polyline_headers {
        let count = header.point_count as usize;
        let slice = &points[cursor..cursor + count];
        cursor += count;
        store.upsert_polyline(header.id, header.layer_id, header.flags, slice, header.rgba, header.enabled, header.stroke_width_px);
    }
    for circle in circles {
        store.upsert_circle(circle.id, circle);
    }
    for polygon in polygons {
        store.upsert_polygon(polygon.id, polygon);
    }
    for arrow in arrows {
        store.upsert_arrow(arrow.id, arrow);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_store::EntityFlags;
    use core_types::Rgba;

    fn rect(id: u32) -> Rect {
        Rect {
            id: EntityId(id),
            layer_id: LayerId(1),
            flags: EntityFlags::default(),
            x: 1.0,
            y: 2.0,
            w: 3.0,
            h: 4.0,
            fill: Rgba::BLACK,
            stroke: Rgba::TRANSPARENT,
            stroke_enabled: true,
            stroke_width_px: 1.0,
        }
    }

    #[test]
    fn round_trips_mixed_kinds_and_a_zero_count_polyline() {
        let mut store = EntityStore::new();
        store.upsert_rect(EntityId(1), rect(1));
        store.upsert_polyline(EntityId(2), LayerId(1), EntityFlags::default(), &[], Rgba::BLACK, true, 1.0);
        store.upsert_polyline(EntityId(3), LayerId(1), EntityFlags::default(), &[(0.0, 0.0), (1.0, 1.0), (2.0, 0.0)], Rgba::BLACK, true, 1.0);

        let mut w = ByteWriter::new();
        write(&mut w, &store);
        let bytes = w.into_vec();

        let mut loaded = EntityStore::new();
        let mut r = ByteReader::new(&bytes);
        read(&mut r, &mut loaded).unwrap();

        assert_eq!(loaded.find_rect(EntityId(1)).unwrap().x, 1.0);
        assert_eq!(loaded.find_polyline(EntityId(2)).unwrap().count, 0);
        let p3 = loaded.find_polyline(EntityId(3)).unwrap();
        assert_eq!(loaded.polyline_points(p3), &[(0.0, 0.0), (1.0, 1.0), (2.0, 0.0)]);
    }
}
