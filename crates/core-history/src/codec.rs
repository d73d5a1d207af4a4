//! Linear byte codec for the history stack (spec.md §4.7 "Serialization").
//! The blob this produces is opaque to `core-snapshot`, which only carries
//! it verbatim in the optional `HIST` section.

use core_store::{Layer, LayerFlags, LayerStyle};
use core_text::{TextAlign, TextBoxMode, TextCaretState, TextRun, TextStyleFlags};
use core_types::{ByteReader, ByteWriter, EngineError, EngineResult, EntityId, LayerId, Rgba};

use crate::entry::{EntityChange, HistoryEntry};
use crate::manager::HistoryManager;
use crate::snapshot::{EntitySnapshot, PolylineSnapshot, TextSnapshot};

pub const HISTORY_CODEC_VERSION: u32 = 1;

const FLAG_LAYERS_BEFORE: u32 = 1 << 0;
const FLAG_LAYERS_AFTER: u32 = 1 << 1;
const FLAG_DRAW_ORDER_BEFORE: u32 = 1 << 2;
const FLAG_DRAW_ORDER_AFTER: u32 = 1 << 3;
const FLAG_SELECTION_BEFORE: u32 = 1 << 4;
const FLAG_SELECTION_AFTER: u32 = 1 << 5;

fn write_rgba(w: &mut ByteWriter, c: Rgba) {
    w.write_f32(c.r);
    w.write_f32(c.g);
    w.write_f32(c.b);
    w.write_f32(c.a);
}

fn read_rgba(r: &mut ByteReader) -> EngineResult<Rgba> {
    Ok(Rgba::new(r.read_f32()?, r.read_f32()?, r.read_f32()?, r.read_f32()?))
}

fn write_ids(w: &mut ByteWriter, ids: &[EntityId]) {
    w.write_u32(ids.len() as u32);
    for id in ids {
        w.write_u32(id.0);
    }
}

fn read_ids(r: &mut ByteReader) -> EngineResult<Vec<EntityId>> {
    let count = r.read_u32()? as usize;
    (0..count).map(|_| Ok(EntityId(r.read_u32()?))).collect()
}

fn write_layers(w: &mut ByteWriter, layers: &[Layer]) {
    w.write_u32(layers.len() as u32);
    for layer in layers {
        w.write_u32(layer.id.0);
        w.write_i32(layer.order);
        w.write_u32(layer.flags.bits());
        w.write_string32(&layer.name);
        write_rgba(w, layer.style.stroke);
        write_rgba(w, layer.style.fill);
        write_rgba(w, layer.style.text_color);
        write_rgba(w, layer.style.text_background);
    }
}

fn read_layers(r: &mut ByteReader) -> EngineResult<Vec<Layer>> {
    let count = r.read_u32()? as usize;
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        let id = LayerId(r.read_u32()?);
        let order = r.read_i32()?;
        let flags = LayerFlags::from_bits_truncate(r.read_u32()?);
        let name = r.read_string32()?;
        let style = LayerStyle {
            stroke: read_rgba(r)?,
            fill: read_rgba(r)?,
            text_color: read_rgba(r)?,
            text_background: read_rgba(r)?,
        };
        out.push(Layer {
            id,
            order,
            flags,
            name,
            style,
        });
    }
    Ok(out)
}

fn write_snapshot(w: &mut ByteWriter, snapshot: &EntitySnapshot) {
    w.write_u8(snapshot.kind().tag());
    match snapshot {
        EntitySnapshot::Rect(r) => {
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
        EntitySnapshot::Line(l) => {
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
        EntitySnapshot::Polyline(p) => {
            w.write_u32(p.layer_id.0);
            w.write_u32(p.flags.bits());
            w.write_u32(p.points.len() as u32);
            for (x, y) in &p.points {
                w.write_f32(*x);
                w.write_f32(*y);
            }
            write_rgba(w, p.rgba);
            w.write_u8(p.enabled as u8);
            w.write_f32(p.stroke_width_px);
        }
        EntitySnapshot::Circle(c) => {
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
        EntitySnapshot::Polygon(p) => {
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
        EntitySnapshot::Arrow(a) => {
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
        EntitySnapshot::Text(t) => {
            w.write_u32(t.layer_id.0);
            w.write_u32(t.flags.bits());
            w.write_f32(t.x);
            w.write_f32(t.y);
            w.write_f32(t.rotation);
            w.write_u8(matches!(t.box_mode, TextBoxMode::FixedWidth) as u8);
            w.write_u8(match t.align {
                TextAlign::Left => 0,
                TextAlign::Center => 1,
                TextAlign::Right => 2,
            });
            w.write_f32(t.constraint_width);
            w.write_string32(&t.content);
            w.write_u32(t.runs.len() as u32);
            for run in &t.runs {
                w.write_u32(run.start_index);
                w.write_u32(run.length);
                w.write_u32(run.font_id);
                w.write_f32(run.font_size);
                write_rgba(w, run.color);
                w.write_u8(run.flags.bits());
            }
            w.write_u32(t.caret.caret);
            w.write_u8(t.caret.selection_anchor.is_some() as u8);
            w.write_u32(t.caret.selection_anchor.unwrap_or(0));
        }
    }
}

fn read_snapshot(r: &mut ByteReader) -> EngineResult<EntitySnapshot> {
    let tag = r.read_u8()?;
    let kind = core_types::EntityKind::from_tag(tag).ok_or_else(|| EngineError::InvalidPayloadSize {
        tag: "history.entity.kind".into(),
        detail: format!("unknown kind tag {tag}"),
    })?;
    use core_types::EntityKind::*;
    Ok(match kind {
        Rect => {
            let layer_id = LayerId(r.read_u32()?);
            let flags = core_store::EntityFlags::from_bits_truncate(r.read_u32()?);
            let x = r.read_f32()?;
            let y = r.read_f32()?;
            let w = r.read_f32()?;
            let h = r.read_f32()?;
            let fill = read_rgba(r)?;
            let stroke = read_rgba(r)?;
            let stroke_enabled = r.read_u8()? != 0;
            let stroke_width_px = r.read_f32()?;
            EntitySnapshot::Rect(core_store::Rect {
                id: EntityId(0),
                layer_id,
                flags,
                x,
                y,
                w,
                h,
                fill,
                stroke,
                stroke_enabled,
                stroke_width_px,
            })
        }
        Line => {
            let layer_id = LayerId(r.read_u32()?);
            let flags = core_store::EntityFlags::from_bits_truncate(r.read_u32()?);
            let x0 = r.read_f32()?;
            let y0 = r.read_f32()?;
            let x1 = r.read_f32()?;
            let y1 = r.read_f32()?;
            let rgba = read_rgba(r)?;
            let enabled = r.read_u8()? != 0;
            let stroke_width_px = r.read_f32()?;
            EntitySnapshot::Line(core_store::Line {
                id: EntityId(0),
                layer_id,
                flags,
                x0,
                y0,
                x1,
                y1,
                rgba,
                enabled,
                stroke_width_px,
            })
        }
        Polyline => {
            let layer_id = LayerId(r.read_u32()?);
            let flags = core_store::EntityFlags::from_bits_truncate(r.read_u32()?);
            let count = r.read_u32()? as usize;
            let mut points = Vec::with_capacity(count);
            for _ in 0..count {
                points.push((r.read_f32()?, r.read_f32()?));
            }
            let rgba = read_rgba(r)?;
            let enabled = r.read_u8()? != 0;
            let stroke_width_px = r.read_f32()?;
            EntitySnapshot::Polyline(PolylineSnapshot {
                layer_id,
                flags,
                points,
                rgba,
                enabled,
                stroke_width_px,
            })
        }
        Circle => {
            let layer_id = LayerId(r.read_u32()?);
            let flags = core_store::EntityFlags::from_bits_truncate(r.read_u32()?);
            let cx = r.read_f32()?;
            let cy = r.read_f32()?;
            let rx = r.read_f32()?;
            let ry = r.read_f32()?;
            let rot = r.read_f32()?;
            let sx = r.read_f32()?;
            let sy = r.read_f32()?;
            let fill = read_rgba(r)?;
            let stroke = read_rgba(r)?;
            let stroke_flags = core_store::StrokeFlags::from_bits_truncate(r.read_u32()?);
            EntitySnapshot::Circle(core_store::Circle {
                id: EntityId(0),
                layer_id,
                flags,
                cx,
                cy,
                rx,
                ry,
                rot,
                sx,
                sy,
                fill,
                stroke,
                stroke_flags,
            })
        }
        Polygon => {
            let layer_id = LayerId(r.read_u32()?);
            let flags = core_store::EntityFlags::from_bits_truncate(r.read_u32()?);
            let cx = r.read_f32()?;
            let cy = r.read_f32()?;
            let rx = r.read_f32()?;
            let ry = r.read_f32()?;
            let rot = r.read_f32()?;
            let sx = r.read_f32()?;
            let sy = r.read_f32()?;
            let fill = read_rgba(r)?;
            let stroke = read_rgba(r)?;
            let stroke_flags = core_store::StrokeFlags::from_bits_truncate(r.read_u32()?);
            let sides = r.read_u32()?;
            EntitySnapshot::Polygon(core_store::Polygon {
                id: EntityId(0),
                layer_id,
                flags,
                cx,
                cy,
                rx,
                ry,
                rot,
                sx,
                sy,
                fill,
                stroke,
                stroke_flags,
                sides,
            })
        }
        Arrow => {
            let layer_id = LayerId(r.read_u32()?);
            let flags = core_store::EntityFlags::from_bits_truncate(r.read_u32()?);
            let ax = r.read_f32()?;
            let ay = r.read_f32()?;
            let bx = r.read_f32()?;
            let by = r.read_f32()?;
            let head = r.read_f32()?;
            let rgba = read_rgba(r)?;
            let stroke_width_px = r.read_f32()?;
            EntitySnapshot::Arrow(core_store::Arrow {
                id: EntityId(0),
                layer_id,
                flags,
                ax,
                ay,
                bx,
                by,
                head,
                rgba,
                stroke_width_px,
            })
        }
        Text => {
            let layer_id = LayerId(r.read_u32()?);
            let flags = core_store::EntityFlags::from_bits_truncate(r.read_u32()?);
            let x = r.read_f32()?;
            let y = r.read_f32()?;
            let rotation = r.read_f32()?;
            let box_mode = if r.read_u8()? != 0 {
                TextBoxMode::FixedWidth
            } else {
                TextBoxMode::AutoWidth
            };
            let align = match r.read_u8()? {
                1 => TextAlign::Center,
                2 => TextAlign::Right,
                _ => TextAlign::Left,
            };
            let constraint_width = r.read_f32()?;
            let content = r.read_string32()?;
            let run_count = r.read_u32()? as usize;
            let mut runs = Vec::with_capacity(run_count);
            for _ in 0..run_count {
                runs.push(TextRun {
                    start_index: r.read_u32()?,
                    length: r.read_u32()?,
                    font_id: r.read_u32()?,
                    font_size: r.read_f32()?,
                    color: read_rgba(r)?,
                    flags: TextStyleFlags::from_bits_truncate(r.read_u8()?),
                });
            }
            let caret = r.read_u32()?;
            let has_anchor = r.read_u8()? != 0;
            let anchor = r.read_u32()?;
            EntitySnapshot::Text(TextSnapshot {
                layer_id,
                flags,
                x,
                y,
                rotation,
                box_mode,
                align,
                constraint_width,
                content,
                runs,
                caret: TextCaretState {
                    caret,
                    selection_anchor: has_anchor.then_some(anchor),
                },
            })
        }
    })
}

fn write_entity_change(w: &mut ByteWriter, change: &EntityChange) {
    w.write_u32(change.id.0);
    w.write_u8(change.existed_before as u8);
    w.write_u8(change.existed_after as u8);
    w.write_u8(0);
    w.write_u8(0);
    if let Some(before) = &change.before {
        write_snapshot(w, before);
    }
    if let Some(after) = &change.after {
        write_snapshot(w, after);
    }
}

fn read_entity_change(r: &mut ByteReader) -> EngineResult<EntityChange> {
    let id = EntityId(r.read_u32()?);
    let existed_before = r.read_u8()? != 0;
    let existed_after = r.read_u8()? != 0;
    let _pad = r.read_u8()?;
    let _pad = r.read_u8()?;
    let before = if existed_before {
        Some(retag(read_snapshot(r)?, id))
    } else {
        None
    };
    let after = if existed_after {
        Some(retag(read_snapshot(r)?, id))
    } else {
        None
    };
    Ok(EntityChange {
        id,
        existed_before,
        existed_after,
        before,
        after,
    })
}

/// Snapshots read off the wire carry a placeholder id (`0`) for the record
/// body fields that mirror the arena struct's own `id` field; this patches
/// it in from the `EntityChange`'s id, which is carried once, not per
/// snapshot side.
fn retag(mut snapshot: EntitySnapshot, id: EntityId) -> EntitySnapshot {
    match &mut snapshot {
        EntitySnapshot::Rect(r) => r.id = id,
        EntitySnapshot::Line(l) => l.id = id,
        EntitySnapshot::Polyline(_) => {}
        EntitySnapshot::Circle(c) => c.id = id,
        EntitySnapshot::Polygon(p) => p.id = id,
        EntitySnapshot::Arrow(a) => a.id = id,
        EntitySnapshot::Text(_) => {}
    }
    snapshot
}

fn write_entry(w: &mut ByteWriter, entry: &HistoryEntry) {
    let mut flags = 0u32;
    if entry.layers_before.is_some() {
        flags |= FLAG_LAYERS_BEFORE;
    }
    if entry.layers_after.is_some() {
        flags |= FLAG_LAYERS_AFTER;
    }
    if entry.draw_order_before.is_some() {
        flags |= FLAG_DRAW_ORDER_BEFORE;
    }
    if entry.draw_order_after.is_some() {
        flags |= FLAG_DRAW_ORDER_AFTER;
    }
    if entry.selection_before.is_some() {
        flags |= FLAG_SELECTION_BEFORE;
    }
    if entry.selection_after.is_some() {
        flags |= FLAG_SELECTION_AFTER;
    }

    w.write_u32(flags);
    w.write_u32(entry.next_id_before);
    w.write_u32(entry.next_id_after);
    w.write_u64(entry.generation);
    if let Some(layers) = &entry.layers_before {
        write_layers(w, layers);
    }
    if let Some(layers) = &entry.layers_after {
        write_layers(w, layers);
    }
    if let Some(order) = &entry.draw_order_before {
        write_ids(w, order);
    }
    if let Some(order) = &entry.draw_order_after {
        write_ids(w, order);
    }
    if let Some(sel) = &entry.selection_before {
        write_ids(w, sel);
    }
    if let Some(sel) = &entry.selection_after {
        write_ids(w, sel);
    }
    w.write_u32(entry.entities.len() as u32);
    for change in &entry.entities {
        write_entity_change(w, change);
    }
}

fn read_entry(r: &mut ByteReader) -> EngineResult<HistoryEntry> {
    let flags = r.read_u32()?;
    let next_id_before = r.read_u32()?;
    let next_id_after = r.read_u32()?;
    let generation = r.read_u64()?;

    let layers_before = (flags & FLAG_LAYERS_BEFORE != 0).then(|| read_layers(r)).transpose()?;
    let layers_after = (flags & FLAG_LAYERS_AFTER != 0).then(|| read_layers(r)).transpose()?;
    let draw_order_before = (flags & FLAG_DRAW_ORDER_BEFORE != 0).then(|| read_ids(r)).transpose()?;
    let draw_order_after = (flags & FLAG_DRAW_ORDER_AFTER != 0).then(|| read_ids(r)).transpose()?;
    let selection_before = (flags & FLAG_SELECTION_BEFORE != 0).then(|| read_ids(r)).transpose()?;
    let selection_after = (flags & FLAG_SELECTION_AFTER != 0).then(|| read_ids(r)).transpose()?;

    let entity_count = r.read_u32()? as usize;
    let mut entities = Vec::with_capacity(entity_count);
    for _ in 0..entity_count {
        entities.push(read_entity_change(r)?);
    }

    Ok(HistoryEntry {
        layers_before,
        layers_after,
        entities,
        draw_order_before,
        draw_order_after,
        selection_before,
        selection_after,
        next_id_before,
        next_id_after,
        generation,
    })
}

/// Encodes the whole history stack (spec.md §4.7 "encodeBytes"):
/// `version=1, entryCount, cursor, reserved`, then each entry in order.
pub fn encode_bytes(history: &HistoryManager) -> Vec<u8> {
    let mut w = ByteWriter::new();
    w.write_u32(HISTORY_CODEC_VERSION);
    w.write_u32(history.entries().len() as u32);
    w.write_u32(history.cursor() as u32);
    w.write_u32(0); // reserved
    for entry in history.entries() {
        write_entry(&mut w, entry);
    }
    w.into_vec()
}

/// Inverse of [`encode_bytes`]; rejects an unsupported version outright.
pub fn decode_bytes(bytes: &[u8]) -> EngineResult<(Vec<HistoryEntry>, usize)> {
    let mut r = ByteReader::new(bytes);
    let version = r.read_u32()?;
    if version != HISTORY_CODEC_VERSION {
        return Err(EngineError::UnsupportedVersion {
            expected: HISTORY_CODEC_VERSION,
            found: version,
        });
    }
    let entry_count = r.read_u32()? as usize;
    let cursor = r.read_u32()? as usize;
    let _reserved = r.read_u32()?;
    let mut entries = Vec::with_capacity(entry_count);
    for _ in 0..entry_count {
        entries.push(read_entry(&mut r)?);
    }
    Ok((entries, cursor))
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_store::{Circle, EntityFlags, EntityStore, Polygon, Rect, StrokeFlags};
    use core_text::TextStore;
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

    fn circle(id: u32, rx: f32) -> Circle {
        Circle {
            id: EntityId(id),
            layer_id: LayerId(1),
            flags: EntityFlags::default(),
            cx: 1.0,
            cy: 2.0,
            rx,
            ry: 3.0,
            rot: 0.0,
            sx: 1.0,
            sy: 1.0,
            fill: Rgba::BLACK,
            stroke: Rgba::BLACK,
            stroke_flags: StrokeFlags::ENABLED,
        }
    }

    fn polygon(id: u32, sides: u32) -> Polygon {
        Polygon {
            id: EntityId(id),
            layer_id: LayerId(1),
            flags: EntityFlags::default(),
            cx: 4.0,
            cy: 5.0,
            rx: 6.0,
            ry: 6.0,
            rot: 0.0,
            sx: 1.0,
            sy: 1.0,
            fill: Rgba::BLACK,
            stroke: Rgba::BLACK,
            stroke_flags: StrokeFlags::ENABLED,
            sides,
        }
    }

    #[test]
    fn encode_decode_round_trips_entry_count_cursor_and_content() {
        let mut store = EntityStore::new();
        let mut texts = TextStore::new();
        store.upsert_rect(EntityId(1), rect(1, 0.0));

        let mut history = HistoryManager::new(None);
        history.begin_entry(store.next_entity_id());
        history.mark_entity_change(EntityId(1), &store, &texts);
        store.upsert_rect(EntityId(1), rect(1, 5.0));
        history.commit_entry(store.next_entity_id(), 1, &store, &texts, None, None, None);
        history.undo(&mut store, &mut texts);

        let bytes = encode_bytes(&history);
        let (entries, cursor) = decode_bytes(&bytes).unwrap();
        assert_eq!(entries.len(), history.entries().len());
        assert_eq!(cursor, history.cursor());
        assert_eq!(entries[0], history.entries()[0]);
    }

    #[test]
    fn encode_decode_round_trips_circle_and_polygon_snapshots() {
        let mut store = EntityStore::new();
        let mut texts = TextStore::new();
        store.upsert_circle(EntityId(1), circle(1, 3.0));
        store.upsert_polygon(EntityId(2), polygon(2, 5));

        let mut history = HistoryManager::new(None);
        history.begin_entry(store.next_entity_id());
        history.mark_entity_change(EntityId(1), &store, &texts);
        history.mark_entity_change(EntityId(2), &store, &texts);
        store.upsert_circle(EntityId(1), circle(1, 9.0));
        store.upsert_polygon(EntityId(2), polygon(2, 8));
        history.commit_entry(store.next_entity_id(), 1, &store, &texts, None, None, None);

        let bytes = encode_bytes(&history);
        let (entries, cursor) = decode_bytes(&bytes).unwrap();
        assert_eq!(cursor, history.cursor());
        assert_eq!(entries, history.entries());

        history.undo(&mut store, &mut texts);
        assert_eq!(store.find_circle(EntityId(1)).unwrap().rx, 3.0);
        assert_eq!(store.find_polygon(EntityId(2)).unwrap().sides, 5);
    }

    #[test]
    fn rejects_unsupported_version() {
        let mut w = ByteWriter::new();
        w.write_u32(99);
        w.write_u32(0);
        w.write_u32(0);
        w.write_u32(0);
        let err = decode_bytes(&w.into_vec()).unwrap_err();
        assert!(matches!(err, EngineError::UnsupportedVersion { .. }));
    }
}
