//! Per-entity-kind before/after snapshots (spec.md §4.7 "Entry"). A
//! snapshot is a self-contained copy of one entity's record — for
//! `Polyline` that means its actual point list, not an arena
//! `{offset,count}` window, since an undo/redo apply must not assume the
//! point arena is in the same layout it was captured from.

use core_store::{Arrow, Circle, EntityStore, Line, Polygon, Rect};
use core_text::{TextBoxMode, TextAlign, TextCaretState, TextRec, TextRun, TextStore};
use core_types::{EntityId, EntityKind, LayerId};

#[derive(Debug, Clone, PartialEq)]
pub struct PolylineSnapshot {
    pub layer_id: LayerId,
    pub flags: core_store::EntityFlags,
    pub points: Vec<(f32, f32)>,
    pub rgba: core_types::Rgba,
    pub enabled: bool,
    pub stroke_width_px: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextSnapshot {
    pub layer_id: LayerId,
    pub flags: core_store::EntityFlags,
    pub x: f32,
    pub y: f32,
    pub rotation: f32,
    pub box_mode: TextBoxMode,
    pub align: TextAlign,
    pub constraint_width: f32,
    pub content: String,
    pub runs: Vec<TextRun>,
    pub caret: TextCaretState,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EntitySnapshot {
    Rect(Rect),
    Line(Line),
    Polyline(PolylineSnapshot),
    Circle(Circle),
    Polygon(Polygon),
    Arrow(Arrow),
    Text(TextSnapshot),
}

impl EntitySnapshot {
    pub fn kind(&self) -> EntityKind {
        match self {
            EntitySnapshot::Rect(_) => EntityKind::Rect,
            EntitySnapshot::Line(_) => EntityKind::Line,
            EntitySnapshot::Polyline(_) => EntityKind::Polyline,
            EntitySnapshot::Circle(_) => EntityKind::Circle,
            EntitySnapshot::Polygon(_) => EntityKind::Polygon,
            EntitySnapshot::Arrow(_) => EntityKind::Arrow,
            EntitySnapshot::Text(_) => EntityKind::Text,
        }
    }

    /// Captures `id`'s current record, if it exists, from either store.
    pub fn capture(id: EntityId, store: &EntityStore, texts: &TextStore) -> Option<EntitySnapshot> {
        match store.kind_of(id) {
            Some(EntityKind::Rect) => store.find_rect(id).cloned().map(EntitySnapshot::Rect),
            Some(EntityKind::Line) => store.find_line(id).cloned().map(EntitySnapshot::Line),
            Some(EntityKind::Polyline) => store.find_polyline(id).map(|pl| {
                EntitySnapshot::Polyline(PolylineSnapshot {
                    layer_id: pl.layer_id,
                    flags: pl.flags,
                    points: store.polyline_points(pl).to_vec(),
                    rgba: pl.rgba,
                    enabled: pl.enabled,
                    stroke_width_px: pl.stroke_width_px,
                })
            }),
            Some(EntityKind::Circle) => store.find_circle(id).cloned().map(EntitySnapshot::Circle),
            Some(EntityKind::Polygon) => store.find_polygon(id).cloned().map(EntitySnapshot::Polygon),
            Some(EntityKind::Arrow) => store.find_arrow(id).cloned().map(EntitySnapshot::Arrow),
            Some(EntityKind::Text) | None => texts.find(id).map(|t| EntitySnapshot::Text(text_snapshot(t))),
        }
    }

    /// Writes this snapshot back into the store/text-store under `id`,
    /// used by undo/redo apply.
    pub fn restore(&self, id: EntityId, store: &mut EntityStore, texts: &mut TextStore) {
        match self {
            EntitySnapshot::Rect(r) => {
                let mut r = r.clone();
                r.id = id;
                store.upsert_rect(id, r);
            }
            EntitySnapshot::Line(l) => {
                let mut l = l.clone();
                l.id = id;
                store.upsert_line(id, l);
            }
            EntitySnapshot::Polyline(p) => {
                store.upsert_polyline(id, p.layer_id, p.flags, &p.points, p.rgba, p.enabled, p.stroke_width_px);
            }
            EntitySnapshot::Circle(c) => {
                let mut c = c.clone();
                c.id = id;
                store.upsert_circle(id, c);
            }
            EntitySnapshot::Polygon(p) => {
                let mut p = p.clone();
                p.id = id;
                store.upsert_polygon(id, p);
            }
            EntitySnapshot::Arrow(a) => {
                let mut a = a.clone();
                a.id = id;
                store.upsert_arrow(id, a);
            }
            EntitySnapshot::Text(t) => {
                texts.upsert_text(
                    id,
                    t.layer_id,
                    t.flags,
                    t.x,
                    t.y,
                    t.rotation,
                    t.box_mode,
                    t.align,
                    t.constraint_width,
                );
                texts.replace_content(id, 0, texts.find(id).map(|r| r.content_len()).unwrap_or(0), &t.content);
                texts.set_runs(id, t.runs.clone());
                if let Some(rec) = texts.find_mut(id) {
                    rec.caret = t.caret;
                }
            }
        }
    }
}

fn text_snapshot(t: &TextRec) -> TextSnapshot {
    TextSnapshot {
        layer_id: t.layer_id,
        flags: t.flags,
        x: t.x,
        y: t.y,
        rotation: t.rotation,
        box_mode: t.box_mode,
        align: t.align,
        constraint_width: t.constraint_width,
        content: t.content.clone(),
        runs: t.runs.clone(),
        caret: t.caret,
    }
}

/// Removes `id` from whichever store it belongs to, used when an entity's
/// "after" state is absence (it was deleted during the transaction) and
/// undo must resurrect it, or redo must re-delete it.
pub fn remove(id: EntityId, kind: EntityKind, store: &mut EntityStore, texts: &mut TextStore) {
    if kind == EntityKind::Text {
        texts.delete(id);
    } else {
        store.delete_entity(id);
    }
}
