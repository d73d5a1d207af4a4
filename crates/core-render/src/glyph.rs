//! Glyph quad buffer assembly (spec.md §4.8 "Quad buffer assembly"): walks
//! each visible text in draw order, turns its laid-out glyphs into 6-vertex
//! quads against the `core-text` layout/atlas contracts, and stitches the
//! per-text caches into one buffer.
//!
//! Invariants / Integration Points:
//! - Quad vertex layout is `(x,y,z,u,v,r,g,b,a)`, 9 floats per vertex.
//! - The per-text cache is keyed by id and only re-emitted for texts the
//!   layout provider reports dirty; an atlas `reset_version` bump forces
//!   every cached text to be thrown away and re-emitted before stitching.
//! - Underline/strike are solid quads sampled from the atlas's white pixel.

use ahash::AHashMap;

use core_store::EntityStore;
use core_text::{AtlasEntry, GlyphAtlas, LayoutProvider, TextLayout, TextRec, TextRun, TextStore, TextStyleFlags};
use core_types::{EntityId, Rgba};

use crate::style;

const Z: f32 = 0.0;
pub const FLOATS_PER_GLYPH_VERTEX: usize = 9;
const UNDERLINE_THICKNESS_PX: f32 = 1.0;
const STRIKE_THICKNESS_PX: f32 = 1.0;

fn push_glyph_vertex(buf: &mut Vec<f32>, x: f32, y: f32, u: f32, v: f32, color: Rgba) {
    buf.push(x);
    buf.push(y);
    buf.push(Z);
    buf.push(u);
    buf.push(v);
    buf.push(color.r);
    buf.push(color.g);
    buf.push(color.b);
    buf.push(color.a);
}

fn push_quad(buf: &mut Vec<f32>, x: f32, y: f32, w: f32, h: f32, entry: &AtlasEntry, color: Rgba) {
    let (x0, y0, x1, y1) = (x, y, x + w, y + h);
    push_glyph_vertex(buf, x0, y0, entry.u0, entry.v0, color);
    push_glyph_vertex(buf, x1, y0, entry.u1, entry.v0, color);
    push_glyph_vertex(buf, x1, y1, entry.u1, entry.v1, color);
    push_glyph_vertex(buf, x0, y0, entry.u0, entry.v0, color);
    push_glyph_vertex(buf, x1, y1, entry.u1, entry.v1, color);
    push_glyph_vertex(buf, x0, y1, entry.u0, entry.v1, color);
}

/// Binary-searches the run covering `cluster_index` (runs are sorted and
/// contiguous — spec.md §4.8).
fn run_at(runs: &[TextRun], cluster_index: u32) -> Option<&TextRun> {
    let idx = runs.partition_point(|r| r.end() <= cluster_index);
    runs.get(idx).filter(|r| cluster_index >= r.start_index && cluster_index < r.end())
}

struct RunSpan {
    flags: TextStyleFlags,
    color: Rgba,
    min_x: f32,
    max_x: f32,
    baseline_y: f32,
}

fn build_text_quads(rec: &TextRec, layout: &TextLayout, atlas: &mut dyn GlyphAtlas) -> Vec<f32> {
    let mut quads = Vec::new();
    for line in &layout.lines {
        let mut cursor_x = line.x_offset;
        let baseline_y = rec.y + line.ascent;
        let glyph_start = line.start_glyph as usize;
        let glyph_end = glyph_start + line.glyph_count as usize;
        let Some(glyphs) = layout.glyphs.get(glyph_start..glyph_end) else {
            continue;
        };

        let mut spans: Vec<RunSpan> = Vec::new();
        for glyph in glyphs {
            let gx = rec.x + cursor_x + glyph.x_offset;
            let gy = baseline_y + glyph.y_offset;
            if let Some(run) = run_at(&rec.runs, glyph.cluster_index) {
                if let Some(entry) = atlas.get_glyph(run.font_id, glyph.glyph_id, run.flags) {
                    push_quad(&mut quads, gx + entry.bearing_x, gy - entry.bearing_y, entry.width, entry.height, &entry, run.color);
                }
                if run.flags.intersects(TextStyleFlags::UNDERLINE | TextStyleFlags::STRIKE) {
                    match spans.iter_mut().find(|s| s.flags == run.flags && s.color == run.color && (cursor_x - s.max_x).abs() < f32::EPSILON) {
                        Some(span) => span.max_x = cursor_x + glyph.x_advance,
                        None => spans.push(RunSpan {
                            flags: run.flags,
                            color: run.color,
                            min_x: cursor_x,
                            max_x: cursor_x + glyph.x_advance,
                            baseline_y,
                        }),
                    }
                }
            }
            cursor_x += glyph.x_advance;
        }

        let white = atlas.white_pixel();
        for span in &spans {
            let width = (span.max_x - span.min_x).max(0.0);
            if width <= 0.0 {
                continue;
            }
            if span.flags.contains(TextStyleFlags::UNDERLINE) {
                push_quad(&mut quads, rec.x + span.min_x, span.baseline_y + 1.0, width, UNDERLINE_THICKNESS_PX, &white, span.color);
            }
            if span.flags.contains(TextStyleFlags::STRIKE) {
                push_quad(&mut quads, rec.x + span.min_x, span.baseline_y - line.ascent * 0.35, width, STRIKE_THICKNESS_PX, &white, span.color);
            }
        }
    }
    quads
}

#[derive(Debug, Clone, Default)]
pub struct GlyphQuadBuffer {
    cache: AHashMap<EntityId, Vec<f32>>,
    stitched: Vec<f32>,
    last_reset_version: u64,
    generation: u64,
}

impl GlyphQuadBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn quad_buffer(&self) -> &[f32] {
        &self.stitched
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn invalidate(&mut self, id: EntityId) {
        self.cache.remove(&id);
    }

    pub fn clear(&mut self) {
        self.cache.clear();
        self.stitched.clear();
        self.generation += 1;
    }

    /// Re-emits every dirty or atlas-invalidated text, then restitches the
    /// buffer by walking draw order (spec.md §4.8).
    pub fn rebuild(&mut self, store: &EntityStore, texts: &mut TextStore, layout: &mut dyn LayoutProvider, atlas: &mut dyn GlyphAtlas) {
        let reset = atlas.reset_version();
        if reset != self.last_reset_version {
            self.cache.clear();
            self.last_reset_version = reset;
            let ids: Vec<EntityId> = texts.iter().map(|rec| rec.id).collect();
            for id in ids {
                texts.mark_dirty(id);
            }
        }

        let dirty: Vec<EntityId> = texts.dirty_ids().collect();
        if dirty.is_empty() && reset == self.last_reset_version && !self.cache.is_empty() {
            // Nothing changed since the last build; still restitch in case
            // draw order moved without touching any text's own content.
            self.stitch(store);
            return;
        }

        for id in dirty {
            let Some(rec) = texts.find(id).cloned() else {
                self.cache.remove(&id);
                continue;
            };
            if !style::is_visible(rec.flags, store.find_layer(rec.layer_id)) {
                self.cache.remove(&id);
                texts.clear_dirty(id);
                continue;
            }
            let Some(layout_result) = layout.ensure_layout(id) else {
                texts.clear_dirty(id);
                continue;
            };
            let quads = build_text_quads(&rec, &layout_result, atlas);
            self.cache.insert(id, quads);
            texts.clear_dirty(id);
        }

        self.stitch(store);
        self.generation += 1;
        tracing::trace!(
            target: "engine.render",
            generation = self.generation,
            cached_texts = self.cache.len(),
            "glyph quad buffer rebuilt"
        );
    }

    fn stitch(&mut self, store: &EntityStore) {
        self.stitched.clear();
        for &id in store.draw_order() {
            if let Some(quads) = self.cache.get(&id) {
                self.stitched.extend_from_slice(quads);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_store::EntityFlags;
    use core_text::{LayoutLine, TextAlign, TextBoxMode};
    use core_types::LayerId;

    struct FixedLayout {
        layout: TextLayout,
    }

    impl LayoutProvider for FixedLayout {
        fn layout_text(&mut self, _id: EntityId) -> Option<TextLayout> {
            Some(self.layout.clone())
        }
        fn ensure_layout(&mut self, _id: EntityId) -> Option<TextLayout> {
            Some(self.layout.clone())
        }
        fn layout_dirty_texts(&mut self, dirty: &[EntityId]) -> Vec<EntityId> {
            dirty.to_vec()
        }
    }

    struct FixedAtlas {
        reset_version: u64,
    }

    impl GlyphAtlas for FixedAtlas {
        fn get_glyph(&mut self, _font_id: u32, _glyph_id: u32, _style_flags: TextStyleFlags) -> Option<AtlasEntry> {
            Some(AtlasEntry {
                u0: 0.0,
                v0: 0.0,
                u1: 1.0,
                v1: 1.0,
                bearing_x: 0.0,
                bearing_y: 0.0,
                width: 8.0,
                height: 12.0,
            })
        }
        fn white_pixel(&self) -> AtlasEntry {
            AtlasEntry {
                u0: 0.0,
                v0: 0.0,
                u1: 0.01,
                v1: 0.01,
                bearing_x: 0.0,
                bearing_y: 0.0,
                width: 1.0,
                height: 1.0,
            }
        }
        fn reset_version(&self) -> u64 {
            self.reset_version
        }
    }

    fn layout_with_glyphs(n: u32) -> TextLayout {
        TextLayout {
            lines: vec![LayoutLine {
                start_glyph: 0,
                glyph_count: n,
                ascent: 10.0,
                line_height: 14.0,
                x_offset: 0.0,
            }],
            glyphs: (0..n)
                .map(|i| core_text::GlyphInstance {
                    cluster_index: i,
                    glyph_id: i,
                    x_advance: 8.0,
                    x_offset: 0.0,
                    y_offset: 0.0,
                })
                .collect(),
        }
    }

    #[test]
    fn dirty_text_is_emitted_and_stitched() {
        let mut store = EntityStore::new();
        let mut texts = TextStore::new();
        let id = EntityId(1);
        texts.upsert_text(id, LayerId::NONE, EntityFlags::default(), 0.0, 0.0, 0.0, TextBoxMode::AutoWidth, TextAlign::Left, 0.0);
        texts.insert_content(id, 0, "Hi");
        texts.set_runs(
            id,
            vec![TextRun {
                start_index: 0,
                length: 2,
                font_id: 1,
                font_size: 12.0,
                color: Rgba::BLACK,
                flags: TextStyleFlags::empty(),
            }],
        );
        store.push_draw_order(id);

        let mut layout = FixedLayout { layout: layout_with_glyphs(2) };
        let mut atlas = FixedAtlas { reset_version: 0 };

        let mut buf = GlyphQuadBuffer::new();
        buf.rebuild(&store, &mut texts, &mut layout, &mut atlas);

        assert_eq!(buf.quad_buffer().len(), 2 * 6 * FLOATS_PER_GLYPH_VERTEX);
        assert!(!texts.is_dirty(id));
    }

    #[test]
    fn atlas_reset_forces_full_rebuild() {
        let mut store = EntityStore::new();
        let mut texts = TextStore::new();
        let id = EntityId(1);
        texts.upsert_text(id, LayerId::NONE, EntityFlags::default(), 0.0, 0.0, 0.0, TextBoxMode::AutoWidth, TextAlign::Left, 0.0);
        texts.insert_content(id, 0, "H");
        texts.set_runs(
            id,
            vec![TextRun {
                start_index: 0,
                length: 1,
                font_id: 1,
                font_size: 12.0,
                color: Rgba::BLACK,
                flags: TextStyleFlags::empty(),
            }],
        );
        store.push_draw_order(id);

        let mut layout = FixedLayout { layout: layout_with_glyphs(1) };
        let mut atlas = FixedAtlas { reset_version: 0 };
        let mut buf = GlyphQuadBuffer::new();
        buf.rebuild(&store, &mut texts, &mut layout, &mut atlas);
        let gen_before = buf.generation();

        atlas.reset_version = 1;
        buf.rebuild(&store, &mut texts, &mut layout, &mut atlas);
        assert!(buf.generation() > gen_before);
        assert_eq!(buf.quad_buffer().len(), 6 * FLOATS_PER_GLYPH_VERTEX);
    }
}
