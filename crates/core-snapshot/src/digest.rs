//! Document digest (spec.md §4.11): a 64-bit FNV-1a over a canonical walk
//! of state — layer records by order, entity records by ascending id per
//! kind, draw order, selection, text content and runs, and
//! `nextEntityId`. Floats are canonicalized before hashing so `-0.0` and
//! `NaN` don't produce digest drift across equivalent documents.

use core_store::EntityStore;
use core_text::TextStore;
use core_types::Fnv1a;

fn hash_rgba(h: &mut Fnv1a, c: core_types::Rgba) {
    h.write_f32_canonical(c.r);
    h.write_f32_canonical(c.g);
    h.write_f32_canonical(c.b);
    h.write_f32_canonical(c.a);
}

/// One-shot digest over the full document. `DigestState` wraps this with a
/// dirty-then-recompute cache, the same idiom `core-render`'s buffers use
/// for their own generation counters.
pub fn digest(store: &EntityStore, texts: &TextStore) -> (u32, u32) {
    let mut h = Fnv1a::new();

    let mut layers: Vec<_> = store.layers().iter().collect();
    layers.sort_by_key(|l| l.order);
    for layer in layers {
        h.write_u32(layer.id.0);
        h.write_u32(layer.order as u32);
        h.write_u32(layer.flags.bits());
        h.write(layer.name.as_bytes());
        hash_rgba(&mut h, layer.style.stroke);
        hash_rgba(&mut h, layer.style.fill);
        hash_rgba(&mut h, layer.style.text_color);
        hash_rgba(&mut h, layer.style.text_background);
    }

    let mut rects: Vec<_> = store.rects().collect();
    rects.sort_by_key(|r| r.id.0);
    for r in rects {
        h.write_u32(r.id.0);
        h.write_u32(r.layer_id.0);
        h.write_u32(r.flags.bits());
        h.write_f32_canonical(r.x);
        h.write_f32_canonical(r.y);
        h.write_f32_canonical(r.w);
        h.write_f32_canonical(r.h);
        hash_rgba(&mut h, r.fill);
        hash_rgba(&mut h, r.stroke);
        h.write_u32(r.stroke_enabled as u32);
        h.write_f32_canonical(r.stroke_width_px);
    }

    let mut lines: Vec<_> = store.lines().collect();
    lines.sort_by_key(|l| l.id.0);
    for l in lines {
        h.write_u32(l.id.0);
        h.write_u32(l.layer_id.0);
        h.write_u32(l.flags.bits());
        h.write_f32_canonical(l.x0);
        h.write_f32_canonical(l.y0);
        h.write_f32_canonical(l.x1);
        h.write_f32_canonical(l.y1);
        hash_rgba(&mut h, l.rgba);
        h.write_u32(l.enabled as u32);
        h.write_f32_canonical(l.stroke_width_px);
    }

    let mut polylines: Vec<_> = store.polylines().collect();
    polylines.sort_by_key(|p| p.id.0);
    for p in polylines {
        h.write_u32(p.id.0);
        h.write_u32(p.layer_id.0);
        h.write_u32(p.flags.bits());
        let points = store.polyline_points(p);
        h.write_u32(points.len() as u32);
        for &(x, y) in points {
            h.write_f32_canonical(x);
            h.write_f32_canonical(y);
        }
        hash_rgba(&mut h, p.rgba);
        h.write_u32(p.enabled as u32);
        h.write_f32_canonical(p.stroke_width_px);
    }

    let mut circles: Vec<_> = store.circles().collect();
    circles.sort_by_key(|c| c.id.0);
    for c in circles {
        h.write_u32(c.id.0);
        h.write_u32(c.layer_id.0);
        h.write_u32(c.flags.bits());
        h.write_f32_canonical(c.cx);
        h.write_f32_canonical(c.cy);
        h.write_f32_canonical(c.rx);
        h.write_f32_canonical(c.ry);
        h.write_f32_canonical(c.rot);
        h.write_f32_canonical(c.sx);
        h.write_f32_canonical(c.sy);
        hash_rgba(&mut h, c.fill);
        hash_rgba(&mut h, c.stroke);
        h.write_u32(c.stroke_flags.bits());
    }

    let mut polygons: Vec<_> = store.polygons().collect();
    polygons.sort_by_key(|p| p.id.0);
    for p in polygons {
        h.write_u32(p.id.0);
        h.write_u32(p.layer_id.0);
        h.write_u32(p.flags.bits());
        h.write_f32_canonical(p.cx);
        h.write_f32_canonical(p.cy);
        h.write_f32_canonical(p.rx);
        h.write_f32_canonical(p.ry);
        h.write_f32_canonical(p.rot);
        h.write_f32_canonical(p.sx);
        h.write_f32_canonical(p.sy);
        hash_rgba(&mut h, p.fill);
        hash_rgba(&mut h, p.stroke);
        h.write_u32(p.stroke_flags.bits());
        h.write_u32(p.sides);
    }

    let mut arrows: Vec<_> = store.arrows().collect();
    arrows.sort_by_key(|a| a.id.0);
    for a in arrows {
        h.write_u32(a.id.0);
        h.write_u32(a.layer_id.0);
        h.write_u32(a.flags.bits());
        h.write_f32_canonical(a.ax);
        h.write_f32_canonical(a.ay);
        h.write_f32_canonical(a.bx);
        h.write_f32_canonical(a.by);
        h.write_f32_canonical(a.head);
        hash_rgba(&mut h, a.rgba);
        h.write_f32_canonical(a.stroke_width_px);
    }

    h.write_u32(store.draw_order().len() as u32);
    for id in store.draw_order() {
        h.write_u32(id.0);
    }

    h.write_u32(store.selection().ids().len() as u32);
    for id in store.selection().ids() {
        h.write_u32(id.0);
    }

    let mut texts_sorted: Vec<_> = texts.iter().collect();
    texts_sorted.sort_by_key(|t| t.id.0);
    h.write_u32(texts_sorted.len() as u32);
    for t in texts_sorted {
        h.write_u32(t.id.0);
        h.write(t.content.as_bytes());
        h.write_u32(t.runs.len() as u32);
        for run in &t.runs {
            h.write_u32(run.start_index);
            h.write_u32(run.length);
            h.write_u32(run.font_id);
            h.write_f32_canonical(run.font_size);
            hash_rgba(&mut h, run.color);
            h.write_u32(run.flags.bits() as u32);
        }
    }

    h.write_u32(store.next_entity_id());

    h.finish_lo_hi()
}

/// Dirty-then-recompute cache over [`digest`], mirroring the lazy-rebuild
/// idiom `core-render`'s `RenderBuffers`/`GlyphQuadBuffer` use for their own
/// generation counters: a mutation marks the cache dirty, and the next
/// query recomputes once and caches the result.
#[derive(Debug, Default, Clone, Copy)]
pub struct DigestState {
    cached: Option<(u32, u32)>,
}

impl DigestState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_dirty(&mut self) {
        self.cached = None;
    }

    pub fn is_dirty(&self) -> bool {
        self.cached.is_none()
    }

    pub fn digest(&mut self, store: &EntityStore, texts: &TextStore) -> (u32, u32) {
        if let Some(cached) = self.cached {
            return cached;
        }
        let value = digest(store, texts);
        self.cached = Some(value);
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_store::{EntityFlags, Rect};
    use core_types::{EntityId, LayerId, Rgba};

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

    #[test]
    fn digest_is_stable_for_equal_state_and_changes_on_mutation() {
        let mut store = EntityStore::new();
        let texts = TextStore::new();
        store.upsert_rect(EntityId(1), rect(1, 0.0));
        let d1 = digest(&store, &texts);
        let d2 = digest(&store, &texts);
        assert_eq!(d1, d2);

        store.upsert_rect(EntityId(1), rect(1, 5.0));
        let d3 = digest(&store, &texts);
        assert_ne!(d1, d3);
    }

    #[test]
    fn digest_state_matches_one_shot_digest() {
        let mut store = EntityStore::new();
        let texts = TextStore::new();
        store.upsert_rect(EntityId(1), rect(1, 0.0));

        let mut state = DigestState::new();
        assert_eq!(state.digest(&store, &texts), digest(&store, &texts));

        store.upsert_rect(EntityId(1), rect(1, 9.0));
        state.mark_dirty();
        assert_eq!(state.digest(&store, &texts), digest(&store, &texts));
    }

    #[test]
    fn negative_zero_and_positive_zero_hash_identically() {
        let mut a = EntityStore::new();
        let mut b = EntityStore::new();
        let texts = TextStore::new();
        a.upsert_rect(EntityId(1), rect(1, 0.0));
        b.upsert_rect(EntityId(1), rect(1, -0.0));
        assert_eq!(digest(&a, &texts), digest(&b, &texts));
    }
}
