//! Render buffer builder (spec.md §4.4, §4.8): tessellates visible
//! entities into flat GPU vertex buffers, assembles a text glyph quad
//! buffer against the `core-text` layout/atlas contracts, and tracks a
//! single monotonically increasing generation across both.
//!
//! Invariants / Integration Points:
//! - [`buffers::RenderBuffers`] owns the triangle/line vertex buffers and
//!   per-entity [`buffers::RenderRange`]s; [`glyph::GlyphQuadBuffer`] owns
//!   the separate text quad buffer. Neither buffer ever mixes the other's
//!   vertex data (spec.md §4.4 "Text: vertex data lives in a separate
//!   glyph quad buffer").
//! - [`RenderModel`] is the one type downstream crates (`core-engine`)
//!   touch; it composes both buffers and exposes a single `dirty`/
//!   `generation` surface via [`RenderDirty`].
//!
//! Hash & Cache Lifecycle: a full shape-buffer rebuild and a full glyph
//! rebuild are independent events — moving an entity dirties only
//! [`buffers::RenderBuffers`], editing text content dirties only
//! [`glyph::GlyphQuadBuffer`] — but both bump the shared `generation`
//! counter so a host polling for "did anything render-visible change"
//! only needs to watch one number.

pub mod buffers;
pub mod glyph;
pub mod style;
pub mod tessellate;

pub use buffers::{EntityRanges, RenderBuffers, RenderRange};
pub use glyph::GlyphQuadBuffer;
pub use style::{is_visible, resolve, ResolvedStyle};

use bitflags::bitflags;

use core_store::EntityStore;
use core_text::{GlyphAtlas, LayoutProvider, TextStore};
use core_types::EntityId;

bitflags! {
    /// Which half of the render model needs a rebuild on the next
    /// [`RenderModel::ensure_built`] call.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RenderDirty: u8 {
        const SHAPES = 1 << 0;
        const GLYPHS = 1 << 1;
    }
}

/// Composes the shape and glyph buffers behind one generation counter.
#[derive(Debug, Default)]
pub struct RenderModel {
    shapes: RenderBuffers,
    glyphs: GlyphQuadBuffer,
    generation: u64,
}

impl RenderModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shapes(&self) -> &RenderBuffers {
        &self.shapes
    }

    pub fn glyphs(&self) -> &GlyphQuadBuffer {
        &self.glyphs
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn mark_shapes_dirty(&mut self) {
        self.shapes.mark_dirty();
    }

    pub fn invalidate_glyphs(&mut self, id: EntityId) {
        self.glyphs.invalidate(id);
    }

    pub fn refresh_entity_render_range(&mut self, id: EntityId, store: &EntityStore, view_scale: f32) -> bool {
        self.shapes.refresh_entity_render_range(id, store, view_scale)
    }

    /// Rebuilds only the shape buffers (triangles/lines), leaving glyphs
    /// untouched. `getPositionBufferMeta`/`getLineBufferMeta` (spec.md
    /// §4.4) query the shape half alone and shouldn't need a host-supplied
    /// `LayoutProvider`/`GlyphAtlas` just to read a vertex count.
    pub fn ensure_shapes_built(&mut self, store: &EntityStore, texts: &TextStore, view_scale: f32) -> bool {
        let built = self.shapes.ensure_built(store, texts, view_scale);
        if built {
            self.generation += 1;
        }
        built
    }

    pub fn remove_entity(&mut self, id: EntityId) {
        self.shapes.remove_entity(id);
        self.glyphs.invalidate(id);
    }

    /// Rebuilds whichever buffers are dirty and returns the dirty flags
    /// that were actually serviced this call.
    pub fn ensure_built(
        &mut self,
        store: &EntityStore,
        texts: &mut TextStore,
        view_scale: f32,
        layout: &mut dyn LayoutProvider,
        atlas: &mut dyn GlyphAtlas,
    ) -> RenderDirty {
        let mut serviced = RenderDirty::empty();
        if self.shapes.ensure_built(store, texts, view_scale) {
            serviced |= RenderDirty::SHAPES;
        }
        let glyph_generation_before = self.glyphs.generation();
        self.glyphs.rebuild(store, texts, layout, atlas);
        if self.glyphs.generation() != glyph_generation_before {
            serviced |= RenderDirty::GLYPHS;
        }
        if !serviced.is_empty() {
            self.generation += 1;
        }
        serviced
    }

    pub fn clear(&mut self) {
        self.shapes.clear();
        self.glyphs.clear();
        self.generation += 1;
    }
}
