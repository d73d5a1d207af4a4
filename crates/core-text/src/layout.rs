//! The layout contract the core depends on (spec.md §4.8 "Layout
//! contract"). Shaping and line-breaking are external collaborators; this
//! module only names the shape of what they hand back.

use core_types::EntityId;

/// One shaped glyph, positioned relative to its line's origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlyphInstance {
    pub cluster_index: u32,
    pub glyph_id: u32,
    pub x_advance: f32,
    pub x_offset: f32,
    pub y_offset: f32,
}

/// One laid-out line: a contiguous run of glyphs plus baseline metrics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutLine {
    pub start_glyph: u32,
    pub glyph_count: u32,
    pub ascent: f32,
    pub line_height: f32,
    pub x_offset: f32,
}

/// The full layout result for one text entity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextLayout {
    pub lines: Vec<LayoutLine>,
    pub glyphs: Vec<GlyphInstance>,
}

impl TextLayout {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// The contract an external shaping/layout engine must satisfy. `core-text`
/// calls through this trait; it ships no implementation of its own (no
/// shaper, no rasterizer — spec.md §1 Out of scope).
pub trait LayoutProvider {
    /// Idempotent: lays out `id` from its current content/runs, populating
    /// its `TextLayout` and bounds. Called directly by a host that wants to
    /// force a relayout regardless of the dirty set.
    fn layout_text(&mut self, id: EntityId) -> Option<TextLayout>;

    /// No-op if `id` is not in the dirty set; otherwise behaves like
    /// `layout_text`.
    fn ensure_layout(&mut self, id: EntityId) -> Option<TextLayout>;

    /// Lays out every currently-dirty text and returns the ids it touched,
    /// so the caller can clear the dirty set and refresh render ranges.
    fn layout_dirty_texts(&mut self, dirty: &[EntityId]) -> Vec<EntityId>;
}
