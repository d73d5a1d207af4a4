//! The glyph atlas contract (spec.md §4.8 "Glyph atlas contract"). An
//! external collaborator rasterizes glyphs into a texture and reports back
//! UV rectangles; this crate only names the contract and tracks the atlas's
//! `reset_version` so the quad builder (`core-render`) can detect a
//! mid-build reset and restart its walk.

use crate::flags::TextStyleFlags;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AtlasEntry {
    pub u0: f32,
    pub v0: f32,
    pub u1: f32,
    pub v1: f32,
    pub bearing_x: f32,
    pub bearing_y: f32,
    pub width: f32,
    pub height: f32,
}

/// The atlas's "white pixel" cell, sampled when the quad builder emits a
/// solid underline/strike quad rather than a glyph quad.
pub trait GlyphAtlas {
    fn get_glyph(&mut self, font_id: u32, glyph_id: u32, style_flags: TextStyleFlags) -> Option<AtlasEntry>;

    /// A solid white texel used to draw underline/strike-through quads.
    fn white_pixel(&self) -> AtlasEntry;

    /// Bumped every time the atlas evicts its contents and starts over; the
    /// quad builder must compare this against the value it observed at the
    /// start of a build and restart from scratch if it changed mid-walk.
    fn reset_version(&self) -> u64;
}
