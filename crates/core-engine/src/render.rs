//! Render buffer facade (spec.md §4.4, §4.8, §6 "host requests a rebuild,
//! then reads back a buffer-meta struct and the flat float slice it
//! describes"). A host never gets a raw pointer out of a safe Rust API —
//! [`BufferMeta`] instead reports the slice length and the render
//! generation it was built at, and the caller pairs that with a direct
//! `&[f32]` accessor.

use core_text::{GlyphAtlas, LayoutProvider};
use core_types::EntityId;

use crate::Engine;

/// Describes one of the engine's flat vertex buffers as of the last
/// rebuild: how many floats it holds, how many vertices that is (7
/// floats/vertex for shapes, 9 for glyph quads), and the render
/// generation the data is valid for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BufferMeta {
    pub float_count: usize,
    pub vertex_count: usize,
    pub generation: u64,
}

impl Engine {
    /// Rebuilds whichever half of the render model (shapes, glyphs) is
    /// dirty, using `layout`/`atlas` as the text subsystem's collaborators
    /// (spec.md §4.8), and returns which halves were actually serviced.
    pub fn build_render_buffers(&mut self, layout: &mut dyn LayoutProvider, atlas: &mut dyn GlyphAtlas) -> core_render::RenderDirty {
        self.render.ensure_built(&self.store, &mut self.texts, self.view_scale, layout, atlas)
    }

    /// Rebuilds only the shape half (triangles/lines) — no text
    /// collaborators required, since shapes never touch glyph layout.
    pub fn build_shape_buffers(&mut self) -> bool {
        self.render.ensure_shapes_built(&self.store, &self.texts, self.view_scale)
    }

    pub fn render_generation(&self) -> u64 {
        self.render.generation()
    }

    pub fn get_position_buffer_meta(&mut self) -> BufferMeta {
        self.build_shape_buffers();
        let floats = self.render.shapes().triangle_buffer().len();
        BufferMeta { float_count: floats, vertex_count: floats / 7, generation: self.render.generation() }
    }

    pub fn get_line_buffer_meta(&mut self) -> BufferMeta {
        self.build_shape_buffers();
        let floats = self.render.shapes().line_buffer().len();
        BufferMeta { float_count: floats, vertex_count: floats / 7, generation: self.render.generation() }
    }

    /// Glyph quads are only ever rebuilt by [`Engine::build_render_buffers`]
    /// — reading this meta does not itself trigger a rebuild, since doing
    /// so would require a `LayoutProvider`/`GlyphAtlas` this accessor
    /// doesn't take.
    pub fn get_glyph_buffer_meta(&self) -> BufferMeta {
        let floats = self.render.glyphs().quad_buffer().len();
        BufferMeta { float_count: floats, vertex_count: floats / 9, generation: self.render.generation() }
    }

    pub fn triangle_buffer(&self) -> &[f32] {
        self.render.shapes().triangle_buffer()
    }

    pub fn line_buffer(&self) -> &[f32] {
        self.render.shapes().line_buffer()
    }

    pub fn glyph_buffer(&self) -> &[f32] {
        self.render.glyphs().quad_buffer()
    }

    /// The triangle/line sub-ranges a single entity occupies in the shape
    /// buffers, or `None` if it has never been tessellated (absent, or
    /// never built since it was created).
    pub fn render_range(&self, id: EntityId) -> Option<core_render::EntityRanges> {
        self.render.shapes().range_of(id)
    }
}

#[cfg(test)]
mod tests {
    use crate::tests::scenario_1_buffer;
    use crate::Engine;

    #[test]
    fn shape_buffers_build_lazily_and_report_matching_meta() {
        let mut engine = Engine::new();
        engine.apply_command_buffer(&scenario_1_buffer()).unwrap();

        let pos_meta = engine.get_position_buffer_meta();
        assert_eq!(pos_meta.float_count, engine.triangle_buffer().len());
        assert_eq!(pos_meta.vertex_count * 7, pos_meta.float_count);

        let line_meta = engine.get_line_buffer_meta();
        assert_eq!(line_meta.float_count, engine.line_buffer().len());
        assert!(line_meta.float_count > 0);
    }

    #[test]
    fn render_range_resolves_the_one_entity_created() {
        let mut engine = Engine::new();
        engine.apply_command_buffer(&scenario_1_buffer()).unwrap();
        engine.build_shape_buffers();

        let ranges = engine.render_range(core_types::EntityId(7)).unwrap();
        assert!(!ranges.triangles.is_empty());
        assert!(!ranges.lines.is_empty());
    }

    #[test]
    fn glyph_buffer_meta_is_empty_until_a_glyph_rebuild_runs() {
        let engine = Engine::new();
        let meta = engine.get_glyph_buffer_meta();
        assert_eq!(meta.float_count, 0);
        assert_eq!(meta.vertex_count, 0);
    }

    #[test]
    fn reordering_bumps_render_generation_on_next_build() {
        let mut engine = Engine::new();
        engine.apply_command_buffer(&scenario_1_buffer()).unwrap();
        engine.build_shape_buffers();
        let gen_before = engine.render_generation();

        engine.reorder(&[core_types::EntityId(7)], core_store::ReorderAction::BringToFront, None);
        engine.build_shape_buffers();
        assert!(engine.render_generation() > gen_before);
    }
}
