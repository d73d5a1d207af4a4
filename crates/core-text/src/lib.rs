//! Text subsystem core glue (spec.md §4.8): content store, run-based
//! styling algebra, and the layout/glyph-atlas contracts an external
//! shaper and rasterizer must satisfy. Shaping and rasterization
//! themselves are out of scope (spec.md §1).

pub mod atlas;
pub mod flags;
pub mod layout;
pub mod runs;
pub mod store;

pub use atlas::{AtlasEntry, GlyphAtlas};
pub use flags::{StyleApplyMode, TextStyleFlags};
pub use layout::{GlyphInstance, LayoutLine, LayoutProvider, TextLayout};
pub use runs::TextRun;
pub use store::{TextAlign, TextBoxMode, TextBounds, TextCaretState, TextRec, TextStore};
