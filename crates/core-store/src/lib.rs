//! The entity store: typed per-kind arenas, the global id index, the
//! shared polyline point arena, layers, draw order, selection, and
//! per-entity style overrides (spec.md §3, §4.1, §4.10).

pub mod arena;
pub mod entities;
pub mod flags;
pub mod layer;
pub mod points;
pub mod reorder;
pub mod selection;
pub mod store;
pub mod style;

pub use entities::{Arrow, Circle, Line, Polygon, Polyline, Rect};
pub use flags::{EntityFlags, LayerFlags, StrokeFlags};
pub use layer::{Layer, LayerStyle};
pub use points::PointArena;
pub use reorder::ReorderAction;
pub use selection::{Selection, SelectionMode};
pub use store::EntityStore;
pub use style::StyleOverride;
