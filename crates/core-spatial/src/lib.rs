//! Spatial index and pick system (spec.md §4.5): a uniform hash grid for
//! broad-phase queries, per-kind AABB computation, point-pick distance
//! rules, and marquee queries.

pub mod aabb;
pub mod grid;
pub mod pick;

pub use grid::{CellCoord, SpatialIndex};
pub use pick::{pick, query_area, query_marquee, MarqueeMode, PickContext};
