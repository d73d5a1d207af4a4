//! Event and change-mask bit sets (spec.md §4.9).

use bitflags::bitflags;

bitflags! {
    /// What changed about a coalesced entity record. OR'd together as
    /// further mutations to the same id arrive before the next flush
    /// (spec.md §4.9 "Per-`id` entity changes coalesce").
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ChangeMask: u32 {
        const GEOMETRY    = 1 << 0;
        const STYLE       = 1 << 1;
        const FLAGS       = 1 << 2;
        const LAYER       = 1 << 3;
        const ORDER       = 1 << 4;
        const TEXT        = 1 << 5;
        const BOUNDS      = 1 << 6;
        const RENDER_DATA = 1 << 7;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    Overflow,
    DocChanged,
    EntityChanged,
    EntityCreated,
    EntityDeleted,
    LayerChanged,
    SelectionChanged,
    OrderChanged,
    HistoryChanged,
}
