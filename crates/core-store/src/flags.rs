use bitflags::bitflags;

bitflags! {
    /// Per-entity flags (spec.md §3 "Layers"). `Locked` entities still
    /// render but are excluded from pick/transform by the interaction
    /// layer.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct EntityFlags: u32 {
        const VISIBLE = 1 << 0;
        const LOCKED = 1 << 1;
    }
}

impl Default for EntityFlags {
    fn default() -> Self {
        EntityFlags::VISIBLE
    }
}

bitflags! {
    /// Per-layer flags, same bit meanings as [`EntityFlags`] but scoped to
    /// the whole layer.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct LayerFlags: u32 {
        const VISIBLE = 1 << 0;
        const LOCKED = 1 << 1;
    }
}

impl Default for LayerFlags {
    fn default() -> Self {
        LayerFlags::VISIBLE
    }
}

bitflags! {
    /// Stroke-related flags shared by Circle/Polygon/Arrow records
    /// (spec.md §3 "stroke flags").
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct StrokeFlags: u32 {
        const ENABLED = 1 << 0;
    }
}
