use bitflags::bitflags;

bitflags! {
    /// Per-run style flags (spec.md §3 "styling is a list of runs").
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TextStyleFlags: u8 {
        const BOLD = 1 << 0;
        const ITALIC = 1 << 1;
        const UNDERLINE = 1 << 2;
        const STRIKE = 1 << 3;
    }
}

impl Default for TextStyleFlags {
    fn default() -> Self {
        TextStyleFlags::empty()
    }
}

/// `applyTextStyle`'s mode over a flags mask (spec.md §4.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StyleApplyMode {
    Set,
    Clear,
    Toggle,
}
