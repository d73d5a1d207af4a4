//! Per-entity style override sidecar (spec.md §3 "Effective style for
//! rendering is `ByLayer` unless the entity has an override sidecar").

use core_types::Rgba;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StyleOverride {
    pub stroke: Option<Rgba>,
    pub fill: Option<Rgba>,
    pub text_color: Option<Rgba>,
    pub text_background: Option<Rgba>,
}

impl StyleOverride {
    pub fn is_empty(&self) -> bool {
        self.stroke.is_none()
            && self.fill.is_none()
            && self.text_color.is_none()
            && self.text_background.is_none()
    }
}
