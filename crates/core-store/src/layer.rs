//! Layers (spec.md §3 "Layers"). Layers live in a small `Vec` rather than a
//! swap-remove arena — documents rarely carry more than a few dozen — kept
//! stably ordered by `order` for canonical snapshot output (spec.md §4.3).

use crate::flags::LayerFlags;
use core_types::{LayerId, Rgba};

#[derive(Debug, Clone, PartialEq)]
pub struct LayerStyle {
    pub stroke: Rgba,
    pub fill: Rgba,
    pub text_color: Rgba,
    pub text_background: Rgba,
}

impl Default for LayerStyle {
    fn default() -> Self {
        Self {
            stroke: Rgba::BLACK,
            fill: Rgba::TRANSPARENT,
            text_color: Rgba::BLACK,
            text_background: Rgba::TRANSPARENT,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub id: LayerId,
    pub order: i32,
    pub flags: LayerFlags,
    pub name: String,
    pub style: LayerStyle,
}

impl Layer {
    pub fn new(id: LayerId, order: i32, name: impl Into<String>) -> Self {
        Self {
            id,
            order,
            flags: LayerFlags::default(),
            name: name.into(),
            style: LayerStyle::default(),
        }
    }
}
