//! Effective-style resolution (spec.md §3 "Effective style for rendering
//! is `ByLayer` unless the entity has an override sidecar").

use core_store::{EntityStore, StyleOverride};
use core_types::{EntityId, Rgba};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedStyle {
    pub fill: Rgba,
    pub stroke: Rgba,
}

/// Applies `id`'s style override, if any, on top of the entity's own
/// `fill`/`stroke` fields (which the command layer sets `ByLayer` at
/// creation time unless the host supplies explicit colors).
pub fn resolve(store: &EntityStore, id: EntityId, fill: Rgba, stroke: Rgba) -> ResolvedStyle {
    match store.style_override(id) {
        Some(StyleOverride {
            fill: override_fill,
            stroke: override_stroke,
            ..
        }) => ResolvedStyle {
            fill: override_fill.unwrap_or(fill),
            stroke: override_stroke.unwrap_or(stroke),
        },
        None => ResolvedStyle { fill, stroke },
    }
}

/// Whether `id` should contribute any vertices: both its own `Visible`
/// flag and its layer's `Visible` flag must hold.
pub fn is_visible(entity_flags: core_store::EntityFlags, layer: Option<&core_store::Layer>) -> bool {
    let layer_visible = layer.map(|l| l.flags.contains(core_store::LayerFlags::VISIBLE)).unwrap_or(true);
    entity_flags.contains(core_store::EntityFlags::VISIBLE) && layer_visible
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_store::{EntityStore, StyleOverride};
    use core_types::EntityId;

    #[test]
    fn override_wins_over_own_field() {
        let mut store = EntityStore::new();
        store.set_style_override(
            EntityId(1),
            StyleOverride {
                fill: Some(Rgba::new(1.0, 0.0, 0.0, 1.0)),
                ..Default::default()
            },
        );
        let resolved = resolve(&store, EntityId(1), Rgba::BLACK, Rgba::BLACK);
        assert_eq!(resolved.fill, Rgba::new(1.0, 0.0, 0.0, 1.0));
        assert_eq!(resolved.stroke, Rgba::BLACK);
    }

    #[test]
    fn no_override_keeps_own_field() {
        let store = EntityStore::new();
        let resolved = resolve(&store, EntityId(1), Rgba::new(0.2, 0.2, 0.2, 1.0), Rgba::BLACK);
        assert_eq!(resolved.fill, Rgba::new(0.2, 0.2, 0.2, 1.0));
    }
}
