//! `HistoryEntry`/`EntityChange` (spec.md §4.7 "Entry").

use core_store::Layer;
use core_types::EntityId;

use crate::snapshot::EntitySnapshot;

#[derive(Debug, Clone, PartialEq)]
pub struct EntityChange {
    pub id: EntityId,
    pub existed_before: bool,
    pub existed_after: bool,
    pub before: Option<EntitySnapshot>,
    pub after: Option<EntitySnapshot>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryEntry {
    pub layers_before: Option<Vec<Layer>>,
    pub layers_after: Option<Vec<Layer>>,
    pub entities: Vec<EntityChange>,
    pub draw_order_before: Option<Vec<EntityId>>,
    pub draw_order_after: Option<Vec<EntityId>>,
    pub selection_before: Option<Vec<EntityId>>,
    pub selection_after: Option<Vec<EntityId>>,
    pub next_id_before: u32,
    pub next_id_after: u32,
    pub generation: u64,
}

impl HistoryEntry {
    /// An entry with nothing worth keeping — no entity, layer, draw-order,
    /// or selection delta. `commit_entry` drops these rather than
    /// appending a no-op undo step.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
            && self.layers_before.is_none()
            && self.layers_after.is_none()
            && self.draw_order_before.is_none()
            && self.draw_order_after.is_none()
            && self.selection_before.is_none()
            && self.selection_after.is_none()
    }
}
