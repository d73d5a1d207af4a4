//! Selection model (spec.md §4.10): an ordered id set plus a generation
//! counter bumped on every mutation, so a host can detect "selection
//! changed" without diffing the set itself.

use core_types::EntityId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionMode {
    Replace,
    Add,
    Remove,
    Toggle,
}

#[derive(Debug, Clone, Default)]
pub struct Selection {
    ids: Vec<EntityId>,
    generation: u64,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ids(&self) -> &[EntityId] {
        &self.ids
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.ids.contains(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    fn bump(&mut self) {
        self.generation += 1;
    }

    /// Applies `ids` to the current set under `mode`. `Add`/`Toggle`
    /// preserve existing order and append newly-added ids at the end;
    /// `Remove` and `Toggle`-removals preserve the order of the ids that
    /// remain.
    pub fn apply(&mut self, ids: &[EntityId], mode: SelectionMode) {
        match mode {
            SelectionMode::Replace => {
                self.ids = ids.to_vec();
            }
            SelectionMode::Add => {
                for &id in ids {
                    if !self.ids.contains(&id) {
                        self.ids.push(id);
                    }
                }
            }
            SelectionMode::Remove => {
                self.ids.retain(|id| !ids.contains(id));
            }
            SelectionMode::Toggle => {
                for &id in ids {
                    if let Some(pos) = self.ids.iter().position(|existing| *existing == id) {
                        self.ids.remove(pos);
                    } else {
                        self.ids.push(id);
                    }
                }
            }
        }
        self.bump();
    }

    pub fn clear(&mut self) {
        if !self.ids.is_empty() {
            self.ids.clear();
            self.bump();
        }
    }

    /// Reorders the selection vector to match `draw_order`'s relative
    /// z-order, without changing set membership.
    pub fn rebuild_order(&mut self, draw_order: &[EntityId]) {
        self.ids
            .sort_by_key(|id| draw_order.iter().position(|d| d == id).unwrap_or(usize::MAX));
    }

    /// Drops ids that no longer exist, per `exists`. Does not bump the
    /// generation if nothing changed.
    pub fn prune(&mut self, exists: impl Fn(EntityId) -> bool) {
        let before = self.ids.len();
        self.ids.retain(|&id| exists(id));
        if self.ids.len() != before {
            self.bump();
        }
    }
}
