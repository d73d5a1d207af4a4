//! Uniform spatial hash grid (spec.md §4.5). Each entity is inserted into
//! every cell its AABB touches; an inverse `id -> cells` map makes removal
//! O(cells covered) instead of a full grid scan.

use std::collections::HashMap;

use ahash::AHashMap;
use core_types::{Aabb, EntityId};
use smallvec::SmallVec;

pub type CellCoord = (i32, i32);

#[derive(Debug, Clone)]
pub struct SpatialIndex {
    cell_size: f32,
    cells: AHashMap<CellCoord, Vec<EntityId>>,
    inverse: HashMap<EntityId, SmallVec<[CellCoord; 4]>>,
    z_index: HashMap<EntityId, usize>,
}

impl SpatialIndex {
    /// World-unit cell size spec.md §4.5 names as the fixed default.
    pub const DEFAULT_CELL_SIZE: f32 = 50.0;

    pub fn new() -> Self {
        Self::with_cell_size(Self::DEFAULT_CELL_SIZE)
    }

    pub fn with_cell_size(cell_size: f32) -> Self {
        Self {
            cell_size: cell_size.max(f32::MIN_POSITIVE),
            cells: AHashMap::new(),
            inverse: HashMap::new(),
            z_index: HashMap::new(),
        }
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    fn cell_of(&self, x: f32, y: f32) -> CellCoord {
        (
            (x / self.cell_size).floor() as i32,
            (y / self.cell_size).floor() as i32,
        )
    }

    fn cells_covering(&self, aabb: &Aabb) -> SmallVec<[CellCoord; 4]> {
        let (cx0, cy0) = self.cell_of(aabb.min_x, aabb.min_y);
        let (cx1, cy1) = self.cell_of(aabb.max_x, aabb.max_y);
        let mut out = SmallVec::new();
        for cy in cy0..=cy1 {
            for cx in cx0..=cx1 {
                out.push((cx, cy));
            }
        }
        out
    }

    /// Inserts or moves `id`'s entry to the cells covering `aabb`.
    pub fn update(&mut self, id: EntityId, aabb: Aabb) {
        self.remove(id);
        let cells = self.cells_covering(&aabb);
        for &cell in &cells {
            self.cells.entry(cell).or_default().push(id);
        }
        self.inverse.insert(id, cells);
    }

    pub fn remove(&mut self, id: EntityId) {
        if let Some(cells) = self.inverse.remove(&id) {
            for cell in cells {
                if let Some(list) = self.cells.get_mut(&cell) {
                    list.retain(|existing| *existing != id);
                    if list.is_empty() {
                        self.cells.remove(&cell);
                    }
                }
            }
        }
    }

    /// Rebuilds the `id -> zIndex` map from a draw-order vector, so pick
    /// ranking is O(1) per candidate (spec.md §4.5 "Updates").
    pub fn set_draw_order(&mut self, order: &[EntityId]) {
        self.z_index.clear();
        for (idx, id) in order.iter().enumerate() {
            self.z_index.insert(*id, idx);
        }
    }

    pub fn z_index(&self, id: EntityId) -> usize {
        self.z_index.get(&id).copied().unwrap_or(0)
    }

    /// Returns every id whose cell set overlaps the cells covering `aabb`,
    /// de-duplicated. Candidates still need a precise AABB/distance test —
    /// this is a broad-phase filter only.
    pub fn query_candidates(&self, aabb: &Aabb) -> Vec<EntityId> {
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        for cell in self.cells_covering(aabb) {
            if let Some(list) = self.cells.get(&cell) {
                for &id in list {
                    if seen.insert(id) {
                        out.push(id);
                    }
                }
            }
        }
        out
    }

    pub fn clear(&mut self) {
        self.cells.clear();
        self.inverse.clear();
        self.z_index.clear();
    }
}

impl Default for SpatialIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aabb(min_x: f32, min_y: f32, max_x: f32, max_y: f32) -> Aabb {
        Aabb {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    #[test]
    fn update_then_query_finds_inserted_id() {
        let mut grid = SpatialIndex::new();
        grid.update(EntityId(1), aabb(0.0, 0.0, 10.0, 10.0));
        let hits = grid.query_candidates(&aabb(5.0, 5.0, 5.0, 5.0));
        assert_eq!(hits, vec![EntityId(1)]);
    }

    #[test]
    fn remove_clears_all_covered_cells() {
        let mut grid = SpatialIndex::with_cell_size(10.0);
        grid.update(EntityId(1), aabb(0.0, 0.0, 25.0, 0.0));
        grid.remove(EntityId(1));
        let hits = grid.query_candidates(&aabb(0.0, 0.0, 25.0, 25.0));
        assert!(hits.is_empty());
    }

    #[test]
    fn set_draw_order_drives_z_index_lookup() {
        let mut grid = SpatialIndex::new();
        grid.set_draw_order(&[EntityId(3), EntityId(1), EntityId(2)]);
        assert_eq!(grid.z_index(EntityId(1)), 1);
        assert_eq!(grid.z_index(EntityId(2)), 2);
        assert_eq!(grid.z_index(EntityId(99)), 0);
    }
}
