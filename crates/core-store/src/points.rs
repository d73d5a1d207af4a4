//! The shared `Point2` arena polylines index into by `{offset, count}`
//! (spec.md §3 "Polyline point arena", §4.1 "Polyline compaction").
//!
//! Deleting or replacing a polyline's points does not compact the arena
//! immediately — the old run is simply orphaned and the polyline (if it
//! survives) gets a fresh run appended at the end. [`PointArena::compact`]
//! is what reclaims orphaned space; [`crate::store::EntityStore`] triggers
//! it lazily once enough slack has accumulated (SPEC_FULL.md §11).

use crate::arena::Arena;
use crate::entities::Polyline;

/// Compaction triggers once at least this many points are orphaned,
/// keeping the common case (no deletions) free of any compaction cost.
pub const COMPACTION_SLACK_THRESHOLD: usize = 64;

#[derive(Debug, Clone, Default)]
pub struct PointArena {
    points: Vec<(f32, f32)>,
    orphaned: usize,
}

impl PointArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Appends `pts` as a fresh run and returns its `(offset, count)`.
    pub fn push_run(&mut self, pts: &[(f32, f32)]) -> (u32, u32) {
        let offset = self.points.len() as u32;
        self.points.extend_from_slice(pts);
        (offset, pts.len() as u32)
    }

    pub fn slice(&self, offset: u32, count: u32) -> Option<&[(f32, f32)]> {
        let start = offset as usize;
        let end = start.checked_add(count as usize)?;
        self.points.get(start..end)
    }

    pub fn all(&self) -> &[(f32, f32)] {
        &self.points
    }

    /// Marks `count` previously-referenced points as orphaned, to be
    /// reclaimed on the next [`PointArena::compact`].
    pub fn mark_orphaned(&mut self, count: u32) {
        self.orphaned += count as usize;
    }

    pub fn needs_compaction(&self) -> bool {
        self.orphaned >= COMPACTION_SLACK_THRESHOLD
    }

    /// Rebuilds the point arena from scratch, copying only the runs still
    /// referenced by `polylines` (in arena order) and rewriting each
    /// polyline's `offset` in place. A polyline whose `offset + count`
    /// exceeds the old arena is corrupted and is reset to an empty run
    /// rather than panicking, matching spec.md §4.1.
    pub fn compact(&mut self, polylines: &mut Arena<Polyline>) {
        let mut fresh = Vec::with_capacity(self.points.len());
        for polyline in polylines.iter_mut() {
            let start = polyline.offset as usize;
            let end = start.saturating_add(polyline.count as usize);
            if end > self.points.len() {
                polyline.offset = fresh.len() as u32;
                polyline.count = 0;
                continue;
            }
            let new_offset = fresh.len() as u32;
            fresh.extend_from_slice(&self.points[start..end]);
            polyline.offset = new_offset;
        }
        self.points = fresh;
        self.orphaned = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::EntityFlags;
    use core_types::{EntityId, LayerId, Rgba};

    fn polyline(id: u32, offset: u32, count: u32) -> Polyline {
        Polyline {
            id: EntityId(id),
            layer_id: LayerId(1),
            flags: EntityFlags::default(),
            offset,
            count,
            rgba: Rgba::BLACK,
            enabled: true,
            stroke_width_px: 1.0,
        }
    }

    #[test]
    fn compact_reclaims_orphaned_runs_and_rewrites_offsets() {
        let mut points = PointArena::new();
        let (off_a, cnt_a) = points.push_run(&[(0.0, 0.0), (1.0, 1.0)]);
        let (_off_orphan, cnt_orphan) = points.push_run(&[(9.0, 9.0)]);
        let (off_b, cnt_b) = points.push_run(&[(2.0, 2.0), (3.0, 3.0), (4.0, 4.0)]);

        points.mark_orphaned(cnt_orphan);

        let mut arena: Arena<Polyline> = Arena::new();
        arena.push(polyline(1, off_a, cnt_a));
        arena.push(polyline(2, off_b, cnt_b));

        points.compact(&mut arena);

        assert_eq!(points.len(), (cnt_a + cnt_b) as usize);
        let p1 = arena.get(0).unwrap();
        assert_eq!(points.slice(p1.offset, p1.count).unwrap(), &[(0.0, 0.0), (1.0, 1.0)]);
        let p2 = arena.get(1).unwrap();
        assert_eq!(
            points.slice(p2.offset, p2.count).unwrap(),
            &[(2.0, 2.0), (3.0, 3.0), (4.0, 4.0)]
        );
    }

    #[test]
    fn compact_resets_corrupted_polyline_to_empty() {
        let mut points = PointArena::new();
        let mut arena: Arena<Polyline> = Arena::new();
        arena.push(polyline(1, 0, 5)); // references points that don't exist
        points.compact(&mut arena);
        let p = arena.get(0).unwrap();
        assert_eq!(p.count, 0);
    }
}
