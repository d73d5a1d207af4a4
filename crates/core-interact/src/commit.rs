//! Commit results (spec.md §4.6 "Commit": "three parallel arrays: `ids`,
//! `opcodes`, `payloads` with 4 floats per id describing the delta/value").

use core_types::EntityId;

use crate::snapshot::TransformGeometry;
use crate::transform::{ActiveTransform, TransformMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum CommitOpcode {
    Move = 0,
    VertexSet = 1,
    Resize = 2,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommitResult {
    pub ids: Vec<EntityId>,
    pub opcodes: Vec<CommitOpcode>,
    pub payloads: Vec<[f32; 4]>,
}

impl CommitResult {
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

fn geometry_payload(geometry: &TransformGeometry) -> [f32; 4] {
    match geometry {
        TransformGeometry::Rect { x, y, w, h } => [*x, *y, *w, *h],
        TransformGeometry::Circle { cx, cy, rx, ry } => [*cx, *cy, *rx, *ry],
        TransformGeometry::Polygon { cx, cy, rx, ry } => [*cx, *cy, *rx, *ry],
        TransformGeometry::Line { x0, y0, x1, y1 } => [*x0, *y0, *x1, *y1],
        TransformGeometry::Arrow { ax, ay, bx, by } => [*ax, *ay, *bx, *by],
        TransformGeometry::Polyline { points } => {
            let (x, y) = points.first().copied().unwrap_or((0.0, 0.0));
            [x, y, points.len() as f32, 0.0]
        }
    }
}

/// Builds the commit result from the session's final snapshots (re-read
/// from `store` at commit time, after the last `update*`), tagging each id
/// with the opcode its active mode implies.
pub fn build_commit_result(active: &ActiveTransform, store: &core_store::EntityStore) -> CommitResult {
    let opcode = match active.mode {
        TransformMode::Move => CommitOpcode::Move,
        TransformMode::VertexDrag | TransformMode::EdgeDrag => CommitOpcode::VertexSet,
        TransformMode::Resize => CommitOpcode::Resize,
    };
    let mut result = CommitResult::default();
    for snap in &active.snapshots {
        let Some(after) = crate::snapshot::TransformSnapshot::capture(snap.id, store) else {
            continue;
        };
        result.ids.push(snap.id);
        result.opcodes.push(opcode);
        result.payloads.push(geometry_payload(&after.geometry));
    }
    result
}
