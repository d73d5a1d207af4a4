//! Draw-order reordering actions (spec.md §4.10 "Reorder").

use core_types::EntityId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReorderAction {
    BringToFront,
    SendToBack,
    BringForward,
    SendBackward,
}

/// Moves every id in `targets` together within `order`, preserving their
/// relative order, and returns the mutated vector.
///
/// `BringForward`/`SendBackward` are relative to `ref_id` when given
/// (otherwise relative to the whole vector's ends, same as
/// `BringToFront`/`SendToBack`).
pub fn reorder(order: &mut Vec<EntityId>, targets: &[EntityId], action: ReorderAction, ref_id: Option<EntityId>) {
    if targets.is_empty() {
        return;
    }
    let moving: Vec<EntityId> = order.iter().copied().filter(|id| targets.contains(id)).collect();
    if moving.is_empty() {
        return;
    }

    match action {
        ReorderAction::BringToFront => {
            order.retain(|id| !targets.contains(id));
            order.extend(moving);
        }
        ReorderAction::SendToBack => {
            order.retain(|id| !targets.contains(id));
            let mut fresh = moving;
            fresh.extend(order.iter().copied());
            *order = fresh;
        }
        ReorderAction::BringForward => {
            let step_past = ref_id.and_then(|r| order.iter().position(|id| *id == r));
            move_step(order, &moving, true, step_past);
        }
        ReorderAction::SendBackward => {
            let step_past = ref_id.and_then(|r| order.iter().position(|id| *id == r));
            move_step(order, &moving, false, step_past);
        }
    }
}

/// Moves the block of `moving` ids one step toward the front (`forward =
/// true`) or back, or past `step_past` when given — used by the relative
/// reorder actions.
fn move_step(order: &mut Vec<EntityId>, moving: &[EntityId], forward: bool, step_past: Option<usize>) {
    let rest: Vec<EntityId> = order.iter().copied().filter(|id| !moving.contains(id)).collect();
    let old_front = order.iter().position(|id| moving.contains(id)).unwrap_or(0);

    let insert_at = match step_past {
        // `pos` was computed against the original `order`; clamp into `rest`'s bounds.
        Some(pos) => pos.min(rest.len()),
        None if forward => (old_front + 1).min(rest.len()),
        None => old_front.saturating_sub(1).min(rest.len()),
    };

    let mut fresh = rest[..insert_at].to_vec();
    fresh.extend(moving.iter().copied());
    fresh.extend(rest[insert_at..].iter().copied());
    *order = fresh;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(vals: &[u32]) -> Vec<EntityId> {
        vals.iter().copied().map(EntityId).collect()
    }

    #[test]
    fn bring_to_front_preserves_relative_order() {
        let mut order = ids(&[1, 2, 3, 4]);
        reorder(&mut order, &ids(&[1, 3]), ReorderAction::BringToFront, None);
        assert_eq!(order, ids(&[2, 4, 1, 3]));
    }

    #[test]
    fn send_to_back_preserves_relative_order() {
        let mut order = ids(&[1, 2, 3, 4]);
        reorder(&mut order, &ids(&[2, 4]), ReorderAction::SendToBack, None);
        assert_eq!(order, ids(&[2, 4, 1, 3]));
    }

    #[test]
    fn bring_forward_moves_one_step() {
        let mut order = ids(&[1, 2, 3, 4]);
        reorder(&mut order, &ids(&[2]), ReorderAction::BringForward, None);
        assert_eq!(order, ids(&[1, 3, 2, 4]));
    }
}
