//! `apply_command_buffer` (spec.md §4.2, §5): decodes and dispatches one
//! EWDC buffer against the engine's subsystems, then performs the batched
//! side effects a single top-level operation owes the caller — exactly
//! one `generation` bump and exactly one event-queue flush.

use core_commands::{DispatchContext, DispatchResult};
use core_types::{EngineError, EngineResult};

use crate::Engine;

impl Engine {
    /// Atomic input-buffer errors (`InvalidMagic`, `UnsupportedVersion`,
    /// `BufferTruncated`, `UnknownCommand` from decoding) leave the
    /// document untouched, so `generation` and the event queue are left
    /// alone. `InvalidOperation` from an individual command can follow
    /// commands that already mutated the document (spec.md §7 "halt the
    /// remainder... does not roll back commands already applied"), so that
    /// case still bumps `generation` and flushes.
    pub fn apply_command_buffer(&mut self, bytes: &[u8]) -> EngineResult<DispatchResult> {
        let mut view_scale = self.view_scale;
        let mut ctx = DispatchContext {
            store: &mut self.store,
            texts: &mut self.texts,
            events: &mut self.events,
            history: &mut self.history,
            grid: &mut self.grid,
            render: &mut self.render,
            view_scale: &mut view_scale,
        };
        let result = core_commands::apply_command_buffer(bytes, &mut ctx);
        self.view_scale = view_scale;

        let mutated = matches!(result, Ok(_) | Err(EngineError::InvalidOperation(_)));
        if mutated {
            self.generation += 1;
            self.digest.mark_dirty();
            self.events.flush_pending_events(self.generation);
            tracing::trace!(target: "engine.facade", generation = self.generation, ok = result.is_ok(), "command buffer applied");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::scenario_1_buffer;
    use core_types::EntityId;

    #[test]
    fn scenario_1_end_to_end() {
        let mut engine = Engine::new();
        let result = engine.apply_command_buffer(&scenario_1_buffer()).unwrap();
        assert!(result.dirty);
        assert_eq!(engine.store().rects().count(), 1);
        assert_eq!(engine.store().draw_order(), &[EntityId(7)]);
        assert_eq!(engine.generation(), 1);

        let polled = engine.poll_events();
        assert!(polled.iter().any(|e| e.event_type == core_events::EventType::EntityCreated && e.a == 7));
        assert!(polled.iter().any(|e| e.event_type == core_events::EventType::EntityChanged && e.a == 7));
    }

    #[test]
    fn malformed_buffer_leaves_generation_untouched() {
        let mut engine = Engine::new();
        let mut bytes = scenario_1_buffer();
        bytes[4..8].copy_from_slice(&99u32.to_le_bytes());
        assert!(engine.apply_command_buffer(&bytes).is_err());
        assert_eq!(engine.generation(), 0);
        assert_eq!(engine.store().rects().count(), 0);
    }

    #[test]
    fn delete_of_missing_id_is_a_no_op() {
        let mut engine = Engine::new();
        let mut w = core_types::ByteWriter::new();
        w.write_u32(core_types::protocol::COMMAND_BUFFER_MAGIC);
        w.write_u32(core_types::protocol::COMMAND_BUFFER_VERSION);
        w.write_u32(1);
        w.write_u32(core_commands::Opcode::DeleteEntity as u32);
        w.write_u32(999);
        w.write_u32(0);
        w.write_u32(0);

        let result = engine.apply_command_buffer(&w.into_vec()).unwrap();
        assert_eq!(result.commands_applied, 1);
        assert_eq!(engine.generation(), 1);
    }
}
