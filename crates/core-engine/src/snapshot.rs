//! Snapshot save/load (spec.md §4.3, §6 "Snapshot buffer"): thin wrappers
//! around `core_snapshot::build_snapshot_bytes`/`parse_snapshot_bytes` that
//! additionally restore the spatial index, render model, and history
//! cursor a freshly loaded document needs before it's usable.

use core_snapshot::LoadedSnapshot;
use core_spatial::pick::{aabb_of, PickContext};
use core_types::EngineResult;

use crate::Engine;

impl Engine {
    /// Builds an ESNP v1 buffer from the current document. The optional
    /// `HIST` section carries the undo/redo stack verbatim, so a host that
    /// round-trips through save/load keeps its undo history intact.
    pub fn save_snapshot(&self) -> Vec<u8> {
        core_snapshot::build_snapshot_bytes(&self.store, &self.texts, Some(&self.history))
    }

    /// Replaces the entire document with the one encoded in `bytes`
    /// (spec.md §8 scenario 4). Fails atomically — a malformed or
    /// CRC-mismatched buffer leaves the current document untouched.
    pub fn load_snapshot_from_bytes(&mut self, bytes: &[u8]) -> EngineResult<()> {
        let LoadedSnapshot { store, texts, history } = core_snapshot::parse_snapshot_bytes(bytes)?;

        self.store = store;
        self.texts = texts;
        self.history.clear();
        if let Some((entries, cursor)) = history {
            self.history.restore(entries, cursor);
        }

        self.grid.clear();
        let ids: Vec<_> = self.store.draw_order().to_vec();
        self.grid.set_draw_order(&ids);
        for id in ids {
            let ctx = PickContext { store: &self.store, texts: &self.texts, view_scale: self.view_scale };
            if let Some(aabb) = aabb_of(&ctx, id) {
                self.grid.update(id, aabb);
            }
        }

        self.render.clear();
        self.events.clear();
        self.digest.mark_dirty();
        self.generation += 1;
        tracing::trace!(target: "engine.facade", generation = self.generation, "snapshot loaded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::tests::scenario_1_buffer;
    use crate::Engine;
    use core_types::EntityId;

    #[test]
    fn save_then_load_reproduces_the_same_digest_and_reserializes_identically() {
        let mut engine = Engine::new();
        engine.apply_command_buffer(&scenario_1_buffer()).unwrap();
        let before = engine.digest();

        let bytes = engine.save_snapshot();
        let mut reloaded = Engine::new();
        reloaded.load_snapshot_from_bytes(&bytes).unwrap();

        assert_eq!(reloaded.digest(), before);
        assert_eq!(reloaded.save_snapshot(), bytes);
        assert_eq!(reloaded.store().find_rect(EntityId(7)).unwrap().w, 10.0);
    }

    #[test]
    fn loaded_document_is_immediately_pickable() {
        let mut engine = Engine::new();
        engine.apply_command_buffer(&scenario_1_buffer()).unwrap();
        let bytes = engine.save_snapshot();

        let mut reloaded = Engine::new();
        reloaded.load_snapshot_from_bytes(&bytes).unwrap();
        assert_eq!(reloaded.pick(5.0, 2.5, 1.0), EntityId(7));
    }

    #[test]
    fn malformed_snapshot_leaves_document_untouched() {
        let mut engine = Engine::new();
        engine.apply_command_buffer(&scenario_1_buffer()).unwrap();
        let before = engine.digest();

        assert!(engine.load_snapshot_from_bytes(&[0u8; 4]).is_err());
        assert_eq!(engine.digest(), before);
    }
}
