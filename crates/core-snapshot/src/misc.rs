//! The three small fixed-shape sections: `ORDR` (draw order), `SELC`
//! (selection), and `NIDX` (next-entity-id watermark).

use core_store::{EntityStore, SelectionMode};
use core_types::{ByteReader, ByteWriter, EngineResult, EntityId};

fn write_ids(w: &mut ByteWriter, ids: &[EntityId]) {
    w.write_u32(ids.len() as u32);
    for id in ids {
        w.write_u32(id.0);
    }
}

fn read_ids(r: &mut ByteReader) -> EngineResult<Vec<EntityId>> {
    let count = r.read_u32()? as usize;
    (0..count).map(|_| Ok(EntityId(r.read_u32()?))).collect()
}

pub fn write_draw_order(w: &mut ByteWriter, store: &EntityStore) {
    write_ids(w, store.draw_order());
}

pub fn read_draw_order(r: &mut ByteReader, store: &mut EntityStore) -> EngineResult<()> {
    store.set_draw_order(read_ids(r)?);
    Ok(())
}

pub fn write_selection(w: &mut ByteWriter, store: &EntityStore) {
    write_ids(w, store.selection().ids());
}

pub fn read_selection(r: &mut ByteReader, store: &mut EntityStore) -> EngineResult<()> {
    let ids = read_ids(r)?;
    store.set_selection(&ids, SelectionMode::Replace);
    Ok(())
}

pub fn write_next_id(w: &mut ByteWriter, store: &EntityStore) {
    w.write_u32(store.next_entity_id());
}

pub fn read_next_id(r: &mut ByteReader, store: &mut EntityStore) -> EngineResult<()> {
    store.restore_id_watermark(r.read_u32()?);
    Ok(())
}
