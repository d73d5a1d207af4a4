//! Snapshot codec (spec.md §4.3) and document digest (spec.md §4.11).
//!
//! `build_snapshot_bytes`/`parse_snapshot_bytes` are the ESNP v1
//! round trip: a self-contained `{header, section table, sections}`
//! buffer with required sections `ENTS`, `LAYR`, `ORDR`, `SELC`, `TEXT`,
//! `NIDX`, `STYL` and an optional `HIST` section carrying the history
//! stack's own opaque byte format verbatim. Every section is individually
//! CRC32-checked on load, and canonical (ascending-id, order-sorted)
//! section contents make `build -> parse -> build` byte-identical for
//! equal document state (spec.md §8 invariant 6).

mod digest;
mod entities;
mod format;
mod layers;
mod misc;
mod style;
mod text;

use core_history::{HistoryEntry, HistoryManager};
use core_store::EntityStore;
use core_text::TextStore;
use core_types::{ByteReader, ByteWriter, EngineResult};

pub use digest::{digest, DigestState};

/// The result of parsing an ESNP buffer: a fresh document plus, if the
/// buffer carried one, the decoded history stack the caller should feed to
/// `HistoryManager::restore`.
pub struct LoadedSnapshot {
    pub store: EntityStore,
    pub texts: TextStore,
    pub history: Option<(Vec<HistoryEntry>, usize)>,
}

/// Builds an ESNP v1 buffer from the given document state. `history`, when
/// present, is encoded with `core_history::encode_bytes` and carried
/// verbatim as the optional `HIST` section.
pub fn build_snapshot_bytes(store: &EntityStore, texts: &TextStore, history: Option<&HistoryManager>) -> Vec<u8> {
    let mut ents = ByteWriter::new();
    entities::write(&mut ents, store);

    let mut layr = ByteWriter::new();
    layers::write(&mut layr, store);

    let mut ordr = ByteWriter::new();
    misc::write_draw_order(&mut ordr, store);

    let mut selc = ByteWriter::new();
    misc::write_selection(&mut selc, store);

    let mut text_w = ByteWriter::new();
    text::write(&mut text_w, texts);

    let mut nidx = ByteWriter::new();
    misc::write_next_id(&mut nidx, store);

    let mut styl = ByteWriter::new();
    style::write(&mut styl, store);

    let mut sections = vec![
        format::Section { tag: format::TAG_ENTS, bytes: ents.into_vec() },
        format::Section { tag: format::TAG_LAYR, bytes: layr.into_vec() },
        format::Section { tag: format::TAG_ORDR, bytes: ordr.into_vec() },
        format::Section { tag: format::TAG_SELC, bytes: selc.into_vec() },
        format::Section { tag: format::TAG_TEXT, bytes: text_w.into_vec() },
        format::Section { tag: format::TAG_NIDX, bytes: nidx.into_vec() },
        format::Section { tag: format::TAG_STYL, bytes: styl.into_vec() },
    ];
    if let Some(history) = history {
        sections.push(format::Section {
            tag: format::TAG_HIST,
            bytes: core_history::encode_bytes(history),
        });
    }

    tracing::trace!(target: "engine.snapshot", bytes = sections.iter().map(|s| s.bytes.len()).sum::<usize>(), "built snapshot");
    format::assemble(&sections)
}

/// Inverse of [`build_snapshot_bytes`]. Fails with a typed `EngineError` on
/// any header/version mismatch, truncation, or per-section CRC mismatch,
/// per spec.md §4.3 "a CRC mismatch in any required section fails the
/// load".
pub fn parse_snapshot_bytes(bytes: &[u8]) -> EngineResult<LoadedSnapshot> {
    let sections = format::parse(bytes)?;

    let mut store = EntityStore::new();
    let mut texts = TextStore::new();

    let ents = format::require(&sections, format::TAG_ENTS, "ENTS")?;
    entities::read(&mut ByteReader::new(ents), &mut store)?;

    let layr = format::require(&sections, format::TAG_LAYR, "LAYR")?;
    layers::read(&mut ByteReader::new(layr), &mut store)?;

    let ordr = format::require(&sections, format::TAG_ORDR, "ORDR")?;
    misc::read_draw_order(&mut ByteReader::new(ordr), &mut store)?;

    let selc = format::require(&sections, format::TAG_SELC, "SELC")?;
    misc::read_selection(&mut ByteReader::new(selc), &mut store)?;

    let text_bytes = format::require(&sections, format::TAG_TEXT, "TEXT")?;
    text::read(&mut ByteReader::new(text_bytes), &mut texts)?;

    let nidx = format::require(&sections, format::TAG_NIDX, "NIDX")?;
    misc::read_next_id(&mut ByteReader::new(nidx), &mut store)?;

    let styl = format::require(&sections, format::TAG_STYL, "STYL")?;
    style::read(&mut ByteReader::new(styl), &mut store)?;

    let history = format::find(&sections, format::TAG_HIST)
        .map(core_history::decode_bytes)
        .transpose()?;

    tracing::trace!(target: "engine.snapshot", "loaded snapshot");
    Ok(LoadedSnapshot { store, texts, history })
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_store::EntityFlags;
    use core_types::{EntityId, LayerId, Rgba};

    fn sample_store() -> EntityStore {
        let mut store = EntityStore::new();
        store.upsert_rect(
            EntityId(7),
            core_store::Rect {
                id: EntityId(7),
                layer_id: LayerId::NONE,
                flags: EntityFlags::default(),
                x: 0.0,
                y: 0.0,
                w: 10.0,
                h: 5.0,
                fill: Rgba::new(1.0, 0.0, 0.0, 1.0),
                stroke: Rgba::new(0.0, 0.0, 0.0, 1.0),
                stroke_enabled: true,
                stroke_width_px: 1.0,
            },
        );
        store.set_selection(&[EntityId(7)], core_store::SelectionMode::Replace);
        store
    }

    #[test]
    fn build_parse_build_is_byte_identical() {
        let store = sample_store();
        let texts = TextStore::new();

        let b1 = build_snapshot_bytes(&store, &texts, None);
        let loaded = parse_snapshot_bytes(&b1).unwrap();
        let b2 = build_snapshot_bytes(&loaded.store, &loaded.texts, None);
        assert_eq!(b1, b2);
    }

    #[test]
    fn loaded_state_has_the_same_digest() {
        let store = sample_store();
        let texts = TextStore::new();
        let before = digest(&store, &texts);

        let bytes = build_snapshot_bytes(&store, &texts, None);
        let loaded = parse_snapshot_bytes(&bytes).unwrap();
        let after = digest(&loaded.store, &loaded.texts);
        assert_eq!(before, after);
    }

    #[test]
    fn carries_history_through_the_optional_hist_section() {
        let mut store = sample_store();
        let texts = TextStore::new();
        let mut history = HistoryManager::new(None);
        history.begin_entry(store.next_entity_id());
        history.mark_entity_change(EntityId(7), &store, &texts);
        store.upsert_rect(
            EntityId(7),
            core_store::Rect {
                id: EntityId(7),
                layer_id: LayerId::NONE,
                flags: EntityFlags::default(),
                x: 5.0,
                y: 0.0,
                w: 10.0,
                h: 5.0,
                fill: Rgba::new(1.0, 0.0, 0.0, 1.0),
                stroke: Rgba::new(0.0, 0.0, 0.0, 1.0),
                stroke_enabled: true,
                stroke_width_px: 1.0,
            },
        );
        history.commit_entry(store.next_entity_id(), 1, &store, &texts, None, None, None);

        let bytes = build_snapshot_bytes(&store, &texts, Some(&history));
        let loaded = parse_snapshot_bytes(&bytes).unwrap();
        let (entries, cursor) = loaded.history.expect("HIST section present");
        assert_eq!(entries.len(), history.entries().len());
        assert_eq!(cursor, history.cursor());
    }

    #[test]
    fn rejects_a_buffer_missing_a_required_section() {
        let bytes = format::assemble(&[format::Section { tag: format::TAG_ENTS, bytes: vec![0; 7 * 4] }]);
        assert!(matches!(parse_snapshot_bytes(&bytes), Err(core_types::EngineError::InvalidPayloadSize { .. })));
    }
}
