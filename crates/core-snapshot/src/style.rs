//! `STYL` section codec (spec.md §4.3): a sparse per-entity style-override
//! map. Only entities with a non-empty override are written, ascending by
//! id, each tagged with a presence bitmask over its four optional fields.

use core_store::{EntityStore, StyleOverride};
use core_types::{ByteReader, ByteWriter, EngineResult, EntityId, Rgba};

const HAS_STROKE: u8 = 1 << 0;
const HAS_FILL: u8 = 1 << 1;
const HAS_TEXT_COLOR: u8 = 1 << 2;
const HAS_TEXT_BACKGROUND: u8 = 1 << 3;

fn write_rgba(w: &mut ByteWriter, c: Rgba) {
    w.write_f32(c.r);
    w.write_f32(c.g);
    w.write_f32(c.b);
    w.write_f32(c.a);
}

fn read_rgba(r: &mut ByteReader) -> EngineResult<Rgba> {
    Ok(Rgba::new(r.read_f32()?, r.read_f32()?, r.read_f32()?, r.read_f32()?))
}

pub fn write(w: &mut ByteWriter, store: &EntityStore) {
    let mut overrides: Vec<(EntityId, &StyleOverride)> = store.style_overrides().collect();
    overrides.sort_by_key(|(id, _)| id.0);
    w.write_u32(overrides.len() as u32);
    for (id, style) in overrides {
        let mut presence = 0u8;
        if style.stroke.is_some() {
            presence |= HAS_STROKE;
        }
        if style.fill.is_some() {
            presence |= HAS_FILL;
        }
        if style.text_color.is_some() {
            presence |= HAS_TEXT_COLOR;
        }
        if style.text_background.is_some() {
            presence |= HAS_TEXT_BACKGROUND;
        }
        w.write_u32(id.0);
        w.write_u8(presence);
        if let Some(c) = style.stroke {
            write_rgba(w, c);
        }
        if let Some(c) = style.fill {
            write_rgba(w, c);
        }
        if let Some(c) = style.text_color {
            write_rgba(w, c);
        }
        if let Some(c) = style.text_background {
            write_rgba(w, c);
        }
    }
}

pub fn read(r: &mut ByteReader, store: &mut EntityStore) -> EngineResult<()> {
    let count = r.read_u32()? as usize;
    for _ in 0..count {
        let id = EntityId(r.read_u32()?);
        let presence = r.read_u8()?;
        let style = StyleOverride {
            stroke: (presence & HAS_STROKE != 0).then(|| read_rgba(r)).transpose()?,
            fill: (presence & HAS_FILL != 0).then(|| read_rgba(r)).transpose()?,
            text_color: (presence & HAS_TEXT_COLOR != 0).then(|| read_rgba(r)).transpose()?,
            text_background: (presence & HAS_TEXT_BACKGROUND != 0).then(|| read_rgba(r)).transpose()?,
        };
        store.set_style_override(id, style);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::EntityId as Id;

    #[test]
    fn round_trips_a_partial_override() {
        let mut store = EntityStore::new();
        store.set_style_override(
            Id(5),
            StyleOverride {
                stroke: Some(Rgba::new(1.0, 0.0, 0.0, 1.0)),
                fill: None,
                text_color: None,
                text_background: Some(Rgba::TRANSPARENT),
            },
        );

        let mut w = ByteWriter::new();
        write(&mut w, &store);
        let bytes = w.into_vec();

        let mut loaded = EntityStore::new();
        let mut r = ByteReader::new(&bytes);
        read(&mut r, &mut loaded).unwrap();

        let style = loaded.style_override(Id(5)).unwrap();
        assert_eq!(style.stroke, Some(Rgba::new(1.0, 0.0, 0.0, 1.0)));
        assert_eq!(style.fill, None);
        assert_eq!(style.text_background, Some(Rgba::TRANSPARENT));
    }
}
