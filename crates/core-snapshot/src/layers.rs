//! `LAYR` section codec (spec.md §4.3): `count` then per-layer
//! `{id, order, flags, nameLength, nameBytes, styleFields}`, stable-sorted
//! by `order` so output is deterministic for equal state.

use core_store::{EntityStore, Layer, LayerFlags, LayerStyle};
use core_types::{ByteReader, ByteWriter, EngineResult, LayerId, Rgba};

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
    let mut layers: Vec<&Layer> = store.layers().iter().collect();
    layers.sort_by_key(|l| l.order);
    w.write_u32(layers.len() as u32);
    for layer in layers {
        w.write_u32(layer.id.0);
        w.write_i32(layer.order);
        w.write_u32(layer.flags.bits());
        w.write_string32(&layer.name);
        write_rgba(w, layer.style.stroke);
        write_rgba(w, layer.style.fill);
        write_rgba(w, layer.style.text_color);
        write_rgba(w, layer.style.text_background);
    }
}

pub fn read(r: &mut ByteReader, store: &mut EntityStore) -> EngineResult<()> {
    let count = r.read_u32()? as usize;
    for _ in 0..count {
        let id = LayerId(r.read_u32()?);
        let order = r.read_i32()?;
        let flags = LayerFlags::from_bits_truncate(r.read_u32()?);
        let name = r.read_string32()?;
        let style = LayerStyle {
            stroke: read_rgba(r)?,
            fill: read_rgba(r)?,
            text_color: read_rgba(r)?,
            text_background: read_rgba(r)?,
        };
        store.upsert_layer(Layer { id, order, flags, name, style });
    }
    Ok(())
}
