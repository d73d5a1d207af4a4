//! `TEXT` section codec (spec.md §4.3): `count` then per-text
//! `{id, layerId, flags, header, runs, contentBytes}`, ascending by id.
//! Layout bounds are not carried — they're derived data the external
//! layout engine recomputes from content/runs on the other side of a load.

use core_store::EntityFlags;
use core_text::{TextAlign, TextBoxMode, TextRun, TextStore, TextStyleFlags};
use core_types::{ByteReader, ByteWriter, EngineResult, EntityId, LayerId, Rgba};

fn write_rgba(w: &mut ByteWriter, c: Rgba) {
    w.write_f32(c.r);
    w.write_f32(c.g);
    w.write_f32(c.b);
    w.write_f32(c.a);
}

fn read_rgba(r: &mut ByteReader) -> EngineResult<Rgba> {
    Ok(Rgba::new(r.read_f32()?, r.read_f32()?, r.read_f32()?, r.read_f32()?))
}

fn box_mode_tag(mode: TextBoxMode) -> u8 {
    matches!(mode, TextBoxMode::FixedWidth) as u8
}

fn box_mode_from_tag(tag: u8) -> TextBoxMode {
    if tag != 0 {
        TextBoxMode::FixedWidth
    } else {
        TextBoxMode::AutoWidth
    }
}

fn align_tag(align: TextAlign) -> u8 {
    match align {
        TextAlign::Left => 0,
        TextAlign::Center => 1,
        TextAlign::Right => 2,
    }
}

fn align_from_tag(tag: u8) -> TextAlign {
    match tag {
        1 => TextAlign::Center,
        2 => TextAlign::Right,
        _ => TextAlign::Left,
    }
}

pub fn write(w: &mut ByteWriter, texts: &TextStore) {
    let mut recs: Vec<_> = texts.iter().collect();
    recs.sort_by_key(|t| t.id.0);
    w.write_u32(recs.len() as u32);
    for t in recs {
        w.write_u32(t.id.0);
        w.write_u32(t.layer_id.0);
        w.write_u32(t.flags.bits());
        w.write_f32(t.x);
        w.write_f32(t.y);
        w.write_f32(t.rotation);
        w.write_u8(box_mode_tag(t.box_mode));
        w.write_u8(align_tag(t.align));
        w.write_f32(t.constraint_width);
        w.write_string32(&t.content);
        w.write_u32(t.runs.len() as u32);
        for run in &t.runs {
            w.write_u32(run.start_index);
            w.write_u32(run.length);
            w.write_u32(run.font_id);
            w.write_f32(run.font_size);
            write_rgba(w, run.color);
            w.write_u8(run.flags.bits());
        }
        w.write_u32(t.caret.caret);
        w.write_u8(t.caret.selection_anchor.is_some() as u8);
        w.write_u32(t.caret.selection_anchor.unwrap_or(0));
    }
}

pub fn read(r: &mut ByteReader, texts: &mut TextStore) -> EngineResult<()> {
    let count = r.read_u32()? as usize;
    for _ in 0..count {
        let id = EntityId(r.read_u32()?);
        let layer_id = LayerId(r.read_u32()?);
        let flags = EntityFlags::from_bits_truncate(r.read_u32()?);
        let x = r.read_f32()?;
        let y = r.read_f32()?;
        let rotation = r.read_f32()?;
        let box_mode = box_mode_from_tag(r.read_u8()?);
        let align = align_from_tag(r.read_u8()?);
        let constraint_width = r.read_f32()?;
        let content = r.read_string32()?;
        let run_count = r.read_u32()? as usize;
        let mut runs = Vec::with_capacity(run_count);
        for _ in 0..run_count {
            runs.push(TextRun {
                start_index: r.read_u32()?,
                length: r.read_u32()?,
                font_id: r.read_u32()?,
                font_size: r.read_f32()?,
                color: read_rgba(r)?,
                flags: TextStyleFlags::from_bits_truncate(r.read_u8()?),
            });
        }
        let caret = r.read_u32()?;
        let has_anchor = r.read_u8()? != 0;
        let anchor = r.read_u32()?;

        texts.upsert_text(id, layer_id, flags, x, y, rotation, box_mode, align, constraint_width);
        if !content.is_empty() {
            texts.insert_content(id, 0, &content);
        }
        texts.set_runs(id, runs);
        if has_anchor {
            texts.set_selection(id, anchor, caret);
        } else {
            texts.set_caret(id, caret);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_text::StyleApplyMode;

    #[test]
    fn round_trips_content_runs_and_caret() {
        let mut texts = TextStore::new();
        let id = EntityId(100);
        texts.upsert_text(id, LayerId(1), EntityFlags::default(), 0.0, 0.0, 0.0, TextBoxMode::AutoWidth, TextAlign::Left, 0.0);
        texts.insert_content(id, 0, "Hello");
        texts.apply_text_style(id, 0, 5, StyleApplyMode::Set, TextStyleFlags::BOLD, None, None);
        texts.set_selection(id, 1, 3);

        let mut w = ByteWriter::new();
        write(&mut w, &texts);
        let bytes = w.into_vec();

        let mut loaded = TextStore::new();
        let mut r = ByteReader::new(&bytes);
        read(&mut r, &mut loaded).unwrap();

        let rec = loaded.find(id).unwrap();
        assert_eq!(rec.content, "Hello");
        assert_eq!(rec.runs.len(), 1);
        assert!(rec.runs[0].flags.contains(TextStyleFlags::BOLD));
        assert_eq!(rec.caret.selection_anchor, Some(1));
        assert_eq!(rec.caret.caret, 3);
    }
}
