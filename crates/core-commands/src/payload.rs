//! EWDC per-opcode payload decoding (spec.md §4.2, §6 "Opcode payload
//! layouts"). Every layout here is POD, little-endian, tight-packed, with
//! no trailing padding — the exact byte count a payload must have is
//! checked before any decoded value is trusted, so a malformed buffer never
//! partially applies (spec.md §7 "input-buffer errors are atomic").
//!
//! Geometric upsert payloads carry only the fields shown in spec.md §8
//! scenario 1 — `layerId`/`flags` are not part of the wire payload. A
//! command-created entity is always assigned `LayerId::NONE` and
//! `EntityFlags::VISIBLE`; there is no opcode in the closed set that
//! assigns a layer to a geometric entity, so layer assignment for such
//! entities is understood to happen only through snapshot load (the ESNP
//! `LAYR`/entity-to-layer wiring) or a host-side domain extension, not the
//! interactive command stream.

use core_store::{EntityFlags, StrokeFlags};
use core_text::{StyleApplyMode, TextAlign, TextBoxMode, TextStyleFlags};
use core_types::{ByteReader, EngineError, EngineResult, Rgba};

fn rgba(r: &mut ByteReader) -> EngineResult<Rgba> {
    Ok(Rgba::new(r.read_f32()?, r.read_f32()?, r.read_f32()?, r.read_f32()?))
}

fn expect_exhausted(r: &ByteReader, tag: &str) -> EngineResult<()> {
    if !r.is_empty() {
        return Err(EngineError::InvalidPayloadSize {
            tag: tag.into(),
            detail: format!("{} trailing bytes", r.remaining()),
        });
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
pub struct RectPayload {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
    pub fill: Rgba,
    pub stroke: Rgba,
    pub stroke_enabled: bool,
    pub stroke_width_px: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinePayload {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
    pub rgba: Rgba,
    pub enabled: bool,
    pub stroke_width_px: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PolylinePayload {
    pub points: Vec<(f32, f32)>,
    pub rgba: Rgba,
    pub enabled: bool,
    pub stroke_width_px: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CirclePayload {
    pub cx: f32,
    pub cy: f32,
    pub rx: f32,
    pub ry: f32,
    pub rot: f32,
    pub sx: f32,
    pub sy: f32,
    pub fill: Rgba,
    pub stroke: Rgba,
    pub stroke_flags: StrokeFlags,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PolygonPayload {
    pub cx: f32,
    pub cy: f32,
    pub rx: f32,
    pub ry: f32,
    pub rot: f32,
    pub sx: f32,
    pub sy: f32,
    pub fill: Rgba,
    pub stroke: Rgba,
    pub stroke_flags: StrokeFlags,
    pub sides: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrowPayload {
    pub ax: f32,
    pub ay: f32,
    pub bx: f32,
    pub by: f32,
    pub head: f32,
    pub rgba: Rgba,
    pub stroke_width_px: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextPayload {
    pub x: f32,
    pub y: f32,
    pub rotation: f32,
    pub box_mode: TextBoxMode,
    pub align: TextAlign,
    pub constraint_width: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApplyTextStylePayload {
    pub lo: u32,
    pub hi: u32,
    pub mode: StyleApplyMode,
    pub flags_mask: TextStyleFlags,
    pub font_id: Option<u32>,
    pub font_size: Option<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    ClearAll,
    UpsertRect(RectPayload),
    UpsertLine(LinePayload),
    UpsertPolyline(PolylinePayload),
    DeleteEntity,
    SetDrawOrder(Vec<u32>),
    SetViewScale(f32),
    UpsertCircle(CirclePayload),
    UpsertPolygon(PolygonPayload),
    UpsertArrow(ArrowPayload),
    UpsertText(TextPayload),
    DeleteText,
    SetTextCaret(u32),
    SetTextSelection { anchor: u32, caret: u32 },
    InsertTextContent { at: u32, text: String },
    DeleteTextContent { lo: u32, hi: u32 },
    ApplyTextStyle(ApplyTextStylePayload),
    SetTextAlign(TextAlign),
}

fn box_mode_from_u32(tag: &str, v: u32) -> EngineResult<TextBoxMode> {
    match v {
        0 => Ok(TextBoxMode::AutoWidth),
        1 => Ok(TextBoxMode::FixedWidth),
        other => Err(EngineError::InvalidPayloadSize {
            tag: tag.into(),
            detail: format!("unknown box mode tag {other}"),
        }),
    }
}

fn align_from_u32(tag: &str, v: u32) -> EngineResult<TextAlign> {
    match v {
        0 => Ok(TextAlign::Left),
        1 => Ok(TextAlign::Center),
        2 => Ok(TextAlign::Right),
        other => Err(EngineError::InvalidPayloadSize {
            tag: tag.into(),
            detail: format!("unknown align tag {other}"),
        }),
    }
}

fn style_mode_from_u32(tag: &str, v: u32) -> EngineResult<StyleApplyMode> {
    match v {
        0 => Ok(StyleApplyMode::Set),
        1 => Ok(StyleApplyMode::Clear),
        2 => Ok(StyleApplyMode::Toggle),
        other => Err(EngineError::InvalidPayloadSize {
            tag: tag.into(),
            detail: format!("unknown style apply mode tag {other}"),
        }),
    }
}

/// Decodes `bytes` as the payload for `opcode`, failing with
/// `InvalidPayloadSize` on any short read or malformed tag rather than
/// `BufferTruncated` — the outer length has already been validated by the
/// caller against the command record's `payloadBytes` field.
pub fn decode(opcode: super::opcode::Opcode, bytes: &[u8]) -> EngineResult<Payload> {
    use super::opcode::Opcode;
    let mut r = ByteReader::new(bytes);
    let payload = match opcode {
        Opcode::ClearAll => {
            expect_exhausted(&r, "ClearAll")?;
            Payload::ClearAll
        }
        Opcode::UpsertRect => {
            let p = RectPayload {
                x: r.read_f32()?,
                y: r.read_f32()?,
                w: r.read_f32()?,
                h: r.read_f32()?,
                fill: rgba(&mut r)?,
                stroke: rgba(&mut r)?,
                stroke_enabled: r.read_f32()? != 0.0,
                stroke_width_px: r.read_f32()?,
            };
            expect_exhausted(&r, "UpsertRect")?;
            Payload::UpsertRect(p)
        }
        Opcode::UpsertLine => {
            let p = LinePayload {
                x0: r.read_f32()?,
                y0: r.read_f32()?,
                x1: r.read_f32()?,
                y1: r.read_f32()?,
                rgba: rgba(&mut r)?,
                enabled: r.read_f32()? != 0.0,
                stroke_width_px: r.read_f32()?,
            };
            expect_exhausted(&r, "UpsertLine")?;
            Payload::UpsertLine(p)
        }
        Opcode::UpsertPolyline => {
            let count = r.read_u32()? as usize;
            let mut points = Vec::with_capacity(count);
            for _ in 0..count {
                points.push((r.read_f32()?, r.read_f32()?));
            }
            let p = PolylinePayload {
                points,
                rgba: rgba(&mut r)?,
                enabled: r.read_f32()? != 0.0,
                stroke_width_px: r.read_f32()?,
            };
            expect_exhausted(&r, "UpsertPolyline")?;
            Payload::UpsertPolyline(p)
        }
        Opcode::DeleteEntity => {
            expect_exhausted(&r, "DeleteEntity")?;
            Payload::DeleteEntity
        }
        Opcode::SetDrawOrder => {
            let count = r.read_u32()? as usize;
            let mut ids = Vec::with_capacity(count);
            for _ in 0..count {
                ids.push(r.read_u32()?);
            }
            expect_exhausted(&r, "SetDrawOrder")?;
            Payload::SetDrawOrder(ids)
        }
        Opcode::SetViewScale => {
            let scale = r.read_f32()?;
            expect_exhausted(&r, "SetViewScale")?;
            Payload::SetViewScale(scale)
        }
        Opcode::UpsertCircle => {
            let p = CirclePayload {
                cx: r.read_f32()?,
                cy: r.read_f32()?,
                rx: r.read_f32()?,
                ry: r.read_f32()?,
                rot: r.read_f32()?,
                sx: r.read_f32()?,
                sy: r.read_f32()?,
                fill: rgba(&mut r)?,
                stroke: rgba(&mut r)?,
                stroke_flags: StrokeFlags::from_bits_truncate(r.read_u32()?),
            };
            expect_exhausted(&r, "UpsertCircle")?;
            Payload::UpsertCircle(p)
        }
        Opcode::UpsertPolygon => {
            let p = PolygonPayload {
                cx: r.read_f32()?,
                cy: r.read_f32()?,
                rx: r.read_f32()?,
                ry: r.read_f32()?,
                rot: r.read_f32()?,
                sx: r.read_f32()?,
                sy: r.read_f32()?,
                fill: rgba(&mut r)?,
                stroke: rgba(&mut r)?,
                stroke_flags: StrokeFlags::from_bits_truncate(r.read_u32()?),
                sides: r.read_u32()?,
            };
            expect_exhausted(&r, "UpsertPolygon")?;
            Payload::UpsertPolygon(p)
        }
        Opcode::UpsertArrow => {
            let p = ArrowPayload {
                ax: r.read_f32()?,
                ay: r.read_f32()?,
                bx: r.read_f32()?,
                by: r.read_f32()?,
                head: r.read_f32()?,
                rgba: rgba(&mut r)?,
                stroke_width_px: r.read_f32()?,
            };
            expect_exhausted(&r, "UpsertArrow")?;
            Payload::UpsertArrow(p)
        }
        Opcode::UpsertText => {
            let x = r.read_f32()?;
            let y = r.read_f32()?;
            let rotation = r.read_f32()?;
            let box_mode = box_mode_from_u32("UpsertText", r.read_u32()?)?;
            let align = align_from_u32("UpsertText", r.read_u32()?)?;
            let constraint_width = r.read_f32()?;
            expect_exhausted(&r, "UpsertText")?;
            Payload::UpsertText(TextPayload {
                x,
                y,
                rotation,
                box_mode,
                align,
                constraint_width,
            })
        }
        Opcode::DeleteText => {
            expect_exhausted(&r, "DeleteText")?;
            Payload::DeleteText
        }
        Opcode::SetTextCaret => {
            let caret = r.read_u32()?;
            expect_exhausted(&r, "SetTextCaret")?;
            Payload::SetTextCaret(caret)
        }
        Opcode::SetTextSelection => {
            let anchor = r.read_u32()?;
            let caret = r.read_u32()?;
            expect_exhausted(&r, "SetTextSelection")?;
            Payload::SetTextSelection { anchor, caret }
        }
        Opcode::InsertTextContent => {
            let at = r.read_u32()?;
            let text = r.read_string32()?;
            expect_exhausted(&r, "InsertTextContent")?;
            Payload::InsertTextContent { at, text }
        }
        Opcode::DeleteTextContent => {
            let lo = r.read_u32()?;
            let hi = r.read_u32()?;
            expect_exhausted(&r, "DeleteTextContent")?;
            Payload::DeleteTextContent { lo, hi }
        }
        Opcode::ApplyTextStyle => {
            let lo = r.read_u32()?;
            let hi = r.read_u32()?;
            let mode = style_mode_from_u32("ApplyTextStyle", r.read_u32()?)?;
            let flags_mask = TextStyleFlags::from_bits_truncate(r.read_u32()? as u8);
            let has_font_id = r.read_u32()? != 0;
            let font_id_raw = r.read_u32()?;
            let has_font_size = r.read_u32()? != 0;
            let font_size_raw = r.read_f32()?;
            expect_exhausted(&r, "ApplyTextStyle")?;
            Payload::ApplyTextStyle(ApplyTextStylePayload {
                lo,
                hi,
                mode,
                flags_mask,
                font_id: has_font_id.then_some(font_id_raw),
                font_size: has_font_size.then_some(font_size_raw),
            })
        }
        Opcode::SetTextAlign => {
            let align = align_from_u32("SetTextAlign", r.read_u32()?)?;
            expect_exhausted(&r, "SetTextAlign")?;
            Payload::SetTextAlign(align)
        }
    };
    Ok(payload)
}

/// Wraps `decode` so every short-read failure reports as the payload-size
/// error the dispatcher's atomicity guarantee expects, tagged with the
/// opcode name, rather than leaking a raw `BufferTruncated`.
pub fn decode_checked(opcode: super::opcode::Opcode, tag: &str, bytes: &[u8]) -> EngineResult<Payload> {
    match decode(opcode, bytes) {
        Ok(p) => Ok(p),
        Err(EngineError::BufferTruncated { needed, available }) => Err(EngineError::InvalidPayloadSize {
            tag: tag.into(),
            detail: format!("needed {needed} bytes, had {available}"),
        }),
        Err(other) => Err(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opcode::Opcode;
    use core_types::ByteWriter;

    #[test]
    fn decodes_upsert_rect_payload_from_scenario_1() {
        let mut w = ByteWriter::new();
        w.write_f32(0.0);
        w.write_f32(0.0);
        w.write_f32(10.0);
        w.write_f32(5.0);
        for v in [1.0, 0.0, 0.0, 1.0] {
            w.write_f32(v);
        }
        for v in [0.0, 0.0, 0.0, 1.0] {
            w.write_f32(v);
        }
        w.write_f32(1.0);
        w.write_f32(1.0);
        let bytes = w.into_vec();

        let Payload::UpsertRect(p) = decode(Opcode::UpsertRect, &bytes).unwrap() else {
            panic!("wrong variant");
        };
        assert_eq!(p.w, 10.0);
        assert_eq!(p.h, 5.0);
        assert_eq!(p.fill, Rgba::new(1.0, 0.0, 0.0, 1.0));
        assert!(p.stroke_enabled);
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        let mut w = ByteWriter::new();
        w.write_f32(1.0);
        let bytes = w.into_vec();
        assert!(decode(Opcode::SetViewScale, &bytes).is_err());
        let mut w2 = ByteWriter::new();
        w2.write_f32(1.0);
        w2.write_u8(0);
        assert!(matches!(
            decode(Opcode::SetViewScale, &w2.into_vec()),
            Err(EngineError::InvalidPayloadSize { .. })
        ));
    }

    #[test]
    fn short_payload_reports_truncation() {
        let bytes: [u8; 2] = [0, 0];
        assert!(matches!(
            decode(Opcode::SetTextCaret, &bytes),
            Err(EngineError::BufferTruncated { .. })
        ));
    }
}
