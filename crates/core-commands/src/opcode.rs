//! EWDC command buffer opcodes (spec.md §4.2). The set is closed and
//! wire-stable: a host and engine must agree on these exact tag values,
//! which is why the enum is explicit `repr(u32)` rather than derived order.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Opcode {
    ClearAll = 0,
    UpsertRect = 1,
    UpsertLine = 2,
    UpsertPolyline = 3,
    DeleteEntity = 4,
    SetDrawOrder = 5,
    SetViewScale = 6,
    UpsertCircle = 7,
    UpsertPolygon = 8,
    UpsertArrow = 9,
    UpsertText = 10,
    DeleteText = 11,
    SetTextCaret = 12,
    SetTextSelection = 13,
    InsertTextContent = 14,
    DeleteTextContent = 15,
    ApplyTextStyle = 16,
    SetTextAlign = 17,
}

impl Opcode {
    pub fn from_u32(value: u32) -> Option<Self> {
        Some(match value {
            0 => Self::ClearAll,
            1 => Self::UpsertRect,
            2 => Self::UpsertLine,
            3 => Self::UpsertPolyline,
            4 => Self::DeleteEntity,
            5 => Self::SetDrawOrder,
            6 => Self::SetViewScale,
            7 => Self::UpsertCircle,
            8 => Self::UpsertPolygon,
            9 => Self::UpsertArrow,
            10 => Self::UpsertText,
            11 => Self::DeleteText,
            12 => Self::SetTextCaret,
            13 => Self::SetTextSelection,
            14 => Self::InsertTextContent,
            15 => Self::DeleteTextContent,
            16 => Self::ApplyTextStyle,
            17 => Self::SetTextAlign,
            _ => return None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_tag() {
        for tag in 0..=17u32 {
            assert_eq!(Opcode::from_u32(tag).unwrap() as u32, tag);
        }
    }

    #[test]
    fn unknown_tag_is_none() {
        assert!(Opcode::from_u32(18).is_none());
    }
}
