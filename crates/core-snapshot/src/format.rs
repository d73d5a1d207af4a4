//! ESNP framing (spec.md §4.3, §6): the 16-byte header, the 16-byte section
//! table entries, and the CRC32 closure over each section payload.

use core_types::protocol::{SNAPSHOT_MAGIC, SNAPSHOT_VERSION};
use core_types::{crc32, ByteReader, ByteWriter, EngineError, EngineResult};

const fn fourcc(tag: &[u8; 4]) -> u32 {
    u32::from_le_bytes(*tag)
}

pub const TAG_ENTS: u32 = fourcc(b"ENTS");
pub const TAG_LAYR: u32 = fourcc(b"LAYR");
pub const TAG_ORDR: u32 = fourcc(b"ORDR");
pub const TAG_SELC: u32 = fourcc(b"SELC");
pub const TAG_TEXT: u32 = fourcc(b"TEXT");
pub const TAG_NIDX: u32 = fourcc(b"NIDX");
pub const TAG_STYL: u32 = fourcc(b"STYL");
pub const TAG_HIST: u32 = fourcc(b"HIST");

const HEADER_SIZE: usize = 16;
const TABLE_ENTRY_SIZE: usize = 16;

/// One section ready to be laid out: its four-CC tag and already-encoded
/// payload bytes. Order in the slice passed to [`assemble`] is the order
/// sections are written in, which for this codec is always the fixed
/// required-then-optional order `build_snapshot_bytes` constructs.
pub struct Section {
    pub tag: u32,
    pub bytes: Vec<u8>,
}

/// Lays out `{header, table, sections...}` as one contiguous buffer.
/// Offsets in the table are absolute byte positions from the start of the
/// buffer, per spec.md §6 "payload offsets reference absolute byte
/// positions".
pub fn assemble(sections: &[Section]) -> Vec<u8> {
    let mut w = ByteWriter::new();
    w.write_u32(SNAPSHOT_MAGIC);
    w.write_u32(SNAPSHOT_VERSION);
    w.write_u32(sections.len() as u32);
    w.write_u32(0); // reserved

    let table_start = HEADER_SIZE;
    let mut offset = table_start + sections.len() * TABLE_ENTRY_SIZE;
    for section in sections {
        w.write_u32(section.tag);
        w.write_u32(offset as u32);
        w.write_u32(section.bytes.len() as u32);
        w.write_u32(crc32(&section.bytes));
        offset += section.bytes.len();
    }
    for section in sections {
        w.write_bytes(&section.bytes);
    }
    w.into_vec()
}

pub struct ParsedSection<'a> {
    pub tag: u32,
    pub bytes: &'a [u8],
}

/// Validates the header and table, checks every section's CRC32, and
/// returns a view of each section's payload. A CRC mismatch in any section
/// fails the whole load, per spec.md §4.3 "a CRC mismatch in any required
/// section fails the load with `InvalidPayloadSize`" — this codec treats
/// every present section the same way, required or optional.
pub fn parse(bytes: &[u8]) -> EngineResult<Vec<ParsedSection<'_>>> {
    let mut r = ByteReader::new(bytes);
    let magic = r.read_u32()?;
    if magic != SNAPSHOT_MAGIC {
        return Err(EngineError::InvalidMagic {
            expected: SNAPSHOT_MAGIC,
            found: magic,
        });
    }
    let version = r.read_u32()?;
    if version != SNAPSHOT_VERSION {
        return Err(EngineError::UnsupportedVersion {
            expected: SNAPSHOT_VERSION,
            found: version,
        });
    }
    let section_count = r.read_u32()? as usize;
    let _reserved = r.read_u32()?;

    let mut entries = Vec::with_capacity(section_count);
    for _ in 0..section_count {
        let tag = r.read_u32()?;
        let offset = r.read_u32()? as usize;
        let size = r.read_u32()? as usize;
        let crc = r.read_u32()?;
        entries.push((tag, offset, size, crc));
    }

    let mut sections = Vec::with_capacity(section_count);
    for (tag, offset, size, crc) in entries {
        let payload = r.slice_from(offset, size)?;
        if crc32(payload) != crc {
            return Err(EngineError::InvalidPayloadSize {
                tag: fourcc_name(tag),
                detail: "CRC32 mismatch".into(),
            });
        }
        sections.push(ParsedSection { tag, bytes: payload });
    }
    Ok(sections)
}

fn fourcc_name(tag: u32) -> String {
    String::from_utf8_lossy(&tag.to_le_bytes()).into_owned()
}

pub fn find<'a, 'b>(sections: &'b [ParsedSection<'a>], tag: u32) -> Option<&'b [u8]> {
    sections.iter().find(|s| s.tag == tag).map(|s| s.bytes)
}

pub fn require<'a, 'b>(sections: &'b [ParsedSection<'a>], tag: u32, name: &str) -> EngineResult<&'b [u8]> {
    find(sections, tag).ok_or_else(|| EngineError::InvalidPayloadSize {
        tag: name.into(),
        detail: "required section is missing".into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_single_section() {
        let sections = vec![Section { tag: TAG_NIDX, bytes: vec![1, 0, 0, 0] }];
        let bytes = assemble(&sections);
        let parsed = parse(&bytes).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(find(&parsed, TAG_NIDX), Some(&[1u8, 0, 0, 0][..]));
    }

    #[test]
    fn rejects_corrupted_section_bytes() {
        let sections = vec![Section { tag: TAG_NIDX, bytes: vec![1, 0, 0, 0] }];
        let mut bytes = assemble(&sections);
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        assert!(matches!(parse(&bytes), Err(EngineError::InvalidPayloadSize { .. })));
    }

    #[test]
    fn rejects_wrong_magic() {
        let mut bytes = assemble(&[Section { tag: TAG_NIDX, bytes: vec![0; 4] }]);
        bytes[0] = 0;
        assert!(matches!(parse(&bytes), Err(EngineError::InvalidMagic { .. })));
    }
}
