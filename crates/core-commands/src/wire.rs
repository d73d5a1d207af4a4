//! EWDC buffer framing (spec.md §4.2, §6): the 12-byte header and the
//! 16-byte-plus-payload per-command record.

use core_types::{ByteReader, EngineError, EngineResult};
use core_types::protocol::{COMMAND_BUFFER_MAGIC, COMMAND_BUFFER_VERSION};

use crate::opcode::Opcode;
use crate::payload::{self, Payload};

#[derive(Debug, Clone, PartialEq)]
pub struct DecodedCommand {
    pub id: u32,
    pub payload: Payload,
}

/// Parses the full EWDC buffer into an ordered list of decoded commands.
/// This is the atomic half of dispatch (spec.md §7): any header mismatch,
/// truncation, unknown opcode, or payload-size mismatch rejects the whole
/// buffer before a single byte of document state is touched.
pub fn decode_buffer(bytes: &[u8]) -> EngineResult<Vec<DecodedCommand>> {
    let mut r = ByteReader::new(bytes);

    let magic = r.read_u32()?;
    if magic != COMMAND_BUFFER_MAGIC {
        return Err(EngineError::InvalidMagic {
            expected: COMMAND_BUFFER_MAGIC,
            found: magic,
        });
    }
    let version = r.read_u32()?;
    if version != COMMAND_BUFFER_VERSION {
        return Err(EngineError::UnsupportedVersion {
            expected: COMMAND_BUFFER_VERSION,
            found: version,
        });
    }
    let command_count = r.read_u32()?;

    let mut commands = Vec::with_capacity(command_count as usize);
    for _ in 0..command_count {
        let op = r.read_u32()?;
        let id = r.read_u32()?;
        let payload_bytes = r.read_u32()?;
        let _reserved = r.read_u32()?;
        let raw = r.read_bytes(payload_bytes as usize)?;

        let opcode = Opcode::from_u32(op).ok_or(EngineError::UnknownCommand(op))?;
        let tag = format!("{opcode:?}");
        let payload = payload::decode_checked(opcode, &tag, raw)?;
        commands.push(DecodedCommand { id, payload });
    }

    Ok(commands)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opcode::Opcode;
    use core_types::ByteWriter;

    fn scenario_1_buffer() -> Vec<u8> {
        let mut payload = ByteWriter::new();
        payload.write_f32(0.0);
        payload.write_f32(0.0);
        payload.write_f32(10.0);
        payload.write_f32(5.0);
        for v in [1.0, 0.0, 0.0, 1.0] {
            payload.write_f32(v);
        }
        for v in [0.0, 0.0, 0.0, 1.0] {
            payload.write_f32(v);
        }
        payload.write_f32(1.0);
        payload.write_f32(1.0);
        let payload_bytes = payload.into_vec();

        let mut w = ByteWriter::new();
        w.write_u32(COMMAND_BUFFER_MAGIC);
        w.write_u32(COMMAND_BUFFER_VERSION);
        w.write_u32(1);
        w.write_u32(Opcode::UpsertRect as u32);
        w.write_u32(7);
        w.write_u32(payload_bytes.len() as u32);
        w.write_u32(0);
        w.write_bytes(&payload_bytes);
        w.into_vec()
    }

    #[test]
    fn decodes_scenario_1_buffer() {
        let commands = decode_buffer(&scenario_1_buffer()).unwrap();
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].id, 7);
        assert!(matches!(commands[0].payload, Payload::UpsertRect(_)));
    }

    #[test]
    fn rejects_wrong_magic() {
        let mut bytes = scenario_1_buffer();
        bytes[0] = 0;
        assert!(matches!(decode_buffer(&bytes), Err(EngineError::InvalidMagic { .. })));
    }

    #[test]
    fn rejects_unknown_opcode_before_any_mutation_would_occur() {
        let mut bytes = scenario_1_buffer();
        // Command op field starts right after the 12-byte header.
        bytes[12..16].copy_from_slice(&999u32.to_le_bytes());
        assert!(matches!(decode_buffer(&bytes), Err(EngineError::UnknownCommand(999))));
    }

    #[test]
    fn rejects_truncated_buffer() {
        let bytes = scenario_1_buffer();
        assert!(decode_buffer(&bytes[..bytes.len() - 4]).is_err());
    }
}
