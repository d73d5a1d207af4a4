//! Little-endian byte cursor shared by the command codec (EWDC), the
//! snapshot codec (ESNP), and the history byte codec. Every wire format in
//! this workspace is tight-packed little-endian POD, so one cursor pair
//! serves all three instead of each crate rolling its own.

use crate::error::EngineError;

/// Read-only cursor over a borrowed byte slice.
///
/// Every `read_*` method advances the cursor only on success; a short read
/// leaves the cursor untouched and returns `BufferTruncated`, which is what
/// lets callers treat a parse failure as "no bytes consumed, buffer
/// rejected" rather than reasoning about partial advancement.
pub struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn need(&self, n: usize) -> Result<(), EngineError> {
        if self.remaining() < n {
            Err(EngineError::BufferTruncated {
                needed: n,
                available: self.remaining(),
            })
        } else {
            Ok(())
        }
    }

    pub fn read_u8(&mut self) -> Result<u8, EngineError> {
        self.need(1)?;
        let v = self.buf[self.pos];
        self.pos += 1;
        Ok(v)
    }

    pub fn read_u32(&mut self) -> Result<u32, EngineError> {
        self.need(4)?;
        let v = u32::from_le_bytes(self.buf[self.pos..self.pos + 4].try_into().unwrap());
        self.pos += 4;
        Ok(v)
    }

    pub fn read_i32(&mut self) -> Result<i32, EngineError> {
        Ok(self.read_u32()? as i32)
    }

    pub fn read_f32(&mut self) -> Result<f32, EngineError> {
        Ok(f32::from_bits(self.read_u32()?))
    }

    pub fn read_u64(&mut self) -> Result<u64, EngineError> {
        self.need(8)?;
        let v = u64::from_le_bytes(self.buf[self.pos..self.pos + 8].try_into().unwrap());
        self.pos += 8;
        Ok(v)
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], EngineError> {
        self.need(n)?;
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    /// Reads a `u32` length prefix followed by that many UTF-8 bytes.
    pub fn read_string32(&mut self) -> Result<String, EngineError> {
        let len = self.read_u32()? as usize;
        let bytes = self.read_bytes(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| EngineError::InvalidPayloadSize {
            tag: "string".into(),
            detail: "invalid utf-8".into(),
        })
    }

    pub fn seek(&mut self, pos: usize) -> Result<(), EngineError> {
        if pos > self.buf.len() {
            return Err(EngineError::BufferTruncated {
                needed: pos,
                available: self.buf.len(),
            });
        }
        self.pos = pos;
        Ok(())
    }

    pub fn slice_from(&self, offset: usize, len: usize) -> Result<&'a [u8], EngineError> {
        if offset.saturating_add(len) > self.buf.len() {
            return Err(EngineError::BufferTruncated {
                needed: offset + len,
                available: self.buf.len(),
            });
        }
        Ok(&self.buf[offset..offset + len])
    }
}

/// Append-only little-endian byte writer backing every encoder in the
/// workspace (EWDC is read-only to this engine, but ESNP and the history
/// codec are written here).
#[derive(Default, Debug, Clone)]
pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(cap: usize) -> Self {
        Self {
            buf: Vec::with_capacity(cap),
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_i32(&mut self, v: i32) {
        self.write_u32(v as u32);
    }

    pub fn write_f32(&mut self, v: f32) {
        self.write_u32(v.to_bits());
    }

    pub fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn write_string32(&mut self, s: &str) {
        self.write_u32(s.len() as u32);
        self.write_bytes(s.as_bytes());
    }

    /// Overwrites `len` bytes at `offset` with `bytes`, used to patch a
    /// section-table entry once the section's final size/crc are known.
    pub fn patch(&mut self, offset: usize, bytes: &[u8]) {
        self.buf[offset..offset + bytes.len()].copy_from_slice(bytes);
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.buf
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_scalar_fields() {
        let mut w = ByteWriter::new();
        w.write_u32(0xdead_beef);
        w.write_i32(-7);
        w.write_f32(1.5);
        w.write_u64(0x1122_3344_5566_7788);
        w.write_string32("hi");
        let bytes = w.into_vec();

        let mut r = ByteReader::new(&bytes);
        assert_eq!(r.read_u32().unwrap(), 0xdead_beef);
        assert_eq!(r.read_i32().unwrap(), -7);
        assert_eq!(r.read_f32().unwrap(), 1.5);
        assert_eq!(r.read_u64().unwrap(), 0x1122_3344_5566_7788);
        assert_eq!(r.read_string32().unwrap(), "hi");
        assert!(r.is_empty());
    }

    #[test]
    fn short_read_reports_truncation_without_advancing() {
        let bytes = [1u8, 2, 3];
        let mut r = ByteReader::new(&bytes);
        let before = r.position();
        let err = r.read_u32().unwrap_err();
        assert!(matches!(err, EngineError::BufferTruncated { .. }));
        assert_eq!(r.position(), before);
    }

    #[test]
    fn patch_overwrites_in_place() {
        let mut w = ByteWriter::new();
        w.write_u32(0);
        w.patch(0, &42u32.to_le_bytes());
        let bytes = w.into_vec();
        assert_eq!(u32::from_le_bytes(bytes.try_into().unwrap()), 42);
    }
}
