//! Bounds-checked sequential reader over an immutable byte buffer.

use std::mem::size_of;

use bytemuck::{Pod, pod_read_unaligned};

use crate::error::DecodeError;

/// Reads through a byte slice front to back.
///
/// Offsets reported in errors are absolute: a cursor created with
/// [`ByteCursor::take`] keeps counting from where its parent was.
#[derive(Clone, Debug)]
pub struct ByteCursor<'bytes> {
    bytes: &'bytes [u8],
    base: usize,
    position: usize,
}

impl<'bytes> ByteCursor<'bytes> {
    pub fn new(bytes: &'bytes [u8]) -> Self {
        Self::at(bytes, 0)
    }

    /// Create a cursor whose first byte sits at absolute offset `base`.
    pub fn at(bytes: &'bytes [u8], base: usize) -> Self {
        ByteCursor {
            bytes,
            base,
            position: 0,
        }
    }

    /// Absolute offset of the next byte to be read.
    pub fn position(&self) -> usize {
        self.base + self.position
    }

    /// Number of bytes consumed from this cursor.
    pub fn consumed(&self) -> usize {
        self.position
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.position
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn truncated(&self, needed: usize) -> DecodeError {
        DecodeError::Truncated {
            offset: self.position(),
            needed,
            remaining: self.remaining(),
        }
    }

    /// Look at the next byte without consuming it.
    ///
    /// At the start of a descriptor this is its bLength.
    pub fn peek_length(&self) -> Result<u8, DecodeError> {
        self.bytes
            .get(self.position)
            .copied()
            .ok_or_else(|| self.truncated(1))
    }

    pub fn read(&mut self, n: usize) -> Result<&'bytes [u8], DecodeError> {
        if n > self.remaining() {
            return Err(self.truncated(n));
        }
        let start = self.position;
        self.position += n;
        Ok(&self.bytes[start .. self.position])
    }

    /// Consume everything that is left.
    pub fn read_rest(&mut self) -> &'bytes [u8] {
        let start = self.position;
        self.position = self.bytes.len();
        &self.bytes[start ..]
    }

    pub fn skip(&mut self, n: usize) -> Result<(), DecodeError> {
        self.read(n).map(|_| ())
    }

    /// Split off a cursor over the next `n` bytes, advancing past them.
    pub fn take(&mut self, n: usize) -> Result<ByteCursor<'bytes>, DecodeError> {
        let base = self.position();
        let bytes = self.read(n)?;
        Ok(ByteCursor::at(bytes, base))
    }

    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.read(1)?[0])
    }

    pub fn read_u16_le(&mut self) -> Result<u16, DecodeError> {
        let b = self.read(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    /// Three-byte little-endian value, as used for audio sample rates.
    pub fn read_u24_le(&mut self) -> Result<u32, DecodeError> {
        let b = self.read(3)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], 0]))
    }

    pub fn read_u32_le(&mut self) -> Result<u32, DecodeError> {
        let b = self.read(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Unsigned little-endian value of 0 to 4 bytes, zero-extended.
    pub fn read_uint_le(&mut self, n: usize) -> Result<u32, DecodeError> {
        if n > 4 {
            return Err(self.truncated(n));
        }
        let b = self.read(n)?;
        let mut word = [0u8; 4];
        word[.. n].copy_from_slice(b);
        Ok(u32::from_le_bytes(word))
    }

    /// Read a fixed-layout record.
    pub fn read_pod<T: Pod>(&mut self) -> Result<T, DecodeError> {
        Ok(pod_read_unaligned::<T>(self.read(size_of::<T>())?))
    }

    /// Read exactly `count` single-byte elements.
    pub fn read_array(&mut self, count: usize) -> Result<Vec<u8>, DecodeError> {
        Ok(self.read(count)?.to_vec())
    }
}
