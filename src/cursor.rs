//! Bounds-checked byte cursor.
//!
//! A [`Cursor`] reads from a borrowed buffer but is confined to one
//! [`ByteRange`] of it. Every byte the crate reads goes through here, so
//! this is the only place that indexes the backing buffer.

use crate::error::{Result, ZerofileError};

/// Half-open `[base_offset, base_offset + length)` window over a buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub base_offset: usize,
    pub length: usize,
}

impl ByteRange {
    /// Create a range, checking it fits inside a buffer of `total` bytes
    pub fn new(base_offset: usize, length: usize, total: usize) -> Result<Self> {
        match base_offset.checked_add(length) {
            Some(end) if end <= total => Ok(Self {
                base_offset,
                length,
            }),
            _ => Err(ZerofileError::OutOfBounds {
                offset: base_offset,
                length,
                scope_len: total,
            }),
        }
    }

    /// One past the last absolute offset in the range
    pub fn end(&self) -> usize {
        self.base_offset + self.length
    }
}

/// Read/seek position inside a [`ByteRange`].
///
/// Invariant: `position <= range.length`. Failed operations leave the
/// position where it was.
#[derive(Debug, Clone, Copy)]
pub struct Cursor<'a> {
    buf: &'a [u8],
    range: ByteRange,
    position: usize,
}

impl<'a> Cursor<'a> {
    /// Cursor over a whole buffer
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            buf,
            range: ByteRange {
                base_offset: 0,
                length: buf.len(),
            },
            position: 0,
        }
    }

    /// Cursor restricted to `range` of `buf`
    pub fn with_range(buf: &'a [u8], range: ByteRange) -> Result<Self> {
        let range = ByteRange::new(range.base_offset, range.length, buf.len())?;
        Ok(Self {
            buf,
            range,
            position: 0,
        })
    }

    pub fn range(&self) -> ByteRange {
        self.range
    }

    /// Position relative to the start of the range
    pub fn position(&self) -> usize {
        self.position
    }

    /// Position as an offset into the backing buffer
    pub fn absolute_position(&self) -> usize {
        self.range.base_offset + self.position
    }

    pub fn len(&self) -> usize {
        self.range.length
    }

    pub fn is_empty(&self) -> bool {
        self.range.length == 0
    }

    pub fn remaining(&self) -> usize {
        self.range.length - self.position
    }

    fn out_of_bounds(&self, offset: usize, length: usize) -> ZerofileError {
        ZerofileError::OutOfBounds {
            offset,
            length,
            scope_len: self.range.length,
        }
    }

    /// Return the next `n` bytes without moving
    pub fn peek_bytes(&self, n: usize) -> Result<&'a [u8]> {
        if n > self.remaining() {
            return Err(self.out_of_bounds(self.position, n));
        }
        let start = self.absolute_position();
        self.buf
            .get(start..start + n)
            .ok_or_else(|| self.out_of_bounds(self.position, n))
    }

    /// Return the next `n` bytes and advance past them
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        let bytes = self.peek_bytes(n)?;
        self.position += n;
        Ok(bytes)
    }

    /// Read a fixed number of bytes into an array
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let bytes = self.peek_bytes(N)?;
        let array: [u8; N] = bytes
            .try_into()
            .map_err(|_| self.out_of_bounds(self.position, N))?;
        self.position += N;
        Ok(array)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        let [b] = self.read_array::<1>()?;
        Ok(b)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    /// Move to an offset relative to the start of the range.
    ///
    /// Seeking to `len()` is allowed and leaves nothing to read.
    pub fn seek(&mut self, offset: usize) -> Result<()> {
        if offset > self.range.length {
            return Err(self.out_of_bounds(offset, 0));
        }
        self.position = offset;
        Ok(())
    }

    pub fn skip(&mut self, n: usize) -> Result<()> {
        if n > self.remaining() {
            return Err(self.out_of_bounds(self.position, n));
        }
        self.position += n;
        Ok(())
    }

    /// Every byte of the range, regardless of position
    pub fn as_slice(&self) -> &'a [u8] {
        self.buf
            .get(self.range.base_offset..self.range.end())
            .unwrap_or_default()
    }

    /// Bytes from the position to the end of the range
    pub fn rest(&self) -> &'a [u8] {
        self.as_slice().get(self.position..).unwrap_or_default()
    }

    /// Cursor over the next `n` bytes, starting at its own position 0.
    ///
    /// Does not advance `self`.
    pub fn sub_cursor(&self, n: usize) -> Result<Cursor<'a>> {
        if n > self.remaining() {
            return Err(self.out_of_bounds(self.position, n));
        }
        Ok(Cursor {
            buf: self.buf,
            range: ByteRange {
                base_offset: self.absolute_position(),
                length: n,
            },
            position: 0,
        })
    }
}
