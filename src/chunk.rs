//! Chunk header codec.
//!
//! Every chunk starts with an 8-byte header: a 4-byte tag followed by the
//! payload length as a little-endian `u32`. The length never includes the
//! header itself.

use crate::cursor::Cursor;
use crate::error::{Result, ZerofileError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Size of an encoded chunk header in bytes
pub const HEADER_SIZE: usize = 8;

/// Size of the form-type field that opens `RIFF` and `LIST` payloads
pub const FORM_TYPE_SIZE: usize = 4;

/// Four-byte chunk identifier.
///
/// Tags are opaque bytes compared by exact equality. They are usually ASCII
/// but nothing requires it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Tag(pub [u8; 4]);

impl Tag {
    /// Outer envelope
    pub const RIFF: Tag = Tag(*b"RIFF");
    /// Nested container
    pub const LIST: Tag = Tag(*b"LIST");
    /// Form type of a Zerofile envelope
    pub const ZERO: Tag = Tag(*b"ZERO");
    /// Spline parameters, the leading record
    pub const SPLI: Tag = Tag(*b"SPLI");
    /// Command buffer bytes
    pub const CBUF: Tag = Tag(*b"CBUF");
    /// Complex value per pin
    pub const CPLX: Tag = Tag(*b"CPLX");
    /// 8-bit volume extraction in scanline order
    pub const PVOS: Tag = Tag(*b"PVOS");
    /// 8-bit volume extraction in tiled order
    pub const PVOL: Tag = Tag(*b"PVOL");

    /// Build a tag from a slice that must be exactly 4 bytes long
    pub fn new(bytes: &[u8]) -> Result<Self> {
        let array: [u8; 4] = bytes
            .try_into()
            .map_err(|_| ZerofileError::InvalidTag(bytes.len()))?;
        Ok(Self(array))
    }

    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }

    /// `RIFF` and `LIST` chunks carry a form type and may hold children
    pub fn is_container(&self) -> bool {
        *self == Self::RIFF || *self == Self::LIST
    }
}

impl From<[u8; 4]> for Tag {
    fn from(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }
}

impl std::str::FromStr for Tag {
    type Err = ZerofileError;
    fn from_str(s: &str) -> Result<Self> {
        Self::new(s.as_bytes())
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"")?;
        for &b in &self.0 {
            if b.is_ascii_graphic() || b == b' ' {
                write!(f, "{}", b as char)?;
            } else {
                write!(f, "\\x{:02x}", b)?;
            }
        }
        write!(f, "\"")
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tag({})", self)
    }
}

/// Decoded chunk header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    pub tag: Tag,
    /// Payload length in bytes, excluding the header
    pub payload_length: u32,
}

impl ChunkHeader {
    pub fn new(tag: Tag, payload_length: u32) -> Self {
        Self {
            tag,
            payload_length,
        }
    }

    /// Serialize header to bytes
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(&self.tag.0);
        buf[4..8].copy_from_slice(&self.payload_length.to_le_bytes());
        buf
    }

    /// Deserialize header from exactly 8 bytes
    pub fn from_bytes(bytes: &[u8; HEADER_SIZE]) -> Self {
        let [t0, t1, t2, t3, l0, l1, l2, l3] = *bytes;
        Self {
            tag: Tag([t0, t1, t2, t3]),
            payload_length: u32::from_le_bytes([l0, l1, l2, l3]),
        }
    }
}

/// Read a chunk header at the cursor position.
///
/// Returns the header together with the number of bytes consumed (always 8).
/// Fails with `TruncatedHeader` and leaves the cursor untouched when fewer
/// than 8 bytes remain in the cursor's scope.
pub fn decode_header(cursor: &mut Cursor<'_>) -> Result<(ChunkHeader, usize)> {
    let available = cursor.remaining();
    if available < HEADER_SIZE {
        return Err(ZerofileError::TruncatedHeader { available });
    }
    let bytes: [u8; HEADER_SIZE] = cursor.read_array()?;
    Ok((ChunkHeader::from_bytes(&bytes), HEADER_SIZE))
}

/// Encode a header from a raw tag and a length.
///
/// Fails with `InvalidTag` unless `tag` is exactly 4 bytes and with
/// `LengthOverflow` when `length` does not fit in 32 bits.
pub fn encode_header(tag: &[u8], length: usize) -> Result<[u8; HEADER_SIZE]> {
    let tag = Tag::new(tag)?;
    let payload_length =
        u32::try_from(length).map_err(|_| ZerofileError::LengthOverflow(length))?;
    Ok(ChunkHeader::new(tag, payload_length).to_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_layout_is_little_endian() {
        let bytes = encode_header(b"SPLI", 16).unwrap();
        assert_eq!(&bytes, b"SPLI\x10\x00\x00\x00");

        let mut cursor = Cursor::new(&bytes);
        let (header, consumed) = decode_header(&mut cursor).unwrap();
        assert_eq!(consumed, HEADER_SIZE);
        assert_eq!(header.tag, Tag::SPLI);
        assert_eq!(header.payload_length, 16);
        assert_eq!(cursor.remaining(), 0);
    }

    #[test]
    fn test_truncated_header() {
        let bytes = b"RIFF\x01\x02";
        let mut cursor = Cursor::new(bytes);
        match decode_header(&mut cursor) {
            Err(ZerofileError::TruncatedHeader { available }) => assert_eq!(available, 6),
            other => panic!("expected TruncatedHeader, got {:?}", other),
        }
        assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn test_encode_rejects_bad_input() {
        assert!(matches!(
            encode_header(b"ABC", 0),
            Err(ZerofileError::InvalidTag(3))
        ));
        assert!(matches!(
            encode_header(b"ABCDE", 0),
            Err(ZerofileError::InvalidTag(5))
        ));
        if usize::BITS > 32 {
            let too_big = u32::MAX as usize + 1;
            assert!(matches!(
                encode_header(b"PVOL", too_big),
                Err(ZerofileError::LengthOverflow(n)) if n == too_big
            ));
        }
        assert!(encode_header(b"PVOL", u32::MAX as usize).is_ok());
    }

    #[test]
    fn test_tag_display_escapes_binary() {
        assert_eq!(Tag::RIFF.to_string(), "\"RIFF\"");
        assert_eq!(Tag([b'a', 0, 0xff, b'z']).to_string(), "\"a\\x00\\xffz\"");
        assert!(Tag::LIST.is_container());
        assert!(!Tag::PVOL.is_container());
        assert_eq!("CBUF".parse::<Tag>().unwrap(), Tag::CBUF);
    }
}
