//! Payload kinds and the sizes the leading record implies for them.

use crate::chunk::{ChunkHeader, Tag};
use crate::cursor::Cursor;
use crate::error::{Result, ZerofileError};
use crate::params::ExtractionParameters;
use serde::{Deserialize, Serialize};

/// Bytes per volume sample
pub const BYTES_PER_SAMPLE: u64 = 1;

/// Bytes per complex value (two `f32`)
pub const BYTES_PER_COMPLEX: u64 = 8;

/// What a chunk tag says about its payload.
///
/// Unknown tags fall through to `Other` so new chunk types can show up in a
/// file without breaking readers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    CommandBuffer,
    Complex,
    VolumeScanline,
    VolumeTiled,
    Other(Tag),
}

impl PayloadKind {
    pub fn from_tag(tag: Tag) -> Self {
        match tag {
            Tag::CBUF => Self::CommandBuffer,
            Tag::CPLX => Self::Complex,
            Tag::PVOS => Self::VolumeScanline,
            Tag::PVOL => Self::VolumeTiled,
            other => Self::Other(other),
        }
    }

    pub fn tag(&self) -> Tag {
        match self {
            Self::CommandBuffer => Tag::CBUF,
            Self::Complex => Tag::CPLX,
            Self::VolumeScanline => Tag::PVOS,
            Self::VolumeTiled => Tag::PVOL,
            Self::Other(tag) => *tag,
        }
    }

    pub fn is_volume(&self) -> bool {
        matches!(self, Self::VolumeScanline | Self::VolumeTiled)
    }
}

/// Expected payload length for `tag`, if the geometry determines one.
///
/// Volumes hold a 4-byte [`VolumeHeader`] then one 8-bit sample per pixel.
/// `CPLX` holds one complex value per pixel. Command buffers and unknown
/// tags have no fixed size.
pub fn payload_size_for(tag: Tag, params: &ExtractionParameters) -> Option<u64> {
    let pixels = params.pixel_count();
    match PayloadKind::from_tag(tag) {
        PayloadKind::VolumeScanline | PayloadKind::VolumeTiled => Some(
            (VolumeHeader::SIZE as u64).saturating_add(pixels.saturating_mul(BYTES_PER_SAMPLE)),
        ),
        PayloadKind::Complex => Some(pixels.saturating_mul(BYTES_PER_COMPLEX)),
        PayloadKind::CommandBuffer | PayloadKind::Other(_) => None,
    }
}

/// Check a chunk's declared length against the geometry.
///
/// Tags with no derivable size always pass.
pub fn check_payload_size(header: &ChunkHeader, params: &ExtractionParameters) -> Result<()> {
    check_length(header.tag, u64::from(header.payload_length), params)
}

pub(crate) fn check_length(tag: Tag, actual: u64, params: &ExtractionParameters) -> Result<()> {
    match payload_size_for(tag, params) {
        Some(expected) if expected != actual => Err(ZerofileError::SizeMismatch {
            tag,
            expected,
            actual,
        }),
        _ => Ok(()),
    }
}

/// Preamble at the start of `PVOS`/`PVOL` payloads.
///
/// The values are passed through untouched; interpreting them belongs to
/// the pixel decoders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeHeader {
    pub lambda: u16,
    pub gain: u16,
}

impl VolumeHeader {
    pub const SIZE: usize = 4;

    pub fn decode(cursor: &mut Cursor<'_>) -> Result<Self> {
        Ok(Self {
            lambda: cursor.read_u16()?,
            gain: cursor.read_u16()?,
        })
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        buf[0..2].copy_from_slice(&self.lambda.to_le_bytes());
        buf[2..4].copy_from_slice(&self.gain.to_le_bytes());
        buf
    }
}

/// Split a volume payload into its preamble and sample bytes
pub fn split_volume<'a>(payload: &'a [u8]) -> Result<(VolumeHeader, &'a [u8])> {
    let mut cursor = Cursor::new(payload);
    let header = VolumeHeader::decode(&mut cursor)?;
    Ok((header, cursor.rest()))
}
