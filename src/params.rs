use crate::cursor::Cursor;
use crate::error::{Result, ZerofileError};
use crate::writer::ChunkWriter;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Format version this crate writes
pub const ZEROFILE_VERSION: FormatVersion = FormatVersion {
    major: 0,
    minor: 1,
    build: 0,
};

/// Highest major version this crate reads
pub const SUPPORTED_MAJOR: u8 = ZEROFILE_VERSION.major;

/// Format version stored at the start of the leading record
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FormatVersion {
    pub major: u8,
    pub minor: u8,
    pub build: u16,
}

impl FormatVersion {
    pub fn is_supported(&self) -> bool {
        self.major <= SUPPORTED_MAJOR
    }
}

impl fmt::Display for FormatVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.build)
    }
}

/// Horizontal pixel pitch.
///
/// Stored as the bit pattern of an `f32` holding the pitch in metres, so
/// `0x37236cd9` reads as 9.7409 um.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HPitch(pub u32);

impl HPitch {
    pub fn from_micrometers(um: f32) -> Self {
        Self((um * 1e-6).to_bits())
    }

    pub fn meters(&self) -> f32 {
        f32::from_bits(self.0)
    }

    pub fn micrometers(&self) -> f32 {
        self.meters() * 1e6
    }
}

impl fmt::Display for HPitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x} = {:.4} um", self.0, self.micrometers())
    }
}

/// Extraction parameters carried by the leading `SPLI` record.
///
/// Layout (little-endian, 16 bytes):
/// `[major: 1][minor: 1][build: 2][width: 4][height: 4][h_pitch: 4]`.
/// Anything after the first 16 bytes is reserved for later versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionParameters {
    pub format_version: FormatVersion,
    pub width: u32,
    pub height: u32,
    pub h_pitch: HPitch,
}

impl ExtractionParameters {
    /// Encoded record size
    pub const SIZE: usize = 16;

    /// Parameters at the current format version
    pub fn new(width: u32, height: u32, h_pitch: HPitch) -> Self {
        Self {
            format_version: ZEROFILE_VERSION,
            width,
            height,
            h_pitch,
        }
    }

    /// Number of samples in one frame
    pub fn pixel_count(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Decode the record at the cursor position.
    ///
    /// A record shorter than 16 bytes fails with `OutOfBounds` on the first
    /// field that does not fit. A newer major version is rejected after the
    /// version field is read.
    pub fn decode(cursor: &mut Cursor<'_>) -> Result<Self> {
        let format_version = FormatVersion {
            major: cursor.read_u8()?,
            minor: cursor.read_u8()?,
            build: cursor.read_u16()?,
        };
        if !format_version.is_supported() {
            return Err(ZerofileError::UnsupportedVersion(format_version));
        }
        let width = cursor.read_u32()?;
        let height = cursor.read_u32()?;
        let h_pitch = HPitch(cursor.read_u32()?);

        Ok(Self {
            format_version,
            width,
            height,
            h_pitch,
        })
    }

    /// Write the record fields (without a chunk header)
    pub fn encode(&self, writer: &mut ChunkWriter<'_>) -> Result<()> {
        writer.write_u8(self.format_version.major)?;
        writer.write_u8(self.format_version.minor)?;
        writer.write_u16(self.format_version.build)?;
        writer.write_u32(self.width)?;
        writer.write_u32(self.height)?;
        writer.write_u32(self.h_pitch.0)
    }
}
