//! Zerofile - RIFF container for parasitic extraction captures
//!
//! A Zerofile stores spline parameters, command-buffer bytes, per-pin complex
//! values and volumetric scans as tagged chunks inside a `RIFF` envelope of
//! type `ZERO`.
//!
//! ## Reading model
//!
//! ```text
//! Zerofile → ChunkWalker → ChunkScope → Cursor → chunk header codec
//! ```
//!
//! - **Cursor**: bounds-checked reads over a borrowed byte range
//! - **ChunkScope**: a cursor confined to one chunk's payload
//! - **ChunkWalker**: "next chunk" and "find chunk by tag" over siblings
//! - **Zerofile**: envelope and leading-record validation, payload size checks
//!
//! After entering a chunk, reads are confined to that chunk. Seeking and
//! re-reading inside it is free, but nothing outside it can be reached; to
//! move on, ask the walker for the next chunk. None of this allocates: every
//! view borrows the caller's buffer.
//!
//! ## Example
//!
//! ```
//! use zerofile::chunk::Tag;
//! use zerofile::params::{ExtractionParameters, HPitch};
//! use zerofile::payload::VolumeHeader;
//! use zerofile::writer::{required_size, ZerofileWriter};
//! use zerofile::Zerofile;
//!
//! let params = ExtractionParameters::new(4, 2, HPitch(0x37236cd9));
//! let mut storage = vec![0u8; required_size(&params, &[Tag::PVOL]).unwrap()];
//!
//! let mut writer = ZerofileWriter::new(&mut storage, params).unwrap();
//! writer
//!     .write_volume(Tag::PVOL, VolumeHeader { lambda: 0, gain: 1 }, &[0; 8])
//!     .unwrap();
//! let bytes = writer.finish().unwrap();
//!
//! let mut file = Zerofile::open(bytes).unwrap();
//! assert_eq!(file.params().width, 4);
//! let volume = file.find_payload(Tag::PVOL).unwrap().unwrap();
//! assert_eq!(volume.bytes().len(), 12);
//! ```

pub mod chunk;
pub mod cli;
pub mod cursor;
pub mod error;
pub mod params;
pub mod payload;
pub mod scope;
pub mod walker;
pub mod writer;
pub mod zerofile;

pub use chunk::{decode_header, encode_header, ChunkHeader, Tag};
pub use cursor::{ByteRange, Cursor};
pub use error::{Result, ZerofileError};
pub use params::{ExtractionParameters, FormatVersion, HPitch};
pub use payload::payload_size_for;
pub use scope::{enter_chunk, enter_container_chunk, ChunkScope};
pub use walker::ChunkWalker;
pub use zerofile::{open, Payload, Zerofile};
