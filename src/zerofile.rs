//! High-level Zerofile reader.
//!
//! A Zerofile is a `RIFF` envelope of type `ZERO` whose first child is the
//! `SPLI` leading record:
//!
//! ```text
//! "RIFF" <length> "ZERO"
//!     "SPLI" <16>          extraction parameters
//!     "CBUF" <length>      command buffer bytes
//!     "CPLX" <length>      complex value per pin
//!     "PVOS" <length>      8-bit volume, scanline order
//!     "PVOL" <length>      8-bit volume, tiled order
//! ```
//!
//! Opening a buffer parses the leading record straight away; the payload
//! chunks after it are then fetched one at a time, each checked against the
//! size the parameters predict.

use crate::chunk::{ChunkHeader, Tag};
use crate::cursor::Cursor;
use crate::error::{Result, ZerofileError};
use crate::params::ExtractionParameters;
use crate::payload::{check_payload_size, split_volume, PayloadKind, VolumeHeader};
use crate::scope::{enter_chunk, enter_chunk_clamped, enter_container_chunk_clamped, ChunkScope};
use crate::walker::ChunkWalker;

/// A payload chunk that passed the geometry check
#[derive(Debug, Clone, Copy)]
pub struct Payload<'a> {
    scope: ChunkScope<'a>,
}

impl<'a> Payload<'a> {
    pub fn tag(&self) -> Tag {
        self.scope.tag()
    }

    pub fn kind(&self) -> PayloadKind {
        PayloadKind::from_tag(self.scope.tag())
    }

    pub fn header(&self) -> ChunkHeader {
        self.scope.header()
    }

    /// Absolute offset of the chunk header
    pub fn offset(&self) -> usize {
        self.scope.offset()
    }

    pub fn bytes(&self) -> &'a [u8] {
        self.scope.payload()
    }

    /// Bounded cursor over the payload
    pub fn scope(&self) -> ChunkScope<'a> {
        self.scope
    }

    /// Preamble and samples of a `PVOS`/`PVOL` payload
    pub fn volume(&self) -> Result<Option<(VolumeHeader, &'a [u8])>> {
        if !self.kind().is_volume() {
            return Ok(None);
        }
        split_volume(self.bytes()).map(Some)
    }
}

/// An opened Zerofile positioned after its leading record
#[derive(Debug, Clone, Copy)]
pub struct Zerofile<'a> {
    envelope: ChunkScope<'a>,
    params: ExtractionParameters,
    walker: ChunkWalker<'a>,
}

impl<'a> Zerofile<'a> {
    /// Validate the envelope and parse the leading record.
    ///
    /// The envelope may end before the buffer does; the extra bytes are
    /// ignored. An envelope that runs past the end of the buffer is cut
    /// short at the buffer end, and so is its leading record, so a truncated
    /// capture fails with `OutOfBounds` on the first missing field rather
    /// than being rejected outright. Inside an intact envelope the leading
    /// record and every payload chunk are held to their parent strictly.
    pub fn open(buf: &'a [u8]) -> Result<Self> {
        let mut root = Cursor::new(buf);

        let tag = Tag::new(root.peek_bytes(4).unwrap_or_default());
        match tag {
            Ok(Tag::RIFF) => {}
            Ok(tag) => return Err(ZerofileError::NotAZerofile { tag, form: None }),
            Err(_) => {
                return Err(ZerofileError::TruncatedHeader {
                    available: root.remaining(),
                })
            }
        }

        let (envelope, header) = enter_container_chunk_clamped(&mut root)?;
        if envelope.form() != Some(Tag::ZERO) {
            return Err(ZerofileError::NotAZerofile {
                tag: header.tag,
                form: envelope.form(),
            });
        }
        if root.remaining() > 0 {
            tracing::warn!(
                trailing = root.remaining(),
                "ignoring bytes after the RIFF envelope"
            );
        }

        let mut children = *envelope.cursor();
        if children.remaining() == 0 {
            return Err(ZerofileError::MissingLeadingRecord { found: None });
        }
        let (mut record, header) = if envelope.is_truncated() {
            enter_chunk_clamped(&mut children)?
        } else {
            enter_chunk(&mut children)?
        };
        if header.tag != Tag::SPLI {
            return Err(ZerofileError::MissingLeadingRecord {
                found: Some(header.tag),
            });
        }
        let walker = ChunkWalker::new(children);

        let params = ExtractionParameters::decode(record.cursor_mut())?;
        if record.remaining() > 0 {
            tracing::warn!(
                reserved = record.remaining(),
                "leading record carries reserved bytes"
            );
        }
        tracing::debug!(
            version = %params.format_version,
            width = params.width,
            height = params.height,
            "opened zerofile"
        );

        Ok(Self {
            envelope,
            params,
            walker,
        })
    }

    pub fn params(&self) -> &ExtractionParameters {
        &self.params
    }

    /// The `RIFF` envelope scope
    pub fn envelope(&self) -> ChunkScope<'a> {
        self.envelope
    }

    /// Sibling walker positioned after the last chunk handed out
    pub fn walker_mut(&mut self) -> &mut ChunkWalker<'a> {
        &mut self.walker
    }

    /// Fetch the next payload chunk and check its size.
    ///
    /// A `SizeMismatch` has already moved past the bad chunk, so the caller
    /// may log it and keep reading.
    pub fn next_payload(&mut self) -> Result<Option<Payload<'a>>> {
        match self.walker.next_sibling()? {
            Some((scope, header)) => self.accept(scope, header).map(Some),
            None => Ok(None),
        }
    }

    /// Scan forward for the next payload tagged `tag`
    pub fn find_payload(&mut self, tag: Tag) -> Result<Option<Payload<'a>>> {
        match self.walker.find_chunk(tag)? {
            Some((scope, header)) => self.accept(scope, header).map(Some),
            None => Ok(None),
        }
    }

    /// Iterate over the remaining payloads
    pub fn payloads(&mut self) -> Payloads<'_, 'a> {
        Payloads {
            file: self,
            failed: false,
        }
    }

    fn accept(&self, scope: ChunkScope<'a>, header: ChunkHeader) -> Result<Payload<'a>> {
        check_payload_size(&header, &self.params)?;
        Ok(Payload { scope })
    }
}

/// Shorthand for [`Zerofile::open`]
pub fn open(buf: &[u8]) -> Result<Zerofile<'_>> {
    Zerofile::open(buf)
}

/// Iterator over the payloads left in a [`Zerofile`].
///
/// A `SizeMismatch` is yielded and iteration carries on with the next
/// chunk; any structural error ends it.
pub struct Payloads<'f, 'a> {
    file: &'f mut Zerofile<'a>,
    failed: bool,
}

impl<'a> Iterator for Payloads<'_, 'a> {
    type Item = Result<Payload<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.file.next_payload() {
            Ok(next) => next.map(Ok),
            Err(e @ ZerofileError::SizeMismatch { .. }) => Some(Err(e)),
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::HPitch;
    use crate::writer::ZerofileWriter;

    fn params() -> ExtractionParameters {
        ExtractionParameters::new(4, 2, HPitch(0x37236cd9))
    }

    fn sample() -> Vec<u8> {
        let mut storage = vec![0u8; 256];
        let mut writer = ZerofileWriter::new(&mut storage, params()).unwrap();
        writer.write_payload(Tag::CBUF, b"cmd").unwrap();
        writer
            .write_volume(Tag::PVOL, VolumeHeader { lambda: 7, gain: 9 }, &[1; 8])
            .unwrap();
        writer.write_payload(Tag::CPLX, &[0; 64]).unwrap();
        writer.finish().unwrap().to_vec()
    }

    #[test]
    fn test_open_and_walk() {
        let buf = sample();
        let mut file = Zerofile::open(&buf).unwrap();
        assert_eq!(*file.params(), params());

        let cbuf = file.next_payload().unwrap().unwrap();
        assert_eq!(cbuf.tag(), Tag::CBUF);
        assert_eq!(cbuf.bytes(), b"cmd");
        assert_eq!(cbuf.offset(), 36);
        assert!(cbuf.volume().unwrap().is_none());

        let pvol = file.next_payload().unwrap().unwrap();
        let (header, samples) = pvol.volume().unwrap().unwrap();
        assert_eq!(header, VolumeHeader { lambda: 7, gain: 9 });
        assert_eq!(samples, &[1; 8]);

        assert_eq!(file.next_payload().unwrap().unwrap().kind(), PayloadKind::Complex);
        assert!(file.next_payload().unwrap().is_none());
    }

    #[test]
    fn test_find_payload_is_forward_only() {
        let buf = sample();
        let mut file = Zerofile::open(&buf).unwrap();
        assert!(file.find_payload(Tag::PVOL).unwrap().is_some());
        assert!(file.find_payload(Tag::CBUF).unwrap().is_none());
    }

    #[test]
    fn test_rejects_foreign_envelopes() {
        let mut buf = sample();
        buf[8..12].copy_from_slice(b"WAVE");
        match Zerofile::open(&buf) {
            Err(ZerofileError::NotAZerofile { tag, form }) => {
                assert_eq!(tag, Tag::RIFF);
                assert_eq!(form, Some(Tag(*b"WAVE")));
            }
            other => panic!("expected NotAZerofile, got {:?}", other),
        }

        let mut buf = sample();
        buf[..4].copy_from_slice(b"RIFX");
        assert!(matches!(
            Zerofile::open(&buf),
            Err(ZerofileError::NotAZerofile { form: None, .. })
        ));

        assert!(matches!(
            Zerofile::open(b"RIF"),
            Err(ZerofileError::TruncatedHeader { available: 3 })
        ));
    }

    #[test]
    fn test_leading_record_must_come_first() {
        let mut buf = sample();
        buf[12..16].copy_from_slice(b"CBUF");
        assert!(matches!(
            Zerofile::open(&buf),
            Err(ZerofileError::MissingLeadingRecord {
                found: Some(Tag::CBUF)
            })
        ));

        let empty = b"RIFF\x04\x00\x00\x00ZERO";
        assert!(matches!(
            Zerofile::open(empty),
            Err(ZerofileError::MissingLeadingRecord { found: None })
        ));
    }

    #[test]
    fn test_payloads_skip_damaged_chunks() {
        let mut buf = sample();
        // A 3-byte CBUF relabelled as PVOS no longer fits the geometry
        buf[36..40].copy_from_slice(b"PVOS");
        let mut file = Zerofile::open(&buf).unwrap();
        let results: Vec<_> = file.payloads().collect();
        assert_eq!(results.len(), 3);
        assert!(matches!(
            results[0],
            Err(ZerofileError::SizeMismatch {
                expected: 12,
                actual: 3,
                ..
            })
        ));
        assert!(results[1].is_ok());
        assert!(results[2].is_ok());
    }

    #[test]
    fn test_trailing_bytes_after_envelope_are_ignored() {
        let mut buf = sample();
        buf.extend_from_slice(&[0xff; 5]);
        let mut file = Zerofile::open(&buf).unwrap();
        assert_eq!(file.payloads().filter(|p| p.is_ok()).count(), 3);
    }

    #[test]
    fn test_truncated_capture_fails_on_field() {
        let buf = sample();
        // Envelope and SPLI both claim more than the 30 bytes present
        match Zerofile::open(&buf[..30]) {
            Err(ZerofileError::OutOfBounds {
                offset,
                length,
                scope_len,
            }) => {
                assert_eq!(offset, 8);
                assert_eq!(length, 4);
                assert_eq!(scope_len, 10);
            }
            other => panic!("expected OutOfBounds, got {:?}", other),
        }
    }

    #[test]
    fn test_oversized_record_in_intact_envelope() {
        let mut buf = sample();
        buf[16..20].copy_from_slice(&0x1000u32.to_le_bytes());
        let available = buf.len() - 20;
        match Zerofile::open(&buf) {
            Err(ZerofileError::PayloadExceedsParent {
                tag,
                declared,
                available: left,
            }) => {
                assert_eq!(tag, Tag::SPLI);
                assert_eq!(declared, 0x1000);
                assert_eq!(left, available);
            }
            other => panic!("expected PayloadExceedsParent, got {:?}", other),
        }
    }

    #[test]
    fn test_payload_overrun_is_strict() {
        let buf = sample();
        // Cut into the final CPLX chunk
        let mut file = Zerofile::open(&buf[..buf.len() - 10]).unwrap();
        file.next_payload().unwrap().unwrap();
        file.next_payload().unwrap().unwrap();
        assert!(matches!(
            file.next_payload(),
            Err(ZerofileError::PayloadExceedsParent {
                tag: Tag::CPLX,
                declared: 64,
                available: 54
            })
        ));
    }
}
