//! Writing chunks into caller-supplied storage.
//!
//! [`ChunkWriter`] never grows its buffer. Chunk lengths are written as zero
//! when a chunk is opened and patched when it is closed, which is what lets
//! `RIFF`/`LIST` containers nest. The buffer is only readable again after
//! [`ChunkWriter::finish`], once every length is final.

use crate::chunk::{ChunkHeader, Tag, FORM_TYPE_SIZE, HEADER_SIZE};
use crate::error::{Result, ZerofileError};
use crate::params::ExtractionParameters;
use crate::payload::{check_length, payload_size_for, VolumeHeader};

/// An open chunk waiting for its length.
///
/// Closing a chunk consumes its mark, so a closed chunk cannot be closed
/// twice:
///
/// ```compile_fail
/// use zerofile::chunk::Tag;
/// use zerofile::writer::ChunkWriter;
///
/// let mut storage = [0u8; 32];
/// let mut writer = ChunkWriter::new(&mut storage);
/// let mark = writer.begin_chunk(Tag::CBUF).unwrap();
/// writer.end_chunk(mark).unwrap();
/// writer.end_chunk(mark).unwrap();
/// ```
#[derive(Debug, PartialEq, Eq)]
#[must_use = "an open chunk must be closed with end_chunk"]
pub struct ChunkMark {
    tag: Tag,
    header_offset: usize,
    depth: usize,
    /// Header offset of the chunk this one is nested in
    parent: Option<usize>,
}

impl ChunkMark {
    pub fn tag(&self) -> Tag {
        self.tag
    }

    /// Offset of the chunk header in the output
    pub fn offset(&self) -> usize {
        self.header_offset
    }
}

#[derive(Debug)]
pub struct ChunkWriter<'a> {
    buf: &'a mut [u8],
    position: usize,
    depth: usize,
    /// Header offset of the innermost open chunk
    open: Option<usize>,
}

impl<'a> ChunkWriter<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self {
            buf,
            position: 0,
            depth: 0,
            open: None,
        }
    }

    /// Bytes written so far
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.position
    }

    /// Number of chunks currently open
    pub fn depth(&self) -> usize {
        self.depth
    }

    fn ensure(&self, needed: usize) -> Result<()> {
        let available = self.remaining();
        if needed > available {
            return Err(ZerofileError::BufferFull { needed, available });
        }
        Ok(())
    }

    /// Append raw bytes. Nothing is written unless all of them fit.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.ensure(bytes.len())?;
        let end = self.position + bytes.len();
        self.buf[self.position..end].copy_from_slice(bytes);
        self.position = end;
        Ok(())
    }

    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.write_bytes(&[value])
    }

    pub fn write_u16(&mut self, value: u16) -> Result<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    /// Open a chunk; its length is filled in by [`end_chunk`](Self::end_chunk)
    pub fn begin_chunk(&mut self, tag: Tag) -> Result<ChunkMark> {
        let header_offset = self.position;
        self.write_bytes(&ChunkHeader::new(tag, 0).to_bytes())?;
        self.depth += 1;
        let parent = self.open.replace(header_offset);
        Ok(ChunkMark {
            tag,
            header_offset,
            depth: self.depth,
            parent,
        })
    }

    /// Open a `RIFF`/`LIST` style chunk and write its form type
    pub fn begin_container(&mut self, tag: Tag, form: Tag) -> Result<ChunkMark> {
        self.ensure(HEADER_SIZE + FORM_TYPE_SIZE)?;
        let mark = self.begin_chunk(tag)?;
        self.write_bytes(form.as_bytes())?;
        Ok(mark)
    }

    /// Close the innermost open chunk and patch its length.
    ///
    /// Marks must be closed in reverse order of opening, on the writer that
    /// issued them. The returned header holds the stored length, form type
    /// included.
    pub fn end_chunk(&mut self, mark: ChunkMark) -> Result<ChunkHeader> {
        if mark.depth != self.depth || self.open != Some(mark.header_offset) {
            return Err(ZerofileError::UnbalancedChunk {
                expected_depth: mark.depth,
                depth: self.depth,
            });
        }
        let payload_start = mark.header_offset + HEADER_SIZE;
        let length = self.position - payload_start;
        let payload_length =
            u32::try_from(length).map_err(|_| ZerofileError::LengthOverflow(length))?;

        self.buf[mark.header_offset + 4..payload_start]
            .copy_from_slice(&payload_length.to_le_bytes());
        self.depth -= 1;
        self.open = mark.parent;
        Ok(ChunkHeader::new(mark.tag, payload_length))
    }

    /// Write a complete leaf chunk
    pub fn write_chunk(&mut self, tag: Tag, payload: &[u8]) -> Result<ChunkHeader> {
        let payload_length = u32::try_from(payload.len())
            .map_err(|_| ZerofileError::LengthOverflow(payload.len()))?;
        self.ensure(HEADER_SIZE + payload.len())?;
        let header = ChunkHeader::new(tag, payload_length);
        self.write_bytes(&header.to_bytes())?;
        self.write_bytes(payload)?;
        Ok(header)
    }

    /// Freeze the output and hand back the written bytes
    pub fn finish(self) -> Result<&'a [u8]> {
        if self.depth != 0 {
            return Err(ZerofileError::UnbalancedChunk {
                expected_depth: 0,
                depth: self.depth,
            });
        }
        let position = self.position;
        let frozen: &'a [u8] = self.buf;
        Ok(&frozen[..position])
    }
}

/// Writes a Zerofile: envelope, leading record, then payload chunks
#[derive(Debug)]
pub struct ZerofileWriter<'a> {
    chunks: ChunkWriter<'a>,
    envelope: ChunkMark,
    params: ExtractionParameters,
}

impl<'a> ZerofileWriter<'a> {
    /// Open the `RIFF`/`ZERO` envelope and write the `SPLI` record
    pub fn new(buf: &'a mut [u8], params: ExtractionParameters) -> Result<Self> {
        let mut chunks = ChunkWriter::new(buf);
        chunks.ensure(leading_size())?;
        let envelope = chunks.begin_container(Tag::RIFF, Tag::ZERO)?;
        let record = chunks.begin_chunk(Tag::SPLI)?;
        params.encode(&mut chunks)?;
        chunks.end_chunk(record)?;
        Ok(Self {
            chunks,
            envelope,
            params,
        })
    }

    pub fn params(&self) -> &ExtractionParameters {
        &self.params
    }

    /// Low-level access for chunks the high-level calls do not cover
    pub fn chunks_mut(&mut self) -> &mut ChunkWriter<'a> {
        &mut self.chunks
    }

    /// Write a payload chunk after checking its size against the geometry
    pub fn write_payload(&mut self, tag: Tag, payload: &[u8]) -> Result<ChunkHeader> {
        check_length(tag, payload.len() as u64, &self.params)?;
        self.chunks.write_chunk(tag, payload)
    }

    /// Write a `PVOS`/`PVOL` chunk from its preamble and samples
    pub fn write_volume(
        &mut self,
        tag: Tag,
        header: VolumeHeader,
        samples: &[u8],
    ) -> Result<ChunkHeader> {
        let length = VolumeHeader::SIZE + samples.len();
        check_length(tag, length as u64, &self.params)?;
        self.chunks.ensure(HEADER_SIZE + length)?;
        let mark = self.chunks.begin_chunk(tag)?;
        self.chunks.write_bytes(&header.to_bytes())?;
        self.chunks.write_bytes(samples)?;
        self.chunks.end_chunk(mark)
    }

    /// Open a `LIST` inside the envelope
    pub fn begin_list(&mut self, form: Tag) -> Result<ChunkMark> {
        self.chunks.begin_container(Tag::LIST, form)
    }

    pub fn end_list(&mut self, mark: ChunkMark) -> Result<ChunkHeader> {
        self.chunks.end_chunk(mark)
    }

    /// Close the envelope and return the finished file
    pub fn finish(mut self) -> Result<&'a [u8]> {
        self.chunks.end_chunk(self.envelope)?;
        self.chunks.finish()
    }
}

/// Envelope header, form type and leading record
fn leading_size() -> usize {
    HEADER_SIZE + FORM_TYPE_SIZE + HEADER_SIZE + ExtractionParameters::SIZE
}

/// Bytes needed for a Zerofile holding one payload per entry of `tags`.
///
/// `None` when a tag has no size derivable from `params` or the total does
/// not fit in memory.
pub fn required_size(params: &ExtractionParameters, tags: &[Tag]) -> Option<usize> {
    tags.iter().try_fold(leading_size(), |total, &tag| {
        let payload = usize::try_from(payload_size_for(tag, params)?).ok()?;
        total.checked_add(HEADER_SIZE)?.checked_add(payload)
    })
}
