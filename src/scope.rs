//! Entering chunks.
//!
//! Entering a chunk produces a [`ChunkScope`]: a cursor confined to that
//! chunk's payload. A scope is always a sub-range of the cursor it was
//! entered from, so a bad length field can never reach sibling chunks or
//! memory past the end of the buffer.

use crate::chunk::{decode_header, ChunkHeader, Tag, FORM_TYPE_SIZE};
use crate::cursor::Cursor;
use crate::error::{Result, ZerofileError};
use crate::walker::ChunkWalker;
use std::ops::{Deref, DerefMut};

/// Cursor over one chunk's payload plus the header it came from
#[derive(Debug, Clone, Copy)]
pub struct ChunkScope<'a> {
    header: ChunkHeader,
    offset: usize,
    form: Option<Tag>,
    cursor: Cursor<'a>,
}

impl<'a> ChunkScope<'a> {
    pub fn tag(&self) -> Tag {
        self.header.tag
    }

    /// Header as reported on entry.
    ///
    /// For containers the length excludes the 4-byte form type.
    pub fn header(&self) -> ChunkHeader {
        self.header
    }

    /// Whether the scope was cut short of the stored length
    pub fn is_truncated(&self) -> bool {
        self.cursor.len() < self.header.payload_length as usize
    }

    /// Length field as stored in the file
    pub fn declared_length(&self) -> u32 {
        match self.form {
            Some(_) => self.header.payload_length + FORM_TYPE_SIZE as u32,
            None => self.header.payload_length,
        }
    }

    /// Absolute offset of the chunk header in the buffer
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Form type of a container chunk
    pub fn form(&self) -> Option<Tag> {
        self.form
    }

    /// Whole payload, independent of the cursor position
    pub fn payload(&self) -> &'a [u8] {
        self.cursor.as_slice()
    }

    pub fn cursor(&self) -> &Cursor<'a> {
        &self.cursor
    }

    pub fn cursor_mut(&mut self) -> &mut Cursor<'a> {
        &mut self.cursor
    }

    /// Walk the children that follow the cursor position
    pub fn walker(&self) -> ChunkWalker<'a> {
        ChunkWalker::new(self.cursor)
    }
}

impl<'a> Deref for ChunkScope<'a> {
    type Target = Cursor<'a>;
    fn deref(&self) -> &Self::Target {
        &self.cursor
    }
}

impl<'a> DerefMut for ChunkScope<'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.cursor
    }
}

/// What to do with a chunk whose length runs past its parent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Overrun {
    Reject,
    Clamp,
}

/// Enter the chunk at the parent's position.
///
/// On success the parent is moved past the whole chunk (header and payload)
/// so the next sibling can be entered however much of the scope gets read.
/// On failure the parent does not move.
pub fn enter_chunk<'a>(parent: &mut Cursor<'a>) -> Result<(ChunkScope<'a>, ChunkHeader)> {
    enter(parent, Overrun::Reject)
}

/// Enter a chunk, cutting its scope short at the end of the parent.
///
/// Meant for truncated captures: the returned header keeps the stored
/// length while the scope only covers the bytes that exist, so reads fail
/// with `OutOfBounds` at the first missing field.
pub fn enter_chunk_clamped<'a>(parent: &mut Cursor<'a>) -> Result<(ChunkScope<'a>, ChunkHeader)> {
    enter(parent, Overrun::Clamp)
}

/// Enter a `RIFF`/`LIST` style chunk and read its form type.
///
/// The returned scope starts after the form type and its reported payload
/// length is 4 bytes shorter than the stored one. A payload too short to
/// hold the form type is `OutOfBounds`; the parent does not move.
pub fn enter_container_chunk<'a>(parent: &mut Cursor<'a>) -> Result<(ChunkScope<'a>, ChunkHeader)> {
    enter_container(parent, Overrun::Reject)
}

/// [`enter_container_chunk`] with the clamping of [`enter_chunk_clamped`]
pub fn enter_container_chunk_clamped<'a>(
    parent: &mut Cursor<'a>,
) -> Result<(ChunkScope<'a>, ChunkHeader)> {
    enter_container(parent, Overrun::Clamp)
}

fn enter<'a>(parent: &mut Cursor<'a>, overrun: Overrun) -> Result<(ChunkScope<'a>, ChunkHeader)> {
    let mut trial = *parent;
    let offset = trial.absolute_position();
    let (header, _) = decode_header(&mut trial)?;

    let available = trial.remaining();
    let declared = header.payload_length;
    let length = match overrun {
        _ if declared as usize <= available => declared as usize,
        Overrun::Reject => {
            return Err(ZerofileError::PayloadExceedsParent {
                tag: header.tag,
                declared,
                available,
            })
        }
        Overrun::Clamp => {
            tracing::warn!(
                tag = %header.tag,
                offset,
                declared,
                available,
                "chunk runs past its parent, clamping"
            );
            available
        }
    };

    let cursor = trial.sub_cursor(length)?;
    trial.skip(length)?;
    *parent = trial;

    tracing::trace!(tag = %header.tag, offset, length, "entered chunk");

    let scope = ChunkScope {
        header,
        offset,
        form: None,
        cursor,
    };
    Ok((scope, header))
}

fn enter_container<'a>(
    parent: &mut Cursor<'a>,
    overrun: Overrun,
) -> Result<(ChunkScope<'a>, ChunkHeader)> {
    let mut trial = *parent;
    let (mut scope, header) = enter(&mut trial, overrun)?;
    let form = Tag(scope.cursor.read_array::<FORM_TYPE_SIZE>()?);
    let cursor = scope.cursor.sub_cursor(scope.cursor.remaining())?;

    let header = ChunkHeader::new(
        header.tag,
        header.payload_length.saturating_sub(FORM_TYPE_SIZE as u32),
    );
    scope.header = header;
    scope.form = Some(form);
    scope.cursor = cursor;
    *parent = trial;
    Ok((scope, header))
}
