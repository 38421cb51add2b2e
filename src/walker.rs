//! Sibling iteration over the chunks of one scope.

use crate::chunk::{ChunkHeader, Tag};
use crate::cursor::Cursor;
use crate::error::Result;
use crate::scope::{enter_chunk, enter_container_chunk, ChunkScope};

/// Walks the chunks laid end to end in a cursor's remaining bytes.
///
/// The walker never descends on its own: to see a child's children, enter
/// the returned scope or call [`ChunkScope::walker`] on it.
#[derive(Debug, Clone, Copy)]
pub struct ChunkWalker<'a> {
    cursor: Cursor<'a>,
    failed: bool,
}

impl<'a> ChunkWalker<'a> {
    pub fn new(cursor: Cursor<'a>) -> Self {
        Self {
            cursor,
            failed: false,
        }
    }

    /// Offset of the next chunk header, relative to the walked scope
    pub fn position(&self) -> usize {
        self.cursor.position()
    }

    /// Bytes left to walk
    pub fn remaining(&self) -> usize {
        self.cursor.remaining()
    }

    /// Enter the next sibling.
    ///
    /// `Ok(None)` means the scope is exhausted. One to seven trailing bytes
    /// are `TruncatedHeader`. On error the walker stays where it was.
    pub fn next_sibling(&mut self) -> Result<Option<(ChunkScope<'a>, ChunkHeader)>> {
        if self.cursor.remaining() == 0 {
            return Ok(None);
        }
        enter_chunk(&mut self.cursor).map(Some)
    }

    /// Like [`next_sibling`](Self::next_sibling) but reads a form type
    /// when the sibling is a `RIFF`/`LIST` container
    pub fn next_entry(&mut self) -> Result<Option<(ChunkScope<'a>, ChunkHeader)>> {
        if self.cursor.remaining() == 0 {
            return Ok(None);
        }
        let tag = Tag::new(self.cursor.peek_bytes(4).unwrap_or_default());
        match tag {
            Ok(tag) if tag.is_container() => enter_container_chunk(&mut self.cursor).map(Some),
            _ => enter_chunk(&mut self.cursor).map(Some),
        }
    }

    /// Scan forward for the first sibling tagged `tag`.
    ///
    /// Chunks passed over are consumed, so a second call carries on from
    /// after the first match instead of starting again. `Ok(None)` once the
    /// scope is exhausted.
    pub fn find_chunk(&mut self, tag: Tag) -> Result<Option<(ChunkScope<'a>, ChunkHeader)>> {
        while let Some((scope, header)) = self.next_sibling()? {
            if header.tag == tag {
                return Ok(Some((scope, header)));
            }
        }
        Ok(None)
    }
}

impl<'a> Iterator for ChunkWalker<'a> {
    type Item = Result<ChunkScope<'a>>;

    /// Yields each sibling once; stops for good after the first error
    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.next_sibling() {
            Ok(next) => next.map(|(scope, _)| Ok(scope)),
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

impl std::iter::FusedIterator for ChunkWalker<'_> {}
