use crate::chunk::Tag;
use crate::params::FormatVersion;
use thiserror::Error;

/// Everything that can go wrong while reading or writing a Zerofile.
///
/// The traversal variants only carry `Copy` data so that raising them never
/// allocates. Running out of siblings or failing to find a tag is not an
/// error; those come back as `Ok(None)`.
#[derive(Error, Debug)]
pub enum ZerofileError {
    #[error("Truncated chunk header: {available} of 8 bytes available")]
    TruncatedHeader { available: usize },

    #[error("Out of bounds: {length} bytes at offset {offset} in a scope of {scope_len} bytes")]
    OutOfBounds {
        offset: usize,
        length: usize,
        scope_len: usize,
    },

    #[error("Chunk {tag} declares {declared} bytes but only {available} remain in its parent")]
    PayloadExceedsParent {
        tag: Tag,
        declared: u32,
        available: usize,
    },

    #[error("Invalid tag: expected 4 bytes, got {0}")]
    InvalidTag(usize),

    #[error("Length {0} does not fit in a 32-bit chunk header")]
    LengthOverflow(usize),

    #[error("Not a Zerofile: found {tag} envelope{}", .form.map(|f| format!(" of type {f}")).unwrap_or_default())]
    NotAZerofile { tag: Tag, form: Option<Tag> },

    #[error("Missing leading SPLI record{}", .found.map(|t| format!(": first chunk is {t}")).unwrap_or_else(|| ": envelope is empty".into()))]
    MissingLeadingRecord { found: Option<Tag> },

    #[error("Unsupported format version {0}")]
    UnsupportedVersion(FormatVersion),

    #[error("Size mismatch in {tag}: expected {expected} bytes, chunk declares {actual}")]
    SizeMismatch { tag: Tag, expected: u64, actual: u64 },

    #[error("Output buffer full: {needed} bytes needed, {available} available")]
    BufferFull { needed: usize, available: usize },

    #[error("Unbalanced chunk nesting: expected depth {expected_depth}, writer is at {depth}")]
    UnbalancedChunk { expected_depth: usize, depth: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ZerofileError>;
