//! Error types for the document format

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DocError>;

#[derive(Error, Debug)]
pub enum DocError {
    #[error("unexpected marker: expected {expected}, found 0x{found:02x}")]
    MarkerMapping { expected: &'static str, found: u8 },

    #[error("read of {requested} bytes at position {position} past end (size {size})")]
    OutOfBounds {
        position: usize,
        requested: usize,
        size: usize,
    },

    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("no such key: {0}")]
    NoSuchKey(String),

    #[error("no such index: {0}")]
    NoSuchIndex(u32),

    #[error("value is not a container")]
    NotAContainer,

    #[error("operation requires a read-write session")]
    ReadOnlyMode,

    #[error("illegal argument: {0}")]
    IllegalArg(String),

    #[error("inserter protocol violation: {0}")]
    Protocol(String),

    #[error("buffer too small: need {needed} bytes, have {available}")]
    BufferTooSmall { needed: usize, available: usize },

    #[error("tailing junk after {0}")]
    TailingJunk(String),

    #[error("varint unterminated after 10 bytes")]
    InvalidVarInt,

    #[error("internal error: {0}")]
    Internal(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DocError {
    /// Shorthand for the common "wrong marker byte" failure.
    pub(crate) fn marker(expected: &'static str, found: u8) -> Self {
        Self::MarkerMapping { expected, found }
    }
}
