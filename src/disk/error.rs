use std::io;

use thiserror::Error;

use crate::disk::geometry::MAX_FILENAME_SIZE;

/// Result type alias for disk image operations.
pub type Result<T> = std::result::Result<T, DiskError>;

/// Errors that can be returned from disk image operations.
#[derive(Debug, Error)]
pub enum DiskError {
    /// I/O error from the backing file or the serialization sink.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The provided buffer does not hold a 35-track disk image.
    #[error("invalid layout: got {0} bytes, want a 35-track image")]
    InvalidLayout(usize),

    /// No free sector is available for allocation.
    #[error("disk is full")]
    DiskFull,

    /// Zero-length PRG payloads cannot be stored.
    #[error("prg file is empty")]
    EmptyPrg,

    /// The filename does not fit in a directory entry.
    #[error("filename {0:?} exceeds {} characters", MAX_FILENAME_SIZE)]
    FilenameTooLong(String),
}
