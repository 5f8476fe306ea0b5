//! Error types for spill buffer operations.

use std::io;

use thiserror::Error;

/// Spill buffer operation error.
#[derive(Error, Debug)]
pub enum BufferError {
    /// The per-segment size was zero.
    #[error("spillbuf: segment size must be greater than 0")]
    InvalidSegmentSize,

    /// The stream side used for this call has been closed.
    #[error("spillbuf: closed")]
    Closed,

    /// Mark/reset is not supported; this never changes for a buffer.
    #[error("spillbuf: reset not supported")]
    ResetNotSupported,

    /// Storage of a segment was accessed after it had been released.
    #[error("spillbuf: segment already released")]
    Released,

    /// The disk-backed segment failed.
    #[error("spillbuf: io: {0}")]
    Io(#[from] io::Error),
}

/// Result type for spill buffer operations.
pub type Result<T> = std::result::Result<T, BufferError>;

impl From<BufferError> for io::Error {
    fn from(err: BufferError) -> Self {
        match err {
            BufferError::Io(e) => e,
            BufferError::Closed => io::Error::new(io::ErrorKind::BrokenPipe, err),
            BufferError::ResetNotSupported => io::Error::new(io::ErrorKind::Unsupported, err),
            BufferError::InvalidSegmentSize => io::Error::new(io::ErrorKind::InvalidInput, err),
            BufferError::Released => io::Error::other(err),
        }
    }
}
