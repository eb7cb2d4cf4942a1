//! Error taxonomy for the COW engine.
//!
//! Every failure surfaces to the immediate caller; the engine performs no
//! silent retries. A failed write/truncate never leaves a half-applied
//! extent update behind (see `file::UpperFileState`).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CowError {
    /// Underlying branch read/write failure. The operation aborts with the
    /// in-memory file state unchanged.
    #[error("branch i/o failed: {0}")]
    Io(#[from] std::io::Error),

    /// Nonsensical offset/length, rejected before any mutation.
    #[error("invalid range: offset {offset}, len {len}")]
    InvalidRange { offset: u64, len: u64 },

    /// The upper branch ran out of space during copy-up or write.
    #[error("upper branch out of space while writing {len} bytes at {offset}")]
    OutOfSpace { offset: u64, len: u64 },
}

impl CowError {
    /// Classify an upper-branch write failure: storage exhaustion becomes
    /// `OutOfSpace`, everything else stays `Io`.
    pub(crate) fn from_upper_write(err: std::io::Error, offset: u64, len: u64) -> Self {
        match err.kind() {
            std::io::ErrorKind::StorageFull | std::io::ErrorKind::QuotaExceeded => {
                CowError::OutOfSpace { offset, len }
            }
            _ => CowError::Io(err),
        }
    }
}

pub type Result<T> = std::result::Result<T, CowError>;
