//! Writable upper-branch access.

use async_trait::async_trait;

/// Random-access I/O against the writable upper-branch file.
///
/// The upper file may not exist yet (`size()` returns `None`); the first
/// write or truncate materializes it as a sparse file. Reads inside
/// `[0, len)` of an existing file return exactly `len` bytes, zero-filled
/// where the file is sparse.
#[async_trait]
pub trait UpperBranch: Send + Sync {
    async fn read_at(&self, offset: u64, len: usize) -> std::io::Result<Vec<u8>>;

    async fn write_at(&self, offset: u64, data: &[u8]) -> std::io::Result<()>;

    /// Set the physical file length, creating the file if needed. Growth
    /// leaves a sparse tail, shrink discards bytes.
    async fn set_len(&self, len: u64) -> std::io::Result<()>;

    /// Current upper file size, or `None` while the file does not exist.
    async fn size(&self) -> std::io::Result<Option<u64>>;
}
