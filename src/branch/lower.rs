//! Read-only lower-branch access.

use async_trait::async_trait;

/// Random-access reads against the immutable lower-branch file.
///
/// The engine only asks for ranges inside `[0, size())`; implementations
/// must return exactly `len` bytes for such ranges.
#[async_trait]
pub trait LowerBranch: Send + Sync {
    async fn read_at(&self, offset: u64, len: usize) -> std::io::Result<Vec<u8>>;

    /// Size of the lower-branch file, sampled once at session start.
    async fn size(&self) -> std::io::Result<u64>;
}
