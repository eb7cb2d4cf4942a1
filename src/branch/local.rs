//! Branch implementations over plain files in a local directory.

use crate::branch::{LowerBranch, UpperBranch};
use async_trait::async_trait;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};

/// Read-only file in the lower branch directory.
pub struct LocalLowerBranch {
    path: PathBuf,
}

impl LocalLowerBranch {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

async fn read_range(path: &Path, offset: u64, len: usize) -> std::io::Result<Vec<u8>> {
    let mut file = fs::File::open(path).await?;
    file.seek(SeekFrom::Start(offset)).await?;
    let mut buf = Vec::with_capacity(len);
    file.take(len as u64).read_to_end(&mut buf).await?;
    // Short read past a sparse tail or EOF reads as zero.
    buf.resize(len, 0);
    Ok(buf)
}

#[async_trait]
impl LowerBranch for LocalLowerBranch {
    async fn read_at(&self, offset: u64, len: usize) -> std::io::Result<Vec<u8>> {
        read_range(&self.path, offset, len).await
    }

    async fn size(&self) -> std::io::Result<u64> {
        Ok(fs::metadata(&self.path).await?.len())
    }
}

/// Writable (possibly not-yet-existing) file in the upper branch directory.
pub struct LocalUpperBranch {
    path: PathBuf,
}

impl LocalUpperBranch {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    async fn open_rw(&self) -> std::io::Result<fs::File> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).await?;
        }
        OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)
            .await
    }
}

#[async_trait]
impl UpperBranch for LocalUpperBranch {
    async fn read_at(&self, offset: u64, len: usize) -> std::io::Result<Vec<u8>> {
        read_range(&self.path, offset, len).await
    }

    async fn write_at(&self, offset: u64, data: &[u8]) -> std::io::Result<()> {
        let mut file = self.open_rw().await?;
        file.seek(SeekFrom::Start(offset)).await?;
        file.write_all(data).await?;
        file.flush().await?;
        Ok(())
    }

    async fn set_len(&self, len: u64) -> std::io::Result<()> {
        let file = self.open_rw().await?;
        file.set_len(len).await
    }

    async fn size(&self) -> std::io::Result<Option<u64>> {
        match fs::metadata(&self.path).await {
            Ok(meta) => Ok(Some(meta.len())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }
}
