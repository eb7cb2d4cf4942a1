//! In-memory branch implementations for tests and local development.

use crate::branch::{LowerBranch, UpperBranch};
use async_trait::async_trait;
use std::sync::Mutex;

/// Immutable in-memory lower file.
pub struct MemLowerBranch {
    data: Vec<u8>,
}

impl MemLowerBranch {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// A lower file of `len` bytes all equal to `byte`.
    pub fn filled(byte: u8, len: usize) -> Self {
        Self::new(vec![byte; len])
    }
}

#[async_trait]
impl LowerBranch for MemLowerBranch {
    async fn read_at(&self, offset: u64, len: usize) -> std::io::Result<Vec<u8>> {
        let mut out = vec![0u8; len];
        let start = (offset as usize).min(self.data.len());
        let end = (start + len).min(self.data.len());
        out[..end - start].copy_from_slice(&self.data[start..end]);
        Ok(out)
    }

    async fn size(&self) -> std::io::Result<u64> {
        Ok(self.data.len() as u64)
    }
}

/// Writable in-memory upper file; starts out not existing.
#[derive(Default)]
pub struct MemUpperBranch {
    file: Mutex<Option<Vec<u8>>>,
}

impl MemUpperBranch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the current file content, if the file exists.
    pub fn contents(&self) -> Option<Vec<u8>> {
        self.file.lock().unwrap().clone()
    }
}

#[async_trait]
impl UpperBranch for MemUpperBranch {
    async fn read_at(&self, offset: u64, len: usize) -> std::io::Result<Vec<u8>> {
        let guard = self.file.lock().unwrap();
        let data = guard.as_deref().unwrap_or(&[]);
        let mut out = vec![0u8; len];
        let start = (offset as usize).min(data.len());
        let end = (start + len).min(data.len());
        out[..end - start].copy_from_slice(&data[start..end]);
        Ok(out)
    }

    async fn write_at(&self, offset: u64, data: &[u8]) -> std::io::Result<()> {
        let mut guard = self.file.lock().unwrap();
        let file = guard.get_or_insert_with(Vec::new);
        let end = offset as usize + data.len();
        if file.len() < end {
            file.resize(end, 0);
        }
        file[offset as usize..end].copy_from_slice(data);
        Ok(())
    }

    async fn set_len(&self, len: u64) -> std::io::Result<()> {
        let mut guard = self.file.lock().unwrap();
        let file = guard.get_or_insert_with(Vec::new);
        file.resize(len as usize, 0);
        Ok(())
    }

    async fn size(&self) -> std::io::Result<Option<u64>> {
        Ok(self.file.lock().unwrap().as_ref().map(|f| f.len() as u64))
    }
}
