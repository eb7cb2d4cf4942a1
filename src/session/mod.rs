//! Open-file sessions and per-path serialization.
//!
//! All mutation funnels through `FileSession`: one async mutex per path
//! guards the shared `CowFile`, so write/read/truncate on the same file
//! never interleave (a half-merged extent map must never be observable),
//! while operations on different files proceed in parallel without shared
//! state.

use crate::branch::{LowerBranch, UpperBranch};
use crate::error::Result;
use crate::file::CowFile;
use crate::policy::CowConfig;
use bytes::Bytes;
use log::debug;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::Mutex as AsyncMutex;

struct Shared<L: LowerBranch, U: UpperBranch> {
    file: Arc<AsyncMutex<CowFile<L, U>>>,
    sessions: usize,
}

/// Hands out the single serialization point for each path.
///
/// The per-file state is volatile: when the last session on a path closes,
/// the entry is dropped and a later open re-derives state from the branch
/// contents.
pub struct SessionRegistry<L: LowerBranch, U: UpperBranch> {
    files: Mutex<HashMap<PathBuf, Shared<L, U>>>,
}

impl<L: LowerBranch, U: UpperBranch> Default for SessionRegistry<L, U> {
    fn default() -> Self {
        Self {
            files: Mutex::new(HashMap::new()),
        }
    }
}

impl<L: LowerBranch, U: UpperBranch> SessionRegistry<L, U> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a session on `path`. Joins the live state if another session
    /// already has the file open (the provided branch handles are then
    /// dropped unused); otherwise derives fresh state from the branches.
    pub async fn open(
        self: &Arc<Self>,
        path: impl AsRef<Path>,
        lower: L,
        upper: U,
        config: CowConfig,
    ) -> Result<FileSession<L, U>> {
        let path = path.as_ref().to_path_buf();
        if let Some(file) = self.join(&path) {
            debug!("open: joined live session for {}", path.display());
            return Ok(FileSession::new(self.clone(), path, file));
        }

        // Probe the branches without holding the map lock across awaits; a
        // racing open for the same path is resolved below.
        let opened = CowFile::open(lower, upper, config).await?;
        let file = {
            let mut files = self.files.lock().unwrap();
            match files.entry(path.clone()) {
                Entry::Occupied(mut e) => {
                    e.get_mut().sessions += 1;
                    e.get().file.clone()
                }
                Entry::Vacant(v) => {
                    let file = Arc::new(AsyncMutex::new(opened));
                    v.insert(Shared {
                        file: file.clone(),
                        sessions: 1,
                    });
                    file
                }
            }
        };
        Ok(FileSession::new(self.clone(), path, file))
    }

    /// Number of paths with live sessions.
    pub fn open_files(&self) -> usize {
        self.files.lock().unwrap().len()
    }

    fn join(&self, path: &Path) -> Option<Arc<AsyncMutex<CowFile<L, U>>>> {
        let mut files = self.files.lock().unwrap();
        files.get_mut(path).map(|shared| {
            shared.sessions += 1;
            shared.file.clone()
        })
    }

    fn release(&self, path: &Path) {
        let mut files = self.files.lock().unwrap();
        if let Some(shared) = files.get_mut(path) {
            shared.sessions -= 1;
            if shared.sessions == 0 {
                files.remove(path);
            }
        }
    }
}

/// Point-in-time view of a session's file state.
#[derive(Clone, Copy, Debug)]
pub struct SessionStat {
    pub size: u64,
    pub fully_copied: bool,
    pub materialized_bytes: u64,
    pub extent_count: usize,
}

/// One open file, externally-facing contract for the surrounding
/// filesystem glue. Operations are processed one at a time in request
/// order; committed writes are already reflected in the upper branch, so
/// `close` loses nothing.
pub struct FileSession<L: LowerBranch, U: UpperBranch> {
    registry: Arc<SessionRegistry<L, U>>,
    path: PathBuf,
    file: Arc<AsyncMutex<CowFile<L, U>>>,
    closed: bool,
}

impl<L: LowerBranch, U: UpperBranch> FileSession<L, U> {
    fn new(
        registry: Arc<SessionRegistry<L, U>>,
        path: PathBuf,
        file: Arc<AsyncMutex<CowFile<L, U>>>,
    ) -> Self {
        Self {
            registry,
            path,
            file,
            closed: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn read(&self, offset: u64, len: usize) -> Result<Bytes> {
        self.file.lock().await.read(offset, len).await
    }

    pub async fn write(&self, offset: u64, data: &[u8]) -> Result<usize> {
        self.file.lock().await.write(offset, data).await
    }

    pub async fn truncate(&self, new_size: u64) -> Result<()> {
        self.file.lock().await.truncate(new_size).await
    }

    pub async fn stat(&self) -> SessionStat {
        let file = self.file.lock().await;
        let state = file.state();
        SessionStat {
            size: state.size,
            fully_copied: state.fully_copied,
            materialized_bytes: state.extents.covered_bytes(),
            extent_count: state.extents.len(),
        }
    }

    /// Release the session. The per-path state is dropped once the last
    /// session on the path goes away.
    pub fn close(mut self) {
        self.closed = true;
        self.registry.release(&self.path);
    }
}

impl<L: LowerBranch, U: UpperBranch> Drop for FileSession<L, U> {
    fn drop(&mut self) {
        if !self.closed {
            self.registry.release(&self.path);
        }
    }
}
