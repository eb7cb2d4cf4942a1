//! Per-file COW state and the write/truncate/read orchestration.
//!
//! A `CowFile` owns one file's `UpperFileState` together with its two
//! branch handles and mutates them consistently. All branch I/O for an
//! operation happens before any in-memory state mutation, so a failed
//! operation leaves `size`/`extents` exactly as they were; bytes that may
//! already have landed in the upper branch are not recorded as materialized
//! and stay invisible (the lower branch still holds the same content for
//! those offsets).

pub mod assemble;

use crate::branch::{LowerBranch, UpperBranch};
use crate::error::{CowError, Result};
use crate::extent::ExtentMap;
use crate::policy::{self, CowConfig, CowDecision};
use bytes::Bytes;
use log::{debug, info};

/// Aggregate per-file state: logical size, materialized ranges, and how
/// much of the lower file is still visible through holes.
#[derive(Clone, Debug)]
pub struct UpperFileState {
    /// Current logical file size.
    pub size: u64,
    /// Lower-branch file size at state creation; immutable once recorded.
    pub lower_size: u64,
    /// Upper bound of lower-branch visibility. Starts at `lower_size`,
    /// clamped down by shrinking truncates and never raised again: a
    /// region regrown after a shrink must read zero, not stale lower
    /// bytes. Unmaterialized bytes at or above it zero-fill.
    pub lower_limit: u64,
    /// Materialized upper-branch byte ranges.
    pub extents: ExtentMap,
    /// Once true, all of `[0, size)` is authoritative in the upper branch
    /// and the map holds a single covering extent; the lower branch is
    /// never consulted again.
    pub fully_copied: bool,
}

impl UpperFileState {
    /// State for a file that so far exists only in the lower branch.
    pub fn for_lower_only(lower_size: u64) -> Self {
        Self {
            size: lower_size,
            lower_size,
            lower_limit: lower_size,
            extents: ExtentMap::new(),
            fully_copied: false,
        }
    }

    /// State for a file whose upper copy already fully exists. The extent
    /// map is volatile session state, so an upper file found on open can
    /// only come from a prior full copy-up: it is complete.
    pub fn for_copied_upper(upper_size: u64, lower_size: u64) -> Self {
        Self {
            size: upper_size,
            lower_size,
            lower_limit: 0,
            extents: ExtentMap::full(upper_size),
            fully_copied: true,
        }
    }
}

/// One open file: branch handles, state, and the three mutating operations.
pub struct CowFile<L: LowerBranch, U: UpperBranch> {
    lower: L,
    upper: U,
    config: CowConfig,
    state: UpperFileState,
    /// Whether the upper file physically exists yet. The first write or
    /// truncate materializes it as a sparse file of the current size.
    materialized: bool,
}

impl<L: LowerBranch, U: UpperBranch> CowFile<L, U> {
    /// Build file state from the current branch contents.
    pub async fn open(lower: L, upper: U, config: CowConfig) -> Result<Self> {
        let lower_size = lower.size().await?;
        let (state, materialized) = match upper.size().await? {
            Some(upper_size) => (
                UpperFileState::for_copied_upper(upper_size, lower_size),
                true,
            ),
            None => (UpperFileState::for_lower_only(lower_size), false),
        };
        debug!(
            "open: lower_size={lower_size} size={} fully_copied={}",
            state.size, state.fully_copied
        );
        Ok(Self {
            lower,
            upper,
            config,
            state,
            materialized,
        })
    }

    pub fn state(&self) -> &UpperFileState {
        &self.state
    }

    /// Write `data` at `offset`, copying up from the lower branch as the
    /// policy dictates. Returns the number of bytes written.
    ///
    /// Afterwards every byte of `[offset, offset + data.len())` is
    /// materialized in the upper branch and reads of that range return
    /// exactly `data`, irrespective of prior state.
    pub async fn write(&mut self, offset: u64, data: &[u8]) -> Result<usize> {
        let len = data.len() as u64;
        let write_end = offset
            .checked_add(len)
            .ok_or(CowError::InvalidRange { offset, len })?;
        if data.is_empty() {
            return Ok(0);
        }
        debug!("write: offset={offset} len={len}");

        let new_size = self.state.size.max(write_end);
        let decision = if self.state.fully_copied {
            None
        } else {
            Some(policy::decide(
                &self.config,
                &self.state.extents,
                self.state.size,
                offset,
                len,
            ))
        };

        // Branch I/O, in order: materialize the sparse upper file, copy up,
        // write the payload. State mutation only happens once all of it
        // succeeded.
        self.ensure_materialized().await?;
        if decision == Some(CowDecision::FullCopy) {
            self.copy_up_remainder().await?;
        }
        self.upper
            .write_at(offset, data)
            .await
            .map_err(|e| CowError::from_upper_write(e, offset, len))?;

        match decision {
            Some(CowDecision::FullCopy) => {
                info!(
                    "full copy-up: size={} -> fully copied at write [{offset}, {write_end})",
                    self.state.size
                );
                self.state.fully_copied = true;
                self.state.extents = ExtentMap::full(new_size);
            }
            Some(CowDecision::PartialCopy) => {
                self.state.extents.extend_to(new_size);
                self.state.extents.insert(offset, len);
            }
            // Already fully copied: keep the single covering extent.
            None => self.state.extents = ExtentMap::full(new_size),
        }
        self.state.size = new_size;
        Ok(data.len())
    }

    /// Grow or shrink the file to `new_size`.
    ///
    /// Growth leaves an implicit hole reading as zero. Shrink discards all
    /// materialized data beyond `new_size` and clamps lower-branch
    /// visibility, so growing back later yields zeros, not resurrected
    /// content.
    pub async fn truncate(&mut self, new_size: u64) -> Result<()> {
        if new_size == self.state.size {
            return Ok(());
        }
        debug!("truncate: size={} new_size={new_size}", self.state.size);

        self.upper.set_len(new_size).await?;

        if new_size < self.state.size {
            self.state.extents.truncate_to(new_size);
            self.state.lower_limit = self.state.lower_limit.min(new_size);
        } else {
            self.state.extents.extend_to(new_size);
        }
        if self.state.fully_copied {
            self.state.extents = ExtentMap::full(new_size);
        }
        self.state.size = new_size;
        self.materialized = true;
        Ok(())
    }

    /// Assemble up to `len` bytes starting at `offset` from upper extents,
    /// lower bytes, and zero-fill.
    pub async fn read(&self, offset: u64, len: usize) -> Result<Bytes> {
        assemble::ReadAssembler::new(&self.state, &self.lower, &self.upper)
            .read(offset, len)
            .await
    }

    /// Create the sparse upper file at the current logical size on first
    /// touch.
    async fn ensure_materialized(&mut self) -> Result<()> {
        if !self.materialized {
            self.upper.set_len(self.state.size).await?;
            self.materialized = true;
        }
        Ok(())
    }

    /// Copy every not-yet-materialized byte of `[0, lower_limit)` from the
    /// lower branch into the upper branch. Each gap is a bounded read
    /// followed by one write; the extent map is not touched here.
    async fn copy_up_remainder(&mut self) -> Result<()> {
        let copy_end = self.state.lower_limit.min(self.state.size);
        for (gap, materialized) in self.state.extents.covers(0, copy_end) {
            if materialized {
                continue;
            }
            let buf = self.lower.read_at(gap.start, gap.len() as usize).await?;
            self.upper
                .write_at(gap.start, &buf)
                .await
                .map_err(|e| CowError::from_upper_write(e, gap.start, gap.len()))?;
        }
        Ok(())
    }
}
