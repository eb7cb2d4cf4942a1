//! Read assembly: stitch upper extents, lower bytes, and zero-fill.

use crate::branch::{LowerBranch, UpperBranch};
use crate::error::Result;
use crate::file::UpperFileState;
use bytes::{BufMut, Bytes, BytesMut};

/// Assembles one read against a file's current state.
///
/// The requested range is partitioned with `ExtentMap::covers`; each
/// materialized subrange comes from the upper branch, each hole comes from
/// the lower branch below `lower_limit` and zero-fills at or above it.
pub struct ReadAssembler<'a, L: LowerBranch, U: UpperBranch> {
    state: &'a UpperFileState,
    lower: &'a L,
    upper: &'a U,
}

impl<'a, L: LowerBranch, U: UpperBranch> ReadAssembler<'a, L, U> {
    pub fn new(state: &'a UpperFileState, lower: &'a L, upper: &'a U) -> Self {
        Self {
            state,
            lower,
            upper,
        }
    }

    /// Read up to `len` bytes at `offset`. Reads past end-of-file return
    /// fewer bytes; an offset at or beyond EOF returns empty.
    pub async fn read(&self, offset: u64, len: usize) -> Result<Bytes> {
        if offset >= self.state.size {
            return Ok(Bytes::new());
        }
        let clipped = (len as u64).min(self.state.size - offset);
        if clipped == 0 {
            return Ok(Bytes::new());
        }

        let mut out = BytesMut::with_capacity(clipped as usize);
        for (seg, materialized) in self.state.extents.covers(offset, clipped) {
            if materialized {
                let buf = self.upper.read_at(seg.start, seg.len() as usize).await?;
                out.put_slice(&buf);
            } else {
                // A hole: lower bytes while the lower file is still
                // visible here, zero beyond.
                let lower_end = seg.end.min(self.state.lower_limit);
                if seg.start < lower_end {
                    let buf = self
                        .lower
                        .read_at(seg.start, (lower_end - seg.start) as usize)
                        .await?;
                    out.put_slice(&buf);
                }
                if seg.end > lower_end.max(seg.start) {
                    out.put_bytes(0, (seg.end - lower_end.max(seg.start)) as usize);
                }
            }
        }
        debug_assert_eq!(out.len() as u64, clipped);
        Ok(out.freeze())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::branch::mem::{MemLowerBranch, MemUpperBranch};
    use crate::extent::ExtentMap;

    fn state(size: u64, lower_limit: u64, extents: ExtentMap) -> UpperFileState {
        UpperFileState {
            size,
            lower_size: lower_limit,
            lower_limit,
            extents,
            fully_copied: false,
        }
    }

    #[tokio::test]
    async fn stitches_upper_lower_and_zero() {
        let lower = MemLowerBranch::filled(b'l', 100);
        let upper = MemUpperBranch::new();
        upper.set_len(150).await.unwrap();
        upper.write_at(40, &[b'u'; 20]).await.unwrap();

        let mut extents = ExtentMap::new();
        extents.insert(40, 20);
        // File grown to 150; lower only ever had 100 bytes.
        let st = state(150, 100, extents);

        let out = ReadAssembler::new(&st, &lower, &upper)
            .read(0, 150)
            .await
            .unwrap();
        assert_eq!(out.len(), 150);
        assert!(out[..40].iter().all(|&b| b == b'l'));
        assert!(out[40..60].iter().all(|&b| b == b'u'));
        assert!(out[60..100].iter().all(|&b| b == b'l'));
        assert!(out[100..].iter().all(|&b| b == 0));
    }

    #[tokio::test]
    async fn hole_straddling_lower_limit_splits() {
        let lower = MemLowerBranch::filled(b'l', 50);
        let upper = MemUpperBranch::new();
        let st = state(80, 50, ExtentMap::new());

        let out = ReadAssembler::new(&st, &lower, &upper)
            .read(30, 40)
            .await
            .unwrap();
        assert_eq!(out.len(), 40);
        assert!(out[..20].iter().all(|&b| b == b'l'));
        assert!(out[20..].iter().all(|&b| b == 0));
    }

    #[tokio::test]
    async fn clips_at_eof() {
        let lower = MemLowerBranch::filled(b'l', 10);
        let upper = MemUpperBranch::new();
        let st = state(10, 10, ExtentMap::new());
        let asm = ReadAssembler::new(&st, &lower, &upper);

        assert_eq!(asm.read(4, 100).await.unwrap().len(), 6);
        assert!(asm.read(10, 5).await.unwrap().is_empty());
        assert!(asm.read(200, 5).await.unwrap().is_empty());
        assert!(asm.read(0, 0).await.unwrap().is_empty());
    }
}
