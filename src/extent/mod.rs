//! Materialized byte-range tracking for sparse upper files.
//!
//! An `ExtentMap` records which parts of an upper-branch file hold
//! authoritative written data. Holes are represented by the absence of an
//! extent, never by a stored zero-filled range, so the map stays sparse no
//! matter how large the file is.

/// Half-open byte range `[start, end)` of materialized upper-branch data.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Extent {
    pub start: u64,
    pub end: u64,
}

impl Extent {
    pub fn new(start: u64, end: u64) -> Self {
        debug_assert!(start < end, "empty extent [{start}, {end})");
        Self { start, end }
    }

    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

/// Ordered collection of pairwise disjoint, non-adjacent extents.
///
/// Invariant: extents are sorted by `start` and never touch or overlap;
/// `insert` merges eagerly, `truncate_to` only removes. Kept as a sorted
/// `Vec` probed with binary search — maps stay small (one entry per
/// un-merged write burst) and reads walk them linearly anyway.
#[derive(Clone, Debug, Default)]
pub struct ExtentMap {
    ranges: Vec<Extent>,
}

impl ExtentMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// A map already covering `[0, end)`, used when a file is known to be
    /// fully materialized (prior full copy-up).
    pub fn full(end: u64) -> Self {
        let ranges = if end > 0 {
            vec![Extent::new(0, end)]
        } else {
            Vec::new()
        };
        Self { ranges }
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Extent> {
        self.ranges.iter()
    }

    /// Record `[start, start + len)` as materialized.
    ///
    /// Merges with every existing extent that overlaps or is adjacent to
    /// the new range; a single insert can bridge several previously
    /// separate extents into one.
    pub fn insert(&mut self, start: u64, len: u64) {
        if len == 0 {
            return;
        }
        let end = start + len;
        // First extent that could merge: anything with `e.end >= start`
        // (half-open ranges, so `e.end == start` means adjacency).
        let lo = self.ranges.partition_point(|e| e.end < start);
        let mut hi = lo;
        let mut merged = Extent::new(start, end);
        while hi < self.ranges.len() && self.ranges[hi].start <= end {
            merged.start = merged.start.min(self.ranges[hi].start);
            merged.end = merged.end.max(self.ranges[hi].end);
            hi += 1;
        }
        self.ranges.splice(lo..hi, [merged]);
    }

    /// Decompose `[offset, offset + len)` into an ordered, exhaustive,
    /// non-overlapping partition alternating between materialized (`true`)
    /// and not-yet-copied (`false`) subranges.
    pub fn covers(&self, offset: u64, len: u64) -> Vec<(Extent, bool)> {
        let mut out = Vec::new();
        if len == 0 {
            return out;
        }
        let end = offset + len;
        let mut cursor = offset;
        let idx = self.ranges.partition_point(|e| e.end <= offset);
        for e in &self.ranges[idx..] {
            if e.start >= end {
                break;
            }
            if e.start > cursor {
                out.push((Extent::new(cursor, e.start), false));
                cursor = e.start;
            }
            let seg_end = e.end.min(end);
            out.push((Extent::new(cursor, seg_end), true));
            cursor = seg_end;
            if cursor >= end {
                break;
            }
        }
        if cursor < end {
            out.push((Extent::new(cursor, end), false));
        }
        out
    }

    /// Clip the map to a shrunken file: extents entirely at or beyond
    /// `new_size` are dropped, a straddler is clipped to `end = new_size`.
    pub fn truncate_to(&mut self, new_size: u64) {
        let keep = self.ranges.partition_point(|e| e.start < new_size);
        self.ranges.truncate(keep);
        if let Some(last) = self.ranges.last_mut()
            && last.end > new_size
        {
            last.end = new_size;
        }
    }

    /// Growth is pure bookkeeping: the grown region is an implicit hole and
    /// materializes nothing until written.
    pub fn extend_to(&mut self, _new_size: u64) {}

    /// Total number of materialized bytes.
    pub fn covered_bytes(&self) -> u64 {
        self.ranges.iter().map(Extent::len).sum()
    }

    /// Number of materialized bytes inside `[start, end)`.
    pub fn overlap(&self, start: u64, end: u64) -> u64 {
        if start >= end {
            return 0;
        }
        let idx = self.ranges.partition_point(|e| e.end <= start);
        self.ranges[idx..]
            .iter()
            .take_while(|e| e.start < end)
            .map(|e| e.end.min(end) - e.start.max(start))
            .sum()
    }

    #[cfg(test)]
    fn check_invariants(&self) {
        for w in self.ranges.windows(2) {
            assert!(w[0].start < w[0].end, "empty extent {:?}", w[0]);
            assert!(
                w[0].end < w[1].start,
                "extents touch or overlap: {:?} {:?}",
                w[0],
                w[1]
            );
        }
        if let Some(e) = self.ranges.last() {
            assert!(e.start < e.end, "empty extent {e:?}");
        }
    }
}
