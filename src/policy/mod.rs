//! Copy-up strategy selection.
//!
//! One pure function decides, per write, whether to copy the whole lower
//! file up or to materialize only the touched range. Keeping the decision
//! free of I/O makes it testable in isolation from the branches.

use crate::extent::ExtentMap;

/// Strategy for an incoming write against a not-fully-copied file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CowDecision {
    /// Copy every not-yet-materialized byte of the lower file into the
    /// upper branch; afterwards the lower branch is never consulted again.
    FullCopy,
    /// Materialize only the written range and record it in the extent map.
    PartialCopy,
}

/// Copy-up tuning consumed from the surrounding filesystem's mount options.
#[derive(Clone, Copy, Debug)]
pub struct CowConfig {
    /// Partial (range-limited) copy-up enabled at all. When `false` every
    /// first write to a lower-only file forces a full copy-up.
    pub partial_enabled: bool,
    /// Fraction of the prospective file size that, once materialized, makes
    /// another partial copy-up pointless: if the write would push coverage
    /// to or above this ratio the whole file is copied up instead. `1.0`
    /// effectively keeps partial copy-up for every write.
    pub coverage_threshold: f64,
    /// Files whose prospective size stays below this many bytes always take
    /// the full-copy path; fragmenting tiny files buys nothing.
    pub min_partial_size: u64,
}

impl Default for CowConfig {
    fn default() -> Self {
        Self {
            partial_enabled: true,
            coverage_threshold: 0.75,
            min_partial_size: 4096,
        }
    }
}

/// Decide the copy strategy for a write of `write_len` bytes at
/// `write_offset` against a file currently `size` bytes long with
/// `extents` materialized.
///
/// Callers skip the call entirely once the file is fully copied; this
/// function only weighs partial against full copy-up.
pub fn decide(
    config: &CowConfig,
    extents: &ExtentMap,
    size: u64,
    write_offset: u64,
    write_len: u64,
) -> CowDecision {
    let write_end = write_offset + write_len;
    let prospective_size = size.max(write_end);

    if !config.partial_enabled || prospective_size < config.min_partial_size {
        return CowDecision::FullCopy;
    }
    if prospective_size == 0 {
        return CowDecision::PartialCopy;
    }

    // Bytes materialized after this write: current coverage plus the part
    // of the write range not already covered.
    let new_bytes = write_len - extents.overlap(write_offset, write_end);
    let covered = extents.covered_bytes() + new_bytes;
    let ratio = covered as f64 / prospective_size as f64;
    if ratio >= config.coverage_threshold {
        CowDecision::FullCopy
    } else {
        CowDecision::PartialCopy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn permissive() -> CowConfig {
        CowConfig {
            partial_enabled: true,
            coverage_threshold: 0.75,
            min_partial_size: 0,
        }
    }

    #[test]
    fn small_write_stays_partial() {
        let cfg = permissive();
        let extents = ExtentMap::new();
        assert_eq!(
            decide(&cfg, &extents, 4096, 100, 10),
            CowDecision::PartialCopy
        );
    }

    #[test]
    fn crossing_threshold_goes_full() {
        let cfg = permissive();
        let mut extents = ExtentMap::new();
        extents.insert(0, 2000);
        // 2000 covered + 1500 new = 3500 / 4096 > 0.75.
        assert_eq!(
            decide(&cfg, &extents, 4096, 2000, 1500),
            CowDecision::FullCopy
        );
        // 2000 covered + 500 new = 2500 / 4096 < 0.75.
        assert_eq!(
            decide(&cfg, &extents, 4096, 2000, 500),
            CowDecision::PartialCopy
        );
    }

    #[test]
    fn overlap_does_not_double_count() {
        let cfg = permissive();
        let mut extents = ExtentMap::new();
        extents.insert(0, 3000);
        // Rewriting already-covered bytes adds nothing: 3000 / 4096 < 0.75.
        assert_eq!(
            decide(&cfg, &extents, 4096, 0, 3000),
            CowDecision::PartialCopy
        );
    }

    #[test]
    fn growth_counts_against_prospective_size() {
        let cfg = permissive();
        let mut extents = ExtentMap::new();
        extents.insert(0, 100);
        // Appending far past EOF: coverage 100 + 1000 out of 100_000.
        assert_eq!(
            decide(&cfg, &extents, 4096, 99_000, 1000),
            CowDecision::PartialCopy
        );
    }

    #[test]
    fn disabled_partial_forces_full() {
        let cfg = CowConfig {
            partial_enabled: false,
            ..permissive()
        };
        assert_eq!(
            decide(&cfg, &ExtentMap::new(), 1 << 20, 0, 1),
            CowDecision::FullCopy
        );
    }

    #[test]
    fn tiny_files_force_full() {
        let cfg = CowConfig::default(); // min_partial_size = 4096
        assert_eq!(
            decide(&cfg, &ExtentMap::new(), 1000, 0, 10),
            CowDecision::FullCopy
        );
        // At or above the cutoff partial is allowed again.
        assert_eq!(
            decide(&cfg, &ExtentMap::new(), 4096, 0, 10),
            CowDecision::PartialCopy
        );
    }

    #[test]
    fn threshold_one_never_goes_full_below_total() {
        let cfg = CowConfig {
            coverage_threshold: 1.0,
            ..permissive()
        };
        let mut extents = ExtentMap::new();
        extents.insert(0, 4000);
        assert_eq!(
            decide(&cfg, &extents, 4096, 4000, 95),
            CowDecision::PartialCopy
        );
        // Writing the last byte reaches full coverage.
        assert_eq!(
            decide(&cfg, &extents, 4096, 4000, 96),
            CowDecision::FullCopy
        );
    }
}
