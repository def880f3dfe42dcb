// kmlst: k-mer based multilocus sequence typing from short-read data
//
// Copyright 2025 kmlst contributors.

// Copyrights in this project are retained by contributors. No copyright assignment
// is required to contribute to this project.

// Except as otherwise noted (below and/or in individual files), this
// project is licensed under the Apache License, Version 2.0
// <LICENSE-APACHE> or <http://www.apache.org/licenses/LICENSE-2.0> or
// the MIT license, <LICENSE-MIT> or <http://opensource.org/licenses/MIT>,
// at your option.
//
//! Per-sequence _k_-mer coverage analysis.
//!
//! Walks the k-mers of a candidate allele against the count table and
//! reports how well the sequence is supported: minimum depth, counts of
//! covered and uncovered positions, and a merged list of uncovered
//! intervals (gaps).

use crate::counts::{self, KmerCounts};

/// Sentinel minimum depth for sequences that produce no k-mers.
///
/// Callers must guard on `covered + uncovered > 0` before trusting
/// `min_depth`.
pub const NO_DEPTH: u32 = u32::MAX;

/// Coverage of one candidate sequence against the count table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coverage {
    /// Minimum count over all k-mer positions, [NO_DEPTH] if there are none.
    pub min_depth: u32,
    /// Number of k-mer positions with count at or above the threshold.
    pub covered: usize,
    /// Number of k-mer positions below the threshold.
    pub uncovered: usize,
    /// Merged uncovered intervals as 1-based inclusive k-mer positions.
    pub gaps: Vec<(usize, usize)>,
}

impl Coverage {
    /// Fraction of supported k-mer positions, 0 when there are none.
    pub fn fraction(&self) -> f64 {
        let total = self.covered + self.uncovered;
        if total == 0 {
            0.0
        } else {
            self.covered as f64 / total as f64
        }
    }

    /// True when the sequence has k-mers and every one of them is supported.
    pub fn fully_covered(&self) -> bool {
        self.covered > 0 && self.uncovered == 0
    }
}

/// Analyze every k-mer position of `seq` against `counts`.
///
/// A position is covered when the canonical form of its k-mer has a count
/// of at least `threshold`; positions whose k-mer contains a character
/// outside ACGT count as depth 0. For a sequence of length L the covered
/// and uncovered totals always sum to `L - k + 1`.
pub fn analyze(
    seq: &[u8],
    counts: &KmerCounts,
    k: usize,
    threshold: u32,
) -> Coverage {
    analyze_from(seq, counts, k, threshold, 1)
}

/// Analyze the k-mer positions of `seq` at or after `skip` (1-based).
///
/// The restricted form exists for the template corrector, which re-detects
/// gaps only beyond the region it has already processed.
pub fn analyze_from(
    seq: &[u8],
    counts: &KmerCounts,
    k: usize,
    threshold: u32,
    skip: usize,
) -> Coverage {
    let mut coverage = Coverage { min_depth: NO_DEPTH, covered: 0, uncovered: 0, gaps: Vec::new() };
    if seq.len() < k {
        return coverage;
    }

    let last = seq.len() - k + 1;
    let mut gap_start: Option<usize> = None;
    for pos in skip.max(1)..=last {
        let depth = counts::kmer_depth(counts, &seq[pos - 1..pos - 1 + k]);
        coverage.min_depth = coverage.min_depth.min(depth);
        if depth >= threshold {
            coverage.covered += 1;
            if let Some(start) = gap_start.take() {
                coverage.gaps.push((start, pos - 1));
            }
        } else {
            coverage.uncovered += 1;
            if gap_start.is_none() {
                gap_start = Some(pos);
            }
        }
    }
    if let Some(start) = gap_start {
        coverage.gaps.push((start, last));
    }

    merge_gaps(&mut coverage.gaps, k);
    coverage
}

/// Merge gaps that describe the same underlying change.
///
/// A single substitution makes exactly k adjacent k-mers unsupported, so a
/// spuriously matching k-mer inside a mutated region can split one gap in
/// two. Consecutive gaps `(s1, e1)` and `(s2, e2)` are merged whenever
/// `s1 + k >= s2`; afterwards consecutive gaps satisfy `s1 + k < s2`.
fn merge_gaps(
    gaps: &mut Vec<(usize, usize)>,
    k: usize,
) {
    let mut merged: Vec<(usize, usize)> = Vec::with_capacity(gaps.len());
    for &(start, end) in gaps.iter() {
        match merged.last_mut() {
            Some((prev_start, prev_end)) if *prev_start + k >= start => *prev_end = end,
            _ => merged.push((start, end)),
        }
    }
    *gaps = merged;
}
