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
//! Counting canonical _k_-mers in read sets.
//!
//! The operational mode is restricted counting: only k-mers that exist as
//! keys in the database index are accumulated, everything else is dropped.
//! Unrestricted counting keeps every canonical k-mer and exists for
//! diagnostics.

use ahash::AHashMap;

use crate::db::KmerIndex;
use crate::kmer;

/// Canonical k-mer to occurrence count.
pub type KmerCounts = AHashMap<Vec<u8>, u32>;

/// Count of a k-mer's canonical form, 0 when absent or not canonicalizable.
pub fn kmer_depth(
    counts: &KmerCounts,
    kmer: &[u8],
) -> u32 {
    match kmer::canonical(kmer) {
        Some(canon) => counts.get(&canon).copied().unwrap_or(0),
        None => 0,
    }
}

/// Accumulate the indexed canonical k-mers of one read into `counts`.
///
/// Slides a window of width `index.k` over the read one base at a time.
/// Windows containing a character outside ACGT are skipped, as are windows
/// whose canonical form is not a key of `index`. Reads shorter than k
/// contribute nothing.
pub fn accumulate(
    counts: &mut KmerCounts,
    seq: &[u8],
    index: &KmerIndex,
) {
    if seq.len() < index.k {
        return;
    }
    for window in seq.windows(index.k) {
        let Some(canon) = kmer::canonical(window) else {
            continue;
        };
        if index.postings.contains_key(&canon) {
            *counts.entry(canon).or_insert(0) += 1;
        }
    }
}

/// Accumulate every canonical k-mer of one read into `counts`.
pub fn accumulate_all(
    counts: &mut KmerCounts,
    seq: &[u8],
    k: usize,
) {
    if seq.len() < k {
        return;
    }
    for window in seq.windows(k) {
        let Some(canon) = kmer::canonical(window) else {
            continue;
        };
        *counts.entry(canon).or_insert(0) += 1;
    }
}

/// Count the indexed canonical k-mers of a read set.
///
/// The result depends only on the multiset of reads, not their order.
pub fn count_reads<I, S>(
    reads: I,
    index: &KmerIndex,
) -> KmerCounts
where
    I: IntoIterator<Item = S>,
    S: AsRef<[u8]>,
{
    let mut counts = KmerCounts::default();
    for read in reads {
        accumulate(&mut counts, read.as_ref(), index);
    }
    counts
}

/// Count every canonical k-mer of a read set.
pub fn count_all_reads<I, S>(
    reads: I,
    k: usize,
) -> KmerCounts
where
    I: IntoIterator<Item = S>,
    S: AsRef<[u8]>,
{
    let mut counts = KmerCounts::default();
    for read in reads {
        accumulate_all(&mut counts, read.as_ref(), k);
    }
    counts
}

////////////////////////////////////////////////////////////////////////////////
// Tests
//
#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn toy_index() -> KmerIndex {
        db::build_index(&[("adk".to_string(), vec![b"AATCGGCTAA".to_vec()])], 5)
    }

    #[test]
    fn restricted_counting_drops_foreign_kmers() {
        let index = toy_index();
        let counts = count_reads([b"AATCGGCTAA".as_slice(), b"TTTTTTTTTT".as_slice()], &index);

        // Every counted k-mer is a key of the index.
        assert!(counts.keys().all(|kmer| index.postings.contains_key(kmer)));
        assert_eq!(kmer_depth(&counts, b"AATCG"), 1);
        assert_eq!(kmer_depth(&counts, b"TTTTT"), 0);
    }

    #[test]
    fn unrestricted_counting_keeps_everything() {
        let counts = count_all_reads([b"TTTTTTT".as_slice()], 5);
        // TTTTT canonicalizes to AAAAA; three windows in a 7-base read.
        assert_eq!(counts.get(b"AAAAA".as_slice()).copied(), Some(3));
    }

    #[test]
    fn reads_shorter_than_k_contribute_nothing() {
        let counts = count_all_reads([b"ACG".as_slice()], 5);
        assert!(counts.is_empty());
    }

    #[test]
    fn invalid_bases_skip_the_window() {
        // All five windows of the read contain the N.
        let counts = count_all_reads([b"ACGTNACGT".as_slice()], 5);
        assert!(counts.is_empty());
    }

    #[test]
    fn reverse_complement_reads_count_the_same() {
        let index = toy_index();
        let fwd = count_reads([b"AATCGGCTAA".as_slice()], &index);
        let rev = count_reads([crate::kmer::reverse_complement(b"AATCGGCTAA").unwrap()], &index);
        assert_eq!(fwd, rev);
    }
}
