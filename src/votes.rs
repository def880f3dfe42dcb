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
//! Aggregating k-mer counts into locus and allele votes.

use crate::counts::KmerCounts;
use crate::db::KmerIndex;

/// Vote totals produced by joining a count table against the k-mer index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteTally {
    /// `votes[locus][allele - 1]`: sum of `weight * count` over the k-mers
    /// whose postings list the allele. Negative weights let a k-mer vote
    /// against alleles, so totals may go negative.
    pub votes: Vec<Vec<i64>>,
    /// `locus_votes[locus]`: sum of `|weight| * count` over the k-mers with
    /// a posting for the locus. Zero means no evidence for the locus at all.
    pub locus_votes: Vec<u64>,
}

/// Join `counts` against `index`, accumulating votes for every locus.
///
/// `allele_counts[locus]` is the number of alleles the locus has; the
/// result is dense over all (locus, allele) pairs. The tally is a pure
/// function of the multiset of (k-mer, count) pairs: iteration order of
/// the count table does not affect it.
pub fn tally(
    counts: &KmerCounts,
    index: &KmerIndex,
    allele_counts: &[usize],
) -> VoteTally {
    let mut votes: Vec<Vec<i64>> = allele_counts.iter().map(|n| vec![0; *n]).collect();
    let mut locus_votes: Vec<u64> = vec![0; allele_counts.len()];

    for (kmer, count) in counts {
        let Some(postings) = index.postings.get(kmer) else {
            continue;
        };
        for posting in postings {
            let vote = posting.weight as i64 * *count as i64;
            locus_votes[posting.locus as usize] += vote.unsigned_abs();
            for allele in &posting.alleles {
                votes[posting.locus as usize][*allele as usize - 1] += vote;
            }
        }
    }

    VoteTally { votes, locus_votes }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
//
#[cfg(test)]
mod tests {
    use super::*;
    use crate::counts::KmerCounts;
    use crate::db::{KmerIndex, Posting};

    fn index_with(postings: Vec<(&[u8], Vec<Posting>)>) -> KmerIndex {
        KmerIndex {
            k: 5,
            postings: postings.into_iter().map(|(kmer, p)| (kmer.to_vec(), p)).collect(),
        }
    }

    #[test]
    fn positive_and_negative_weights_accumulate() {
        let index = index_with(vec![
            (b"AAACG", vec![Posting { locus: 0, weight: 1, alleles: vec![1, 2] }]),
            (b"AACGT", vec![Posting { locus: 0, weight: -1, alleles: vec![3] }]),
        ]);
        let mut counts = KmerCounts::default();
        counts.insert(b"AAACG".to_vec(), 4);
        counts.insert(b"AACGT".to_vec(), 3);

        let tally = tally(&counts, &index, &[3]);
        assert_eq!(tally.votes[0], vec![4, 4, -3]);
        assert_eq!(tally.locus_votes[0], 7);
    }

    #[test]
    fn locus_votes_bound_allele_votes() {
        let index = index_with(vec![
            (b"AAACG", vec![Posting { locus: 0, weight: 2, alleles: vec![1] }]),
            (b"AACGT", vec![Posting { locus: 0, weight: -1, alleles: vec![1, 2] }]),
        ]);
        let mut counts = KmerCounts::default();
        counts.insert(b"AAACG".to_vec(), 5);
        counts.insert(b"AACGT".to_vec(), 2);

        let tally = tally(&counts, &index, &[2]);
        for allele_votes in &tally.votes[0] {
            assert!(tally.locus_votes[0] >= allele_votes.unsigned_abs());
        }
    }

    #[test]
    fn tally_is_iteration_order_insensitive() {
        let index = index_with(vec![
            (b"AAACG", vec![Posting { locus: 0, weight: 1, alleles: vec![1] }]),
            (b"AACGT", vec![Posting { locus: 1, weight: -1, alleles: vec![1] }]),
            (b"AAGGT", vec![Posting { locus: 1, weight: 1, alleles: vec![2] }]),
        ]);

        let mut forward = KmerCounts::default();
        forward.insert(b"AAACG".to_vec(), 1);
        forward.insert(b"AACGT".to_vec(), 2);
        forward.insert(b"AAGGT".to_vec(), 3);

        let mut backward = KmerCounts::default();
        backward.insert(b"AAGGT".to_vec(), 3);
        backward.insert(b"AACGT".to_vec(), 2);
        backward.insert(b"AAACG".to_vec(), 1);

        assert_eq!(tally(&forward, &index, &[1, 2]), tally(&backward, &index, &[1, 2]));
    }

    #[test]
    fn unindexed_counts_are_ignored() {
        let index = index_with(vec![(b"AAACG", vec![Posting { locus: 0, weight: 1, alleles: vec![1] }])]);
        let mut counts = KmerCounts::default();
        counts.insert(b"CCCCC".to_vec(), 10);

        let tally = tally(&counts, &index, &[1]);
        assert_eq!(tally.locus_votes[0], 0);
        assert_eq!(tally.votes[0], vec![0]);
    }
}
