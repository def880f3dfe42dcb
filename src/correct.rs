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
//! Correcting a template allele into a covered novel sequence.
//!
//! Walks the gaps of a template allele left to right, handing each one to
//! the gap coverer together with its flanking context and splicing the
//! covered fragment back into the sequence. Gaps the coverer cannot fix
//! are kept so the caller can downgrade the result to a partial call.

use crate::counts::KmerCounts;
use crate::coverage;
use crate::gap_cover::{self, Mutation};

/// A reconstructed allele that is not in the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NovelAllele {
    /// External id of the template allele the sequence was derived from.
    pub template: String,
    /// The corrected sequence.
    pub seq: Vec<u8>,
    /// Total mutation count across all corrected gaps.
    pub n_mut: usize,
    /// Mutation events in template coordinates.
    pub mutations: Vec<Mutation>,
    /// Maximum gap-cover depth over the corrected gaps, 0 if none succeeded.
    pub depth: u32,
    /// Gaps the coverer could not fix, as reported during correction.
    pub uncorrected: Vec<(usize, usize)>,
}

impl NovelAllele {
    /// Compact description of the mutations, e.g. `S6:C->G,I12:A`.
    pub fn describe_mutations(&self) -> String {
        self.mutations.iter().map(|m| m.to_string()).collect::<Vec<_>>().join(",")
    }
}

/// Correct every gap of `template` against the count table.
///
/// Gaps are re-detected after each correction because covering one gap
/// shifts the positions of everything behind it. `current_skip` tracks the
/// first k-mer position that has not been processed yet, so corrected
/// regions are not revisited. The returned [NovelAllele] has an empty
/// `template` id; the caller fills it in.
pub fn correct_template(
    template: &[u8],
    counts: &KmerCounts,
    k: usize,
    threshold: u32,
    max_mutations: usize,
) -> NovelAllele {
    let mut corrected = template.to_vec();
    let mut current_skip: usize = 1;
    let mut mutations: Vec<Mutation> = Vec::new();
    let mut n_mut = 0;
    let mut depth: u32 = 0;
    let mut uncorrected: Vec<(usize, usize)> = Vec::new();

    loop {
        let detected = coverage::analyze_from(&corrected, counts, k, threshold, current_skip);
        let Some(&(start, end)) = detected.gaps.first() else {
            break;
        };

        // The fragment is the gap plus the context the coverer needs on
        // both sides: one base before the first uncovered k-mer and the
        // full extent of the last uncovered k-mer plus one.
        let adj_start = start.saturating_sub(1).max(1);
        let adj_end = (end + k).min(corrected.len());
        let fragment = &corrected[adj_start - 1..adj_end];

        match gap_cover::cover_gap(fragment, counts, k, threshold, max_mutations) {
            Some(cover) => {
                let mut spliced = corrected[..adj_start - 1].to_vec();
                spliced.extend_from_slice(&cover.seq);
                spliced.extend_from_slice(&corrected[adj_end..]);
                corrected = spliced;

                current_skip = adj_start + cover.seq.len() - k;
                n_mut += cover.n_mut;
                depth = depth.max(cover.min_depth);
                mutations.extend(cover.events.into_iter().map(|event| event.rebase(adj_start - 1)));
            }
            None => {
                uncorrected.push((start, end));
                current_skip = end + 1;
            }
        }
    }

    NovelAllele {
        template: String::new(),
        seq: corrected,
        n_mut,
        mutations,
        depth,
        uncorrected,
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
//
#[cfg(test)]
mod tests {
    use super::*;
    use crate::counts::count_all_reads;
    use crate::coverage;
    use crate::gap_cover::Mutation;

    const K: usize = 5;

    #[test]
    fn single_substitution_is_corrected() {
        let template = b"AATCGGCTAAGCTGGATCACTTGCA".to_vec();
        let mut observed = template.clone();
        observed[12] = b'C';
        let counts = count_all_reads([&observed, &observed], K);

        let novel = correct_template(&template, &counts, K, 2, 3);
        assert_eq!(novel.seq, observed);
        assert_eq!(novel.n_mut, 1);
        assert_eq!(novel.mutations, vec![Mutation::Substitution { pos: 13, from: b'T', to: b'C' }]);
        assert!(novel.uncorrected.is_empty());

        // A novel allele without uncorrected gaps is fully covered.
        let check = coverage::analyze(&novel.seq, &counts, K, 2);
        assert_eq!(check.uncovered, 0);
    }

    #[test]
    fn distant_mutations_are_corrected_one_gap_at_a_time() {
        let template = b"TTAGTTGTGCCGCAGCGAAGTAGTGCTTGAAATAT".to_vec();
        let mut observed = template.clone();
        observed[9] = b'G';
        observed[25] = b'A';
        let counts = count_all_reads([&observed, &observed], K);

        let novel = correct_template(&template, &counts, K, 2, 3);
        assert_eq!(novel.seq, observed);
        assert_eq!(novel.n_mut, 2);
        // Events are rebased into template coordinates.
        assert_eq!(
            novel.mutations,
            vec![
                Mutation::Substitution { pos: 10, from: b'C', to: b'G' },
                Mutation::Substitution { pos: 26, from: b'C', to: b'A' },
            ]
        );
        assert!(novel.uncorrected.is_empty());
    }

    #[test]
    fn deletion_shortens_the_corrected_sequence() {
        let template = b"AATCGGCTAAGCTGGATCACTTGCA".to_vec();
        let mut observed = template.clone();
        observed.remove(12);
        let counts = count_all_reads([&observed, &observed], K);

        let novel = correct_template(&template, &counts, K, 2, 3);
        assert_eq!(novel.seq, observed);
        assert_eq!(novel.n_mut, 1);
        assert!(matches!(novel.mutations[0], Mutation::Deletion { len: 1, .. }));
    }

    #[test]
    fn hopeless_gap_is_reported_uncorrected() {
        let template = b"AATCGGCTAAGCTGGATCACTTGCA".to_vec();
        // Reads support only the flanks of the template, nothing bridges
        // the middle, and no variant k-mers exist to edit towards.
        let counts = count_all_reads([&template[..10], &template[15..]], K);

        let novel = correct_template(&template, &counts, K, 1, 2);
        assert_eq!(novel.seq, template);
        assert_eq!(novel.n_mut, 0);
        assert!(!novel.uncorrected.is_empty());
        assert_eq!(novel.depth, 0);
    }

    #[test]
    fn mutation_description_is_joined() {
        let novel = NovelAllele {
            template: "12".to_string(),
            seq: b"ACGT".to_vec(),
            n_mut: 2,
            mutations: vec![
                Mutation::Substitution { pos: 6, from: b'C', to: b'G' },
                Mutation::Insertion { pos: 9, base: b'A' },
            ],
            depth: 11,
            uncorrected: Vec::new(),
        };
        assert_eq!(novel.describe_mutations(), "S6:C->G,I9:A");
    }
}
