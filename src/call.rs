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
//! Per-locus allele calling.
//!
//! Orchestrates voting, coverage analysis and template correction into a
//! single verdict per locus. The verdict is a sum type: absence and poor
//! coverage are ordinary outcomes, never errors.

use std::cmp::Reverse;

use crate::correct::{self, NovelAllele};
use crate::counts::KmerCounts;
use crate::coverage::{self, Coverage, NO_DEPTH};
use crate::db::Locus;

/// Calling parameters.
#[derive(Debug, Clone)]
pub struct CallOpts {
    /// Depth at which a k-mer position counts as covered.
    pub kmer_thr: u32,
    /// Depth used inside gap covering and template correction.
    pub gap_thr: u32,
    /// Mutation budget per gap.
    pub max_mutations: usize,
    /// How many top-voted alleles are examined per locus.
    pub max_candidates: usize,
}

impl Default for CallOpts {
    fn default() -> CallOpts {
        CallOpts { kmer_thr: 6, gap_thr: 8, max_mutations: 5, max_candidates: 10 }
    }
}

/// A fully covered allele listed in a [Call::Multiple].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoveredAllele {
    pub id: String,
    pub depth: u32,
    pub votes: i64,
}

/// Outcome of calling one locus.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    /// No k-mer evidence for the locus at all.
    Absent,
    /// Exactly one known allele is fully covered.
    Single { id: String, votes: i64, depth: u32 },
    /// More than one known allele is fully covered; the highest-voted
    /// comes first.
    Multiple { covered: Vec<CoveredAllele> },
    /// A novel allele reconstructed from the closest template.
    Novel { novel: NovelAllele },
    /// The best template kept gaps the corrector could not cover.
    Partial { id: String, coverage: f64, depth: u32, gaps: usize },
    /// Even the best candidate is too far from covered to attempt
    /// correction.
    Uncovered { id: String, coverage: f64, depth: u32, uncovered: usize },
}

impl Call {
    /// The allele cell of the calls table: an external id, `"0"` for
    /// absent, or `"N"` for novel.
    pub fn label(&self) -> &str {
        match self {
            Call::Absent => "0",
            Call::Single { id, .. } => id,
            Call::Multiple { covered } => &covered[0].id,
            Call::Novel { .. } => "N",
            Call::Partial { id, .. } => id,
            Call::Uncovered { .. } => "0",
        }
    }

    pub fn flag(&self) -> &'static str {
        match self {
            Call::Absent | Call::Single { .. } | Call::Novel { .. } => "",
            Call::Multiple { .. } => "+",
            Call::Partial { .. } => "-",
            Call::Uncovered { .. } => "?",
        }
    }

    /// Fraction of supported k-mer positions behind the call.
    pub fn coverage(&self) -> f64 {
        match self {
            Call::Absent => 0.0,
            Call::Single { .. } | Call::Multiple { .. } | Call::Novel { .. } => 1.0,
            Call::Partial { coverage, .. } | Call::Uncovered { coverage, .. } => *coverage,
        }
    }

    pub fn depth(&self) -> u32 {
        match self {
            Call::Absent => 0,
            Call::Single { depth, .. } => *depth,
            Call::Multiple { covered } => covered[0].depth,
            Call::Novel { novel } => novel.depth,
            Call::Partial { depth, .. } => *depth,
            Call::Uncovered { depth, .. } => *depth,
        }
    }

    pub fn novel(&self) -> Option<&NovelAllele> {
        match self {
            Call::Novel { novel } => Some(novel),
            _ => None,
        }
    }
}

/// A sequence flagged for manual review in the special-cases output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckAllele {
    /// Label half of the FASTA header, e.g. an allele id or `"N"`.
    pub label: String,
    pub desc: String,
    pub seq: Vec<u8>,
}

/// A called locus: the outcome plus everything the writers need.
#[derive(Debug, Clone)]
pub struct AlleleCall {
    pub locus: String,
    pub call: Call,
    pub text: String,
    pub alleles_to_check: Vec<CheckAllele>,
}

/// One locus's top-voted allele, ignoring coverage entirely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteCall {
    pub best: String,
    pub votes: i64,
    /// External ids sharing the top vote; empty unless there is a tie.
    pub ties: Vec<String>,
}

/// Per-locus vote totals for the diagnostic vote output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteDetail {
    pub total: u64,
    /// `(external id, votes)` for the top-voted alleles, best first.
    pub top: Vec<(String, i64)>,
}

/// Everything called for one sample.
#[derive(Debug, Clone)]
pub struct SampleResult {
    pub sample: String,
    pub calls: Vec<AlleleCall>,
    pub st: String,
    pub cc: String,
    pub votes: Option<SampleVotes>,
}

/// The vote-only view of one sample.
#[derive(Debug, Clone)]
pub struct SampleVotes {
    pub calls: Vec<VoteCall>,
    pub st: String,
    pub cc: String,
    pub details: Vec<VoteDetail>,
}

/// One ranked candidate during calling.
struct Candidate {
    /// 1-based internal allele index.
    allele: usize,
    votes: i64,
    coverage: Coverage,
}

/// Call one locus.
///
/// `sequences[i - 1]` is the sequence of internal allele `i`, `votes` the
/// locus's row of the vote tally. The decision ladder is: absent when the
/// locus has no votes, then single/multiple when known alleles are fully
/// covered, then an uncovered verdict when even the closest template is
/// beyond the mutation budget, and otherwise novel reconstruction with a
/// partial call as the fallback.
pub fn call_locus(
    locus: &Locus,
    sequences: &[Vec<u8>],
    votes: &[i64],
    locus_votes: u64,
    counts: &KmerCounts,
    k: usize,
    opts: &CallOpts,
) -> AlleleCall {
    if locus_votes == 0 {
        return absent(locus);
    }

    // Rank alleles by vote; the sort is stable so ties keep allele order.
    let mut ranked: Vec<usize> = (1..=votes.len()).collect();
    ranked.sort_by_key(|allele| Reverse(votes[allele - 1]));
    ranked.truncate(opts.max_candidates);

    let mut candidates: Vec<Candidate> = ranked
        .iter()
        .map(|&allele| Candidate {
            allele,
            votes: votes[allele - 1],
            coverage: coverage::analyze(&sequences[allele - 1], counts, k, opts.kmer_thr),
        })
        .collect();
    // A sequence too short to produce a k-mer is not a callable candidate.
    candidates.retain(|c| c.coverage.covered + c.coverage.uncovered > 0);
    if candidates.is_empty() {
        return absent(locus);
    }

    let covered: Vec<&Candidate> = candidates.iter().filter(|c| c.coverage.fully_covered()).collect();
    if covered.len() == 1 {
        return single(locus, covered[0]);
    }
    if covered.len() > 1 {
        return multiple(locus, &covered, sequences);
    }

    // Nothing fully covered; the closest candidate decides between novel
    // reconstruction and an uncovered verdict.
    candidates.sort_by_key(|c| c.coverage.uncovered);
    if candidates[0].coverage.uncovered > k * opts.max_mutations {
        return uncovered(locus, &candidates[0], sequences);
    }

    // Correct the templates with the fewest gaps and keep the best result.
    candidates.sort_by_key(|c| (c.coverage.gaps.len(), Reverse(c.votes)));
    let fewest_gaps = candidates[0].coverage.gaps.len();
    let mut corrected: Vec<(usize, NovelAllele)> = Vec::new();
    for (idx, candidate) in candidates.iter().enumerate() {
        if candidate.coverage.gaps.len() != fewest_gaps {
            break;
        }
        let novel = correct::correct_template(
            &sequences[candidate.allele - 1],
            counts,
            k,
            opts.gap_thr,
            opts.max_mutations,
        );
        corrected.push((idx, novel));
    }
    corrected.sort_by_key(|(idx, novel)| {
        (novel.uncorrected.len(), novel.n_mut, Reverse(candidates[*idx].votes))
    });

    let (idx, mut novel) = corrected.swap_remove(0);
    let template = &candidates[idx];
    novel.template = locus.allele_ids[template.allele - 1].clone();
    if novel.uncorrected.is_empty() {
        novel_call(locus, novel, template, sequences)
    } else {
        partial(locus, novel, template, sequences)
    }
}

/// The highest-voted allele of a locus, with ties, ignoring coverage.
pub fn vote_call(
    locus: &Locus,
    votes: &[i64],
    locus_votes: u64,
) -> VoteCall {
    if locus_votes == 0 || votes.is_empty() {
        return VoteCall { best: "0".to_string(), votes: 0, ties: Vec::new() };
    }
    let top = *votes.iter().max().expect("nonempty votes");
    let tied: Vec<String> = votes
        .iter()
        .enumerate()
        .filter(|(_, v)| **v == top)
        .map(|(idx, _)| locus.allele_ids[idx].clone())
        .collect();
    VoteCall {
        best: tied[0].clone(),
        votes: top,
        ties: if tied.len() > 1 { tied } else { Vec::new() },
    }
}

/// Vote totals for the diagnostic vote output, top `limit` alleles.
pub fn vote_detail(
    locus: &Locus,
    votes: &[i64],
    locus_votes: u64,
    limit: usize,
) -> VoteDetail {
    let mut ranked: Vec<usize> = (0..votes.len()).collect();
    ranked.sort_by_key(|&idx| Reverse(votes[idx]));
    ranked.truncate(limit);
    VoteDetail {
        total: locus_votes,
        top: ranked.into_iter().map(|idx| (locus.allele_ids[idx].clone(), votes[idx])).collect(),
    }
}

fn absent(locus: &Locus) -> AlleleCall {
    AlleleCall {
        locus: locus.name.clone(),
        call: Call::Absent,
        text: "Not present, no kmers found.".to_string(),
        alleles_to_check: Vec::new(),
    }
}

fn single(locus: &Locus, candidate: &Candidate) -> AlleleCall {
    let id = locus.allele_ids[candidate.allele - 1].clone();
    let mut text = format!("Allele {} fully covered at depth {}.", id, candidate.coverage.min_depth);
    if candidate.votes < 0 {
        text.push_str(&format!(" Warning: negative votes ({}).", candidate.votes));
    }
    AlleleCall {
        locus: locus.name.clone(),
        call: Call::Single { id, votes: candidate.votes, depth: candidate.coverage.min_depth },
        text,
        alleles_to_check: Vec::new(),
    }
}

fn multiple(locus: &Locus, covered: &[&Candidate], sequences: &[Vec<u8>]) -> AlleleCall {
    let entries: Vec<CoveredAllele> = covered
        .iter()
        .map(|c| CoveredAllele {
            id: locus.allele_ids[c.allele - 1].clone(),
            depth: c.coverage.min_depth,
            votes: c.votes,
        })
        .collect();
    let listing = entries
        .iter()
        .map(|e| format!("{} (depth {}, votes {})", e.id, e.depth, e.votes))
        .collect::<Vec<_>>()
        .join(", ");
    let alleles_to_check = covered
        .iter()
        .zip(entries.iter())
        .map(|(c, e)| CheckAllele {
            label: e.id.clone(),
            desc: format!("fully covered, depth {}, votes {}", e.depth, e.votes),
            seq: sequences[c.allele - 1].clone(),
        })
        .collect();
    AlleleCall {
        locus: locus.name.clone(),
        call: Call::Multiple { covered: entries },
        text: format!("Multiple fully covered alleles: {}.", listing),
        alleles_to_check,
    }
}

fn uncovered(locus: &Locus, best: &Candidate, sequences: &[Vec<u8>]) -> AlleleCall {
    let id = locus.allele_ids[best.allele - 1].clone();
    let coverage = round4(best.coverage.fraction());
    let depth = if best.coverage.min_depth == NO_DEPTH { 0 } else { best.coverage.min_depth };
    let text = format!(
        "Not present; best candidate {} is below the coverage threshold ({} uncovered kmers).",
        id, best.coverage.uncovered
    );
    AlleleCall {
        locus: locus.name.clone(),
        call: Call::Uncovered { id: id.clone(), coverage, depth, uncovered: best.coverage.uncovered },
        text,
        alleles_to_check: vec![CheckAllele {
            label: id,
            desc: format!("best partial candidate, coverage {:.4}", coverage),
            seq: sequences[best.allele - 1].clone(),
        }],
    }
}

fn novel_call(
    locus: &Locus,
    novel: NovelAllele,
    template: &Candidate,
    sequences: &[Vec<u8>],
) -> AlleleCall {
    let desc = novel.describe_mutations();
    let text = format!(
        "Novel allele from template {}, {} mutation(s): {}.",
        novel.template, novel.n_mut, desc
    );
    let alleles_to_check = vec![
        CheckAllele {
            label: novel.template.clone(),
            desc: "template for novel allele".to_string(),
            seq: sequences[template.allele - 1].clone(),
        },
        CheckAllele {
            label: "N".to_string(),
            desc: format!("novel, mutations: {}", desc),
            seq: novel.seq.clone(),
        },
    ];
    AlleleCall {
        locus: locus.name.clone(),
        call: Call::Novel { novel },
        text,
        alleles_to_check,
    }
}

fn partial(
    locus: &Locus,
    novel: NovelAllele,
    template: &Candidate,
    sequences: &[Vec<u8>],
) -> AlleleCall {
    let id = locus.allele_ids[template.allele - 1].clone();
    let coverage = round4(template.coverage.fraction());
    let text = format!(
        "Partial match to allele {}, coverage {:.4}, {} uncorrectable gap(s).",
        id,
        coverage,
        novel.uncorrected.len()
    );
    AlleleCall {
        locus: locus.name.clone(),
        call: Call::Partial { id: id.clone(), coverage, depth: novel.depth, gaps: novel.uncorrected.len() },
        text,
        alleles_to_check: vec![CheckAllele {
            label: id,
            desc: format!("partial template, coverage {:.4}", coverage),
            seq: sequences[template.allele - 1].clone(),
        }],
    }
}

fn round4(value: f64) -> f64 {
    (value * 10000.0).round() / 10000.0
}
