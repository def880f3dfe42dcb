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
//! Writing call results into the tab-separated output streams.

use std::io::{self, Write};

use crate::call::SampleResult;

/// The calls table: one row per sample, one allele cell per locus, then
/// the sequence type and clonal complex.
pub fn write_calls<W: Write>(
    out: &mut W,
    loci: &[String],
    results: &[SampleResult],
) -> io::Result<()> {
    writeln!(out, "Sample\t{}\tST\tclonal_complex", loci.join("\t"))?;
    for result in results {
        let cells: Vec<String> = result
            .calls
            .iter()
            .map(|call| format!("{}{}", call.call.label(), call.call.flag()))
            .collect();
        writeln!(out, "{}\t{}\t{}\t{}", result.sample, cells.join("\t"), result.st, result.cc)?;
    }
    Ok(())
}

/// The per-locus coverage report.
pub fn write_coverage<W: Write>(
    out: &mut W,
    results: &[SampleResult],
) -> io::Result<()> {
    writeln!(out, "Sample\tLocus\tCoverage\tMinKmerDepth\tCall")?;
    for result in results {
        for call in &result.calls {
            writeln!(
                out,
                "{}\t{}\t{:.4}\t{}\t{}{}",
                result.sample,
                call.locus,
                call.call.coverage(),
                call.call.depth(),
                call.call.label(),
                call.call.flag()
            )?;
        }
    }
    Ok(())
}

/// FASTA of sequences flagged for manual review.
pub fn write_special_cases<W: Write>(
    out: &mut W,
    results: &[SampleResult],
) -> io::Result<()> {
    for result in results {
        for call in &result.calls {
            for check in &call.alleles_to_check {
                writeln!(out, ">{}_{} sample:{} {}", call.locus, check.label, result.sample, check.desc)?;
                out.write_all(&check.seq)?;
                writeln!(out)?;
            }
        }
    }
    Ok(())
}

/// True when any call carries a sequence to review.
pub fn has_special_cases(results: &[SampleResult]) -> bool {
    results.iter().any(|result| result.calls.iter().any(|call| !call.alleles_to_check.is_empty()))
}

/// The vote-only calls table, shaped like [write_calls] but built from
/// the highest-voted allele per locus regardless of coverage.
pub fn write_vote_calls<W: Write>(
    out: &mut W,
    loci: &[String],
    results: &[SampleResult],
) -> io::Result<()> {
    writeln!(out, "Sample\t{}\tST\tclonal_complex", loci.join("\t"))?;
    for result in results {
        let Some(votes) = &result.votes else {
            continue;
        };
        let cells: Vec<String> = votes.calls.iter().map(|call| call.best.clone()).collect();
        writeln!(out, "{}\t{}\t{}\t{}", result.sample, cells.join("\t"), votes.st, votes.cc)?;
    }
    Ok(())
}

/// Per-locus vote totals: `Sample, Locus, TotalLocusVotes, Allele(votes)...`.
pub fn write_vote_details<W: Write>(
    out: &mut W,
    loci: &[String],
    results: &[SampleResult],
) -> io::Result<()> {
    writeln!(out, "Sample\tLocus\tTotalLocusVotes\tAlleleVotes")?;
    for result in results {
        let Some(votes) = &result.votes else {
            continue;
        };
        for (locus, detail) in loci.iter().zip(votes.details.iter()) {
            let cells: Vec<String> =
                detail.top.iter().map(|(id, v)| format!("{}({})", id, v)).collect();
            writeln!(out, "{}\t{}\t{}\t{}", result.sample, locus, detail.total, cells.join("\t"))?;
        }
    }
    Ok(())
}

/// Loci whose top vote is shared by more than one allele.
pub fn write_ties<W: Write>(
    out: &mut W,
    loci: &[String],
    results: &[SampleResult],
) -> io::Result<()> {
    writeln!(out, "Sample\tLocus\tTiedAlleles")?;
    for result in results {
        let Some(votes) = &result.votes else {
            continue;
        };
        for (locus, call) in loci.iter().zip(votes.calls.iter()) {
            if call.ties.len() > 1 {
                writeln!(out, "{}\t{}\t{}", result.sample, locus, call.ties.join(","))?;
            }
        }
    }
    Ok(())
}

////////////////////////////////////////////////////////////////////////////////
// Tests
//
#[cfg(test)]
mod tests {
    use super::*;
    use crate::call::{AlleleCall, Call, CheckAllele, SampleResult, SampleVotes, VoteCall, VoteDetail};

    fn result() -> SampleResult {
        SampleResult {
            sample: "iso1".to_string(),
            calls: vec![
                AlleleCall {
                    locus: "adk".to_string(),
                    call: Call::Single { id: "4".to_string(), votes: 120, depth: 11 },
                    text: "Allele 4 fully covered at depth 11.".to_string(),
                    alleles_to_check: Vec::new(),
                },
                AlleleCall {
                    locus: "purA".to_string(),
                    call: Call::Partial { id: "7".to_string(), coverage: 0.8125, depth: 3, gaps: 1 },
                    text: "Partial match to allele 7.".to_string(),
                    alleles_to_check: vec![CheckAllele {
                        label: "7".to_string(),
                        desc: "partial template, coverage 0.8125".to_string(),
                        seq: b"ACGT".to_vec(),
                    }],
                },
            ],
            st: "11".to_string(),
            cc: "CC3".to_string(),
            votes: Some(SampleVotes {
                calls: vec![
                    VoteCall { best: "4".to_string(), votes: 120, ties: Vec::new() },
                    VoteCall {
                        best: "7".to_string(),
                        votes: 55,
                        ties: vec!["7".to_string(), "9".to_string()],
                    },
                ],
                st: "11".to_string(),
                cc: "CC3".to_string(),
                details: vec![
                    VoteDetail { total: 130, top: vec![("4".to_string(), 120), ("2".to_string(), -7)] },
                    VoteDetail { total: 60, top: vec![("7".to_string(), 55), ("9".to_string(), 55)] },
                ],
            }),
        }
    }

    fn loci() -> Vec<String> {
        vec!["adk".to_string(), "purA".to_string()]
    }

    #[test]
    fn calls_table_concatenates_label_and_flag() {
        let mut out = Vec::new();
        write_calls(&mut out, &loci(), &[result()]).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "Sample\tadk\tpurA\tST\tclonal_complex\niso1\t4\t7-\t11\tCC3\n");
    }

    #[test]
    fn coverage_report_has_one_row_per_locus() {
        let mut out = Vec::new();
        write_coverage(&mut out, &[result()]).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "iso1\tadk\t1.0000\t11\t4");
        assert_eq!(lines[2], "iso1\tpurA\t0.8125\t3\t7-");
    }

    #[test]
    fn special_cases_fasta_labels_locus_and_allele() {
        let results = [result()];
        assert!(has_special_cases(&results));

        let mut out = Vec::new();
        write_special_cases(&mut out, &results).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, ">purA_7 sample:iso1 partial template, coverage 0.8125\nACGT\n");
    }

    #[test]
    fn vote_streams_report_ties_and_details() {
        let results = [result()];

        let mut out = Vec::new();
        write_vote_calls(&mut out, &loci(), &results).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.ends_with("iso1\t4\t7\t11\tCC3\n"));

        let mut out = Vec::new();
        write_vote_details(&mut out, &loci(), &results).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("iso1\tadk\t130\t4(120)\t2(-7)"));

        let mut out = Vec::new();
        write_ties(&mut out, &loci(), &results).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1], "iso1\tpurA\t7,9");
    }
}
