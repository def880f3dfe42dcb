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
//! k-mer based multilocus sequence typing from short-read data.
//!
//! Reads are decomposed into canonical k-mers and counted against a
//! precompiled database of known alleles. Counts turn into per-allele
//! votes, the top-voted candidates are checked for full k-mer coverage,
//! and candidates with gaps are handed to a bounded mutation search that
//! either reconstructs a covered novel allele or reports the closest
//! template as partial. A profile table maps the called allele
//! combination to a sequence type.

use log::info;

pub mod call;
pub mod correct;
pub mod counts;
pub mod coverage;
pub mod db;
pub mod error;
pub mod format;
pub mod gap_cover;
pub mod io;
pub mod kmer;
pub mod profile;
pub mod votes;

pub use error::Error;

use call::{AlleleCall, CallOpts, SampleResult, SampleVotes};
use db::Database;

/// How many alleles the vote-detail output lists per locus.
const VOTE_DETAIL_LIMIT: usize = 20;

/// Count, vote, and call every locus of `db` against one sample's reads.
///
/// Read files are streamed one record at a time; only k-mers present in
/// the database index are counted. Allele sequences are loaded from the
/// per-locus FASTA recorded in the database, and only for loci with vote
/// evidence. With `with_votes` the result also carries the diagnostic
/// vote-only view.
pub fn call_sample(
    db: &Database,
    sample: &str,
    read_files: &[String],
    opts: &CallOpts,
    with_votes: bool,
) -> Result<SampleResult, Error> {
    let mut kmer_counts = counts::KmerCounts::default();
    for file in read_files {
        io::each_read(file, |seq| counts::accumulate(&mut kmer_counts, seq, &db.index))?;
    }
    info!("{}: {} distinct indexed k-mers observed", sample, kmer_counts.len());

    let tally = votes::tally(&kmer_counts, &db.index, &db.allele_counts());

    let mut calls: Vec<AlleleCall> = Vec::with_capacity(db.loci.len());
    for (locus_idx, locus) in db.loci.iter().enumerate() {
        if tally.locus_votes[locus_idx] == 0 {
            calls.push(call::call_locus(
                locus,
                &[],
                &tally.votes[locus_idx],
                0,
                &kmer_counts,
                db.k(),
                opts,
            ));
            continue;
        }
        // Allele sequences are only materialized for loci with evidence.
        let sequences: Vec<Vec<u8>> = io::read_fasta_records(&locus.fasta.to_string_lossy())?
            .into_iter()
            .map(|(_, seq)| seq)
            .collect();
        calls.push(call::call_locus(
            locus,
            &sequences,
            &tally.votes[locus_idx],
            tally.locus_votes[locus_idx],
            &kmer_counts,
            db.k(),
            opts,
        ));
    }

    let genotype: Vec<String> = calls.iter().map(|call| call.call.label().to_string()).collect();
    let (st, cc) = match &db.profiles {
        Some(profiles) => profiles.lookup(&genotype),
        None => ("0".to_string(), String::new()),
    };

    let votes = with_votes.then(|| {
        let calls: Vec<call::VoteCall> = db
            .loci
            .iter()
            .enumerate()
            .map(|(idx, locus)| call::vote_call(locus, &tally.votes[idx], tally.locus_votes[idx]))
            .collect();
        let genotype: Vec<String> = calls.iter().map(|call| call.best.clone()).collect();
        let (st, cc) = match &db.profiles {
            Some(profiles) => profiles.lookup(&genotype),
            None => ("0".to_string(), String::new()),
        };
        let details = db
            .loci
            .iter()
            .enumerate()
            .map(|(idx, locus)| {
                call::vote_detail(locus, &tally.votes[idx], tally.locus_votes[idx], VOTE_DETAIL_LIMIT)
            })
            .collect();
        SampleVotes { calls, st, cc, details }
    });

    Ok(SampleResult { sample: sample.to_string(), calls, st, cc, votes })
}
