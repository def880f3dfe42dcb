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
use std::io::Write;

use clap::Parser;
use log::{error, info, warn};
use rayon::iter::IntoParallelRefIterator;
use rayon::iter::ParallelIterator;

use kmlst::call::{CallOpts, SampleResult};
use kmlst::{db, format, io as seqio, Error};

// Command-line interface
mod cli;

/// Initializes the logger with verbosity given in `log_max_level`.
fn init_log(log_max_level: usize) {
    stderrlog::new()
        .module(module_path!())
        .quiet(false)
        .verbosity(log_max_level)
        .timestamp(stderrlog::Timestamp::Off)
        .init()
        .unwrap();
}

/// Use `kmlst` to list the available commands or `kmlst <command>` to run.
///
/// # Input format detection
/// The sequence data is read using
/// [needletail::parser::parse_fastx_file](https://docs.rs/needletail/latest/needletail/parser/fn.parse_fastx_file.html).
///
/// Input file format (fasta or fastq) is detected automatically and
/// the files may be compressed in a
/// [DEFLATE-based](https://en.wikipedia.org/wiki/Deflate) format (.gz
/// files).
///
fn main() {
    let cli = cli::Cli::parse();

    // Subcommands:
    match &cli.command {
        Some(cli::Commands::Index { locus_files, output, kmer_size, profile, verbose }) => {
            init_log(if *verbose { 2 } else { 1 });

            info!("Building database from {} loci at k = {}...", locus_files.len(), kmer_size);
            let result = db::build(locus_files, *kmer_size, profile.as_deref())
                .and_then(|database| {
                    info!("Serializing database to {} ...", output);
                    db::save(&database, output)
                });
            if let Err(err) = result {
                error!("{}", err);
                std::process::exit(1);
            }
        }

        Some(cli::Commands::Call {
            read_files,
            reads_1,
            reads_2,
            db_path,
            out_prefix,
            output_special_cases,
            output_votes,
            kmer_thr,
            gap_thr,
            max_mutations,
            num_threads,
            verbose,
        }) => {
            init_log(if *verbose { 2 } else { 1 });

            let opts = CallOpts {
                kmer_thr: *kmer_thr,
                gap_thr: *gap_thr,
                max_mutations: *max_mutations,
                ..CallOpts::default()
            };

            rayon::ThreadPoolBuilder::new()
                .num_threads(*num_threads)
                .thread_name(|i| format!("rayon-thread-{}", i))
                .build_global()
                .unwrap();

            let result = run_call(
                read_files,
                reads_1,
                reads_2,
                db_path,
                out_prefix.as_deref(),
                *output_special_cases,
                *output_votes,
                &opts,
            );
            if let Err(err) = result {
                error!("{}", err);
                std::process::exit(1);
            }
        }

        None => {}
    }
}

#[allow(clippy::too_many_arguments)]
fn run_call(
    read_files: &[String],
    reads_1: &[String],
    reads_2: &[String],
    db_path: &str,
    out_prefix: Option<&str>,
    output_special_cases: bool,
    output_votes: bool,
    opts: &CallOpts,
) -> Result<(), Error> {
    info!("Loading database from {} ...", db_path);
    let database = db::load(db_path)?;
    info!(
        "Database has {} loci, {} indexed k-mers, k = {}",
        database.loci.len(),
        database.index.postings.len(),
        database.k()
    );

    let samples = seqio::group_samples(read_files, reads_1, reads_2)?;
    info!("Calling {} sample(s)...", samples.len());

    let results: Result<Vec<SampleResult>, Error> = samples
        .par_iter()
        .map(|sample| kmlst::call_sample(&database, &sample.name, &sample.files, opts, output_votes))
        .collect();
    let results = results?;

    let loci: Vec<String> = database.loci.iter().map(|locus| locus.name.clone()).collect();
    write_outputs(&loci, &results, out_prefix, output_special_cases, output_votes)
}

fn write_outputs(
    loci: &[String],
    results: &[SampleResult],
    out_prefix: Option<&str>,
    output_special_cases: bool,
    output_votes: bool,
) -> Result<(), Error> {
    let Some(prefix) = out_prefix else {
        // Without a prefix only the calls table is written, to stdout.
        if output_special_cases || output_votes {
            warn!("Special-case and vote outputs need -o/--out-prefix, skipping them");
        }
        let stdout = std::io::stdout();
        format::write_calls(&mut stdout.lock(), loci, results)?;
        return Ok(());
    };

    let mut calls = create(prefix, "calls.tsv")?;
    format::write_calls(&mut calls, loci, results)?;
    calls.flush()?;

    let mut coverage = create(prefix, "coverage.tsv")?;
    format::write_coverage(&mut coverage, results)?;
    coverage.flush()?;

    if output_special_cases && format::has_special_cases(results) {
        let mut special = create(prefix, "special.fa")?;
        format::write_special_cases(&mut special, results)?;
        special.flush()?;
    }

    if output_votes {
        let mut vote_calls = create(prefix, "vote_calls.tsv")?;
        format::write_vote_calls(&mut vote_calls, loci, results)?;
        vote_calls.flush()?;

        let mut details = create(prefix, "vote_details.tsv")?;
        format::write_vote_details(&mut details, loci, results)?;
        details.flush()?;

        let mut ties = create(prefix, "ties.tsv")?;
        format::write_ties(&mut ties, loci, results)?;
        ties.flush()?;
    }

    Ok(())
}

fn create(prefix: &str, suffix: &str) -> Result<std::io::BufWriter<std::fs::File>, Error> {
    let path = format!("{}.{}", prefix, suffix);
    info!("Writing {} ...", path);
    let file = std::fs::File::create(&path)?;
    Ok(std::io::BufWriter::new(file))
}
