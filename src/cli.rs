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
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(version)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    // Build an allele database from per-locus fasta files
    Index {
        // One fasta file of alleles per locus
        #[arg(group = "input", required = true)]
        locus_files: Vec<String>,

        // Outputs
        #[arg(short = 'o', long = "output", required = true, help_heading = "Output")]
        output: String,

        // Parameters
        #[arg(short = 'k', long = "kmer-size", default_value_t = 31)]
        kmer_size: usize,

        // Sequence type profile table
        #[arg(long = "profile", required = false)]
        profile: Option<String>,

        // Verbosity
        #[arg(long = "verbose", default_value_t = false)]
        verbose: bool,
    },

    // Call alleles and sequence types from read sets
    Call {
        // Input fasta or fastq read file(s), grouped into samples by name
        #[arg(group = "input")]
        read_files: Vec<String>,

        // Paired input as explicit forward/reverse lists
        #[arg(short = '1', long = "reads-1", num_args = 1.., help_heading = "Input")]
        reads_1: Vec<String>,
        #[arg(short = '2', long = "reads-2", num_args = 1.., help_heading = "Input")]
        reads_2: Vec<String>,

        // Database
        #[arg(short = 'd', long = "db", required = true, help_heading = "Index")]
        db_path: String,

        // Outputs
        #[arg(short = 'o', long = "out-prefix", required = false, help_heading = "Output")]
        out_prefix: Option<String>,
        #[arg(long = "output-special-cases", default_value_t = false, help_heading = "Output")]
        output_special_cases: bool,
        #[arg(long = "output-votes", default_value_t = false, help_heading = "Output")]
        output_votes: bool,

        // Parameters
        // // Coverage threshold for calling
        #[arg(long = "kmer-thr", default_value_t = 6)]
        kmer_thr: u32,
        // // Coverage threshold inside gap correction
        #[arg(long = "gap-thr", default_value_t = 8)]
        gap_thr: u32,
        // // Mutation budget per gap
        #[arg(short = 'm', long = "max-mutations", default_value_t = 5)]
        max_mutations: usize,

        // Resources
        // // Threads
        #[arg(short = 't', long = "threads", default_value_t = 1)]
        num_threads: usize,

        // Verbosity
        #[arg(long = "verbose", default_value_t = false)]
        verbose: bool,
    },
}
