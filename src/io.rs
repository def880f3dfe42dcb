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
//! Sequence input and read-file grouping.
//!
//! File format (fasta or fastq) and gzip compression are detected by
//! [needletail::parse_fastx_file]. A record that fails to parse mid-file
//! is logged and treated as end of that file; content never aborts a run.

use std::path::Path;

use log::warn;
use needletail::Sequence;

use crate::error::Error;

/// Stream every sequence of a fastX file into `f`.
pub fn each_read<F>(
    file: &str,
    mut f: F,
) -> Result<(), Error>
where
    F: FnMut(&[u8]),
{
    let mut reader = needletail::parse_fastx_file(file)
        .map_err(|err| Error::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, err.to_string())))?;
    while let Some(rec) = reader.next() {
        match rec {
            Ok(seqrec) => f(&seqrec.normalize(true)),
            Err(err) => {
                warn!("{}: malformed record ({}), skipping the rest of the file", file, err);
                break;
            }
        }
    }
    Ok(())
}

/// All sequences of a fastX file.
pub fn read_fastx_file(
    file: &str,
) -> Result<Vec<Vec<u8>>, Error> {
    let mut seq_data: Vec<Vec<u8>> = Vec::new();
    each_read(file, |seq| seq_data.push(seq.to_vec()))?;
    Ok(seq_data)
}

/// Record ids and sequences of a FASTA file, in file order.
pub fn read_fasta_records(
    file: &str,
) -> Result<Vec<(String, Vec<u8>)>, Error> {
    let mut reader = needletail::parse_fastx_file(file)
        .map_err(|err| Error::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, err.to_string())))?;
    let mut records = Vec::new();
    while let Some(rec) = reader.next() {
        match rec {
            Ok(seqrec) => {
                let id = String::from_utf8_lossy(seqrec.id())
                    .split_whitespace()
                    .next()
                    .unwrap_or("")
                    .to_string();
                records.push((id, seqrec.normalize(true).to_vec()));
            }
            Err(err) => {
                warn!("{}: malformed record ({}), skipping the rest of the file", file, err);
                break;
            }
        }
    }
    Ok(records)
}

/// One sample: a name and the read files contributing to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    pub name: String,
    pub files: Vec<String>,
}

/// Derive a sample name from a read file path.
///
/// Strips the directory, compression and sequence extensions, and a
/// trailing `_1`/`_2`/`_R1`/`_R2` mate tag, so `runs/foo_R1.fastq.gz` and
/// `runs/foo_R2.fastq.gz` name the same sample.
pub fn sample_name(
    file: &str,
) -> Option<String> {
    let base = Path::new(file).file_name()?.to_string_lossy().into_owned();
    let mut name = base.as_str();
    for ext in [".gz", ".fastq", ".fq", ".fasta", ".fa", ".fna"] {
        if let Some(stripped) = name.strip_suffix(ext) {
            name = stripped;
        }
    }
    for tag in ["_R1", "_R2", "_1", "_2"] {
        if let Some(stripped) = name.strip_suffix(tag) {
            name = stripped;
            break;
        }
    }
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

/// Group read files into samples.
///
/// With `reads_1`/`reads_2` the two lists are zipped pairwise and must
/// have equal lengths. Otherwise positional `reads` are grouped by their
/// derived sample name, preserving first-seen order.
pub fn group_samples(
    reads: &[String],
    reads_1: &[String],
    reads_2: &[String],
) -> Result<Vec<Sample>, Error> {
    if !reads_1.is_empty() || !reads_2.is_empty() {
        if reads_1.len() != reads_2.len() {
            return Err(Error::InputMismatch(format!(
                "{} forward read files but {} reverse read files",
                reads_1.len(),
                reads_2.len()
            )));
        }
        let mut samples = Vec::with_capacity(reads_1.len());
        for (fwd, rev) in reads_1.iter().zip(reads_2.iter()) {
            let name = sample_name(fwd)
                .ok_or_else(|| Error::InputMismatch(format!("cannot derive a sample name from {}", fwd)))?;
            samples.push(Sample { name, files: vec![fwd.clone(), rev.clone()] });
        }
        return Ok(samples);
    }

    let mut samples: Vec<Sample> = Vec::new();
    for file in reads {
        let name = sample_name(file)
            .ok_or_else(|| Error::InputMismatch(format!("cannot derive a sample name from {}", file)))?;
        match samples.iter_mut().find(|sample| sample.name == name) {
            Some(sample) => sample.files.push(file.clone()),
            None => samples.push(Sample { name, files: vec![file.clone()] }),
        }
    }
    if samples.is_empty() {
        return Err(Error::InputMismatch("no read files given".to_string()));
    }
    Ok(samples)
}
