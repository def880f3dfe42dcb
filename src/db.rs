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
//! The allele database: per-locus allele inventories and the canonical
//! k-mer index, with construction from per-locus FASTA files and a
//! compressed on-disk codec.

use std::collections::BTreeSet;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use ahash::AHashMap;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use log::info;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::io as seqio;
use crate::kmer;
use crate::profile::ProfileTable;

/// Magic bytes prefixed to the serialized database.
const DB_MAGIC: &[u8; 8] = b"kmlstdb1";

/// One posting of the k-mer index: the k-mer evidences (weight > 0) or
/// contradicts (weight < 0) the listed alleles of a locus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    /// 0-based locus index into [Database::loci].
    pub locus: u32,
    /// Signed vote weight applied per observed copy of the k-mer.
    pub weight: i32,
    /// 1-based internal allele indices the weight applies to.
    pub alleles: Vec<u32>,
}

/// Canonical k-mer to posting list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KmerIndex {
    pub k: usize,
    pub postings: AHashMap<Vec<u8>, Vec<Posting>>,
}

/// One typed locus: its name, the external ids of its alleles, and the
/// FASTA file its allele sequences are loaded from on demand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Locus {
    pub name: String,
    /// `allele_ids[i - 1]` is the external id of internal allele `i`.
    pub allele_ids: Vec<String>,
    pub fasta: PathBuf,
}

/// A complete typing database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Database {
    pub loci: Vec<Locus>,
    pub index: KmerIndex,
    pub profiles: Option<ProfileTable>,
}

impl Database {
    pub fn k(&self) -> usize {
        self.index.k
    }

    /// Number of alleles per locus, in locus order.
    pub fn allele_counts(&self) -> Vec<usize> {
        self.loci.iter().map(|locus| locus.allele_ids.len()).collect()
    }
}

/// Build the k-mer index over per-locus allele sequence sets.
///
/// For every locus the canonical k-mers of its alleles are collected with
/// the set of alleles containing each. A k-mer present in more than half
/// of the locus's alleles, but not all of them, is stored with weight -1
/// against the alleles missing it; observing it then votes those alleles
/// down. Everything else is stored with weight +1 for the alleles that
/// have it.
pub fn build_index(
    loci: &[(String, Vec<Vec<u8>>)],
    k: usize,
) -> KmerIndex {
    let mut postings: AHashMap<Vec<u8>, Vec<Posting>> = AHashMap::new();

    for (locus_idx, (_, alleles)) in loci.iter().enumerate() {
        let n_alleles = alleles.len();
        let mut containing: AHashMap<Vec<u8>, BTreeSet<u32>> = AHashMap::new();
        for (allele_idx, seq) in alleles.iter().enumerate() {
            if seq.len() < k {
                continue;
            }
            for window in seq.windows(k) {
                let Some(canon) = kmer::canonical(window) else {
                    continue;
                };
                containing.entry(canon).or_default().insert(allele_idx as u32 + 1);
            }
        }

        for (canon, with_kmer) in containing {
            let posting = if with_kmer.len() * 2 > n_alleles && with_kmer.len() < n_alleles {
                let without: Vec<u32> = (1..=n_alleles as u32)
                    .filter(|allele| !with_kmer.contains(allele))
                    .collect();
                Posting { locus: locus_idx as u32, weight: -1, alleles: without }
            } else {
                Posting { locus: locus_idx as u32, weight: 1, alleles: with_kmer.into_iter().collect() }
            };
            postings.entry(canon).or_default().push(posting);
        }
    }

    // Posting lists in locus order so the index is reproducible.
    for list in postings.values_mut() {
        list.sort_by_key(|posting| posting.locus);
    }

    KmerIndex { k, postings }
}

/// External allele id from a FASTA record id.
///
/// MLST allele FASTAs conventionally name records `locus_12`; the trailing
/// underscore-separated token is the id. Record ids without an underscore
/// fall back to the 1-based record index.
fn allele_id(record_id: &str, record_index: usize) -> String {
    match record_id.rsplit_once('_') {
        Some((_, id)) if !id.is_empty() => id.to_string(),
        _ => record_index.to_string(),
    }
}

/// Build a database from one FASTA file of alleles per locus.
///
/// The locus name is the file stem; the i-th record (1-based) is internal
/// allele i. The profile table, when given, is validated against the
/// locus list.
pub fn build(
    locus_files: &[String],
    k: usize,
    profile: Option<&str>,
) -> Result<Database, Error> {
    let mut loci: Vec<Locus> = Vec::with_capacity(locus_files.len());
    let mut locus_seqs: Vec<(String, Vec<Vec<u8>>)> = Vec::with_capacity(locus_files.len());

    for file in locus_files {
        let name = locus_name(file);
        let records = seqio::read_fasta_records(file)?;
        let allele_ids = records
            .iter()
            .enumerate()
            .map(|(idx, (id, _))| allele_id(id, idx + 1))
            .collect();
        let seqs: Vec<Vec<u8>> = records.into_iter().map(|(_, seq)| seq).collect();
        info!("Locus {}: {} alleles", name, seqs.len());
        loci.push(Locus { name: name.clone(), allele_ids, fasta: PathBuf::from(file) });
        locus_seqs.push((name, seqs));
    }

    let index = build_index(&locus_seqs, k);
    info!("Indexed {} distinct k-mers at k = {}", index.postings.len(), k);

    let locus_names: Vec<String> = loci.iter().map(|locus| locus.name.clone()).collect();
    let profiles = match profile {
        Some(path) => Some(ProfileTable::from_tsv(path, &locus_names)?),
        None => None,
    };

    Ok(Database { loci, index, profiles })
}

/// Locus name from an allele FASTA path: the file stem without extensions.
fn locus_name(file: &str) -> String {
    let base = Path::new(file)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.to_string());
    match base.split_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem.to_string(),
        _ => base,
    }
}

/// Serialize a database: magic tag, then gzip-compressed bincode.
pub fn save(
    db: &Database,
    path: &str,
) -> Result<(), Error> {
    let file = std::fs::File::create(path)?;
    let mut out = std::io::BufWriter::new(file);
    out.write_all(DB_MAGIC)?;
    let mut encoder = GzEncoder::new(out, Compression::default());
    bincode::serialize_into(&mut encoder, db)
        .map_err(|err| Error::InvalidDatabase(format!("serialization failed: {}", err)))?;
    encoder.finish()?.flush()?;
    Ok(())
}

/// Load a database serialized by [save].
pub fn load(
    path: &str,
) -> Result<Database, Error> {
    let file = std::fs::File::open(path)?;
    let mut reader = std::io::BufReader::new(file);

    let mut magic = [0u8; 8];
    reader.read_exact(&mut magic)?;
    if &magic != DB_MAGIC {
        return Err(Error::InvalidDatabase(format!("{} is not a kmlst database", path)));
    }

    let decoder = GzDecoder::new(reader);
    let db: Database = bincode::deserialize_from(decoder)
        .map_err(|err| Error::InvalidDatabase(format!("{}: {}", path, err)))?;

    if db.index.k == 0 {
        return Err(Error::InvalidDatabase("k-mer length missing".to_string()));
    }
    if db.loci.is_empty() {
        return Err(Error::InvalidDatabase("no loci".to_string()));
    }
    Ok(db)
}
