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
//! Sequence-type profiles: mapping a combination of allele ids to a
//! sequence type and an optional clonal complex.

use std::io::BufRead;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// One row of the profile table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRow {
    pub st: String,
    /// Allele ids in locus column order.
    pub alleles: Vec<String>,
    /// Clonal complex, empty when the table has no such column.
    pub cc: String,
}

/// A sequence-type profile table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileTable {
    /// Locus names in column order, from the header.
    pub loci: Vec<String>,
    pub rows: Vec<ProfileRow>,
}

impl ProfileTable {
    /// Parse a tab-separated profile table.
    ///
    /// The first column is the sequence type, the next `loci.len()`
    /// columns are allele ids in locus order, and one optional trailing
    /// column is the clonal complex. Fewer columns than loci is an
    /// [Error::InvalidDatabase].
    pub fn from_tsv(
        path: &str,
        loci: &[String],
    ) -> Result<ProfileTable, Error> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        let mut lines = reader.lines();

        let header = match lines.next() {
            Some(line) => line?,
            None => return Err(Error::InvalidDatabase(format!("{}: empty profile table", path))),
        };
        let columns: Vec<&str> = header.split('\t').collect();
        if columns.len() < loci.len() + 1 {
            return Err(Error::InvalidDatabase(format!(
                "{}: profile table has {} columns but the database has {} loci",
                path,
                columns.len(),
                loci.len()
            )));
        }
        let header_loci: Vec<String> =
            columns[1..=loci.len()].iter().map(|name| name.to_string()).collect();
        if header_loci != loci {
            warn!("Profile locus columns {:?} differ from database loci {:?}", header_loci, loci);
        }
        let has_cc = columns.len() > loci.len() + 1;

        let mut rows = Vec::new();
        for line in lines {
            let line = line?;
            if line.is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() < loci.len() + 1 {
                warn!("Skipping short profile row: {}", line);
                continue;
            }
            rows.push(ProfileRow {
                st: fields[0].to_string(),
                alleles: fields[1..=loci.len()].iter().map(|field| field.to_string()).collect(),
                cc: if has_cc && fields.len() > loci.len() + 1 {
                    fields[loci.len() + 1].to_string()
                } else {
                    String::new()
                },
            });
        }

        Ok(ProfileTable { loci: header_loci, rows })
    }

    /// Sequence type and clonal complex of a genotype.
    ///
    /// Linear scan; the first row whose allele columns equal `genotype`
    /// as strings wins. Unknown genotypes are `("0", "")`.
    pub fn lookup(
        &self,
        genotype: &[String],
    ) -> (String, String) {
        self.rows
            .iter()
            .find(|row| row.alleles == genotype)
            .map(|row| (row.st.clone(), row.cc.clone()))
            .unwrap_or_else(|| ("0".to_string(), String::new()))
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
//
#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn table() -> ProfileTable {
        ProfileTable {
            loci: vec!["adk".to_string(), "purA".to_string()],
            rows: vec![
                ProfileRow {
                    st: "1".to_string(),
                    alleles: vec!["1".to_string(), "3".to_string()],
                    cc: "CC1".to_string(),
                },
                ProfileRow {
                    st: "2".to_string(),
                    alleles: vec!["2".to_string(), "3".to_string()],
                    cc: String::new(),
                },
            ],
        }
    }

    #[test]
    fn lookup_finds_the_first_exact_match() {
        let genotype = vec!["1".to_string(), "3".to_string()];
        assert_eq!(table().lookup(&genotype), ("1".to_string(), "CC1".to_string()));
    }

    #[test]
    fn lookup_misses_to_st_zero() {
        let genotype = vec!["9".to_string(), "9".to_string()];
        assert_eq!(table().lookup(&genotype), ("0".to_string(), String::new()));
    }

    #[test]
    fn parses_a_tsv_with_clonal_complex() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profiles.tsv");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "ST\tadk\tpurA\tclonal_complex").unwrap();
        writeln!(file, "1\t1\t3\tCC1").unwrap();
        writeln!(file, "2\t2\t3\t").unwrap();

        let loci = vec!["adk".to_string(), "purA".to_string()];
        let parsed = ProfileTable::from_tsv(path.to_str().unwrap(), &loci).unwrap();
        assert_eq!(parsed, table());
    }

    #[test]
    fn too_few_columns_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profiles.tsv");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "ST\tadk").unwrap();

        let loci = vec!["adk".to_string(), "purA".to_string()];
        let err = ProfileTable::from_tsv(path.to_str().unwrap(), &loci).unwrap_err();
        assert!(matches!(err, Error::InvalidDatabase(_)));
    }
}
