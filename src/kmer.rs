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
//! Canonical _k_-mer handling.
//!
//! Every k-mer stored in the database index or the count table is in
//! canonical form: the lexicographically smaller of the k-mer and its
//! reverse complement. K-mers containing characters outside ACGT have no
//! canonical form and are skipped by the counting and coverage code.

/// Complement of a single nucleotide, or None for characters outside ACGT.
pub fn complement(base: u8) -> Option<u8> {
    match base {
        b'A' => Some(b'T'),
        b'C' => Some(b'G'),
        b'G' => Some(b'C'),
        b'T' => Some(b'A'),
        _ => None,
    }
}

/// Reverse complement of a nucleotide sequence.
///
/// Returns None if the sequence contains a character outside ACGT.
pub fn reverse_complement(
    seq: &[u8],
) -> Option<Vec<u8>> {
    seq.iter().rev().map(|base| complement(*base)).collect()
}

/// Canonical form of a k-mer.
///
/// The canonical form is the lexicographically smaller of the k-mer and
/// its reverse complement. Canonicalization is involutive:
/// `canonical(canonical(x)) == canonical(x)`, and a k-mer and its reverse
/// complement share the same canonical form.
///
/// Returns None if the k-mer contains a character outside ACGT.
///
/// # Examples
/// ```rust
/// use kmlst::kmer::canonical;
///
/// assert_eq!(canonical(b"TTGAC"), Some(b"GTCAA".to_vec()));
/// assert_eq!(canonical(b"GTCAA"), Some(b"GTCAA".to_vec()));
/// assert_eq!(canonical(b"GTNAA"), None);
/// ```
///
pub fn canonical(
    kmer: &[u8],
) -> Option<Vec<u8>> {
    let revcomp = reverse_complement(kmer)?;
    if revcomp.as_slice() < kmer {
        Some(revcomp)
    } else {
        Some(kmer.to_vec())
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
//
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complement_rejects_ambiguous_bases() {
        assert_eq!(complement(b'A'), Some(b'T'));
        assert_eq!(complement(b'G'), Some(b'C'));
        assert_eq!(complement(b'N'), None);
        assert_eq!(complement(b'a'), None);
    }

    #[test]
    fn reverse_complement_roundtrips() {
        let seq = b"AATCGGCTAAGCTGGATCAC";
        let twice = reverse_complement(&reverse_complement(seq).unwrap()).unwrap();
        assert_eq!(twice, seq.to_vec());
    }

    #[test]
    fn canonical_is_involutive() {
        let kmer = b"TTGACGTAC";
        let once = canonical(kmer).unwrap();
        let twice = canonical(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn canonical_of_revcomp_matches() {
        let kmer = b"ACGGTTCAG";
        let revcomp = reverse_complement(kmer).unwrap();
        assert_eq!(canonical(kmer), canonical(&revcomp));
    }

    #[test]
    fn canonical_skips_invalid() {
        assert_eq!(canonical(b"ACGNT"), None);
    }
}
