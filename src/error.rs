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
//! Errors that abort a run.
//!
//! Algorithmic outcomes (absent, uncovered, partial, multiple) are never
//! errors; they are ordinary [AlleleCall](crate::call::AlleleCall)
//! variants.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Read file lists or names that cannot be reconciled into samples.
    #[error("input mismatch: {0}")]
    InputMismatch(String),

    /// A database missing required sections or internally inconsistent.
    #[error("invalid database: {0}")]
    InvalidDatabase(String),

    /// Underlying file I/O failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
