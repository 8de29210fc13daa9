//! Core types for catalog dump imports

use crate::index::{keys, StoreError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

/// Which of the three catalog dumps a file holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DumpCategory {
    Editions,
    Authors,
    Works,
}

impl DumpCategory {
    pub const ALL: [DumpCategory; 3] = [Self::Editions, Self::Authors, Self::Works];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Editions => "editions",
            Self::Authors => "authors",
            Self::Works => "works",
        }
    }

    /// Conventional file name of the latest published dump
    pub fn dump_filename(&self) -> String {
        format!("ol_dump_{}_latest.txt.gz", self.as_str())
    }

    /// Key prefix of this category's primary records
    pub fn primary_prefix(&self) -> &'static str {
        match self {
            Self::Editions => keys::PREFIX_EDITION,
            Self::Authors => keys::PREFIX_AUTHOR,
            Self::Works => keys::PREFIX_WORK,
        }
    }
}

impl fmt::Display for DumpCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DumpCategory {
    type Err = ImportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "editions" => Ok(Self::Editions),
            "authors" => Ok(Self::Authors),
            "works" => Ok(Self::Works),
            other => Err(ImportError::UnknownCategory(other.to_string())),
        }
    }
}

/// Errors that can occur during import
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("unknown dump category: {0:?} (expected editions, authors or works)")]
    UnknownCategory(String),

    #[error("failed to open dump {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("read error after line {line}: {source}")]
    Stream {
        line: u64,
        #[source]
        source: std::io::Error,
    },

    #[error("line {line} exceeds the maximum line length of {limit} bytes")]
    LineTooLong { line: u64, limit: usize },

    #[error("commit failed after {records} records: {source}")]
    Commit {
        records: u64,
        #[source]
        source: sled::Error,
    },

    #[error("checkpoint error: {0}")]
    Checkpoint(#[source] StoreError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("import cancelled after {records} records")]
    Cancelled { records: u64 },

    #[error("import task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl ImportError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

/// Progress notification sent after each commit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImportTick {
    pub category: DumpCategory,
    /// Cumulative committed records, including those of a resumed run
    pub records: u64,
    /// Committed line watermark
    pub lines: u64,
    /// Fraction of the compressed file consumed, `1.0` only when complete
    pub progress: f64,
}

/// Import statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportStats {
    pub category: DumpCategory,
    /// Total records committed for this file, across resumed runs
    pub records_committed: u64,
    /// Records committed by this run
    pub records_imported: u64,
    /// Lines read by this run, including skipped malformed rows
    pub lines_processed: u64,
    pub malformed_rows: u64,
    /// Line the run resumed after, if it resumed
    pub resumed_from_line: Option<u64>,
    /// The file was already fully imported; nothing was done
    pub already_complete: bool,
    pub elapsed_seconds: f64,
    pub records_per_second: f64,
}

impl ImportStats {
    pub fn new(category: DumpCategory) -> Self {
        Self {
            category,
            records_committed: 0,
            records_imported: 0,
            lines_processed: 0,
            malformed_rows: 0,
            resumed_from_line: None,
            already_complete: false,
            elapsed_seconds: 0.0,
            records_per_second: 0.0,
        }
    }

    /// Calculate records per second
    pub fn update_rate(&mut self) {
        if self.elapsed_seconds > 0.0 {
            self.records_per_second = self.records_imported as f64 / self.elapsed_seconds;
        }
    }
}
