//! Typed error taxonomy for the classification/packaging core.
//!
//! Every fallible public entry point returns `Result<T, PackagerError>` so
//! callers can match on failure kind instead of parsing a message string.
//! Per-file classification faults are the one exception: they are
//! accumulated inside [`crate::classify::ClassificationResult`] rather than
//! raised, per the propagation policy in the specification.

use std::path::PathBuf;

use thiserror::Error;

use crate::path::RelPath;

/// Top-level error type returned by every core component.
#[derive(Debug, Error)]
pub enum PackagerError {
    #[error("could not normalize path {input}: {reason}")]
    Path { input: PathBuf, reason: String },

    #[error("classification aborted: {reason}")]
    FatalClassifier { reason: String },

    #[error("chunking failed: {reason} (produced archives: {produced_archives:?})")]
    Chunking {
        reason: String,
        produced_archives: Vec<PathBuf>,
    },

    #[error("no archive builder backend is available")]
    NoArchiveBuilderAvailable,

    #[error("compression failed: {0}")]
    Compress(String),

    #[error("plugin template error for {game}: {reason}")]
    Template { game: String, reason: String },

    #[error("insufficient disk space at {path}: need {required} bytes, have {available} bytes")]
    InsufficientSpace {
        required: u64,
        available: u64,
        path: PathBuf,
    },

    #[error("operation cancelled after {completed} of {remaining} remaining")]
    Cancelled { completed: usize, remaining: usize },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PackagerError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, PackagerError>;

/// A non-fatal fault encountered while classifying a single file.
///
/// Collected into [`crate::classify::ClassificationResult`] rather than
/// propagated — see the propagation policy in the specification: per-file
/// hash/path errors never abort classification of the remaining files.
#[derive(Debug, Error, Clone)]
pub enum ClassifyError {
    #[error("path normalization failed: {0}")]
    Path(String),
    #[error("hash failed: {0}")]
    Hash(String),
}

/// A relpath paired with the fault observed while classifying it.
#[derive(Debug, Clone)]
pub struct ClassifyFault {
    pub rel_path: RelPath,
    pub error: ClassifyError,
}
