//! Error taxonomy for the ingestion core.
//!
//! Pre-flight errors (`PathValidation`, `RepositoryTooLarge`, `Clone*`) are
//! returned synchronously and never produce a task record. Per-file errors
//! are absorbed into the task's `failed_files` list as a [`FileErrorKind`].

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("path validation failed: {0}")]
    PathValidation(String),

    #[error("repository too large: {files} files, {bytes} bytes (limits: {max_files} files, {max_bytes} bytes)")]
    RepositoryTooLarge {
        files: usize,
        bytes: u64,
        max_files: usize,
        max_bytes: u64,
    },

    #[error("clone failed for {url}: {reason}")]
    Clone { url: String, reason: String },

    #[error("clone timed out after {seconds}s: {url}")]
    CloneTimeout { url: String, seconds: u64 },

    #[error("failed to read {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("grammar setup failed: {0}")]
    Grammar(String),

    #[error("persistence failed: {0}")]
    Persistence(#[from] StoreError),

    #[error("task cancelled")]
    Cancelled,

    #[error("task exceeded wall-clock limit of {seconds}s")]
    Timeout { seconds: u64 },
}

/// Error returned by [`crate::pipeline::PersistenceStore`] implementations.
///
/// Fatal for the task: the in-flight batch is not committed, previously
/// committed batches remain.
#[derive(Error, Debug)]
#[error("{0}")]
pub struct StoreError(pub String);

/// Category recorded for a file that could not be processed.
///
/// Only read failures can fail a file: parse failures trigger fallback
/// segmentation and per-construct extraction errors are skipped, so neither
/// ever lands here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileErrorKind {
    Read,
}

impl FileErrorKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            FileErrorKind::Read => "read",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = IngestError::RepositoryTooLarge {
            files: 20_000,
            bytes: 1024,
            max_files: 10_000,
            max_bytes: 1 << 30,
        };
        assert!(err.to_string().contains("20000 files"));

        let err = IngestError::CloneTimeout {
            url: "https://example.com/repo.git".into(),
            seconds: 300,
        };
        assert!(err.to_string().contains("300s"));
    }

    #[test]
    fn test_file_error_kind_serializes_snake_case() {
        let json = serde_json::to_string(&FileErrorKind::Read).unwrap();
        assert_eq!(json, r#""read""#);
    }
}
