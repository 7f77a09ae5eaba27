//! Repository crawler: produces a filtered, safe, ordered sequence of
//! candidate files from a local directory or a freshly cloned checkout.
//!
//! - [`walk`] handles local traversal with gitignore compliance, binary
//!   sniffing, and size/count guards.
//! - [`remote`] acquires a git checkout over HTTPS into a scoped temporary
//!   directory with a clone timeout.

pub mod remote;
pub mod walk;

pub use remote::{clone_repository, validate_git_url, ClonedRepo};
pub use walk::{crawl, CandidateFile};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Repository-level provenance attached to every ingested resource.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepoMetadata {
    pub root: PathBuf,
    pub commit: Option<String>,
    pub branch: Option<String>,
}

impl RepoMetadata {
    #[must_use]
    pub fn local(root: PathBuf) -> Self {
        Self {
            root,
            commit: None,
            branch: None,
        }
    }
}
