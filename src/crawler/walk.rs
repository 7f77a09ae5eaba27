/// Local directory traversal with ignore-pattern compliance, binary
/// filtering, and repository size guards.
use crate::error::IngestError;
use ignore::WalkBuilder;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A file discovered by the crawler. Immutable; consumed once by the
/// segmentation engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFile {
    pub path: PathBuf,
    /// Path relative to the repository root, forward-slash separated.
    pub relative_path: String,
    pub size: u64,
}

/// Extensions that are binary by definition and never worth sniffing.
const BINARY_EXTENSIONS: &[&str] = &[
    // images
    "png", "jpg", "jpeg", "gif", "bmp", "ico", "webp", "tiff",
    // archives
    "zip", "tar", "gz", "bz2", "xz", "7z", "rar", "jar",
    // compiled artifacts
    "exe", "dll", "so", "dylib", "o", "a", "class", "pyc", "pyo", "wasm", "bin",
    // media
    "mp3", "mp4", "avi", "mov", "ogg", "wav", "flac",
    // fonts and documents
    "ttf", "otf", "woff", "woff2", "eot", "pdf",
    // databases
    "db", "sqlite", "sqlite3",
];

/// Bytes sniffed from the head of each file when classifying binary content.
const SNIFF_BYTES: usize = 8 * 1024;

/// Walk `root` and collect candidate files in deterministic (sorted) order.
///
/// Honors nested ignore-pattern files with standard gitignore semantics
/// (deeper patterns override shallower ones, `!` negation re-includes).
/// Binary files are silently skipped. Aborts with
/// [`IngestError::RepositoryTooLarge`] as soon as either guard is crossed,
/// before any file is handed downstream.
pub fn crawl(
    root: &Path,
    max_files: usize,
    max_repo_bytes: u64,
) -> Result<Vec<CandidateFile>, IngestError> {
    let mut candidates = Vec::new();
    let mut total_bytes = 0u64;

    let walker = WalkBuilder::new(root)
        .require_git(false)
        .git_global(false)
        .sort_by_file_name(std::cmp::Ord::cmp)
        .build();

    for entry in walker.into_iter().filter_map(|e| e.ok()) {
        let path = entry.path();
        if path.is_dir() {
            continue;
        }

        if is_binary_extension(path) {
            debug!("skipping binary extension: {}", path.display());
            continue;
        }

        let size = match entry.metadata() {
            Ok(m) => m.len(),
            Err(e) => {
                warn!("skipping unreadable entry {}: {e}", path.display());
                continue;
            }
        };

        match sniff_is_binary(path) {
            Ok(true) => {
                debug!("skipping binary content: {}", path.display());
                continue;
            }
            Ok(false) => {}
            Err(e) => {
                warn!("skipping unreadable file {}: {e}", path.display());
                continue;
            }
        }

        total_bytes += size;
        if candidates.len() + 1 > max_files || total_bytes > max_repo_bytes {
            return Err(IngestError::RepositoryTooLarge {
                files: candidates.len() + 1,
                bytes: total_bytes,
                max_files,
                max_bytes: max_repo_bytes,
            });
        }

        let relative_path = path
            .strip_prefix(root)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/");

        candidates.push(CandidateFile {
            path: path.to_path_buf(),
            relative_path,
            size,
        });
    }

    Ok(candidates)
}

fn is_binary_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            BINARY_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// A file is binary if its first 8 KB contain a NUL byte.
fn sniff_is_binary(path: &Path) -> std::io::Result<bool> {
    let mut file = File::open(path)?;
    let mut buf = [0u8; SNIFF_BYTES];
    let mut read = 0;
    while read < SNIFF_BYTES {
        let n = file.read(&mut buf[read..])?;
        if n == 0 {
            break;
        }
        read += n;
    }
    Ok(buf[..read].contains(&0))
}
