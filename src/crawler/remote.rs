/// Remote repository acquisition.
///
/// Clones over HTTPS into a scoped temporary directory. The directory is
/// removed when the [`ClonedRepo`] is dropped, on success and failure paths
/// alike. The clone subprocess runs under a wall-clock budget and is killed
/// if the budget is exceeded.
use super::RepoMetadata;
use crate::error::IngestError;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tempfile::TempDir;
use tokio::process::Command;
use tracing::info;

/// A checkout held in a temporary directory. Dropping it deletes the clone.
#[derive(Debug)]
pub struct ClonedRepo {
    pub root: PathBuf,
    pub metadata: RepoMetadata,
    _dir: TempDir,
}

/// Only secure HTTP transport is accepted; local-file and ssh schemes are
/// rejected before any I/O occurs.
pub fn validate_git_url(url: &str) -> Result<(), IngestError> {
    if url.starts_with("https://") {
        Ok(())
    } else {
        Err(IngestError::PathValidation(format!(
            "git_url must use https://, got: {url}"
        )))
    }
}

/// Clone `url` shallowly and read its commit hash and branch name.
pub async fn clone_repository(url: &str, timeout: Duration) -> Result<ClonedRepo, IngestError> {
    validate_git_url(url)?;

    // tempfile creates the directory with owner-only permissions on unix
    let dir = TempDir::new().map_err(|e| IngestError::Clone {
        url: url.to_string(),
        reason: format!("failed to create temp dir: {e}"),
    })?;
    let root = dir.path().to_path_buf();

    info!("cloning {url}");
    let clone = Command::new("git")
        .arg("clone")
        .arg("--depth")
        .arg("1")
        .arg("--single-branch")
        .arg(url)
        .arg(&root)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output();

    let output = match tokio::time::timeout(timeout, clone).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            return Err(IngestError::Clone {
                url: url.to_string(),
                reason: format!("failed to spawn git: {e}"),
            });
        }
        Err(_) => {
            // TempDir drops here, removing any partial clone
            return Err(IngestError::CloneTimeout {
                url: url.to_string(),
                seconds: timeout.as_secs(),
            });
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(IngestError::Clone {
            url: url.to_string(),
            reason: stderr.trim().to_string(),
        });
    }

    let commit = git_stdout(&root, &["rev-parse", "HEAD"]).await;
    let branch = git_stdout(&root, &["rev-parse", "--abbrev-ref", "HEAD"]).await;
    info!(
        "cloned {url} at {} ({})",
        commit.as_deref().unwrap_or("unknown"),
        branch.as_deref().unwrap_or("unknown")
    );

    Ok(ClonedRepo {
        metadata: RepoMetadata {
            root: root.clone(),
            commit,
            branch,
        },
        root,
        _dir: dir,
    })
}

async fn git_stdout(dir: &Path, args: &[&str]) -> Option<String> {
    let output = Command::new("git")
        .arg("-C")
        .arg(dir)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .await
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8(output.stdout).ok()?;
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_https_urls_accepted() {
        assert!(validate_git_url("https://example.com/org/repo.git").is_ok());
    }

    #[test]
    fn test_insecure_and_local_schemes_rejected() {
        for url in [
            "http://example.com/repo.git",
            "file:///etc/passwd",
            "git://example.com/repo.git",
            "ssh://git@example.com/repo.git",
            "git@example.com:org/repo.git",
        ] {
            assert!(validate_git_url(url).is_err(), "{url} should be rejected");
        }
    }

    #[tokio::test]
    async fn test_clone_invalid_scheme_fails_before_io() {
        let err = clone_repository("file:///tmp/repo", Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::PathValidation(_)));
    }

    #[tokio::test]
    async fn test_clone_unreachable_host_reports_clone_error() {
        let err = clone_repository(
            "https://localhost:1/definitely/not/a/repo.git",
            Duration::from_secs(30),
        )
        .await
        .unwrap_err();
        assert!(
            matches!(err, IngestError::Clone { .. } | IngestError::CloneTimeout { .. }),
            "got: {err}"
        );
    }
}
