/// Ingestion task record, request validation, and the task state machine.
use crate::crawler::remote::validate_git_url;
use crate::error::{FileErrorKind, IngestError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Task lifecycle: `PENDING → PROCESSING → {COMPLETED | FAILED}`.
/// No other transitions are valid; terminal states are immutable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskState {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl TaskState {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Completed | TaskState::Failed)
    }

    #[must_use]
    pub fn can_transition_to(&self, next: TaskState) -> bool {
        matches!(
            (self, next),
            (TaskState::Pending, TaskState::Processing)
                | (TaskState::Processing, TaskState::Completed)
                | (TaskState::Processing, TaskState::Failed)
        )
    }
}

/// A file that could not be processed, recorded without failing the task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedFile {
    pub path: String,
    pub error_kind: FileErrorKind,
}

/// Trigger payload: exactly one of `path` or `git_url` must be set.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IngestionRequest {
    pub path: Option<PathBuf>,
    pub git_url: Option<String>,
}

/// Validated ingestion source.
#[derive(Debug, Clone)]
pub enum IngestSource {
    Path(PathBuf),
    GitUrl(String),
}

impl IngestSource {
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            IngestSource::Path(p) => p.display().to_string(),
            IngestSource::GitUrl(u) => u.clone(),
        }
    }
}

impl IngestionRequest {
    #[must_use]
    pub fn local(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            git_url: None,
        }
    }

    #[must_use]
    pub fn remote(url: impl Into<String>) -> Self {
        Self {
            path: None,
            git_url: Some(url.into()),
        }
    }

    /// Pre-flight validation. Local paths must resolve beneath
    /// `allowed_base`; remote URLs must use the https scheme. Runs before
    /// any task record exists.
    pub fn validate(&self, allowed_base: &Path) -> Result<IngestSource, IngestError> {
        match (&self.path, &self.git_url) {
            (Some(_), Some(_)) => Err(IngestError::PathValidation(
                "exactly one of path or git_url must be set, got both".into(),
            )),
            (None, None) => Err(IngestError::PathValidation(
                "exactly one of path or git_url must be set, got neither".into(),
            )),
            (Some(path), None) => {
                let resolved = path.canonicalize().map_err(|e| {
                    IngestError::PathValidation(format!("cannot resolve {}: {e}", path.display()))
                })?;
                let base = allowed_base.canonicalize().map_err(|e| {
                    IngestError::PathValidation(format!(
                        "cannot resolve base {}: {e}",
                        allowed_base.display()
                    ))
                })?;
                if !resolved.starts_with(&base) {
                    return Err(IngestError::PathValidation(format!(
                        "{} escapes the allowed base directory",
                        path.display()
                    )));
                }
                Ok(IngestSource::Path(resolved))
            }
            (None, Some(url)) => {
                validate_git_url(url)?;
                Ok(IngestSource::GitUrl(url.clone()))
            }
        }
    }
}

/// The orchestration record. Mutated only by the orchestrator; terminal
/// once completed or failed.
#[derive(Debug, Clone, Serialize)]
pub struct IngestionTask {
    pub task_id: Uuid,
    pub source: String,
    pub state: TaskState,
    pub files_total: usize,
    pub files_processed: usize,
    pub current_file: Option<String>,
    pub failed_files: Vec<FailedFile>,
    /// Human-readable reason recorded on FAILED.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl IngestionTask {
    #[must_use]
    pub fn new(source: &IngestSource) -> Self {
        Self {
            task_id: Uuid::new_v4(),
            source: source.describe(),
            state: TaskState::Pending,
            files_total: 0,
            files_processed: 0,
            current_file: None,
            failed_files: Vec::new(),
            reason: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Apply a state transition, enforcing the state machine. Returns false
    /// (and leaves the task untouched) for invalid transitions.
    pub fn transition(&mut self, next: TaskState) -> bool {
        if !self.state.can_transition_to(next) {
            return false;
        }
        self.state = next;
        if next.is_terminal() {
            self.completed_at = Some(Utc::now());
        }
        true
    }

    pub fn fail(&mut self, reason: impl Into<String>) {
        if self.transition(TaskState::Failed) {
            self.reason = Some(reason.into());
        }
    }

    /// The projection served by the status interface.
    #[must_use]
    pub fn status(&self) -> TaskStatus {
        TaskStatus {
            task_id: self.task_id,
            state: self.state,
            files_processed: self.files_processed,
            files_total: self.files_total,
            current_file: self.current_file.clone(),
            failed_files: self.failed_files.clone(),
        }
    }
}

/// Point-in-time view of a task, published over the progress channel.
#[derive(Debug, Clone, Serialize)]
pub struct TaskStatus {
    pub task_id: Uuid,
    pub state: TaskState,
    pub files_processed: usize,
    pub files_total: usize,
    pub current_file: Option<String>,
    pub failed_files: Vec<FailedFile>,
}

impl Default for TaskStatus {
    fn default() -> Self {
        Self {
            task_id: Uuid::nil(),
            state: TaskState::Pending,
            files_processed: 0,
            files_total: 0,
            current_file: None,
            failed_files: Vec::new(),
        }
    }
}
