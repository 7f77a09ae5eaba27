/// Ingestion orchestrator: drives crawl → segmentation → extraction in
/// batches, maintains the task record, and hands results to the external
/// persistence and event collaborators at batch boundaries.
use super::sinks::{EventSink, PersistenceStore};
use super::task::{FailedFile, IngestSource, IngestionRequest, IngestionTask, TaskState, TaskStatus};
use crate::config::Config;
use crate::crawler::remote::ClonedRepo;
use crate::crawler::{self, CandidateFile, RepoMetadata};
use crate::error::{FileErrorKind, IngestError, StoreError};
use crate::extractor::{GraphRelationship, RelationshipExtractor};
use crate::segmenter::{CodeChunk, SegmentationEngine};
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub struct Orchestrator<S, E> {
    config: Config,
    engine: SegmentationEngine,
    extractor: RelationshipExtractor,
    store: S,
    events: E,
}

impl<S: PersistenceStore, E: EventSink> Orchestrator<S, E> {
    pub fn new(config: Config, store: S, events: E) -> Result<Self, IngestError> {
        let engine = SegmentationEngine::new(config.fallback_chunk_chars)?;
        let extractor = RelationshipExtractor::new()?;
        Ok(Self {
            config,
            engine,
            extractor,
            store,
            events,
        })
    }

    /// Run one ingestion task to completion.
    ///
    /// Pre-flight failures (validation, oversized repository, clone errors)
    /// are returned as `Err` and never produce a task record. Everything
    /// after the task starts is reported through the returned
    /// [`IngestionTask`]: per-file errors land in `failed_files`, fatal
    /// errors transition the task to FAILED with a reason, and committed
    /// batches are never rolled back.
    pub async fn run(
        &self,
        request: IngestionRequest,
        cancel: CancellationToken,
        progress: Option<watch::Sender<TaskStatus>>,
    ) -> Result<IngestionTask, IngestError> {
        let source = request.validate(&self.config.allowed_base_dir)?;

        // Acquisition: for remote sources the checkout lives in a temp dir
        // that is removed when `_checkout` drops, on every exit path.
        let mut _checkout: Option<ClonedRepo> = None;
        let (root, repo) = match &source {
            IngestSource::Path(path) => (path.clone(), RepoMetadata::local(path.clone())),
            IngestSource::GitUrl(url) => {
                let cloned = crawler::clone_repository(
                    url,
                    Duration::from_secs(self.config.clone_timeout_secs),
                )
                .await?;
                let pair = (cloned.root.clone(), cloned.metadata.clone());
                _checkout = Some(cloned);
                pair
            }
        };

        let candidates = crawler::crawl(&root, self.config.max_files, self.config.max_repo_bytes)?;

        let mut task = IngestionTask::new(&source);
        task.files_total = candidates.len();
        task.transition(TaskState::Processing);
        publish(&progress, &task);
        info!(
            task_id = %task.task_id,
            files_total = task.files_total,
            source = %task.source,
            "ingestion started"
        );

        let deadline = Instant::now() + Duration::from_secs(self.config.task_timeout_secs);

        for batch in candidates.chunks(self.config.batch_size) {
            // Cancellation and the wall-clock ceiling are observed between
            // batches; already-committed work is not rolled back.
            if cancel.is_cancelled() {
                task.fail("cancelled");
                publish(&progress, &task);
                info!(task_id = %task.task_id, "ingestion cancelled");
                return Ok(task);
            }
            if Instant::now() >= deadline {
                task.fail("timeout");
                publish(&progress, &task);
                warn!(task_id = %task.task_id, "ingestion exceeded wall-clock limit");
                return Ok(task);
            }

            if let Err(e) = self.process_batch(batch, &repo, &mut task) {
                task.fail(format!("persistence: {e}"));
                publish(&progress, &task);
                warn!(task_id = %task.task_id, error = %e, "ingestion failed");
                return Ok(task);
            }
            publish(&progress, &task);
        }

        task.current_file = None;
        task.transition(TaskState::Completed);
        publish(&progress, &task);
        info!(
            task_id = %task.task_id,
            files_processed = task.files_processed,
            failed = task.failed_files.len(),
            "ingestion completed"
        );
        Ok(task)
    }

    /// Process and commit one batch as a unit. Per-file errors are absorbed
    /// into `failed_files`; only persistence errors propagate.
    fn process_batch(
        &self,
        batch: &[CandidateFile],
        repo: &RepoMetadata,
        task: &mut IngestionTask,
    ) -> Result<(), StoreError> {
        let mut prepared: Vec<(&CandidateFile, Vec<CodeChunk>, Vec<GraphRelationship>)> =
            Vec::with_capacity(batch.len());

        for file in batch {
            task.current_file = Some(file.relative_path.clone());

            let content = match std::fs::read(&file.path) {
                Ok(bytes) => match String::from_utf8(bytes) {
                    Ok(text) => text,
                    Err(_) => {
                        // Not valid UTF-8: treated as binary, silently skipped
                        debug!("skipping non-UTF-8 file: {}", file.relative_path);
                        continue;
                    }
                },
                Err(e) => {
                    warn!("failed to read {}: {e}", file.relative_path);
                    task.failed_files.push(FailedFile {
                        path: file.relative_path.clone(),
                        error_kind: FileErrorKind::Read,
                    });
                    continue;
                }
            };

            // Segmentation is total and extraction absorbs per-construct
            // errors, so neither can fail the file from here on.
            let segmented = self.engine.segment(&content, &file.path);
            let relationships = self
                .extractor
                .extract(&segmented, &content, &file.relative_path);
            prepared.push((file, segmented.chunks, relationships));
        }

        // Batch-level commit boundary: resources, chunks, and relationships
        // go to the store together, then one event for the whole batch.
        let mut resource_ids: Vec<Uuid> = Vec::with_capacity(prepared.len());
        let mut batch_relationships: Vec<GraphRelationship> = Vec::new();

        for (file, chunks, relationships) in &prepared {
            let resource_id = self.store.save_resource(file, repo)?;
            self.store.save_chunks(resource_id, chunks)?;
            batch_relationships.extend(relationships.iter().cloned());
            resource_ids.push(resource_id);
        }
        if !batch_relationships.is_empty() {
            self.store.save_relationships(&batch_relationships)?;
        }
        if !resource_ids.is_empty() {
            self.events.resources_ingested(&resource_ids);
        }

        task.files_processed += resource_ids.len();
        Ok(())
    }
}

fn publish(progress: &Option<watch::Sender<TaskStatus>>, task: &IngestionTask) {
    if let Some(tx) = progress {
        let _ = tx.send(task.status());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::sinks::{MemoryEvents, MemoryStore};
    use std::fs;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn config_for(dir: &std::path::Path) -> Config {
        Config {
            allowed_base_dir: dir.to_path_buf(),
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn test_batch_commit_boundaries() {
        let dir = tempdir().unwrap();
        for i in 0..5 {
            fs::write(dir.path().join(format!("f{i}.py")), format!("def fn{i}():\n    pass\n"))
                .unwrap();
        }

        let store = Arc::new(MemoryStore::new());
        let events = Arc::new(MemoryEvents::new());
        let config = Config {
            batch_size: 2,
            ..config_for(dir.path())
        };
        let orchestrator = Orchestrator::new(config, store.clone(), events.clone()).unwrap();

        let task = orchestrator
            .run(
                IngestionRequest::local(dir.path()),
                CancellationToken::new(),
                None,
            )
            .await
            .unwrap();

        assert_eq!(task.state, TaskState::Completed);
        assert_eq!(task.files_processed, 5);
        assert_eq!(store.resource_count(), 5);
        assert_eq!(events.batch_count(), 3, "5 files at batch size 2 = 3 events");
        assert_eq!(events.total_resources(), 5);
    }

    #[tokio::test]
    async fn test_cancellation_between_batches() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.py"), "def f():\n    pass\n").unwrap();

        let store = Arc::new(MemoryStore::new());
        let events = Arc::new(MemoryEvents::new());
        let orchestrator =
            Orchestrator::new(config_for(dir.path()), store.clone(), events.clone()).unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let task = orchestrator
            .run(IngestionRequest::local(dir.path()), cancel, None)
            .await
            .unwrap();

        assert_eq!(task.state, TaskState::Failed);
        assert_eq!(task.reason.as_deref(), Some("cancelled"));
        assert_eq!(task.files_processed, 0);
        assert_eq!(store.resource_count(), 0);
    }

    #[tokio::test]
    async fn test_persistence_failure_preserves_committed_batches() {
        let dir = tempdir().unwrap();
        for i in 0..4 {
            fs::write(dir.path().join(format!("f{i}.py")), "x = 1\n").unwrap();
        }

        let store = Arc::new(MemoryStore::new());
        store.fail_after_resources(2);
        let events = Arc::new(MemoryEvents::new());
        let config = Config {
            batch_size: 2,
            ..config_for(dir.path())
        };
        let orchestrator = Orchestrator::new(config, store.clone(), events.clone()).unwrap();

        let task = orchestrator
            .run(
                IngestionRequest::local(dir.path()),
                CancellationToken::new(),
                None,
            )
            .await
            .unwrap();

        assert_eq!(task.state, TaskState::Failed);
        assert!(task.reason.as_deref().unwrap().contains("persistence"));
        assert_eq!(task.files_processed, 2, "first batch committed");
        assert_eq!(store.resource_count(), 2, "committed batch not rolled back");
        assert_eq!(events.batch_count(), 1, "only the committed batch was announced");
    }

    #[tokio::test]
    async fn test_non_utf8_file_skipped_silently() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("good.py"), "x = 1\n").unwrap();
        // Invalid UTF-8 without a NUL byte sneaks past the crawler's sniff
        fs::write(dir.path().join("weird.py"), [0xC3u8, 0x28, 0x20, 0x21]).unwrap();

        let store = Arc::new(MemoryStore::new());
        let events = Arc::new(MemoryEvents::new());
        let orchestrator =
            Orchestrator::new(config_for(dir.path()), store.clone(), events.clone()).unwrap();

        let task = orchestrator
            .run(
                IngestionRequest::local(dir.path()),
                CancellationToken::new(),
                None,
            )
            .await
            .unwrap();

        assert_eq!(task.state, TaskState::Completed);
        assert_eq!(task.files_processed, 1);
        assert!(task.failed_files.is_empty(), "non-UTF-8 is skipped, not failed");
    }

    #[tokio::test]
    async fn test_unreadable_file_recorded_not_fatal() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("ok.py"), "def fine():\n    pass\n").unwrap();

        let store = Arc::new(MemoryStore::new());
        let events = Arc::new(MemoryEvents::new());
        let orchestrator =
            Orchestrator::new(config_for(dir.path()), store.clone(), events).unwrap();

        // A candidate whose file vanished between crawl and read
        let ghost = CandidateFile {
            path: dir.path().join("ghost.py"),
            relative_path: "ghost.py".into(),
            size: 4,
        };
        let good = CandidateFile {
            path: dir.path().join("ok.py"),
            relative_path: "ok.py".into(),
            size: 4,
        };
        let repo = RepoMetadata::local(dir.path().to_path_buf());
        let mut task = IngestionTask::new(&IngestSource::Path(dir.path().to_path_buf()));
        task.files_total = 2;
        task.transition(TaskState::Processing);

        orchestrator
            .process_batch(&[ghost, good], &repo, &mut task)
            .unwrap();

        assert_eq!(task.files_processed, 1, "readable file still committed");
        assert_eq!(task.failed_files.len(), 1);
        assert_eq!(task.failed_files[0].path, "ghost.py");
        assert_eq!(task.failed_files[0].error_kind, FileErrorKind::Read);
        assert!(store.chunks_for("ok.py").is_some());
    }

    #[tokio::test]
    async fn test_wall_clock_ceiling_fails_task() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.py"), "def f():\n    pass\n").unwrap();

        let store = Arc::new(MemoryStore::new());
        let events = Arc::new(MemoryEvents::new());
        let config = Config {
            task_timeout_secs: 0,
            ..config_for(dir.path())
        };
        let orchestrator = Orchestrator::new(config, store.clone(), events).unwrap();

        let task = orchestrator
            .run(
                IngestionRequest::local(dir.path()),
                CancellationToken::new(),
                None,
            )
            .await
            .unwrap();

        assert_eq!(task.state, TaskState::Failed);
        assert_eq!(task.reason.as_deref(), Some("timeout"));
        assert_eq!(task.files_processed, 0);
        assert_eq!(store.resource_count(), 0, "no batch started past the deadline");
    }

    #[tokio::test]
    async fn test_progress_snapshots_are_monotonic() {
        let dir = tempdir().unwrap();
        for i in 0..6 {
            fs::write(dir.path().join(format!("f{i}.py")), "x = 1\n").unwrap();
        }

        let store = Arc::new(MemoryStore::new());
        let events = Arc::new(MemoryEvents::new());
        let config = Config {
            batch_size: 2,
            ..config_for(dir.path())
        };
        let orchestrator = Orchestrator::new(config, store, events).unwrap();

        let (tx, rx) = watch::channel(TaskStatus::default());
        let task = orchestrator
            .run(
                IngestionRequest::local(dir.path()),
                CancellationToken::new(),
                Some(tx),
            )
            .await
            .unwrap();

        assert_eq!(task.state, TaskState::Completed);
        let last = rx.borrow();
        assert_eq!(last.state, TaskState::Completed);
        assert_eq!(last.files_processed, 6);
    }

    #[tokio::test]
    async fn test_preflight_validation_produces_no_task() {
        let dir = tempdir().unwrap();
        let store = Arc::new(MemoryStore::new());
        let events = Arc::new(MemoryEvents::new());
        let orchestrator =
            Orchestrator::new(config_for(dir.path()), store.clone(), events).unwrap();

        let err = orchestrator
            .run(IngestionRequest::default(), CancellationToken::new(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::PathValidation(_)));
        assert_eq!(store.resource_count(), 0);
    }
}
