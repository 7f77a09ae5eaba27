/// External collaborator interfaces consumed by the orchestrator, plus
/// in-memory implementations used by tests and the CLI.
use crate::crawler::{CandidateFile, RepoMetadata};
use crate::error::StoreError;
use crate::extractor::GraphRelationship;
use crate::segmenter::CodeChunk;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Persistence collaborator. All three calls happen once per batch and the
/// implementation is expected to scope them transactionally per batch.
pub trait PersistenceStore: Send + Sync {
    fn save_resource(&self, file: &CandidateFile, repo: &RepoMetadata) -> Result<Uuid, StoreError>;

    fn save_chunks(&self, resource_id: Uuid, chunks: &[CodeChunk]) -> Result<(), StoreError>;

    fn save_relationships(&self, relationships: &[GraphRelationship]) -> Result<(), StoreError>;
}

/// Event collaborator. One call per batch carrying every resource ingested
/// in that batch, to bound event volume.
pub trait EventSink: Send + Sync {
    fn resources_ingested(&self, resource_ids: &[Uuid]);
}

impl<T: PersistenceStore + ?Sized> PersistenceStore for Arc<T> {
    fn save_resource(&self, file: &CandidateFile, repo: &RepoMetadata) -> Result<Uuid, StoreError> {
        (**self).save_resource(file, repo)
    }

    fn save_chunks(&self, resource_id: Uuid, chunks: &[CodeChunk]) -> Result<(), StoreError> {
        (**self).save_chunks(resource_id, chunks)
    }

    fn save_relationships(&self, relationships: &[GraphRelationship]) -> Result<(), StoreError> {
        (**self).save_relationships(relationships)
    }
}

impl<T: EventSink + ?Sized> EventSink for Arc<T> {
    fn resources_ingested(&self, resource_ids: &[Uuid]) {
        (**self).resources_ingested(resource_ids)
    }
}

#[derive(Default)]
struct MemoryStoreInner {
    resources: Vec<(Uuid, String)>,
    chunks: HashMap<Uuid, Vec<CodeChunk>>,
    relationships: Vec<GraphRelationship>,
}

/// In-memory store for tests and the CLI. Can be switched into a failing
/// mode to exercise the fatal persistence path.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryStoreInner>,
    fail: AtomicBool,
    fail_after: Mutex<Option<usize>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent save call fail.
    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Fail `save_resource` once `n` resources have been stored.
    pub fn fail_after_resources(&self, n: usize) {
        *self.fail_after.lock().unwrap() = Some(n);
    }

    fn check_fail(&self) -> Result<(), StoreError> {
        if self.fail.load(Ordering::SeqCst) {
            Err(StoreError("injected store failure".into()))
        } else {
            Ok(())
        }
    }

    #[must_use]
    pub fn resource_count(&self) -> usize {
        self.inner.lock().unwrap().resources.len()
    }

    #[must_use]
    pub fn relationships(&self) -> Vec<GraphRelationship> {
        self.inner.lock().unwrap().relationships.clone()
    }

    /// Chunks saved for a resource, looked up by its relative path.
    #[must_use]
    pub fn chunks_for(&self, relative_path: &str) -> Option<Vec<CodeChunk>> {
        let inner = self.inner.lock().unwrap();
        let id = inner
            .resources
            .iter()
            .find(|(_, path)| path == relative_path)
            .map(|(id, _)| *id)?;
        inner.chunks.get(&id).cloned()
    }

    #[must_use]
    pub fn chunk_count(&self) -> usize {
        self.inner.lock().unwrap().chunks.values().map(Vec::len).sum()
    }
}

impl PersistenceStore for MemoryStore {
    fn save_resource(&self, file: &CandidateFile, _repo: &RepoMetadata) -> Result<Uuid, StoreError> {
        self.check_fail()?;
        let mut inner = self.inner.lock().unwrap();
        if let Some(limit) = *self.fail_after.lock().unwrap() {
            if inner.resources.len() >= limit {
                return Err(StoreError("injected store failure".into()));
            }
        }
        let id = Uuid::new_v4();
        inner.resources.push((id, file.relative_path.clone()));
        Ok(id)
    }

    fn save_chunks(&self, resource_id: Uuid, chunks: &[CodeChunk]) -> Result<(), StoreError> {
        self.check_fail()?;
        self.inner
            .lock()
            .unwrap()
            .chunks
            .insert(resource_id, chunks.to_vec());
        Ok(())
    }

    fn save_relationships(&self, relationships: &[GraphRelationship]) -> Result<(), StoreError> {
        self.check_fail()?;
        self.inner
            .lock()
            .unwrap()
            .relationships
            .extend_from_slice(relationships);
        Ok(())
    }
}

/// In-memory event sink recording one entry per batch notification.
#[derive(Default)]
pub struct MemoryEvents {
    batches: Mutex<Vec<Vec<Uuid>>>,
}

impl MemoryEvents {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn batch_count(&self) -> usize {
        self.batches.lock().unwrap().len()
    }

    #[must_use]
    pub fn total_resources(&self) -> usize {
        self.batches.lock().unwrap().iter().map(Vec::len).sum()
    }
}

impl EventSink for MemoryEvents {
    fn resources_ingested(&self, resource_ids: &[Uuid]) {
        self.batches.lock().unwrap().push(resource_ids.to_vec());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn candidate(path: &str) -> CandidateFile {
        CandidateFile {
            path: PathBuf::from(path),
            relative_path: path.to_string(),
            size: 10,
        }
    }

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryStore::new();
        let repo = RepoMetadata::local(PathBuf::from("/repo"));
        let id = store.save_resource(&candidate("a.py"), &repo).unwrap();
        store.save_chunks(id, &[]).unwrap();
        assert_eq!(store.resource_count(), 1);
        assert!(store.chunks_for("a.py").is_some());
        assert!(store.chunks_for("missing.py").is_none());
    }

    #[test]
    fn test_memory_store_failure_injection() {
        let store = MemoryStore::new();
        store.set_fail(true);
        let repo = RepoMetadata::local(PathBuf::from("/repo"));
        assert!(store.save_resource(&candidate("a.py"), &repo).is_err());

        store.set_fail(false);
        assert!(store.save_resource(&candidate("a.py"), &repo).is_ok());
    }

    #[test]
    fn test_memory_events_batching() {
        let events = MemoryEvents::new();
        events.resources_ingested(&[Uuid::new_v4(), Uuid::new_v4()]);
        events.resources_ingested(&[Uuid::new_v4()]);
        assert_eq!(events.batch_count(), 2);
        assert_eq!(events.total_resources(), 3);
    }
}
