//! Ingestion orchestration: task records and state machine, external
//! collaborator interfaces, and the batch-driven orchestrator itself.

pub mod orchestrator;
pub mod sinks;
pub mod task;

pub use orchestrator::Orchestrator;
pub use sinks::{EventSink, MemoryEvents, MemoryStore, PersistenceStore};
pub use task::{
    FailedFile, IngestSource, IngestionRequest, IngestionTask, TaskState, TaskStatus,
};
