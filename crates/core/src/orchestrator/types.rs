use crate::artifact::ArtifactError;
use crate::request::RequestError;

/// Error type for orchestrator operations.
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    /// Request store failure.
    #[error(transparent)]
    Store(#[from] RequestError),

    /// Artifact generation failure.
    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    /// The worker queue is closed (orchestrator stopped or never started).
    #[error("Orchestrator queue is closed")]
    QueueClosed,
}

/// Snapshot of orchestrator state for the server surface.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct OrchestratorStatus {
    /// Whether the worker loop is running.
    pub running: bool,
    /// Request ids waiting in the queue.
    pub queued: usize,
}
