//! Processing orchestrator.
//!
//! Drives accepted requests through the pipeline in the background:
//! accept path enqueues a request id and returns immediately; a worker loop
//! consumes the queue and spawns one independent run per request.

mod config;
mod runner;
mod types;

pub use config::OrchestratorConfig;
pub use runner::{OrchestratorHandle, ProcessingOrchestrator};
pub use types::{OrchestratorError, OrchestratorStatus};
