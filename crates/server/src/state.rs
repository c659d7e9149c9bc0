use std::sync::Arc;

use batchpix_core::{
    Config, OrchestratorHandle, ProcessingOrchestrator, RequestStore, SanitizedConfig,
    StatusReporter,
};

/// Shared application state
pub struct AppState {
    config: Config,
    store: Arc<dyn RequestStore>,
    reporter: StatusReporter,
    orchestrator_handle: OrchestratorHandle,
    orchestrator: Arc<ProcessingOrchestrator>,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn RequestStore>,
        orchestrator: Arc<ProcessingOrchestrator>,
    ) -> Self {
        Self {
            config,
            reporter: StatusReporter::new(Arc::clone(&store)),
            orchestrator_handle: orchestrator.handle(),
            orchestrator,
            store,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn store(&self) -> &Arc<dyn RequestStore> {
        &self.store
    }

    pub fn reporter(&self) -> &StatusReporter {
        &self.reporter
    }

    pub fn orchestrator_handle(&self) -> &OrchestratorHandle {
        &self.orchestrator_handle
    }

    pub fn orchestrator(&self) -> &ProcessingOrchestrator {
        &self.orchestrator
    }
}
