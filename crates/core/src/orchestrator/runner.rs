//! Processing orchestrator implementation.
//!
//! One run per request id: load, transition to processing, transform every
//! item sequentially, commit outputs with completion, render the artifact,
//! fire the webhook. A run that dies mid-flight keeps whatever it already
//! committed; there is no retry and no explicit failed transition.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, Mutex};
use tracing::{debug, info, warn};

use crate::artifact::ArtifactGenerator;
use crate::notify::Notifier;
use crate::request::{RequestStatus, RequestStore};
use crate::transform::compress_ref;

use super::config::OrchestratorConfig;
use super::types::{OrchestratorError, OrchestratorStatus};

/// Cloneable handle for enqueueing accepted requests.
///
/// The accept path holds one of these; it never awaits the run itself.
#[derive(Clone)]
pub struct OrchestratorHandle {
    tx: mpsc::Sender<String>,
}

impl OrchestratorHandle {
    /// Schedule a background run for the given request id.
    pub async fn enqueue(&self, request_id: String) -> Result<(), OrchestratorError> {
        self.tx
            .send(request_id)
            .await
            .map_err(|_| OrchestratorError::QueueClosed)
    }
}

/// The processing orchestrator - drives requests from pending to completed.
pub struct ProcessingOrchestrator {
    config: OrchestratorConfig,
    store: Arc<dyn RequestStore>,
    artifacts: Arc<ArtifactGenerator>,
    notifier: Option<Arc<dyn Notifier>>,

    // Runtime state
    running: Arc<AtomicBool>,
    tx: mpsc::Sender<String>,
    rx: Mutex<Option<mpsc::Receiver<String>>>,
    shutdown_tx: broadcast::Sender<()>,
}

impl ProcessingOrchestrator {
    /// Create a new orchestrator. Call `start` to spawn the worker loop.
    pub fn new(
        config: OrchestratorConfig,
        store: Arc<dyn RequestStore>,
        artifacts: ArtifactGenerator,
        notifier: Option<Arc<dyn Notifier>>,
    ) -> Self {
        let (tx, rx) = mpsc::channel(config.queue_capacity);
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            config,
            store,
            artifacts: Arc::new(artifacts),
            notifier,
            running: Arc::new(AtomicBool::new(false)),
            tx,
            rx: Mutex::new(Some(rx)),
            shutdown_tx,
        }
    }

    /// Get a handle for enqueueing requests.
    pub fn handle(&self) -> OrchestratorHandle {
        OrchestratorHandle {
            tx: self.tx.clone(),
        }
    }

    /// Start the orchestrator (spawns the worker loop).
    pub async fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Orchestrator already running");
            return;
        }

        let Some(mut rx) = self.rx.lock().await.take() else {
            warn!("Orchestrator worker already consumed");
            return;
        };

        info!("Starting processing orchestrator");

        let running = Arc::clone(&self.running);
        let store = Arc::clone(&self.store);
        let artifacts = Arc::clone(&self.artifacts);
        let notifier = self.notifier.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            info!("Orchestrator worker loop started");
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("Orchestrator worker received shutdown signal");
                        break;
                    }
                    request_id = rx.recv() => {
                        let Some(request_id) = request_id else {
                            break;
                        };
                        if !running.load(Ordering::Relaxed) {
                            break;
                        }

                        // Each request runs independently so distinct
                        // requests can process concurrently.
                        let store = Arc::clone(&store);
                        let artifacts = Arc::clone(&artifacts);
                        let notifier = notifier.clone();
                        tokio::spawn(async move {
                            Self::run_request(store, artifacts, notifier, request_id).await;
                        });
                    }
                }
            }
            info!("Orchestrator worker loop stopped");
        });
    }

    /// Stop the orchestrator. Runs already spawned are not cancelled.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            warn!("Orchestrator not running");
            return;
        }

        info!("Stopping processing orchestrator");
        let _ = self.shutdown_tx.send(());
    }

    /// Get current orchestrator status.
    pub fn status(&self) -> OrchestratorStatus {
        OrchestratorStatus {
            running: self.running.load(Ordering::Relaxed),
            queued: self.config.queue_capacity - self.tx.capacity(),
        }
    }

    /// Execute one run. Never returns an error to the caller: nobody awaits
    /// a run, so failures are logged and the request keeps its last
    /// committed status.
    async fn run_request(
        store: Arc<dyn RequestStore>,
        artifacts: Arc<ArtifactGenerator>,
        notifier: Option<Arc<dyn Notifier>>,
        request_id: String,
    ) {
        match store.get(&request_id) {
            Ok(Some(_)) => {}
            Ok(None) => {
                // Fire-and-forget: an unknown id aborts silently.
                debug!("Run skipped, request {} not found", request_id);
                return;
            }
            Err(e) => {
                warn!("Run aborted, failed to load request {}: {}", request_id, e);
                return;
            }
        }

        if let Err(e) = Self::drive(&store, &artifacts, &request_id).await {
            warn!(
                "Run for request {} aborted at last committed status: {}",
                request_id, e
            );
            return;
        }

        // Notification failure never touches the completed request.
        if let Some(notifier) = notifier {
            if let Err(e) = notifier.notify(&request_id).await {
                warn!("Completion webhook failed for request {}: {}", request_id, e);
            }
        } else {
            debug!("No notifier configured, skipping completion webhook");
        }
    }

    /// The fallible part of a run, through artifact commit.
    async fn drive(
        store: &Arc<dyn RequestStore>,
        artifacts: &ArtifactGenerator,
        request_id: &str,
    ) -> Result<(), OrchestratorError> {
        store.update_status(request_id, RequestStatus::Processing)?;
        debug!("Request {} processing", request_id);

        let request = store
            .get(request_id)?
            .ok_or_else(|| crate::request::RequestError::NotFound(request_id.to_string()))?;

        // Sequential per item; refs are independent so order is the only
        // observable property.
        let outputs: Vec<Vec<String>> = request
            .items
            .iter()
            .map(|item| item.input_refs.iter().map(|r| compress_ref(r)).collect())
            .collect();

        store.complete_with_outputs(request_id, &outputs)?;

        // Re-read so the artifact renders the committed outputs.
        let completed = store
            .get(request_id)?
            .ok_or_else(|| crate::request::RequestError::NotFound(request_id.to_string()))?;

        let artifact_ref = artifacts.generate(&completed)?;
        store.set_artifact(request_id, &artifact_ref)?;

        info!("Request {} completed", request_id);
        Ok(())
    }
}
