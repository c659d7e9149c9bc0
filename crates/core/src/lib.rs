pub mod artifact;
pub mod config;
pub mod manifest;
pub mod notify;
pub mod orchestrator;
pub mod request;
pub mod status;
pub mod testing;
pub mod transform;

pub use artifact::{ArtifactConfig, ArtifactError, ArtifactGenerator};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, DatabaseConfig,
    SanitizedConfig, ServerConfig,
};
pub use manifest::{parse_manifest, validate_manifest, LineItem, ManifestError};
pub use notify::{Notifier, NotifyError, WebhookConfig, WebhookNotifier};
pub use orchestrator::{
    OrchestratorConfig, OrchestratorError, OrchestratorHandle, OrchestratorStatus,
    ProcessingOrchestrator,
};
pub use request::{
    Item, ProcessingRequest, RequestError, RequestStatus, RequestStore, SqliteRequestStore,
};
pub use status::{ItemView, StatusReporter, StatusView};
pub use transform::compress_ref;
