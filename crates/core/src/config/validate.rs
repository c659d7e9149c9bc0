use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Orchestrator queue capacity is not 0
/// - Webhook URL is non-empty when the section is present
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.orchestrator.queue_capacity == 0 {
        return Err(ConfigError::ValidationError(
            "orchestrator.queue_capacity cannot be 0".to_string(),
        ));
    }

    if let Some(webhook) = &config.webhook {
        if webhook.url.is_empty() {
            return Err(ConfigError::ValidationError(
                "webhook.url cannot be empty".to_string(),
            ));
        }
    }

    Ok(())
}
