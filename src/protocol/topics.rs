//! Broker topics and plugin identifier validation

use thiserror::Error;

/// Topic on which new-pallet notifications arrive
pub const NEW_PALLET_TOPIC: &str = "quality/pallets/new";

/// Reserved results topic; `{plugin_id}` is substituted per plugin
pub const RESULTS_TOPIC_TEMPLATE: &str = "quality/plugins/{plugin_id}/results";

/// Topic construction for the worker
pub struct TopicBuilder;

impl TopicBuilder {
    /// Topic the listener subscribes to
    pub fn build_new_pallet_topic() -> String {
        NEW_PALLET_TOPIC.to_string()
    }

    /// Reserved results topic: `quality/plugins/{plugin_id}/results`
    ///
    /// Nothing publishes here; results are submitted over HTTP.
    pub fn build_results_topic(plugin_id: &str) -> String {
        RESULTS_TOPIC_TEMPLATE.replace("{plugin_id}", plugin_id)
    }
}

/// Plugin identifiers must match `[a-zA-Z0-9._-]+` so they form a single topic level
pub fn validate_plugin_id(plugin_id: &str) -> Result<(), ValidationError> {
    if plugin_id.is_empty() {
        return Err(ValidationError::EmptyPluginId);
    }

    for ch in plugin_id.chars() {
        if !ch.is_ascii_alphanumeric() && ch != '.' && ch != '_' && ch != '-' {
            return Err(ValidationError::InvalidPluginIdChar(ch));
        }
    }

    Ok(())
}

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("Plugin ID cannot be empty")]
    EmptyPluginId,
    #[error("Plugin ID contains invalid character: '{0}'")]
    InvalidPluginIdChar(char),
}
