//! Worker configuration
//!
//! Built once at startup and handed to each component's constructor.
//! Resolution order: built-in defaults, then an optional TOML file, then
//! environment variables.

use crate::protocol::topics::{validate_plugin_id, ValidationError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use url::Url;

pub const ENV_MQTT_BROKER_HOST: &str = "MQTT_BROKER_HOST";
pub const ENV_MQTT_BROKER_PORT: &str = "MQTT_BROKER_PORT";
pub const ENV_MQTT_USERNAME: &str = "MQTT_USERNAME";
pub const ENV_MQTT_PASSWORD: &str = "MQTT_PASSWORD";
pub const ENV_MQTT_KEEP_ALIVE_SECS: &str = "MQTT_KEEP_ALIVE_SECS";
pub const ENV_MQTT_CLIENT_ID: &str = "MQTT_CLIENT_ID";
pub const ENV_MQTT_RECONNECT_DELAY_MS: &str = "MQTT_RECONNECT_DELAY_MS";
pub const ENV_QUALITY_API_URL: &str = "QUALITY_API_URL";
pub const ENV_QUALITY_API_KEY: &str = "QUALITY_API_KEY";
pub const ENV_QUALITY_API_TIMEOUT_SECS: &str = "QUALITY_API_TIMEOUT_SECS";
pub const ENV_PLUGIN_ID: &str = "PLUGIN_ID";
pub const ENV_ANALYSIS_DELAY_MS: &str = "ANALYSIS_DELAY_MS";

const MASK: &str = "***";

/// Top-level worker configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WorkerConfig {
    #[serde(default)]
    pub mqtt: MqttSection,
    #[serde(default)]
    pub quality_api: QualityApiSection,
    #[serde(default)]
    pub plugin: PluginSection,
    #[serde(default)]
    pub analysis: AnalysisSection,
}

/// Broker connection settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MqttSection {
    #[serde(default = "default_mqtt_host")]
    pub host: String,
    #[serde(default = "default_mqtt_port")]
    pub port: u16,
    /// Empty username means connect anonymously
    #[serde(default = "default_mqtt_username")]
    pub username: String,
    #[serde(default = "default_mqtt_password")]
    pub password: String,
    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_secs: u64,
    /// Generated from the plugin id when unset
    #[serde(default)]
    pub client_id: Option<String>,
    /// Pause before polling the event loop again after a transport error
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
}

fn default_mqtt_host() -> String {
    "mqtt-host".to_string()
}

fn default_mqtt_port() -> u16 {
    1883
}

fn default_mqtt_username() -> String {
    "your-username".to_string()
}

fn default_mqtt_password() -> String {
    "your-password".to_string()
}

fn default_keep_alive_secs() -> u64 {
    60
}

fn default_reconnect_delay_ms() -> u64 {
    1000
}

impl Default for MqttSection {
    fn default() -> Self {
        Self {
            host: default_mqtt_host(),
            port: default_mqtt_port(),
            username: default_mqtt_username(),
            password: default_mqtt_password(),
            keep_alive_secs: default_keep_alive_secs(),
            client_id: None,
            reconnect_delay_ms: default_reconnect_delay_ms(),
        }
    }
}

/// Quality API settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QualityApiSection {
    #[serde(default = "default_api_url")]
    pub base_url: String,
    #[serde(default = "default_api_key")]
    pub api_key: String,
    /// Total request timeout; `None` keeps the transport default (no timeout)
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_api_url() -> String {
    "https://east.arvistcloud.net/api/v1".to_string()
}

fn default_api_key() -> String {
    "your-api-key".to_string()
}

impl Default for QualityApiSection {
    fn default() -> Self {
        Self {
            base_url: default_api_url(),
            api_key: default_api_key(),
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PluginSection {
    #[serde(default = "default_plugin_id")]
    pub id: String,
}

fn default_plugin_id() -> String {
    "your-plugin-id".to_string()
}

impl Default for PluginSection {
    fn default() -> Self {
        Self {
            id: default_plugin_id(),
        }
    }
}

/// Settings for the placeholder analysis stage
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisSection {
    #[serde(default = "default_analysis_delay_ms")]
    pub delay_ms: u64,
    #[serde(default = "default_model_version")]
    pub model_version: String,
}

fn default_analysis_delay_ms() -> u64 {
    5000
}

fn default_model_version() -> String {
    "1.2.3".to_string()
}

impl Default for AnalysisSection {
    fn default() -> Self {
        Self {
            delay_ms: default_analysis_delay_ms(),
            model_version: default_model_version(),
        }
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Environment variable {name} has invalid value '{value}'")]
    InvalidEnvValue { name: String, value: String },
    #[error("Invalid plugin ID: {0}")]
    InvalidPluginId(#[from] ValidationError),
    #[error("Invalid Quality API URL '{url}': {reason}")]
    InvalidApiUrl { url: String, reason: String },
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl WorkerConfig {
    /// Defaults overridden by the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(None)
    }

    /// Load from an optional TOML file, then apply the process environment
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::load_from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file without consulting the environment
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: WorkerConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Override fields from environment-style lookups
    ///
    /// `lookup` returns the raw value for a variable name, if set.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup(ENV_MQTT_BROKER_HOST) {
            self.mqtt.host = host;
        }
        if let Some(raw) = lookup(ENV_MQTT_BROKER_PORT) {
            self.mqtt.port = parse_env(ENV_MQTT_BROKER_PORT, raw)?;
        }
        if let Some(username) = lookup(ENV_MQTT_USERNAME) {
            self.mqtt.username = username;
        }
        if let Some(password) = lookup(ENV_MQTT_PASSWORD) {
            self.mqtt.password = password;
        }
        if let Some(raw) = lookup(ENV_MQTT_KEEP_ALIVE_SECS) {
            self.mqtt.keep_alive_secs = parse_env(ENV_MQTT_KEEP_ALIVE_SECS, raw)?;
        }
        if let Some(client_id) = lookup(ENV_MQTT_CLIENT_ID) {
            self.mqtt.client_id = Some(client_id);
        }
        if let Some(raw) = lookup(ENV_MQTT_RECONNECT_DELAY_MS) {
            self.mqtt.reconnect_delay_ms = parse_env(ENV_MQTT_RECONNECT_DELAY_MS, raw)?;
        }
        if let Some(url) = lookup(ENV_QUALITY_API_URL) {
            self.quality_api.base_url = url;
        }
        if let Some(key) = lookup(ENV_QUALITY_API_KEY) {
            self.quality_api.api_key = key;
        }
        if let Some(raw) = lookup(ENV_QUALITY_API_TIMEOUT_SECS) {
            self.quality_api.timeout_secs = Some(parse_env(ENV_QUALITY_API_TIMEOUT_SECS, raw)?);
        }
        if let Some(id) = lookup(ENV_PLUGIN_ID) {
            self.plugin.id = id;
        }
        if let Some(raw) = lookup(ENV_ANALYSIS_DELAY_MS) {
            self.analysis.delay_ms = parse_env(ENV_ANALYSIS_DELAY_MS, raw)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mqtt.host.trim().is_empty() {
            return Err(ConfigError::InvalidConfig(
                "MQTT broker host cannot be empty".to_string(),
            ));
        }
        if self.mqtt.port == 0 {
            return Err(ConfigError::InvalidConfig(
                "MQTT broker port must be non-zero".to_string(),
            ));
        }
        // rumqttc rejects keep-alive intervals below 5 seconds
        if self.mqtt.keep_alive_secs < 5 {
            return Err(ConfigError::InvalidConfig(format!(
                "MQTT keep-alive must be at least 5 seconds, got {}",
                self.mqtt.keep_alive_secs
            )));
        }
        if self.quality_api.timeout_secs == Some(0) {
            return Err(ConfigError::InvalidConfig(
                "Quality API timeout must be non-zero when set".to_string(),
            ));
        }
        // rumqttc panics on these client ids
        if let Some(id) = &self.mqtt.client_id {
            if id.is_empty() || id.starts_with(' ') {
                return Err(ConfigError::InvalidConfig(format!(
                    "MQTT client id '{id}' must be non-empty and not start with a space"
                )));
            }
        }
        validate_plugin_id(&self.plugin.id)?;
        self.api_base_url()?;
        Ok(())
    }

    /// Parsed Quality API base URL; only absolute http(s) URLs are accepted
    pub fn api_base_url(&self) -> Result<Url, ConfigError> {
        let raw = &self.quality_api.base_url;
        let url = Url::parse(raw).map_err(|e| ConfigError::InvalidApiUrl {
            url: raw.clone(),
            reason: e.to_string(),
        })?;

        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(ConfigError::InvalidApiUrl {
                url: raw.clone(),
                reason: format!("unsupported scheme '{other}'"),
            }),
        }
    }

    pub fn api_timeout(&self) -> Option<Duration> {
        self.quality_api.timeout_secs.map(Duration::from_secs)
    }

    pub fn analysis_delay(&self) -> Duration {
        Duration::from_millis(self.analysis.delay_ms)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.mqtt.reconnect_delay_ms)
    }

    /// Copy with secrets replaced, for display
    pub fn masked(&self) -> Self {
        let mut masked = self.clone();
        if !masked.mqtt.password.is_empty() {
            masked.mqtt.password = MASK.to_string();
        }
        if !masked.quality_api.api_key.is_empty() {
            masked.quality_api.api_key = MASK.to_string();
        }
        masked
    }
}

fn parse_env<T: FromStr>(name: &str, raw: String) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidEnvValue {
        name: name.to_string(),
        value: raw,
    })
}
