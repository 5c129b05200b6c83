//! Broker connection settings and connect-class errors
//!
//! Pure functions only; nothing here touches the network.

use crate::config::WorkerConfig;
use rumqttc::{ConnectReturnCode, MqttOptions};
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Broker-side failures
#[derive(Debug, Error)]
pub enum MqttError {
    #[error("Could not connect to MQTT broker: {0}")]
    ConnectionFailed(#[source] rumqttc::ConnectionError),
    #[error("Subscription to {topic} failed")]
    SubscriptionFailed {
        topic: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("Disconnect failed")]
    DisconnectFailed(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("Invalid broker options: {0}")]
    InvalidOptions(String),
}

/// Client id: configured value, or `pallet-worker-{plugin_id}-{uuid}`
pub fn resolve_client_id(config: &WorkerConfig) -> Result<String, MqttError> {
    match &config.mqtt.client_id {
        Some(id) if id.is_empty() || id.starts_with(' ') => Err(MqttError::InvalidOptions(
            format!("client id '{id}' must be non-empty and not start with a space"),
        )),
        Some(id) => Ok(id.clone()),
        None => Ok(format!(
            "pallet-worker-{}-{}",
            config.plugin.id,
            Uuid::new_v4().simple()
        )),
    }
}

/// Build rumqttc options from worker configuration
pub fn configure_mqtt_options(config: &WorkerConfig) -> Result<MqttOptions, MqttError> {
    let client_id = resolve_client_id(config)?;
    let mut mqtt_options = MqttOptions::new(client_id, config.mqtt.host.clone(), config.mqtt.port);

    if !config.mqtt.username.is_empty() {
        mqtt_options.set_credentials(config.mqtt.username.clone(), config.mqtt.password.clone());
    }

    mqtt_options.set_keep_alive(Duration::from_secs(config.mqtt.keep_alive_secs));
    mqtt_options.set_clean_session(true);

    Ok(mqtt_options)
}

/// Numeric CONNACK return code as defined by MQTT 3.1.1
pub fn connect_return_code(code: ConnectReturnCode) -> u8 {
    match code {
        ConnectReturnCode::Success => 0,
        ConnectReturnCode::RefusedProtocolVersion => 1,
        ConnectReturnCode::BadClientId => 2,
        ConnectReturnCode::ServiceUnavailable => 3,
        ConnectReturnCode::BadUserNamePassword => 4,
        ConnectReturnCode::NotAuthorized => 5,
    }
}

/// Human-readable reason for a CONNACK return code
pub fn describe_connect_code(code: u8) -> &'static str {
    match code {
        0 => "connection accepted",
        1 => "unacceptable protocol version",
        2 => "identifier rejected",
        3 => "server unavailable",
        4 => "bad user name or password",
        5 => "not authorized",
        _ => "unknown return code",
    }
}
