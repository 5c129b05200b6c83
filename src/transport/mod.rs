//! Broker transport
//!
//! [`BrokerSession`] abstracts the outbound half of a broker connection so the
//! listener's reactions can be exercised without a broker.

pub mod mqtt;

use mqtt::MqttError;

/// Requests the listener makes on its broker connection
#[async_trait::async_trait]
pub trait BrokerSession: Send + Sync {
    /// Subscribe to `topic` at QoS 1
    async fn subscribe(&self, topic: &str) -> Result<(), MqttError>;

    /// Ask the broker to close the connection
    async fn disconnect(&self) -> Result<(), MqttError>;
}
