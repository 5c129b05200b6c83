//! rumqttc-driven broker client
//!
//! Owns the event loop and feeds every polled event through
//! [`MessageHandler::route_mqtt_event`] into the [`PalletListener`].

use super::connection::{configure_mqtt_options, MqttError};
use super::listener::PalletListener;
use super::message_handler::{MessageHandler, PalletMessageHandler};
use super::state::ListenerState;
use crate::config::WorkerConfig;
use crate::transport::BrokerSession;
use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, EventLoop, Outgoing, QoS};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

const REQUEST_CHANNEL_CAPACITY: usize = 10;
const DISCONNECT_FLUSH_TIMEOUT: Duration = Duration::from_millis(500);

#[async_trait]
impl BrokerSession for AsyncClient {
    async fn subscribe(&self, topic: &str) -> Result<(), MqttError> {
        AsyncClient::subscribe(self, topic, QoS::AtLeastOnce)
            .await
            .map_err(|e| MqttError::SubscriptionFailed {
                topic: topic.to_string(),
                source: Box::new(e),
            })
    }

    async fn disconnect(&self) -> Result<(), MqttError> {
        AsyncClient::disconnect(self)
            .await
            .map_err(|e| MqttError::DisconnectFailed(Box::new(e)))
    }
}

/// Broker client for the pallet worker
pub struct MqttClient {
    listener: PalletListener<AsyncClient>,
    event_loop: EventLoop,
    reconnect_delay: Duration,
    broker: String,
}

impl MqttClient {
    pub fn new(
        config: &WorkerConfig,
        handler: Arc<PalletMessageHandler>,
    ) -> Result<Self, MqttError> {
        let mqtt_options = configure_mqtt_options(config)?;
        let (client, event_loop) = AsyncClient::new(mqtt_options, REQUEST_CHANNEL_CAPACITY);

        Ok(Self {
            listener: PalletListener::new(client, handler),
            event_loop,
            reconnect_delay: config.reconnect_delay(),
            broker: format!("{}:{}", config.mqtt.host, config.mqtt.port),
        })
    }

    pub fn state(&self) -> ListenerState {
        self.listener.state()
    }

    /// Drive the connection until shutdown is signalled
    ///
    /// Returns an error only when the broker never answered a CONNECT. Messages are handled one at a time; a shutdown signal
    /// received mid-pallet takes effect once that pallet is done.
    pub async fn run(&mut self, mut shutdown_rx: watch::Receiver<bool>) -> Result<(), MqttError> {
        info!(broker = %self.broker, "Connecting to MQTT broker");
        self.listener.begin_connect();

        loop {
            if *shutdown_rx.borrow() {
                break;
            }

            tokio::select! {
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("Shutdown signal received, stopping MQTT listener");
                        break;
                    }
                }

                event = self.event_loop.poll() => {
                    match event {
                        Ok(event) => {
                            let route = MessageHandler::route_mqtt_event(&event);
                            self.listener.handle_route(route).await;
                        }
                        Err(e) => {
                            self.listener.handle_connection_error(e)?;
                            debug!(
                                delay_ms = self.reconnect_delay.as_millis() as u64,
                                "Waiting before reconnecting"
                            );
                            tokio::select! {
                                _ = tokio::time::sleep(self.reconnect_delay) => {}
                                _ = shutdown_rx.changed() => {}
                            }
                        }
                    }
                }
            }
        }

        Ok(())
    }

    /// Send DISCONNECT and give the event loop a moment to flush it
    ///
    /// Nothing is flushed when no connection was ever accepted.
    pub async fn disconnect(&mut self) {
        let was_connected = self.listener.has_connected();
        self.listener.shutdown().await;

        if was_connected {
            self.flush_disconnect().await;
        }
        info!("Disconnected from MQTT broker.");
    }

    async fn flush_disconnect(&mut self) {
        let flushed = tokio::time::timeout(DISCONNECT_FLUSH_TIMEOUT, async {
            loop {
                match self.event_loop.poll().await {
                    Ok(Event::Outgoing(Outgoing::Disconnect)) | Err(_) => break,
                    Ok(_) => {}
                }
            }
        })
        .await;

        if flushed.is_err() {
            warn!("Timed out flushing DISCONNECT to broker");
        }
    }
}
