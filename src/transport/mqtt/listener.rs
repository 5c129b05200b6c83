//! Listener reactions to broker events
//!
//! [`PalletListener`] decides what to do for each routed event: subscribe
//! on CONNACK, log refused connects, dispatch messages one at a time. It
//! only talks to the broker through a [`BrokerSession`], so tests drive it
//! with a mock session.

use super::connection::{connect_return_code, describe_connect_code, MqttError};
use super::message_handler::{EventRoute, MessageDisposition, MessageHandler, PalletMessageHandler};
use super::state::{next_state, ListenerEvent, ListenerState};
use crate::transport::BrokerSession;
use rumqttc::ConnectionError;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub struct PalletListener<S: BrokerSession> {
    session: S,
    handler: Arc<PalletMessageHandler>,
    state: ListenerState,
    connected_once: bool,
    broker_reached: bool,
}

impl<S: BrokerSession> PalletListener<S> {
    pub fn new(session: S, handler: Arc<PalletMessageHandler>) -> Self {
        Self {
            session,
            handler,
            state: ListenerState::Disconnected,
            connected_once: false,
            broker_reached: false,
        }
    }

    pub fn state(&self) -> ListenerState {
        self.state
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    /// Whether a CONNACK was ever accepted on this listener
    pub fn has_connected(&self) -> bool {
        self.connected_once
    }

    /// Whether the broker ever answered a CONNECT, accepted or refused
    pub fn has_reached_broker(&self) -> bool {
        self.broker_reached
    }

    fn transition(&mut self, event: ListenerEvent) {
        self.state = next_state(self.state, &event);
    }

    pub fn begin_connect(&mut self) {
        self.transition(ListenerEvent::ConnectStarted);
    }

    /// React to one routed broker event
    ///
    /// Returns the disposition when the event carried a message.
    pub async fn handle_route(&mut self, route: EventRoute) -> Option<MessageDisposition> {
        match route {
            EventRoute::ConnectionAcknowledged => {
                self.on_connected().await;
                None
            }
            EventRoute::ConnectionRefused(code) => {
                self.on_connect_refused(code);
                None
            }
            EventRoute::MessageReceived { topic, payload } => {
                info!("Received message on topic {}", topic);
                self.transition(ListenerEvent::DispatchStarted);
                let disposition = self.handler.dispatch(topic, payload).await;
                self.transition(ListenerEvent::DispatchFinished);
                debug!(?disposition, "Message handled");
                Some(disposition)
            }
            EventRoute::Disconnected => {
                warn!("MQTT broker closed the connection");
                self.transition(ListenerEvent::ConnectionLost);
                None
            }
            EventRoute::SubscriptionConfirmed {
                packet_id,
                return_codes,
            } => {
                match MessageHandler::validate_subscription_success(&return_codes) {
                    Ok(()) => {
                        debug!(target: "mqtt_transport", packet_id, "Subscription confirmed")
                    }
                    Err(e) => error!(packet_id, "{}", e),
                }
                None
            }
            EventRoute::InfrastructureEvent(event) => {
                debug!(target: "mqtt_transport", "MQTT event: {}", event);
                None
            }
            EventRoute::OutgoingEvent => None,
        }
    }

    /// React to an event-loop error
    ///
    /// A transport error is fatal only while the broker has never answered a
    /// CONNECT. Once any CONNACK arrived, accepted or refused, errors are
    /// logged and left to the transport to retry.
    pub fn handle_connection_error(&mut self, err: ConnectionError) -> Result<(), MqttError> {
        if let ConnectionError::ConnectionRefused(code) = err {
            self.on_connect_refused(connect_return_code(code));
            return Ok(());
        }

        if !self.broker_reached {
            self.transition(ListenerEvent::ConnectFailed);
            return Err(MqttError::ConnectionFailed(err));
        }

        if self.connected_once {
            error!("Lost connection to MQTT broker: {}", err);
        } else {
            error!("Connection to MQTT broker failed: {}", err);
        }
        self.transition(ListenerEvent::ConnectionLost);
        Ok(())
    }

    async fn on_connected(&mut self) {
        info!("Connected to MQTT Broker!");
        self.connected_once = true;
        self.broker_reached = true;
        self.transition(ListenerEvent::ConnAckReceived);

        let topic = self.handler.topic().to_string();
        match self.session.subscribe(&topic).await {
            Ok(()) => info!("Subscribed to topic: {}", topic),
            Err(e) => error!("Failed to subscribe to {}: {}", topic, e),
        }
    }

    fn on_connect_refused(&mut self, code: u8) {
        self.broker_reached = true;
        error!(
            return_code = code,
            reason = describe_connect_code(code),
            "Failed to connect, return code {}",
            code
        );
        self.transition(ListenerEvent::ConnectRefused(code));
    }

    /// Disconnect from the broker; the listener ends in `Disconnected`
    pub async fn shutdown(&mut self) {
        if let Err(e) = self.session.disconnect().await {
            debug!("Disconnect request not delivered: {}", e);
        }
        self.transition(ListenerEvent::Shutdown);
    }
}
