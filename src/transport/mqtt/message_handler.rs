//! Inbound message handling
//!
//! [`MessageHandler`] holds the pure pieces: event routing and payload
//! decoding. [`PalletMessageHandler`] is the handler registered on the
//! connection; it owns the processor and runs it for each decoded event.

use crate::protocol::PalletEvent;
use crate::protocol::topics::TopicBuilder;
use crate::transport::mqtt::connection::connect_return_code;
use crate::worker::processor::{PalletProcessor, ProcessOutcome};
use bytes::Bytes;
use rumqttc::{ConnectReturnCode, Event, Packet, SubscribeReasonCode};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, warn, Instrument};

/// Why an inbound payload could not be turned into a [`PalletEvent`]
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("payload is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),
    #[error("payload is not a JSON object")]
    NotAnObject,
    #[error("message has no 'pallet_id'")]
    MissingPalletId,
    #[error("'pallet_id' has unsupported JSON type {0}")]
    InvalidPalletId(&'static str),
}

/// Pure routing and decoding for broker traffic
pub struct MessageHandler;

impl MessageHandler {
    /// Decode a new-pallet notification body
    ///
    /// Strings and non-zero numbers are accepted as the pallet id. Missing
    /// or empty-ish values (`null`, `""`, `0`, `false`, `[]`, `{}`) count as
    /// absent.
    pub fn decode_pallet_event(payload: &[u8]) -> Result<PalletEvent, DecodeError> {
        let value: Value = serde_json::from_slice(payload).map_err(DecodeError::InvalidJson)?;
        let object = value.as_object().ok_or(DecodeError::NotAnObject)?;

        match object.get("pallet_id") {
            None | Some(Value::Null) | Some(Value::Bool(false)) => {
                Err(DecodeError::MissingPalletId)
            }
            Some(Value::String(id)) if id.is_empty() => Err(DecodeError::MissingPalletId),
            Some(Value::String(id)) => Ok(PalletEvent::new(id.clone())),
            Some(Value::Number(n)) if n.as_f64() == Some(0.0) => Err(DecodeError::MissingPalletId),
            Some(Value::Number(n)) => Ok(PalletEvent::new(n.to_string())),
            Some(Value::Array(items)) if items.is_empty() => Err(DecodeError::MissingPalletId),
            Some(Value::Object(fields)) if fields.is_empty() => Err(DecodeError::MissingPalletId),
            Some(Value::Bool(true)) => Err(DecodeError::InvalidPalletId("boolean")),
            Some(Value::Array(_)) => Err(DecodeError::InvalidPalletId("array")),
            Some(Value::Object(_)) => Err(DecodeError::InvalidPalletId("object")),
        }
    }

    /// Only messages on the subscribed topic are handled
    pub fn should_process_message(topic: &str, expected_topic: &str) -> bool {
        if topic != expected_topic {
            debug!("Topic mismatch: expected {}, got {}", expected_topic, topic);
            return false;
        }
        true
    }

    /// Route a rumqttc event to the listener reaction it needs
    pub fn route_mqtt_event(event: &Event) -> EventRoute {
        match event {
            Event::Incoming(incoming) => match incoming {
                Packet::ConnAck(connack) => {
                    if connack.code == ConnectReturnCode::Success {
                        EventRoute::ConnectionAcknowledged
                    } else {
                        EventRoute::ConnectionRefused(connect_return_code(connack.code))
                    }
                }
                Packet::Publish(publish) => EventRoute::MessageReceived {
                    topic: publish.topic.clone(),
                    payload: publish.payload.clone(),
                },
                Packet::Disconnect => EventRoute::Disconnected,
                Packet::SubAck(suback) => EventRoute::SubscriptionConfirmed {
                    packet_id: suback.pkid,
                    return_codes: suback.return_codes.clone(),
                },
                other => EventRoute::InfrastructureEvent(format!("{other:?}")),
            },
            Event::Outgoing(_) => EventRoute::OutgoingEvent,
        }
    }

    /// A SUBACK fails if any filter was refused
    pub fn validate_subscription_success(return_codes: &[SubscribeReasonCode]) -> Result<(), String> {
        if return_codes
            .iter()
            .any(|code| matches!(code, SubscribeReasonCode::Failure))
        {
            Err(format!("Subscription failed with return codes: {return_codes:?}"))
        } else {
            Ok(())
        }
    }
}

/// Routing decisions for MQTT events
#[derive(Debug, Clone)]
pub enum EventRoute {
    ConnectionAcknowledged,
    /// CONNACK with a non-zero return code
    ConnectionRefused(u8),
    MessageReceived {
        topic: String,
        payload: Bytes,
    },
    Disconnected,
    SubscriptionConfirmed {
        packet_id: u16,
        return_codes: Vec<SubscribeReasonCode>,
    },
    /// PingResp and other bookkeeping packets
    InfrastructureEvent(String),
    OutgoingEvent,
}

/// What happened to one inbound message
#[derive(Debug, Clone, PartialEq)]
pub enum MessageDisposition {
    Processed {
        pallet_id: String,
        outcome: ProcessOutcome,
    },
    MissingPalletId,
    DecodeFailed(String),
    IgnoredTopic(String),
    /// Handling panicked; the listener carried on
    HandlerFailed(String),
}

/// Handler registered on the broker connection for new-pallet messages
pub struct PalletMessageHandler {
    processor: Arc<PalletProcessor>,
    topic: String,
}

impl PalletMessageHandler {
    pub fn new(processor: Arc<PalletProcessor>) -> Self {
        Self {
            processor,
            topic: TopicBuilder::build_new_pallet_topic(),
        }
    }

    /// Topic this handler expects messages on
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Decode and process one message to completion
    pub async fn handle(&self, topic: &str, payload: &[u8]) -> MessageDisposition {
        if !MessageHandler::should_process_message(topic, &self.topic) {
            return MessageDisposition::IgnoredTopic(topic.to_string());
        }

        match MessageHandler::decode_pallet_event(payload) {
            Ok(event) => {
                let outcome = self
                    .processor
                    .process(&event.pallet_id)
                    .instrument(crate::pallet_span!(pallet_id = %event.pallet_id))
                    .await;
                MessageDisposition::Processed {
                    pallet_id: event.pallet_id,
                    outcome,
                }
            }
            Err(DecodeError::MissingPalletId) => {
                warn!("Received message without a 'pallet_id'");
                MessageDisposition::MissingPalletId
            }
            Err(e @ DecodeError::InvalidJson(_)) => {
                error!(error_kind = "decode", "Failed to decode JSON from message payload: {}", e);
                MessageDisposition::DecodeFailed(e.to_string())
            }
            Err(e) => {
                error!(error_kind = "decode", "Rejected message payload: {}", e);
                MessageDisposition::DecodeFailed(e.to_string())
            }
        }
    }

    /// Handle one message on its own task and wait for it
    ///
    /// The caller does not take the next message until this returns, so at
    /// most one pallet is in flight. A panic during handling is logged and
    /// reported as [`MessageDisposition::HandlerFailed`].
    pub async fn dispatch(self: &Arc<Self>, topic: String, payload: Bytes) -> MessageDisposition {
        let handler = Arc::clone(self);
        let task = tokio::spawn(
            async move { handler.handle(&topic, &payload).await }.in_current_span(),
        );

        match task.await {
            Ok(disposition) => disposition,
            Err(e) => {
                error!(error_kind = "handler", "An error occurred while handling message: {}", e);
                MessageDisposition::HandlerFailed(e.to_string())
            }
        }
    }
}
